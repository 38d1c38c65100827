//! Builder pattern for configuring the YDB instrumentor
//!
//! Both tracing toggles default to off, matching the most conservative
//! configuration: spans carry identifiers only, query text stays out of the
//! trace, and outgoing statistics modes are never rewritten.

use crate::instrumentor::YdbInstrumentor;

/// Builder for creating a [`YdbInstrumentor`] with configurable span content
///
/// # Example
///
/// ```
/// use otel_instrumentation_ydb::YdbInstrumentor;
///
/// let instrumentor = YdbInstrumentor::builder()
///     .with_query_text(true)
///     .with_query_stats(true)
///     .build();
/// ```
pub struct YdbInstrumentorBuilder {
    trace_query_text: bool,
    trace_query_stats: bool,
}

impl YdbInstrumentorBuilder {
    /// Create a new builder with both toggles off
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_query_text: false,
            trace_query_stats: false,
        }
    }

    /// Record the YQL text of every query as a span attribute
    ///
    /// Query parameters are never recorded, but the text itself may still
    /// contain sensitive literals.
    #[must_use]
    pub fn with_query_text(mut self, enabled: bool) -> Self {
        self.trace_query_text = enabled;
        self
    }

    /// Record server-reported query statistics as span attributes
    ///
    /// Enabling this upgrades the statistics mode of queries that did not
    /// ask for statistics to `Basic`, which may affect latency.
    #[must_use]
    pub fn with_query_stats(mut self, enabled: bool) -> Self {
        self.trace_query_stats = enabled;
        self
    }

    /// Build the configured instrumentor
    ///
    /// The instrumentor starts uninstalled.
    #[must_use]
    pub fn build(self) -> YdbInstrumentor {
        YdbInstrumentor::new(self.trace_query_text, self.trace_query_stats)
    }
}

impl Default for YdbInstrumentorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
