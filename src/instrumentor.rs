use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::builder::YdbInstrumentorBuilder;
use crate::client::{QuerySession, QueryTransaction};
use crate::session::InstrumentedSession;
use crate::txn::InstrumentedTxn;

/// Configuration and install flag shared by the instrumentor and every
/// wrapper it hands out.
///
/// The toggles are fixed at construction time; only the install flag
/// changes, so wrappers created before `install` or kept across
/// `uninstall` follow the current state on every call.
#[derive(Debug)]
pub(crate) struct InstrumentationState {
    trace_query_text: bool,
    trace_query_stats: bool,
    installed: AtomicBool,
}

impl InstrumentationState {
    fn new(trace_query_text: bool, trace_query_stats: bool) -> Self {
        Self {
            trace_query_text,
            trace_query_stats,
            installed: AtomicBool::new(false),
        }
    }

    pub(crate) fn trace_query_text(&self) -> bool {
        self.trace_query_text
    }

    pub(crate) fn trace_query_stats(&self) -> bool {
        self.trace_query_stats
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }
}

/// Entry point that turns driver sessions and transactions into their
/// instrumented counterparts
///
/// The instrumentor starts uninstalled. Wrappers can be created at any time,
/// but they only trace while the instrumentation is installed; after
/// [`uninstall`](Self::uninstall) they delegate to the driver with every
/// argument untouched. Cloning is cheap and every clone drives the same
/// install flag.
///
/// # Example
///
/// ```
/// use otel_instrumentation_ydb::YdbInstrumentor;
///
/// let instrumentor = YdbInstrumentor::builder()
///     .with_query_text(true)
///     .build();
///
/// instrumentor.install();
/// assert!(instrumentor.is_installed());
/// instrumentor.uninstall();
/// ```
#[derive(Debug, Clone)]
pub struct YdbInstrumentor {
    state: Arc<InstrumentationState>,
}

impl YdbInstrumentor {
    /// Creates an instrumentor with the given tracing toggles
    ///
    /// `trace_query_text` records the YQL text of every query on its span.
    /// `trace_query_stats` upgrades the statistics mode of outgoing queries
    /// to `Basic` when the caller did not ask for statistics, so the server
    /// reports timings for the span to record. Both default to off in
    /// [`YdbInstrumentorBuilder`].
    #[must_use]
    pub fn new(trace_query_text: bool, trace_query_stats: bool) -> Self {
        Self {
            state: Arc::new(InstrumentationState::new(trace_query_text, trace_query_stats)),
        }
    }

    /// Returns a builder for configuring an instrumentor
    #[must_use]
    pub fn builder() -> YdbInstrumentorBuilder {
        YdbInstrumentorBuilder::new()
    }

    /// Activates tracing for every wrapper sharing this instrumentor
    ///
    /// # Panics
    ///
    /// Panics if the instrumentation is already installed.
    pub fn install(&self) {
        let flipped =
            self.state
                .installed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        assert!(flipped.is_ok(), "YDB instrumentation is already installed");
        debug!("YDB instrumentation installed");
    }

    /// Deactivates tracing, reverting every wrapper to a plain passthrough
    ///
    /// Queries already in flight keep the span they opened; only subsequent
    /// calls are affected. The instrumentor may be installed again later.
    ///
    /// # Panics
    ///
    /// Panics if the instrumentation is not installed.
    pub fn uninstall(&self) {
        let flipped =
            self.state
                .installed
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
        assert!(flipped.is_ok(), "YDB instrumentation is not installed");
        debug!("YDB instrumentation uninstalled");
    }

    /// Whether the instrumentation is currently installed
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.state.is_installed()
    }

    /// Wraps a query session
    #[must_use]
    pub fn instrument_session<S: QuerySession>(&self, session: S) -> InstrumentedSession<S> {
        InstrumentedSession::new(session, Arc::clone(&self.state))
    }

    /// Wraps a transaction context
    #[must_use]
    pub fn instrument_transaction<T: QueryTransaction>(&self, tx: T) -> InstrumentedTxn<T> {
        InstrumentedTxn::new(tx, Arc::clone(&self.state))
    }

    /// The driver release series this instrumentation is written against
    #[must_use]
    pub fn instrumentation_dependencies(&self) -> &'static [&'static str] {
        &["ydb >= 0.9"]
    }
}
