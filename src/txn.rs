use std::ops::Deref;
use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::trace::{FutureExt, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions as semconv;
use tracing::{debug, error};

use crate::attributes::{self, QUERY_SPAN_NAME};
use crate::client::{QueryStatsMode, QueryTransaction};
use crate::instrumentor::InstrumentationState;
use crate::stats::resolve_stats_mode;
use crate::stream::TracedResultStream;

/// An instrumented wrapper around a transaction context that adds
/// OpenTelemetry tracing
///
/// Obtained from [`YdbInstrumentor::instrument_transaction`]. The shape
/// mirrors [`InstrumentedSession`] on purpose; the difference is in what the
/// span records when it closes. The server assigns the transaction
/// identifier only once the first statement has executed, so `tx.mode` and
/// `tx.id` are recorded at span close rather than at span start.
///
/// [`YdbInstrumentor::instrument_transaction`]: crate::YdbInstrumentor::instrument_transaction
/// [`InstrumentedSession`]: crate::InstrumentedSession
pub struct InstrumentedTxn<T> {
    inner: T,
    state: Arc<InstrumentationState>,
}

impl<T: QueryTransaction> InstrumentedTxn<T> {
    pub(crate) fn new(inner: T, state: Arc<InstrumentationState>) -> Self {
        Self { inner, state }
    }

    /// Executes a query in this transaction and returns the traced result
    /// stream
    ///
    /// The requested statistics mode may be upgraded to `Basic` when
    /// statistics tracing is enabled. While instrumentation is uninstalled
    /// the call delegates with every argument untouched and no span is
    /// created.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged if the query execution fails.
    pub async fn execute(
        &self,
        query: &str,
        params: T::Params,
        stats_mode: QueryStatsMode,
    ) -> Result<TracedResultStream<T::Stream>, T::Error> {
        if !self.state.is_installed() {
            let stream = self.inner.execute(query, params, stats_mode).await?;
            return Ok(TracedResultStream::untraced(stream));
        }

        let stats_mode = resolve_stats_mode(stats_mode, self.state.trace_query_stats());

        debug!(
            "executing query in {} transaction on session {} with stats mode {}",
            self.inner.tx_mode(),
            self.inner.session_id(),
            stats_mode
        );

        let tracer = global::tracer(crate::TRACER_NAME);
        let span = tracer
            .span_builder(QUERY_SPAN_NAME)
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new(semconv::attribute::DB_SYSTEM_NAME, attributes::DB_SYSTEM),
                KeyValue::new(semconv::attribute::DB_OPERATION_NAME, attributes::DB_OPERATION),
            ])
            .start(&tracer);
        let cx = Context::current_with_span(span);

        attributes::set_query_attribute(&cx, query, self.state.trace_query_text());
        attributes::set_session_attribute(&cx, self.inner.session_id());

        match self
            .inner
            .execute(query, params, stats_mode)
            .with_context(cx.clone())
            .await
        {
            Ok(stream) => {
                let tx = self.inner.clone();
                Ok(TracedResultStream::traced(
                    stream,
                    cx,
                    Box::new(move |cx| {
                        attributes::set_transaction_attributes(
                            cx,
                            tx.tx_mode(),
                            tx.tx_id().as_deref(),
                        );
                        attributes::set_stats_attributes(cx, tx.last_query_stats());
                    }),
                ))
            }
            Err(e) => {
                error!("Query execution failed in transaction: {}", e);
                cx.span().set_status(Status::error(e.to_string()));
                cx.span().end();
                Err(e)
            }
        }
    }

    /// Get a reference to the underlying transaction
    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get a mutable reference to the underlying transaction
    #[must_use]
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume self and return the underlying transaction
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: QueryTransaction> Deref for InstrumentedTxn<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: QueryTransaction> AsRef<T> for InstrumentedTxn<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}
