use std::ops::Deref;
use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::trace::{FutureExt, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions as semconv;
use tracing::{debug, error};

use crate::attributes::{self, QUERY_SPAN_NAME};
use crate::client::{QuerySession, QueryStatsMode};
use crate::instrumentor::InstrumentationState;
use crate::stats::resolve_stats_mode;
use crate::stream::TracedResultStream;

/// A wrapper around a query session that adds tracing instrumentation
///
/// Obtained from [`YdbInstrumentor::instrument_session`]. Every `execute`
/// call opens a `Query` span that stays open until the returned result
/// stream is drained, fails, or is dropped.
///
/// [`YdbInstrumentor::instrument_session`]: crate::YdbInstrumentor::instrument_session
pub struct InstrumentedSession<S> {
    inner: S,
    state: Arc<InstrumentationState>,
}

impl<S: QuerySession> InstrumentedSession<S> {
    pub(crate) fn new(inner: S, state: Arc<InstrumentationState>) -> Self {
        Self { inner, state }
    }

    /// Executes a query on this session and returns the traced result stream
    ///
    /// The requested statistics mode may be upgraded to `Basic` when
    /// statistics tracing is enabled, so the server reports timings for the
    /// span to record. While instrumentation is uninstalled the call
    /// delegates with every argument untouched and no span is created.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged if the query execution fails.
    pub async fn execute(
        &self,
        query: &str,
        params: S::Params,
        stats_mode: QueryStatsMode,
    ) -> Result<TracedResultStream<S::Stream>, S::Error> {
        if !self.state.is_installed() {
            let stream = self.inner.execute(query, params, stats_mode).await?;
            return Ok(TracedResultStream::untraced(stream));
        }

        let stats_mode = resolve_stats_mode(stats_mode, self.state.trace_query_stats());

        debug!(
            "Executing query on session {} with stats mode {}",
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
                // Statistics only exist once the stream is drained, so the
                // close hook reads them from a clone of the session handle.
                let session = self.inner.clone();
                Ok(TracedResultStream::traced(
                    stream,
                    cx,
                    Box::new(move |cx| {
                        attributes::set_stats_attributes(cx, session.last_query_stats());
                    }),
                ))
            }
            Err(e) => {
                error!("Query execution failed: {}", e);
                cx.span().set_status(Status::error(e.to_string()));
                cx.span().end();
                Err(e)
            }
        }
    }

    /// Get a reference to the inner session
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Consume self and return the inner session
    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: QuerySession> Deref for InstrumentedSession<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<S: QuerySession> AsRef<S> for InstrumentedSession<S> {
    fn as_ref(&self) -> &S {
        &self.inner
    }
}
