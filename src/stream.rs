//! Result stream decorator that owns the query span
//!
//! YDB query execution is lazy: the driver call returns a stream of result
//! set parts, and the interesting telemetry (server-side statistics, the
//! transaction identifier of an interactive transaction) only exists once
//! that stream is drained. [`TracedResultStream`] therefore carries the span
//! past the driver call and closes it exactly once, on whichever comes
//! first: exhaustion, a failed item, or drop.

use std::fmt;
use std::pin::Pin;
use std::task::{self, Poll};

use futures_util::Stream;
use opentelemetry::trace::{Status, TraceContextExt};
use opentelemetry::Context;
use tracing::error;

/// Deferred finalization step run right before the span ends.
///
/// The wrappers use this to read back whatever the driver only knows after
/// the fact (last query statistics, the transaction identifier).
pub(crate) type CloseHook = Box<dyn FnOnce(&Context) + Send>;

struct ActiveSpan {
    cx: Context,
    on_close: CloseHook,
}

impl ActiveSpan {
    /// Run the close hook and end the span. Consumes the handle, so the
    /// span cannot be closed twice.
    fn finish(self) {
        (self.on_close)(&self.cx);
        self.cx.span().end();
    }
}

/// Stream of result set parts with a query span attached.
///
/// Forwards every item of the underlying driver stream unchanged. While an
/// item is being polled the span's context is attached to the current
/// thread, so telemetry emitted by the driver lands under the query span.
///
/// When instrumentation is uninstalled the wrappers hand out the same type
/// without a span, making the decorator a plain passthrough.
#[must_use = "streams do nothing unless polled"]
pub struct TracedResultStream<St> {
    inner: St,
    active: Option<ActiveSpan>,
    done: bool,
}

impl<St> TracedResultStream<St> {
    pub(crate) fn traced(inner: St, cx: Context, on_close: CloseHook) -> Self {
        Self {
            inner,
            active: Some(ActiveSpan { cx, on_close }),
            done: false,
        }
    }

    pub(crate) fn untraced(inner: St) -> Self {
        Self {
            inner,
            active: None,
            done: false,
        }
    }

    /// Whether a span is still open for this stream.
    #[must_use]
    pub fn is_traced(&self) -> bool {
        self.active.is_some()
    }

    fn finish(&mut self) {
        if let Some(active) = self.active.take() {
            active.finish();
        }
    }
}

impl<St, T, E> Stream for TracedResultStream<St>
where
    St: Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
{
    type Item = Result<T, E>;

    fn poll_next(
        self: Pin<&mut Self>,
        task_cx: &mut task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Once drained the inner stream is never polled again.
        if this.done {
            return Poll::Ready(None);
        }

        let poll = match this.active.as_ref() {
            Some(active) => {
                let _guard = active.cx.clone().attach();
                Pin::new(&mut this.inner).poll_next(task_cx)
            }
            None => Pin::new(&mut this.inner).poll_next(task_cx),
        };

        match poll {
            Poll::Ready(Some(Ok(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Err(err))) => {
                this.done = true;
                if let Some(active) = this.active.as_ref() {
                    error!("Query result stream failed: {}", err);
                    active.cx.span().set_status(Status::error(err.to_string()));
                }
                this.finish();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.done = true;
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}

// Abandoning the stream must still close the span.
impl<St> Drop for TracedResultStream<St> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<St: fmt::Debug> fmt::Debug for TracedResultStream<St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedResultStream")
            .field("inner", &self.inner)
            .field("traced", &self.active.is_some())
            .field("done", &self.done)
            .finish()
    }
}
