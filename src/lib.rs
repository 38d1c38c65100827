/*!
`otel-instrumentation-ydb` provides OpenTelemetry tracing instrumentation for YDB query
execution. Driver sessions and transaction contexts are wrapped behind a small trait, and
every `execute` call becomes a `Query` span that stays open until the returned result
stream is drained.

# Usage

The driver is not patched. An application hands its session (or transaction context) to
the [`YdbInstrumentor`] and uses the returned wrapper in its place; the wrapper delegates
every call and adds the span. [`install`](YdbInstrumentor::install) and
[`uninstall`](YdbInstrumentor::uninstall) switch tracing on and off for every wrapper the
instrumentor has handed out.

# Example

```rust,ignore
use futures_util::TryStreamExt;
use otel_instrumentation_ydb::{QueryStatsMode, YdbInstrumentor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (you need to set up your tracing subscriber)
    tracing_subscriber::fmt::init();

    let instrumentor = YdbInstrumentor::builder()
        .with_query_text(true)
        .with_query_stats(true)
        .build();
    instrumentor.install();

    // `session` is any driver session implementing `client::QuerySession`
    let session = instrumentor.instrument_session(session);

    let mut rows = session
        .execute("SELECT 1 + 1", params, QueryStatsMode::Unspecified)
        .await?;
    while let Some(result_set) = rows.try_next().await? {
        // The `Query` span stays open until this loop finishes.
    }

    Ok(())
}
```

# Span attributes

Every span is named `Query`, has kind `CLIENT`, and carries:

- `db.system.name` - always `ydb`
- `db.operation.name` - always `execute`
- `query.text` - YQL text (without parameters) of the query, only when query text tracing is enabled
- `session.id` - identifier of the session used to execute the query
- `tx.mode` - isolation level of the transaction (transaction spans only)
- `tx.id` - transaction identifier (transaction spans only, once the server assigned one)
- `query.stats.total_duration` - total query duration (in microseconds)
- `query.stats.total_cpu_time` - total query CPU time (in microseconds)
- `query.stats.process_cpu_time` - process CPU time (in microseconds)

# Features

- **Wrapper pattern** - [`InstrumentedSession`] and [`InstrumentedTxn`] delegate to the driver and add spans
- **Deferred span close** - the span follows the result stream and closes exactly once, on exhaustion, failure, or drop, so server-reported statistics land on the right span
- **Explicit lifecycle** - `install`/`uninstall` flip tracing for every wrapper already handed out, no process-wide patching
- **Drop-in surface** - wrappers implement `Deref` and `AsRef` to the inner driver type

# Limitations

Only query-service sessions and transaction contexts are covered. Sync clients and the
table service client are out of scope for now.

*/
#![warn(clippy::all, clippy::pedantic)]

pub mod attributes;
pub mod builder;
pub mod client;
pub mod instrumentor;
pub mod session;
pub mod stats;
pub mod stream;
pub mod txn;

/// Instrumentation scope name every query span is created under.
pub const TRACER_NAME: &str = "otel-instrumentation-ydb";

pub use builder::YdbInstrumentorBuilder;
pub use client::{QuerySession, QueryStats, QueryStatsMode, QueryTransaction, TxMode};
pub use instrumentor::YdbInstrumentor;
pub use session::InstrumentedSession;
pub use stream::TracedResultStream;
pub use txn::InstrumentedTxn;
