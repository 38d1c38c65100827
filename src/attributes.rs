//! Span attribute keys and collector functions
//!
//! Everything a query span can carry is enumerated here. The setters operate
//! on the [`Context`] holding the active span, so both the pre-call steps in
//! the wrappers and the deferred close path in the stream decorator share one
//! vocabulary.

use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};

use crate::client::{QueryStats, TxMode};

/// Name of every span emitted by this crate.
pub const QUERY_SPAN_NAME: &str = "Query";

/// YQL text of the query, recorded only when query-text tracing is enabled.
pub const QUERY_TEXT: &str = "query.text";
/// Identifier of the session the query executed on.
pub const SESSION_ID: &str = "session.id";
/// Isolation level of the transaction the query executed in.
pub const TX_MODE: &str = "tx.mode";
/// Identifier of the transaction the query executed in.
pub const TX_ID: &str = "tx.id";
/// Process CPU time reported by the server, as integer microseconds + `us`.
pub const QUERY_STATS_PROCESS_CPU_TIME: &str = "query.stats.process_cpu_time";
/// Total CPU time reported by the server, as integer microseconds + `us`.
pub const QUERY_STATS_TOTAL_CPU_TIME: &str = "query.stats.total_cpu_time";
/// Total duration reported by the server, as integer microseconds + `us`.
pub const QUERY_STATS_TOTAL_DURATION: &str = "query.stats.total_duration";

/// Value of the `db.system.name` semantic-convention attribute.
pub(crate) const DB_SYSTEM: &str = "ydb";
/// Value of the `db.operation.name` semantic-convention attribute.
pub(crate) const DB_OPERATION: &str = "execute";

/// Record the literal query text iff query-text tracing is enabled.
pub(crate) fn set_query_attribute(cx: &Context, query: &str, trace_query_text: bool) {
    if trace_query_text {
        cx.span()
            .set_attribute(KeyValue::new(QUERY_TEXT, query.to_string()));
    }
}

/// Record the session identifier.
pub(crate) fn set_session_attribute(cx: &Context, session_id: &str) {
    cx.span()
        .set_attribute(KeyValue::new(SESSION_ID, session_id.to_string()));
}

/// Record the transaction isolation level and, once assigned, the
/// transaction identifier.
pub(crate) fn set_transaction_attributes(cx: &Context, tx_mode: TxMode, tx_id: Option<&str>) {
    let span = cx.span();
    span.set_attribute(KeyValue::new(TX_MODE, tx_mode.as_str()));
    if let Some(tx_id) = tx_id {
        span.set_attribute(KeyValue::new(TX_ID, tx_id.to_string()));
    }
}

/// Record server-reported statistics. Absent statistics (the server was not
/// asked to collect any, or the stream never drained) record nothing.
pub(crate) fn set_stats_attributes(cx: &Context, stats: Option<QueryStats>) {
    let Some(stats) = stats else {
        return;
    };

    let span = cx.span();
    span.set_attribute(KeyValue::new(
        QUERY_STATS_PROCESS_CPU_TIME,
        format_micros(&stats.process_cpu_time),
    ));
    span.set_attribute(KeyValue::new(
        QUERY_STATS_TOTAL_CPU_TIME,
        format_micros(&stats.total_cpu_time),
    ));
    span.set_attribute(KeyValue::new(
        QUERY_STATS_TOTAL_DURATION,
        format_micros(&stats.total_duration),
    ));
}

fn format_micros(duration: &std::time::Duration) -> String {
    format!("{}us", duration.as_micros())
}
