//! Stats-mode coercion
//!
//! When statistics tracing is enabled the caller's stats mode must be strong
//! enough for the server to report statistics at all. [`resolve_stats_mode`]
//! upgrades `Unspecified` and `None` to [`QueryStatsMode::Basic`], the
//! cheapest mode that yields statistics, and leaves anything the caller
//! asked for explicitly untouched.

use crate::client::QueryStatsMode;

/// Decide which stats mode to forward to the driver.
///
/// With `trace_query_stats` disabled this is the identity function. With it
/// enabled, `Unspecified` and `None` become [`QueryStatsMode::Basic`]; a
/// stronger caller-supplied mode is never downgraded.
///
/// # Example
///
/// ```
/// use otel_instrumentation_ydb::client::QueryStatsMode;
/// use otel_instrumentation_ydb::stats::resolve_stats_mode;
///
/// assert_eq!(
///     resolve_stats_mode(QueryStatsMode::None, true),
///     QueryStatsMode::Basic
/// );
/// assert_eq!(
///     resolve_stats_mode(QueryStatsMode::Full, true),
///     QueryStatsMode::Full
/// );
/// assert_eq!(
///     resolve_stats_mode(QueryStatsMode::None, false),
///     QueryStatsMode::None
/// );
/// ```
#[must_use]
pub fn resolve_stats_mode(requested: QueryStatsMode, trace_query_stats: bool) -> QueryStatsMode {
    if !trace_query_stats {
        return requested;
    }

    match requested {
        QueryStatsMode::Unspecified | QueryStatsMode::None => QueryStatsMode::Basic,
        stronger => stronger,
    }
}
