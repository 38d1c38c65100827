//! Interfaces required from the underlying YDB driver
//!
//! The instrumentation layer never links a driver. Instead it declares, as
//! traits, exactly what it needs from the driver's query-service types: a
//! session and a transaction that can execute a query into a lazily consumed
//! stream of result sets and that expose the statistics the server reports
//! once that stream has been drained. Implementing [`QuerySession`] and
//! [`QueryTransaction`] for the driver's handle types is the integration step
//! a host application performs once.
//!
//! Implementations are expected to be cheap clonable handles (the driver's
//! session and transaction objects are shared references around connection
//! state); the instrumentation clones them so statistics stay readable after
//! the result stream has been exhausted.

use std::time::Duration;

use futures_util::Stream;

/// Server-side statistics collection mode for a single query execution.
///
/// `Unspecified` is the default and means the caller expressed no preference;
/// the server then collects nothing. Stronger modes add server-side work, so
/// the instrumentation only ever upgrades to [`QueryStatsMode::Basic`], the
/// cheapest mode that yields statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatsMode {
    /// No preference expressed; the server default applies.
    #[default]
    Unspecified,
    /// Statistics collection explicitly disabled.
    None,
    /// Aggregated statistics: durations and CPU times.
    Basic,
    /// Per-phase statistics in addition to the basic aggregates.
    Full,
    /// Full statistics plus the query plan.
    Profile,
}

impl QueryStatsMode {
    /// Stable lowercase name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatsMode::Unspecified => "unspecified",
            QueryStatsMode::None => "none",
            QueryStatsMode::Basic => "basic",
            QueryStatsMode::Full => "full",
            QueryStatsMode::Profile => "profile",
        }
    }

    /// Whether the server returns query statistics under this mode.
    #[must_use]
    pub fn collects_stats(&self) -> bool {
        matches!(
            self,
            QueryStatsMode::Basic | QueryStatsMode::Full | QueryStatsMode::Profile
        )
    }
}

impl std::fmt::Display for QueryStatsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Isolation level a transaction was started with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxMode {
    /// Serializable read-write, the strongest and the driver default.
    #[default]
    SerializableReadWrite,
    /// Online read-only, possibly reading non-committed data.
    OnlineReadOnly,
    /// Stale read-only against a possibly lagging replica.
    StaleReadOnly,
    /// Snapshot read-only against a consistent snapshot.
    SnapshotReadOnly,
}

impl TxMode {
    /// Stable snake_case name of the isolation level, used verbatim as the
    /// `tx.mode` span attribute value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TxMode::SerializableReadWrite => "serializable_read_write",
            TxMode::OnlineReadOnly => "online_read_only",
            TxMode::StaleReadOnly => "stale_read_only",
            TxMode::SnapshotReadOnly => "snapshot_read_only",
        }
    }
}

impl std::fmt::Display for TxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics the server reports for one query execution.
///
/// The server finalizes these only after the full result stream has been
/// drained; until then the driver's last-statistics accessor returns `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Wall-clock duration of the whole execution.
    pub total_duration: Duration,
    /// CPU time consumed across all participating nodes.
    pub total_cpu_time: Duration,
    /// CPU time consumed by the query process itself.
    pub process_cpu_time: Duration,
}

/// A driver session able to execute queries outside a transaction.
///
/// `execute` returns a scoped stream: dropping it releases the server-side
/// cursor. The driver records the statistics of the most recent execution on
/// the session once that stream is exhausted.
pub trait QuerySession: Clone + Send + Sync + 'static {
    /// Driver-specific execution arguments (query parameters, execution
    /// settings). Forwarded through the instrumentation untouched; use `()`
    /// when the adapter has none.
    type Params: Send;
    /// One result set as produced by the server.
    type ResultSet: Send;
    /// The driver's error type. The instrumentation layer propagates it
    /// unchanged and never wraps it.
    type Error: std::error::Error + Send + Sync + 'static;
    /// The lazily produced sequence of result sets.
    type Stream: Stream<Item = Result<Self::ResultSet, Self::Error>> + Send + Unpin;

    /// Identifier the server assigned to this session. Stable for the
    /// session's lifetime.
    fn session_id(&self) -> &str;

    /// Execute `query` on this session.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the execution cannot be started.
    /// Errors encountered while streaming results surface as `Err` items of
    /// the returned stream.
    fn execute(
        &self,
        query: &str,
        params: Self::Params,
        stats_mode: QueryStatsMode,
    ) -> impl std::future::Future<Output = Result<Self::Stream, Self::Error>> + Send;

    /// Statistics of the most recently completed execution, if the server
    /// reported any. `None` until a result stream has been fully drained
    /// under a stats-collecting mode.
    fn last_query_stats(&self) -> Option<QueryStats>;
}

/// A driver transaction context able to execute queries within a transaction.
///
/// Committing or rolling back is the caller's business and stays on the
/// driver's own surface; this trait only covers what the instrumentation
/// reads and calls.
pub trait QueryTransaction: Clone + Send + Sync + 'static {
    /// Driver-specific execution arguments, as for [`QuerySession::Params`].
    type Params: Send;
    /// One result set as produced by the server.
    type ResultSet: Send;
    /// The driver's error type, propagated unchanged.
    type Error: std::error::Error + Send + Sync + 'static;
    /// The lazily produced sequence of result sets.
    type Stream: Stream<Item = Result<Self::ResultSet, Self::Error>> + Send + Unpin;

    /// Identifier of the session this transaction runs on.
    fn session_id(&self) -> &str;

    /// Identifier the server assigned to this transaction. `None` until the
    /// first statement has executed.
    fn tx_id(&self) -> Option<String>;

    /// Isolation level the transaction was started with.
    fn tx_mode(&self) -> TxMode;

    /// Execute `query` within this transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the execution cannot be started.
    /// Errors encountered while streaming results surface as `Err` items of
    /// the returned stream.
    fn execute(
        &self,
        query: &str,
        params: Self::Params,
        stats_mode: QueryStatsMode,
    ) -> impl std::future::Future<Output = Result<Self::Stream, Self::Error>> + Send;

    /// Statistics of the most recently completed execution, if the server
    /// reported any.
    fn last_query_stats(&self) -> Option<QueryStats>;
}
