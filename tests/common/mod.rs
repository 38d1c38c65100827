#![allow(dead_code)]

// Shared test support: an in-memory tracing harness and a scripted fake
// driver. The harness swaps the global tracer provider, which is process
// wide state, so constructing one takes a lock that serializes the tests
// in this binary.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{self, Poll};
use std::time::Duration;

use futures_util::Stream;
use opentelemetry::global;
use opentelemetry_sdk::trace::{
    InMemorySpanExporter, InMemorySpanExporterBuilder, Sampler, SdkTracerProvider as TracerProvider,
    SpanData,
};
use opentelemetry_sdk::Resource;
use otel_instrumentation_ydb::{
    QuerySession, QueryStats, QueryStatsMode, QueryTransaction, TxMode,
};

static GLOBAL_TRACING: Mutex<()> = Mutex::new(());

pub struct TestHarness {
    provider: TracerProvider,
    exporter: InMemorySpanExporter,
    _serialized: MutexGuard<'static, ()>,
}

impl TestHarness {
    pub fn new() -> Self {
        // A poisoned lock only means an earlier test failed while holding it.
        let guard = GLOBAL_TRACING
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let exporter = InMemorySpanExporterBuilder::new().build();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(Resource::builder_empty().build())
            .build();

        // Set as global provider for instrumentation
        global::set_tracer_provider(provider.clone());

        Self {
            provider,
            exporter,
            _serialized: guard,
        }
    }

    pub fn get_spans(&self) -> Vec<SpanData> {
        // Force flush of any pending spans
        let _ = self.provider.force_flush();
        self.exporter.get_finished_spans().unwrap()
    }

    pub fn reset(&self) {
        self.exporter.reset();
    }

    pub fn tracer(&self, name: &'static str) -> opentelemetry::global::BoxedTracer {
        global::tracer(name)
    }
}

/// Attribute value of `span`, if present.
pub fn attr(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

pub fn has_attr(span: &SpanData, key: &str) -> bool {
    attr(span, key).is_some()
}

/// Statistics the fake server reports once a collecting query drains.
pub fn stats_fixture() -> QueryStats {
    QueryStats {
        total_duration: Duration::from_micros(1500),
        total_cpu_time: Duration::from_micros(900),
        process_cpu_time: Duration::from_micros(417),
    }
}

/// What the fake driver does when asked to execute a query.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return these result sets, then report statistics on drain.
    Rows(Vec<FakeResultSet>),
    /// Fail the execute call itself.
    FailImmediately(String),
    /// Return these result sets, then fail the stream.
    FailMidStream {
        first: Vec<FakeResultSet>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResultSet {
    pub rows: Vec<i64>,
}

impl FakeResultSet {
    pub fn new(rows: Vec<i64>) -> Self {
        Self { rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeError(pub String);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for FakeError {}

/// Everything the driver call recorded, for the assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub query: String,
    pub stats_mode: QueryStatsMode,
}

#[derive(Debug, Default)]
struct DriverState {
    calls: Vec<RecordedCall>,
    last_stats: Option<QueryStats>,
    tx_id: Option<String>,
    committed: bool,
}

/// Driver result stream. Panics if polled past its end, and only reports
/// statistics back to its session once fully drained, like the real driver.
pub struct FakeResultStream {
    items: VecDeque<Result<FakeResultSet, FakeError>>,
    stats_on_drain: Option<QueryStats>,
    state: Arc<Mutex<DriverState>>,
    ended: bool,
}

impl Stream for FakeResultStream {
    type Item = Result<FakeResultSet, FakeError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        assert!(!self.ended, "driver stream polled after exhaustion");
        match self.items.pop_front() {
            Some(item) => Poll::Ready(Some(item)),
            None => {
                self.ended = true;
                if let Some(stats) = self.stats_on_drain.take() {
                    self.state.lock().unwrap().last_stats = Some(stats);
                }
                Poll::Ready(None)
            }
        }
    }
}

fn run_script(
    state: &Arc<Mutex<DriverState>>,
    behavior: &Behavior,
    query: &str,
    stats_mode: QueryStatsMode,
) -> Result<FakeResultStream, FakeError> {
    {
        let mut state = state.lock().unwrap();
        state.calls.push(RecordedCall {
            query: query.to_string(),
            stats_mode,
        });
        state.last_stats = None;
    }

    match behavior {
        Behavior::FailImmediately(message) => Err(FakeError(message.clone())),
        Behavior::Rows(sets) => Ok(FakeResultStream {
            items: sets.iter().cloned().map(Ok).collect(),
            stats_on_drain: stats_mode.collects_stats().then(stats_fixture),
            state: Arc::clone(state),
            ended: false,
        }),
        Behavior::FailMidStream { first, message } => {
            let mut items: VecDeque<_> = first.iter().cloned().map(Ok).collect();
            items.push_back(Err(FakeError(message.clone())));
            Ok(FakeResultStream {
                items,
                stats_on_drain: None,
                state: Arc::clone(state),
                ended: false,
            })
        }
    }
}

/// Scripted query session.
#[derive(Debug, Clone)]
pub struct FakeSession {
    id: String,
    behavior: Behavior,
    state: Arc<Mutex<DriverState>>,
}

impl FakeSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_behavior(id, Behavior::Rows(vec![FakeResultSet::new(vec![2])]))
    }

    pub fn with_behavior(id: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            id: id.into(),
            behavior,
            state: Arc::new(Mutex::new(DriverState::default())),
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl QuerySession for FakeSession {
    type Params = ();
    type ResultSet = FakeResultSet;
    type Error = FakeError;
    type Stream = FakeResultStream;

    fn session_id(&self) -> &str {
        &self.id
    }

    async fn execute(
        &self,
        query: &str,
        _params: (),
        stats_mode: QueryStatsMode,
    ) -> Result<FakeResultStream, FakeError> {
        run_script(&self.state, &self.behavior, query, stats_mode)
    }

    fn last_query_stats(&self) -> Option<QueryStats> {
        self.state.lock().unwrap().last_stats
    }
}

/// Scripted transaction context. The server side assigns the transaction
/// identifier when the first statement executes.
#[derive(Debug, Clone)]
pub struct FakeTx {
    session_id: String,
    mode: TxMode,
    behavior: Behavior,
    state: Arc<Mutex<DriverState>>,
}

impl FakeTx {
    pub fn new(session_id: impl Into<String>, mode: TxMode) -> Self {
        Self::with_behavior(
            session_id,
            mode,
            Behavior::Rows(vec![FakeResultSet::new(vec![2])]),
        )
    }

    pub fn with_behavior(session_id: impl Into<String>, mode: TxMode, behavior: Behavior) -> Self {
        Self {
            session_id: session_id.into(),
            mode,
            behavior,
            state: Arc::new(Mutex::new(DriverState::default())),
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub async fn commit(&self) -> Result<(), FakeError> {
        self.state.lock().unwrap().committed = true;
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.state.lock().unwrap().committed
    }
}

impl QueryTransaction for FakeTx {
    type Params = ();
    type ResultSet = FakeResultSet;
    type Error = FakeError;
    type Stream = FakeResultStream;

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn tx_id(&self) -> Option<String> {
        self.state.lock().unwrap().tx_id.clone()
    }

    fn tx_mode(&self) -> TxMode {
        self.mode
    }

    async fn execute(
        &self,
        query: &str,
        _params: (),
        stats_mode: QueryStatsMode,
    ) -> Result<FakeResultStream, FakeError> {
        let result = run_script(&self.state, &self.behavior, query, stats_mode);
        if result.is_ok() {
            self.state
                .lock()
                .unwrap()
                .tx_id
                .get_or_insert_with(|| "tx-1".to_string());
        }
        result
    }

    fn last_query_stats(&self) -> Option<QueryStats> {
        self.state.lock().unwrap().last_stats
    }
}
