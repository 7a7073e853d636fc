//! Dispatcher behaviour against a scripted event source

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;
use vsphere_api::{ApiError, EventBatch, FeedOptions, InventoryRoot, ManagedObjectReference, RawEvent};
use vsphere_stream::{
    on_batch, Cancellation, ClassifiedEvent, DiscoveryError, DispatchError, Dispatcher,
    DispatcherState, EventCategory, EventSink, EventSource, ForwardingError, Severity, SourceError,
    StreamError, SubscribeOptions,
};

type Step = Result<Option<Vec<RawEvent>>, ApiError>;

/// Replays a fixed script of poll results, then blocks like an idle endpoint
#[derive(Default)]
struct ScriptedSource {
    roots: Vec<InventoryRoot>,
    fail_lookup: bool,
    fail_open: bool,
    steps: Mutex<VecDeque<Step>>,
    lookups: AtomicUsize,
    closed: Arc<AtomicUsize>,
    opened_with: Arc<Mutex<Option<FeedOptions>>>,
}

impl ScriptedSource {
    fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            roots: vec![datacenter("ha-datacenter")],
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }
}

fn datacenter(name: &str) -> InventoryRoot {
    InventoryRoot {
        name: name.to_string(),
        reference: ManagedObjectReference::new("Datacenter", name),
    }
}

fn collector() -> ManagedObjectReference {
    ManagedObjectReference::new("EventHistoryCollector", "session[52]c1")
}

#[async_trait]
impl EventSource for ScriptedSource {
    type Feed = ();

    async fn find_roots(&self) -> Result<Vec<InventoryRoot>, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            return Err(ApiError::NetworkError("connection refused".to_string()).into());
        }
        Ok(self.roots.clone())
    }

    async fn open_feed(&self, _root: &InventoryRoot, options: &FeedOptions) -> Result<(), SourceError> {
        *self.opened_with.lock().unwrap() = Some(options.clone());
        if self.fail_open {
            return Err(ApiError::Fault {
                kind: Some("NotAuthenticated".to_string()),
                message: "The session is not authenticated.".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn next_batch(&self, _feed: &mut ()) -> Result<Option<EventBatch>, SourceError> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Ok(Some(events))) => Ok(Some(EventBatch {
                collector: collector(),
                events,
            })),
            Some(Ok(None)) => Ok(None),
            Some(Err(e)) => Err(e.into()),
            None => std::future::pending().await,
        }
    }

    async fn close_feed(&self, _feed: ()) -> Result<(), SourceError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every event it is handed; fails for the configured keys
#[derive(Clone, Default)]
struct SharedSink {
    attempted: Arc<Mutex<Vec<i64>>>,
    recorded: Arc<Mutex<Vec<ClassifiedEvent>>>,
    fail_keys: Vec<i64>,
}

impl EventSink for SharedSink {
    fn record(&mut self, event: &ClassifiedEvent) -> Result<(), ForwardingError> {
        self.attempted.lock().unwrap().push(event.key);
        if self.fail_keys.contains(&event.key) {
            return Err(ForwardingError::Rejected("sink unavailable".to_string()));
        }
        self.recorded.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Run the dispatcher until the sink has seen `attempts` events, then cancel
async fn run_until_attempted(
    dispatcher: &mut Dispatcher<ScriptedSource>,
    sink: &SharedSink,
    attempts: usize,
) -> vsphere_stream::Result<()> {
    let cancel = Cancellation::new();
    let mut running_sink = sink.clone();
    let attempted = sink.attempted.clone();

    let watcher = async {
        while attempted.lock().unwrap().len() < attempts {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
    };

    let (result, ()) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(dispatcher.run(&mut running_sink, &cancel), watcher) },
    )
    .await
    .expect("dispatcher did not stop after cancellation");
    result
}

fn powered_on_web_01() -> RawEvent {
    RawEvent::new("VmPoweredOnEvent", 1042).with_vm("web-01", "vm-100")
}

#[tokio::test]
async fn test_powered_on_event_is_forwarded() {
    let source = ScriptedSource::with_steps(vec![Ok(Some(vec![powered_on_web_01()]))]);
    let closed = source.closed.clone();
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let sink = SharedSink::default();

    run_until_attempted(&mut dispatcher, &sink, 1).await.unwrap();

    let recorded = sink.recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].category, EventCategory::PoweredOn);
    assert_eq!(recorded[0].name.as_deref(), Some("web-01"));
    assert_eq!(recorded[0].reference.as_deref(), Some("vm-100"));
    assert_eq!(recorded[0].severity, Severity::Informational);

    assert_eq!(dispatcher.state(), DispatcherState::Cancelled);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unrecognized_kind_does_not_stop_the_stream() {
    let source = ScriptedSource::with_steps(vec![
        Ok(Some(vec![RawEvent::new("VmMigratingEvent", 1).with_vm("db-01", "vm-7")])),
        Ok(None),
        Ok(Some(vec![RawEvent::new("VmCreatedEvent", 2).with_vm("db-02", "vm-8")])),
    ]);
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let sink = SharedSink::default();

    run_until_attempted(&mut dispatcher, &sink, 2).await.unwrap();

    let recorded = sink.recorded.lock().unwrap();
    assert_eq!(recorded[0].category, EventCategory::Unrecognized);
    assert_eq!(recorded[0].unrecognized_kind.as_deref(), Some("VmMigratingEvent"));
    assert_eq!(recorded[0].severity, Severity::Diagnostic);
    assert_eq!(recorded[1].category, EventCategory::Created);
}

#[tokio::test]
async fn test_forwarding_failure_is_isolated_within_batch() {
    let batch = vec![
        RawEvent::new("VmStartingEvent", 1),
        RawEvent::new("VmPoweredOnEvent", 2),
        RawEvent::new("VmReconfiguredEvent", 3),
    ];
    let source = ScriptedSource::with_steps(vec![Ok(Some(batch))]);
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let sink = SharedSink {
        fail_keys: vec![2],
        ..Default::default()
    };

    run_until_attempted(&mut dispatcher, &sink, 3).await.unwrap();

    assert_eq!(*sink.attempted.lock().unwrap(), vec![1, 2, 3]);
    let forwarded: Vec<i64> = sink.recorded.lock().unwrap().iter().map(|e| e.key).collect();
    assert_eq!(forwarded, vec![1, 3]);
}

#[test]
fn test_on_batch_reports_isolated_failures() {
    let mut sink = SharedSink {
        fail_keys: vec![5],
        ..Default::default()
    };
    let events = (1..=8).map(|key| RawEvent::new("VmStoppingEvent", key)).collect();

    let report = on_batch(&mut sink, &collector(), events);

    assert_eq!(report.forwarded, 7);
    assert_eq!(report.failed, 1);
    assert_eq!(sink.attempted.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn test_cancellation_ends_idle_stream_without_error() {
    let source = ScriptedSource::with_steps(Vec::new());
    let closed = source.closed.clone();
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let cancel = Cancellation::new();
    let trigger = cancel.clone();
    let mut sink = SharedSink::default();

    let cancel_later = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(dispatcher.run(&mut sink, &cancel), cancel_later)
    })
    .await
    .expect("dispatcher did not stop after cancellation");

    assert!(result.is_ok());
    assert_eq!(dispatcher.state(), DispatcherState::Cancelled);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let source = ScriptedSource::with_steps(vec![Ok(Some(vec![powered_on_web_01()]))]);
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let cancel = Cancellation::new();
    cancel.cancel();
    let mut sink = SharedSink::default();

    dispatcher.run(&mut sink, &cancel).await.unwrap();

    assert_eq!(dispatcher.state(), DispatcherState::Cancelled);
    assert!(sink.attempted.lock().unwrap().is_empty());
}

#[rstest]
#[case(vec![], Some(0))]
#[case(vec!["ha-datacenter"], None)]
#[case(vec!["Lab", "Edge"], Some(2))]
#[tokio::test]
async fn test_single_root_invariant(#[case] names: Vec<&str>, #[case] failure: Option<usize>) {
    let source = ScriptedSource {
        roots: names.iter().map(|name| datacenter(name)).collect(),
        ..Default::default()
    };
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());

    let result = dispatcher.resolve_root().await;

    match (failure, result) {
        (None, Ok(root)) => {
            assert_eq!(root.name, names[0]);
            assert_eq!(dispatcher.state(), DispatcherState::RootResolved);
        }
        (Some(0), Err(DiscoveryError::NotFound)) => {}
        (Some(n), Err(DiscoveryError::Ambiguous { candidates })) => assert_eq!(candidates.len(), n),
        (expected, other) => panic!("expected failure {:?}, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_root_is_resolved_once() {
    let source = ScriptedSource::with_steps(Vec::new());
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());

    let first = dispatcher.resolve_root().await.unwrap();
    let second = dispatcher.resolve_root().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(dispatcher.root(), Some(&first));
}

#[tokio::test]
async fn test_lookup_failure_is_discovery_error() {
    let source = ScriptedSource {
        fail_lookup: true,
        ..Default::default()
    };
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let mut sink = SharedSink::default();

    let err = dispatcher.run(&mut sink, &Cancellation::new()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Discovery(DiscoveryError::Lookup(_))));
    assert_eq!(dispatcher.state(), DispatcherState::Failed);
}

#[tokio::test]
async fn test_subscribe_failure_is_stream_error() {
    let source = ScriptedSource {
        roots: vec![datacenter("ha-datacenter")],
        fail_open: true,
        ..Default::default()
    };
    let closed = source.closed.clone();
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let mut sink = SharedSink::default();

    let err = dispatcher.run(&mut sink, &Cancellation::new()).await.unwrap_err();

    match err {
        DispatchError::Stream(StreamError::Subscribe { root, .. }) => assert_eq!(root, "ha-datacenter"),
        other => panic!("Expected subscribe failure, got {:?}", other),
    }
    assert_eq!(dispatcher.state(), DispatcherState::Failed);
    assert_eq!(closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_poll_failure_ends_stream_and_releases_feed() {
    let source = ScriptedSource::with_steps(vec![
        Ok(Some(vec![powered_on_web_01()])),
        Err(ApiError::NetworkError("connection reset by peer".to_string())),
    ]);
    let closed = source.closed.clone();
    let mut dispatcher = Dispatcher::new(source, SubscribeOptions::default());
    let mut sink = SharedSink::default();

    let err = dispatcher.run(&mut sink, &Cancellation::new()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Stream(StreamError::Poll(_))));
    assert_eq!(sink.attempted.lock().unwrap().len(), 1);
    assert_eq!(dispatcher.state(), DispatcherState::Failed);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscription_uses_configured_options() {
    let source = ScriptedSource::with_steps(vec![Err(ApiError::HttpStatus(503))]);
    let opened_with = source.opened_with.clone();
    let options = SubscribeOptions {
        page_size: 25,
        tail_only: false,
        max_wait_seconds: Some(30),
        ..Default::default()
    };
    let mut dispatcher = Dispatcher::new(source, options);
    let mut sink = SharedSink::default();

    let _ = dispatcher.run(&mut sink, &Cancellation::new()).await;

    let feed = opened_with.lock().unwrap().clone().unwrap();
    assert_eq!(feed.page_size, 25);
    assert!(!feed.tail_only);
    assert!(feed.include_full_detail);
    assert_eq!(feed.max_wait_seconds, Some(30));
}
