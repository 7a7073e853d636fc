//! The event stream dispatcher
//!
//! The dispatcher drives one subscription from start to finish:
//!
//! ```text
//! Idle -> RootResolving -> RootResolved -> Subscribing -> Streaming -> Cancelled
//!                                                                   \-> Failed
//! ```
//!
//! `Cancelled` is only reached through the [`Cancellation`] token and is the
//! only terminal state without an error. `Failed` can be reached from any
//! state. There is no way back from `Failed`; callers that want to retry
//! build a new session and a new dispatcher.

use std::time::Duration;

use tracing::{debug, info, trace, warn};
use vsphere_api::{FeedOptions, InventoryRoot, ManagedObjectReference, RawEvent};

use crate::cancel::Cancellation;
use crate::category::classify;
use crate::error::{DiscoveryError, Result, StreamError};
use crate::sink::EventSink;
use crate::source::EventSource;

/// Lifecycle state of a [`Dispatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    RootResolving,
    RootResolved,
    Subscribing,
    Streaming,
    Cancelled,
    Failed,
}

/// Subscription settings
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Events requested per page, bounding replay at startup
    pub page_size: u32,
    /// Request VM names and messages along with references
    pub include_full_detail: bool,
    /// Skip the backlog present at subscription time
    pub tail_only: bool,
    /// Server-side long-poll window; `None` blocks until events arrive
    pub max_wait_seconds: Option<u32>,
    /// Upper bound for releasing the feed on the server at exit
    pub close_timeout: Duration,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            include_full_detail: true,
            tail_only: true,
            max_wait_seconds: None,
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl SubscribeOptions {
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: self.page_size,
            include_full_detail: self.include_full_detail,
            tail_only: self.tail_only,
            max_wait_seconds: self.max_wait_seconds,
        }
    }
}

/// Outcome of forwarding one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub forwarded: usize,
    pub failed: usize,
}

/// Classify every event of a batch and hand it to the sink
///
/// Events are forwarded in the order given. A sink failure is logged and
/// counted; the remaining events are still forwarded.
pub fn on_batch<K: EventSink + ?Sized>(
    sink: &mut K,
    collector: &ManagedObjectReference,
    events: Vec<RawEvent>,
) -> BatchReport {
    let mut report = BatchReport::default();

    for event in &events {
        let classified = classify(event);
        match sink.record(&classified) {
            Ok(()) => report.forwarded += 1,
            Err(e) => {
                warn!(
                    %collector,
                    key = classified.key,
                    category = %classified.category,
                    error = %e,
                    "Failed to forward event"
                );
                report.failed += 1;
            }
        }
    }

    trace!(%collector, forwarded = report.forwarded, failed = report.failed, "batch forwarded");
    report
}

/// Pick the single inventory root among the candidates
pub fn select_root(mut candidates: Vec<InventoryRoot>) -> std::result::Result<InventoryRoot, DiscoveryError> {
    match candidates.len() {
        0 => Err(DiscoveryError::NotFound),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::Ambiguous {
            candidates: candidates.into_iter().map(|root| root.name).collect(),
        }),
    }
}

/// Resolves the inventory root and streams its events into a sink
pub struct Dispatcher<S: EventSource> {
    source: S,
    options: SubscribeOptions,
    state: DispatcherState,
    root: Option<InventoryRoot>,
}

impl<S: EventSource> Dispatcher<S> {
    pub fn new(source: S, options: SubscribeOptions) -> Self {
        Self {
            source,
            options,
            state: DispatcherState::Idle,
            root: None,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// The root resolved for this dispatcher, once known
    pub fn root(&self) -> Option<&InventoryRoot> {
        self.root.as_ref()
    }

    pub fn options(&self) -> &SubscribeOptions {
        &self.options
    }

    /// Locate exactly one inventory root
    ///
    /// The lookup runs once; later calls return the cached root.
    pub async fn resolve_root(&mut self) -> std::result::Result<InventoryRoot, DiscoveryError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }

        self.state = DispatcherState::RootResolving;
        let resolved = match self.source.find_roots().await {
            Ok(candidates) => select_root(candidates),
            Err(e) => Err(DiscoveryError::Lookup(e)),
        };

        match resolved {
            Ok(root) => {
                info!(datacenter = %root.name, reference = %root.reference, "Resolved inventory root");
                self.state = DispatcherState::RootResolved;
                self.root = Some(root.clone());
                Ok(root)
            }
            Err(e) => {
                self.state = DispatcherState::Failed;
                Err(e)
            }
        }
    }

    /// Stream events scoped to `root` until `cancel` fires
    ///
    /// `on_batch` runs once per delivered batch, in delivery order, never
    /// concurrently. Cancellation is observed between batches. Returns
    /// `Ok(())` only on cancellation.
    pub async fn subscribe<F>(
        &mut self,
        root: &InventoryRoot,
        cancel: &Cancellation,
        mut on_batch: F,
    ) -> std::result::Result<(), StreamError>
    where
        F: FnMut(&ManagedObjectReference, Vec<RawEvent>) + Send,
    {
        self.state = DispatcherState::Subscribing;
        let feed_options = self.options.feed_options();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.source.open_feed(root, &feed_options) => Some(opened),
        };
        let mut feed = match opened {
            None => {
                self.state = DispatcherState::Cancelled;
                return Ok(());
            }
            Some(Ok(feed)) => feed,
            Some(Err(source)) => {
                self.state = DispatcherState::Failed;
                return Err(StreamError::Subscribe {
                    root: root.name.clone(),
                    source,
                });
            }
        };

        self.state = DispatcherState::Streaming;
        info!(
            datacenter = %root.name,
            page_size = feed_options.page_size,
            tail_only = feed_options.tail_only,
            "Listening for events"
        );

        let outcome = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                polled = self.source.next_batch(&mut feed) => Some(polled),
            };

            match polled {
                None => break Ok(()),
                Some(Ok(Some(batch))) => {
                    debug!(collector = %batch.collector, count = batch.events.len(), "received event batch");
                    on_batch(&batch.collector, batch.events);
                }
                Some(Ok(None)) => trace!("poll ended without new events"),
                Some(Err(e)) => break Err(StreamError::Poll(e)),
            }
        };

        self.close_feed(feed).await;

        match &outcome {
            Ok(()) => {
                info!("Event stream cancelled");
                self.state = DispatcherState::Cancelled;
            }
            Err(_) => self.state = DispatcherState::Failed,
        }
        outcome
    }

    async fn close_feed(&self, feed: S::Feed) {
        match tokio::time::timeout(self.options.close_timeout, self.source.close_feed(feed)).await {
            Ok(Ok(())) => debug!("released event feed"),
            Ok(Err(e)) => warn!(error = %e, "Failed to release event feed"),
            Err(_) => warn!(
                timeout_secs = self.options.close_timeout.as_secs(),
                "Timed out releasing event feed"
            ),
        }
    }

    /// Resolve the root, then forward every event into `sink` until
    /// cancelled
    pub async fn run<K: EventSink + ?Sized>(&mut self, sink: &mut K, cancel: &Cancellation) -> Result<()> {
        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            resolved = self.resolve_root() => Some(resolved),
        };
        let root = match resolved {
            None => {
                self.state = DispatcherState::Cancelled;
                return Ok(());
            }
            Some(resolved) => resolved?,
        };

        self.subscribe(&root, cancel, |collector, events| {
            on_batch(sink, collector, events);
        })
        .await?;
        Ok(())
    }
}
