//! Continuous event delivery from an `EventHistoryCollector`
//!
//! The feed creates a collector scoped to one inventory root, sizes its
//! `latestPage`, and watches that property through the property
//! collector's versioned long poll. Every reported change of the page is
//! turned into one [`EventBatch`].
//!
//! `latestPage` always holds the newest `page_size` events, so successive
//! pages overlap. The feed remembers the highest event key it has seen and
//! only hands out events above it; within a batch the server's order is
//! kept as is.

use tracing::{debug, warn};

use crate::events::RawEvent;
use crate::operations::{
    CreateCollectorForEventsOperation, CreateCollectorForEventsRequest, CreateFilterOperation,
    CreateFilterRequest, DestroyCollectorOperation, DestroyCollectorRequest,
    DestroyPropertyFilterOperation, DestroyPropertyFilterRequest, PropertyChange,
    SetCollectorPageSizeOperation, SetCollectorPageSizeRequest, WaitForUpdatesExOperation,
    WaitForUpdatesExRequest,
};
use crate::types::{ManagedObjectReference, ServiceContent};
use crate::{Result, VimClient};

const LATEST_PAGE: &str = "latestPage";
const ASSIGN: &str = "assign";

/// Options for an event feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    /// Size of the collector's latest page, bounding replay per poll
    pub page_size: u32,
    /// Decode names, messages and users, not only references
    pub include_full_detail: bool,
    /// Drop the backlog present at subscription time
    pub tail_only: bool,
    /// Server-side long-poll window. `None` waits until something changes.
    pub max_wait_seconds: Option<u32>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            include_full_detail: true,
            tail_only: true,
            max_wait_seconds: None,
        }
    }
}

/// A group of events delivered together
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    /// The collector the events were read from
    pub collector: ManagedObjectReference,
    pub events: Vec<RawEvent>,
}

/// A live event subscription on the server
///
/// All methods block on the network. The feed is a plain value so that
/// async callers can move it onto a blocking thread for each poll.
#[derive(Debug, Clone)]
pub struct EventFeed {
    property_collector: ManagedObjectReference,
    collector: ManagedObjectReference,
    filter: ManagedObjectReference,
    version: String,
    watermark: Option<i64>,
    primed: bool,
    options: FeedOptions,
}

impl EventFeed {
    /// Register a feed for events on `root` and everything below it
    pub fn open(
        client: &VimClient,
        content: &ServiceContent,
        root: &ManagedObjectReference,
        options: FeedOptions,
    ) -> Result<Self> {
        let collector = client.execute::<CreateCollectorForEventsOperation>(
            &CreateCollectorForEventsRequest {
                event_manager: content.event_manager.clone(),
                entity: root.clone(),
            },
        )?;
        debug!(%collector, %root, "created event history collector");

        let filter = match Self::watch_latest_page(client, content, &collector, options.page_size) {
            Ok(filter) => filter,
            Err(e) => {
                let request = DestroyCollectorRequest { collector: collector.clone() };
                if let Err(cleanup) = client.execute::<DestroyCollectorOperation>(&request) {
                    warn!(%collector, error = %cleanup, "failed to destroy collector after setup error");
                }
                return Err(e);
            }
        };

        Ok(Self {
            property_collector: content.property_collector.clone(),
            collector,
            filter,
            version: String::new(),
            watermark: None,
            primed: false,
            options,
        })
    }

    fn watch_latest_page(
        client: &VimClient,
        content: &ServiceContent,
        collector: &ManagedObjectReference,
        page_size: u32,
    ) -> Result<ManagedObjectReference> {
        client.execute::<SetCollectorPageSizeOperation>(&SetCollectorPageSizeRequest {
            collector: collector.clone(),
            max_count: page_size,
        })?;

        client.execute::<CreateFilterOperation>(&CreateFilterRequest {
            property_collector: content.property_collector.clone(),
            object: collector.clone(),
            property: LATEST_PAGE.to_string(),
        })
    }

    /// The server-side collector backing this feed
    pub fn collector(&self) -> &ManagedObjectReference {
        &self.collector
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    /// Wait for the next batch of unseen events
    ///
    /// Returns `Ok(None)` when the poll ended without anything new: the
    /// wait window elapsed, the backlog was dropped for a tail-only feed,
    /// or the page only repeated events already delivered.
    pub fn next_batch(&mut self, client: &VimClient) -> Result<Option<EventBatch>> {
        let update = client.execute::<WaitForUpdatesExOperation>(&WaitForUpdatesExRequest {
            property_collector: self.property_collector.clone(),
            version: self.version.clone(),
            max_wait_seconds: self.options.max_wait_seconds,
        })?;

        let Some(update) = update else {
            return Ok(None);
        };
        self.version = update.version;
        if update.truncated {
            debug!(collector = %self.collector, "update set truncated, remainder follows on the next poll");
        }

        let Some(page) = self.latest_page(update.changes)? else {
            return Ok(None);
        };

        let events = self.take_unseen(page);
        if events.is_empty() {
            return Ok(None);
        }

        Ok(Some(EventBatch {
            collector: self.collector.clone(),
            events,
        }))
    }

    /// The last `latestPage` value among `changes`, if it changed at all
    ///
    /// A removed page reads as empty.
    fn latest_page(&self, changes: Vec<PropertyChange>) -> Result<Option<Vec<RawEvent>>> {
        let mut page = None;
        for change in changes {
            if change.object != self.collector || change.name != LATEST_PAGE {
                continue;
            }
            page = Some(match (change.op.as_str(), change.value) {
                (ASSIGN, Some(value)) => RawEvent::from_array(&value, self.options.include_full_detail)?,
                _ => Vec::new(),
            });
        }
        Ok(page)
    }

    fn take_unseen(&mut self, page: Vec<RawEvent>) -> Vec<RawEvent> {
        let first_page = !self.primed;
        self.primed = true;

        let newest = page.iter().map(|e| e.key).max();
        let unseen: Vec<RawEvent> = match self.watermark {
            Some(watermark) => page.into_iter().filter(|e| e.key > watermark).collect(),
            None => page,
        };

        if let Some(newest) = newest {
            self.watermark = Some(self.watermark.map_or(newest, |w| w.max(newest)));
        }

        if first_page && self.options.tail_only {
            debug!(skipped = unseen.len(), "dropping backlog for tail-only feed");
            return Vec::new();
        }
        unseen
    }

    /// Destroy the property filter and the collector on the server
    ///
    /// Both are attempted; the first failure is returned.
    pub fn close(&self, client: &VimClient) -> Result<()> {
        let filter = client.execute::<DestroyPropertyFilterOperation>(&DestroyPropertyFilterRequest {
            filter: self.filter.clone(),
        });
        let collector = client.execute::<DestroyCollectorOperation>(&DestroyCollectorRequest {
            collector: self.collector.clone(),
        });
        debug!(collector = %self.collector, "closed event feed");
        filter.and(collector)
    }
}
