//! The seam between the dispatcher and the management endpoint

use async_trait::async_trait;
use vsphere_api::{
    find_datacenters, EventBatch, EventFeed, FeedOptions, InventoryRoot, ServiceContent, Session,
    VimClient,
};

use crate::error::SourceError;

/// Where the dispatcher gets inventory roots and event batches from
///
/// The production implementation is [`VimEventSource`]. Tests substitute
/// scripted sources.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Handle of one live subscription
    type Feed: Send;

    /// Every candidate inventory root visible to the session
    async fn find_roots(&self) -> Result<Vec<InventoryRoot>, SourceError>;

    /// Register a feed scoped to `root`
    async fn open_feed(
        &self,
        root: &InventoryRoot,
        options: &FeedOptions,
    ) -> Result<Self::Feed, SourceError>;

    /// Wait for the next batch. `None` means the poll ended empty.
    async fn next_batch(&self, feed: &mut Self::Feed) -> Result<Option<EventBatch>, SourceError>;

    /// Release the feed on the server
    async fn close_feed(&self, feed: Self::Feed) -> Result<(), SourceError>;
}

/// Event source backed by a logged-in [`Session`]
///
/// Every call runs on tokio's blocking pool, since the vim25 client is
/// synchronous and long polls may block for a long time.
#[derive(Debug, Clone)]
pub struct VimEventSource {
    client: VimClient,
    content: ServiceContent,
}

impl VimEventSource {
    pub fn new(session: &Session) -> Self {
        Self {
            client: session.client().clone(),
            content: session.content().clone(),
        }
    }
}

#[async_trait]
impl EventSource for VimEventSource {
    type Feed = EventFeed;

    async fn find_roots(&self) -> Result<Vec<InventoryRoot>, SourceError> {
        let client = self.client.clone();
        let content = self.content.clone();

        let roots = tokio::task::spawn_blocking(move || find_datacenters(&client, &content)).await??;
        Ok(roots)
    }

    async fn open_feed(
        &self,
        root: &InventoryRoot,
        options: &FeedOptions,
    ) -> Result<Self::Feed, SourceError> {
        let client = self.client.clone();
        let content = self.content.clone();
        let reference = root.reference.clone();
        let options = options.clone();

        let feed = tokio::task::spawn_blocking(move || {
            EventFeed::open(&client, &content, &reference, options)
        })
        .await??;
        Ok(feed)
    }

    async fn next_batch(&self, feed: &mut Self::Feed) -> Result<Option<EventBatch>, SourceError> {
        let client = self.client.clone();
        let mut polling = feed.clone();

        let (polling, batch) = tokio::task::spawn_blocking(move || {
            let batch = polling.next_batch(&client);
            (polling, batch)
        })
        .await?;

        // Carry the version and watermark forward for the next poll
        *feed = polling;
        Ok(batch?)
    }

    async fn close_feed(&self, feed: Self::Feed) -> Result<(), SourceError> {
        let client = self.client.clone();

        tokio::task::spawn_blocking(move || feed.close(&client)).await??;
        Ok(())
    }
}
