//! Error types for the vsphere-stream crate.

use vsphere_api::ApiError;

/// Errors from an [`EventSource`](crate::EventSource) implementation.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The management endpoint rejected or failed a call
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The blocking worker running the call panicked or was aborted
    #[error("Blocking worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Errors resolving the inventory root a subscription is scoped to.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The inventory holds no datacenter
    #[error("No datacenter found in the inventory")]
    NotFound,

    /// More than one datacenter and no way to pick one
    #[error("Ambiguous inventory root: {} datacenters found ({})", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        /// Names of every datacenter found
        candidates: Vec<String>,
    },

    /// The lookup itself failed
    #[error("Datacenter lookup failed")]
    Lookup(#[source] SourceError),
}

/// Errors of an active or starting subscription.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Registering the event feed failed
    #[error("Failed to subscribe to events on {root}")]
    Subscribe {
        /// The inventory root the subscription was scoped to
        root: String,
        #[source]
        source: SourceError,
    },

    /// A poll of a live feed failed
    #[error("Event feed failed")]
    Poll(#[source] SourceError),
}

/// Failure delivering one classified event to a sink.
///
/// Never fatal: the dispatcher reports it and moves on to the next event.
#[derive(Debug, thiserror::Error)]
pub enum ForwardingError {
    /// Writing to the sink's output failed
    #[error("Failed to write event: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be serialized
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Sink-specific failure
    #[error("Sink rejected event: {0}")]
    Rejected(String),
}

/// Fatal errors of the whole dispatch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Convenience type alias for Results using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;
