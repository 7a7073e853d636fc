//! vim25 operations grouped by the managed object they are invoked on

pub mod event_manager;
pub mod property_collector;
pub mod service_instance;
pub mod session_manager;

pub use event_manager::{
    CreateCollectorForEventsOperation, CreateCollectorForEventsRequest, DestroyCollectorOperation,
    DestroyCollectorRequest, SetCollectorPageSizeOperation, SetCollectorPageSizeRequest,
};
pub use property_collector::{
    ContinueRetrievePropertiesExOperation, ContinueRetrievePropertiesExRequest,
    CreateFilterOperation, CreateFilterRequest, DestroyPropertyFilterOperation,
    DestroyPropertyFilterRequest, FindDatacentersOperation, FindDatacentersRequest,
    FindDatacentersResponse, PropertyChange, UpdateSet, WaitForUpdatesExOperation,
    WaitForUpdatesExRequest,
};
pub use service_instance::{RetrieveServiceContentOperation, RetrieveServiceContentRequest};
pub use session_manager::{LoginOperation, LoginRequest, LogoutOperation, LogoutRequest};
