//! EventManager and EventHistoryCollector operations

use xmltree::Element;

use crate::types::ManagedObjectReference;
use crate::{ApiError, VimOperation};

/// CreateCollectorForEvents operation
///
/// Creates an `EventHistoryCollector` filtered to events on `entity` and
/// everything beneath it in the inventory.
pub struct CreateCollectorForEventsOperation;

/// Request for CreateCollectorForEvents operation
#[derive(Debug, Clone)]
pub struct CreateCollectorForEventsRequest {
    pub event_manager: ManagedObjectReference,
    pub entity: ManagedObjectReference,
}

impl VimOperation for CreateCollectorForEventsOperation {
    type Request = CreateCollectorForEventsRequest;
    type Response = ManagedObjectReference;

    const ACTION: &'static str = "CreateCollectorForEvents";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "{}<filter><entity>{}<recursion>all</recursion></entity></filter>",
            request.event_manager.as_this(),
            request.entity.to_xml("entity")
        )
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        ManagedObjectReference::from_child(xml, "returnval")
    }
}

/// SetCollectorPageSize operation
pub struct SetCollectorPageSizeOperation;

/// Request for SetCollectorPageSize operation
#[derive(Debug, Clone)]
pub struct SetCollectorPageSizeRequest {
    pub collector: ManagedObjectReference,
    pub max_count: u32,
}

impl VimOperation for SetCollectorPageSizeOperation {
    type Request = SetCollectorPageSizeRequest;
    type Response = ();

    const ACTION: &'static str = "SetCollectorPageSize";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "{}<maxCount>{}</maxCount>",
            request.collector.as_this(),
            request.max_count
        )
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(())
    }
}

/// DestroyCollector operation
pub struct DestroyCollectorOperation;

/// Request for DestroyCollector operation
#[derive(Debug, Clone)]
pub struct DestroyCollectorRequest {
    pub collector: ManagedObjectReference,
}

impl VimOperation for DestroyCollectorOperation {
    type Request = DestroyCollectorRequest;
    type Response = ();

    const ACTION: &'static str = "DestroyCollector";

    fn build_payload(request: &Self::Request) -> String {
        request.collector.as_this()
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(())
    }
}
