//! RetrieveServiceContent operation on the ServiceInstance

use xmltree::Element;

use crate::types::{child_text, AboutInfo, ManagedObjectReference, ServiceContent};
use crate::{ApiError, VimOperation};

/// RetrieveServiceContent operation
///
/// The first call of every session; it needs no authentication and returns
/// the references of the singleton managers.
pub struct RetrieveServiceContentOperation;

/// Request for RetrieveServiceContent operation
#[derive(Debug, Clone, Default)]
pub struct RetrieveServiceContentRequest;

impl VimOperation for RetrieveServiceContentOperation {
    type Request = RetrieveServiceContentRequest;
    type Response = ServiceContent;

    const ACTION: &'static str = "RetrieveServiceContent";

    fn build_payload(_request: &Self::Request) -> String {
        ManagedObjectReference::new("ServiceInstance", "ServiceInstance").as_this()
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        let returnval = xml
            .get_child("returnval")
            .ok_or_else(|| ApiError::ParseError("Missing returnval element".to_string()))?;

        let about = returnval
            .get_child("about")
            .map(|about| AboutInfo {
                full_name: child_text(about, "fullName").unwrap_or_default(),
                version: child_text(about, "version").unwrap_or_default(),
                api_type: child_text(about, "apiType").unwrap_or_default(),
                api_version: child_text(about, "apiVersion").unwrap_or_default(),
            })
            .unwrap_or_default();

        Ok(ServiceContent {
            root_folder: ManagedObjectReference::from_child(returnval, "rootFolder")?,
            property_collector: ManagedObjectReference::from_child(returnval, "propertyCollector")?,
            session_manager: ManagedObjectReference::from_child(returnval, "sessionManager")?,
            event_manager: ManagedObjectReference::from_child(returnval, "eventManager")?,
            about,
        })
    }
}
