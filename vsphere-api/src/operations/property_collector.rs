//! PropertyCollector operations: inventory retrieval and update long polls

use xmltree::Element;

use crate::types::{child_text, children_named, InventoryRoot, ManagedObjectReference};
use crate::{ApiError, VimOperation};
use soap_client::escape;

/// Datacenter lookup through RetrievePropertiesEx
///
/// Walks `Folder.childEntity` recursively from the root folder and returns
/// the name of every datacenter it reaches.
pub struct FindDatacentersOperation;

/// Request for FindDatacenters operation
#[derive(Debug, Clone)]
pub struct FindDatacentersRequest {
    pub property_collector: ManagedObjectReference,
    pub root_folder: ManagedObjectReference,
}

/// One page of datacenters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindDatacentersResponse {
    pub datacenters: Vec<InventoryRoot>,
    /// Continuation token when the server paged the result
    pub token: Option<String>,
}

impl VimOperation for FindDatacentersOperation {
    type Request = FindDatacentersRequest;
    type Response = FindDatacentersResponse;

    const ACTION: &'static str = "RetrievePropertiesEx";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            concat!(
                "{this}<specSet>",
                "<propSet><type>Datacenter</type><all>false</all><pathSet>name</pathSet></propSet>",
                "<objectSet>{root}<skip>true</skip>",
                r#"<selectSet xsi:type="TraversalSpec"><name>folderTraversal</name><type>Folder</type>"#,
                "<path>childEntity</path><skip>false</skip>",
                "<selectSet><name>folderTraversal</name></selectSet></selectSet>",
                "</objectSet></specSet><options></options>"
            ),
            this = request.property_collector.as_this(),
            root = request.root_folder.to_xml("obj")
        )
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        parse_datacenter_page(xml)
    }
}

/// ContinueRetrievePropertiesEx operation for paged datacenter results
pub struct ContinueRetrievePropertiesExOperation;

/// Request for ContinueRetrievePropertiesEx operation
#[derive(Debug, Clone)]
pub struct ContinueRetrievePropertiesExRequest {
    pub property_collector: ManagedObjectReference,
    pub token: String,
}

impl VimOperation for ContinueRetrievePropertiesExOperation {
    type Request = ContinueRetrievePropertiesExRequest;
    type Response = FindDatacentersResponse;

    const ACTION: &'static str = "ContinueRetrievePropertiesEx";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "{}<token>{}</token>",
            request.property_collector.as_this(),
            escape(&request.token)
        )
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        parse_datacenter_page(xml)
    }
}

fn parse_datacenter_page(xml: &Element) -> Result<FindDatacentersResponse, ApiError> {
    // No returnval means nothing matched
    let Some(returnval) = xml.get_child("returnval") else {
        return Ok(FindDatacentersResponse::default());
    };

    let mut datacenters = Vec::new();
    for object in children_named(returnval, "objects") {
        let reference = ManagedObjectReference::from_child(object, "obj")?;
        if reference.kind != "Datacenter" {
            continue;
        }

        let name = children_named(object, "propSet")
            .find(|prop| child_text(prop, "name").as_deref() == Some("name"))
            .and_then(|prop| child_text(prop, "val"))
            .unwrap_or_else(|| reference.value.clone());

        datacenters.push(InventoryRoot { name, reference });
    }

    Ok(FindDatacentersResponse {
        datacenters,
        token: child_text(returnval, "token"),
    })
}

/// CreateFilter operation watching a single property of a single object
pub struct CreateFilterOperation;

/// Request for CreateFilter operation
#[derive(Debug, Clone)]
pub struct CreateFilterRequest {
    pub property_collector: ManagedObjectReference,
    pub object: ManagedObjectReference,
    pub property: String,
}

impl VimOperation for CreateFilterOperation {
    type Request = CreateFilterRequest;
    type Response = ManagedObjectReference;

    const ACTION: &'static str = "CreateFilter";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            concat!(
                "{this}<spec>",
                "<propSet><type>{kind}</type><all>false</all><pathSet>{property}</pathSet></propSet>",
                "<objectSet>{obj}<skip>false</skip></objectSet>",
                "</spec><partialUpdates>false</partialUpdates>"
            ),
            this = request.property_collector.as_this(),
            kind = escape(&request.object.kind),
            property = escape(&request.property),
            obj = request.object.to_xml("obj")
        )
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        ManagedObjectReference::from_child(xml, "returnval")
    }
}

/// DestroyPropertyFilter operation
pub struct DestroyPropertyFilterOperation;

/// Request for DestroyPropertyFilter operation
#[derive(Debug, Clone)]
pub struct DestroyPropertyFilterRequest {
    pub filter: ManagedObjectReference,
}

impl VimOperation for DestroyPropertyFilterOperation {
    type Request = DestroyPropertyFilterRequest;
    type Response = ();

    const ACTION: &'static str = "DestroyPropertyFilter";

    fn build_payload(request: &Self::Request) -> String {
        request.filter.as_this()
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(())
    }
}

/// WaitForUpdatesEx operation
///
/// Blocks on the server until a watched property changes after `version`,
/// or until `max_wait_seconds` elapses when set.
pub struct WaitForUpdatesExOperation;

/// Request for WaitForUpdatesEx operation
#[derive(Debug, Clone)]
pub struct WaitForUpdatesExRequest {
    pub property_collector: ManagedObjectReference,
    /// Version from the previous update set, empty for the initial state
    pub version: String,
    pub max_wait_seconds: Option<u32>,
}

/// A single property change reported by WaitForUpdatesEx
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub object: ManagedObjectReference,
    /// Property path, e.g. `latestPage`
    pub name: String,
    /// `assign`, `add`, `remove` or `indirectRemove`
    pub op: String,
    /// The new value element; absent when the property was cleared
    pub value: Option<Element>,
}

/// The changes reported by one WaitForUpdatesEx call
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSet {
    pub version: String,
    pub truncated: bool,
    pub changes: Vec<PropertyChange>,
}

impl VimOperation for WaitForUpdatesExOperation {
    type Request = WaitForUpdatesExRequest;
    type Response = Option<UpdateSet>;

    const ACTION: &'static str = "WaitForUpdatesEx";

    fn build_payload(request: &Self::Request) -> String {
        let mut payload = format!(
            "{}<version>{}</version>",
            request.property_collector.as_this(),
            escape(&request.version)
        );
        if let Some(max_wait) = request.max_wait_seconds {
            payload.push_str(&format!("<options><maxWaitSeconds>{}</maxWaitSeconds></options>", max_wait));
        }
        payload
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        // The server omits returnval when the wait elapsed without changes
        let Some(returnval) = xml.get_child("returnval") else {
            return Ok(None);
        };

        let version = child_text(returnval, "version")
            .ok_or_else(|| ApiError::ParseError("Missing version in update set".to_string()))?;
        let truncated = child_text(returnval, "truncated").as_deref() == Some("true");

        let mut changes = Vec::new();
        for filter_set in children_named(returnval, "filterSet") {
            for object_set in children_named(filter_set, "objectSet") {
                let object = ManagedObjectReference::from_child(object_set, "obj")?;
                for change in children_named(object_set, "changeSet") {
                    let name = child_text(change, "name").ok_or_else(|| {
                        ApiError::ParseError("Missing name in changeSet".to_string())
                    })?;
                    changes.push(PropertyChange {
                        object: object.clone(),
                        name,
                        op: child_text(change, "op").unwrap_or_else(|| "assign".to_string()),
                        value: change.get_child("val").cloned(),
                    });
                }
            }
        }

        Ok(Some(UpdateSet { version, truncated, changes }))
    }
}
