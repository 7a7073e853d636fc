//! Decoding of vim25 events as delivered in `ArrayOfEvent`
//!
//! Events are polymorphic on the wire: every `<Event>` element carries its
//! concrete type in `xsi:type` (`VmPoweredOnEvent`, `UserLoginSessionEvent`,
//! ...) and a set of entity arguments naming the objects involved. The
//! decoder keeps the type name as an opaque kind tag; giving it meaning is
//! the job of the classifier downstream.

use chrono::{DateTime, Utc};
use xmltree::Element;

use crate::error::{ApiError, Result};
use crate::types::{child_text, children_named, ManagedObjectReference};

/// An entity an event refers to, e.g. the VM of a `VmPoweredOnEvent`
#[derive(Debug, Clone, PartialEq)]
pub struct EntityArgument {
    /// Display name at the time of the event, when detail was requested
    pub name: Option<String>,
    pub reference: Option<ManagedObjectReference>,
}

/// A single event as delivered by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Concrete event type, e.g. `VmPoweredOnEvent`
    pub kind: String,
    /// Server-assigned, monotonically increasing key
    pub key: i64,
    pub chain_id: Option<i64>,
    pub created_time: Option<DateTime<Utc>>,
    pub user_name: Option<String>,
    pub message: Option<String>,
    pub vm: Option<EntityArgument>,
    pub host: Option<EntityArgument>,
    pub datacenter: Option<EntityArgument>,
}

impl RawEvent {
    /// Create an event with only a kind and key, mostly useful in tests
    pub fn new(kind: impl Into<String>, key: i64) -> Self {
        Self {
            kind: kind.into(),
            key,
            chain_id: None,
            created_time: None,
            user_name: None,
            message: None,
            vm: None,
            host: None,
            datacenter: None,
        }
    }

    /// Attach a VM argument
    pub fn with_vm(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vm = Some(EntityArgument {
            name: Some(name.into()),
            reference: Some(ManagedObjectReference::new("VirtualMachine", value)),
        });
        self
    }

    /// Name of the associated VM, if any
    pub fn vm_name(&self) -> Option<&str> {
        self.vm.as_ref().and_then(|vm| vm.name.as_deref())
    }

    /// Reference value of the associated VM, if any
    pub fn vm_reference(&self) -> Option<&str> {
        self.vm
            .as_ref()
            .and_then(|vm| vm.reference.as_ref())
            .map(|r| r.value.as_str())
    }

    /// Decode one `<Event>` element
    ///
    /// With `full_detail` unset, names, messages and user fields are
    /// dropped and only kind, key, time and references survive.
    pub fn from_element(element: &Element, full_detail: bool) -> Result<Self> {
        let kind = element
            .attributes
            .get("type")
            .cloned()
            .unwrap_or_else(|| element.name.clone());

        let key = child_text(element, "key")
            .ok_or_else(|| ApiError::ParseError(format!("{} without key", kind)))?
            .parse::<i64>()
            .map_err(|e| ApiError::ParseError(format!("invalid key on {}: {}", kind, e)))?;

        let chain_id = child_text(element, "chainId").and_then(|c| c.parse().ok());

        let created_time = child_text(element, "createdTime").and_then(|t| {
            DateTime::parse_from_rfc3339(&t)
                .map(|time| time.with_timezone(&Utc))
                .ok()
        });

        let detail = |value: Option<String>| if full_detail { value } else { None };

        Ok(Self {
            key,
            chain_id,
            created_time,
            user_name: detail(child_text(element, "userName")),
            message: detail(child_text(element, "fullFormattedMessage")),
            vm: entity_argument(element, "vm", full_detail),
            host: entity_argument(element, "host", full_detail),
            datacenter: entity_argument(element, "datacenter", full_detail),
            kind,
        })
    }

    /// Decode the events of an `ArrayOfEvent` value element
    pub fn from_array(value: &Element, full_detail: bool) -> Result<Vec<Self>> {
        children_named(value, "Event")
            .map(|event| Self::from_element(event, full_detail))
            .collect()
    }
}

/// Entity arguments nest the reference under the same tag:
/// `<vm><name>web-01</name><vm type="VirtualMachine">vm-100</vm></vm>`
fn entity_argument(event: &Element, tag: &str, full_detail: bool) -> Option<EntityArgument> {
    let argument = event.get_child(tag)?;
    let reference = argument
        .get_child(tag)
        .and_then(|r| ManagedObjectReference::from_element(r).ok());
    let name = if full_detail { child_text(argument, "name") } else { None };

    if name.is_none() && reference.is_none() {
        return None;
    }
    Some(EntityArgument { name, reference })
}
