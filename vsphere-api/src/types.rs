//! Core vim25 types shared by operations, sessions and feeds

use xmltree::Element;

use crate::error::{ApiError, Result};

/// Reference to a managed object on the server, e.g. `VirtualMachine:vm-100`
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ManagedObjectReference {
    /// Managed object type, carried in the `type` attribute on the wire
    pub kind: String,
    /// Server-assigned identifier
    pub value: String,
}

impl ManagedObjectReference {
    /// Create a new reference
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Parse a reference from an element of the form `<tag type="T">value</tag>`
    pub fn from_element(element: &Element) -> Result<Self> {
        let kind = element.attributes.get("type").ok_or_else(|| {
            ApiError::ParseError(format!("Missing type attribute on <{}>", element.name))
        })?;
        let value = element
            .get_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if value.is_empty() {
            return Err(ApiError::ParseError(format!("Empty reference in <{}>", element.name)));
        }

        Ok(Self::new(kind.clone(), value))
    }

    /// Parse the named child of `parent` as a reference
    pub fn from_child(parent: &Element, name: &str) -> Result<Self> {
        let child = parent
            .get_child(name)
            .ok_or_else(|| ApiError::ParseError(format!("Missing {} element", name)))?;
        Self::from_element(child)
    }

    /// Render the reference as `<tag type="T">value</tag>`
    pub fn to_xml(&self, tag: &str) -> String {
        format!(
            r#"<{tag} type="{kind}">{value}</{tag}>"#,
            tag = tag,
            kind = soap_client::escape(&self.kind),
            value = soap_client::escape(&self.value)
        )
    }

    /// Render the reference as the `_this` argument of a request
    pub fn as_this(&self) -> String {
        self.to_xml("_this")
    }
}

impl std::fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Product information from the service content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AboutInfo {
    pub full_name: String,
    pub version: String,
    pub api_type: String,
    pub api_version: String,
}

/// The subset of `ServiceContent` the monitor relies on
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
    pub event_manager: ManagedObjectReference,
    pub about: AboutInfo,
}

/// The session returned by a successful login
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub key: String,
    pub user_name: String,
    pub full_name: Option<String>,
}

/// The top-level inventory container that scopes an event subscription
///
/// On both ESXi and vCenter this is a datacenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRoot {
    pub name: String,
    pub reference: ManagedObjectReference,
}

/// Text of a named child element, trimmed, if present and non-empty
pub(crate) fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Iterate over the element children of `parent` named `name`
pub(crate) fn children_named<'a>(
    parent: &'a Element,
    name: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .filter(move |e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_round_trip_through_xml() {
        let reference = ManagedObjectReference::new("VirtualMachine", "vm-100");
        let xml = reference.to_xml("vm");
        assert_eq!(xml, r#"<vm type="VirtualMachine">vm-100</vm>"#);

        let element = Element::parse(xml.as_bytes()).unwrap();
        assert_eq!(ManagedObjectReference::from_element(&element).unwrap(), reference);
    }

    #[test]
    fn test_reference_display() {
        let reference = ManagedObjectReference::new("Datacenter", "ha-datacenter");
        assert_eq!(reference.to_string(), "Datacenter:ha-datacenter");
    }

    #[test]
    fn test_reference_escapes_session_scoped_values() {
        let reference = ManagedObjectReference::new("EventHistoryCollector", "session[52a<1>]e1");
        assert_eq!(
            reference.as_this(),
            r#"<_this type="EventHistoryCollector">session[52a&lt;1&gt;]e1</_this>"#
        );
    }

    #[test]
    fn test_reference_without_type_is_rejected() {
        let element = Element::parse(r#"<obj>vm-1</obj>"#.as_bytes()).unwrap();
        let err = ManagedObjectReference::from_element(&element).unwrap_err();
        assert!(err.to_string().contains("Missing type attribute"));
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        let element = Element::parse(r#"<obj type="Folder"></obj>"#.as_bytes()).unwrap();
        assert!(ManagedObjectReference::from_element(&element).is_err());
    }
}
