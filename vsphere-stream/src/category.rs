//! Classification of raw events into virtual machine lifecycle categories
//!
//! The mapping is closed: thirteen lifecycle phases are recognized by their
//! vim25 event type, everything else lands in [`EventCategory::Unrecognized`]
//! with the original type name kept for diagnostics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vsphere_api::RawEvent;

/// A virtual machine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    BeingCreated,
    Created,
    Removed,
    Starting,
    PoweredOn,
    Suspending,
    Suspended,
    Resuming,
    Stopping,
    PoweredOff,
    Resetting,
    Registered,
    Reconfigured,
    /// Any event type outside the recognized set
    Unrecognized,
}

impl EventCategory {
    /// Every category with a vim25 event type behind it
    pub const RECOGNIZED: [EventCategory; 13] = [
        EventCategory::BeingCreated,
        EventCategory::Created,
        EventCategory::Removed,
        EventCategory::Starting,
        EventCategory::PoweredOn,
        EventCategory::Suspending,
        EventCategory::Suspended,
        EventCategory::Resuming,
        EventCategory::Stopping,
        EventCategory::PoweredOff,
        EventCategory::Resetting,
        EventCategory::Registered,
        EventCategory::Reconfigured,
    ];

    /// Stable kebab-case label, e.g. `powered-on`
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::BeingCreated => "being-created",
            EventCategory::Created => "created",
            EventCategory::Removed => "removed",
            EventCategory::Starting => "starting",
            EventCategory::PoweredOn => "powered-on",
            EventCategory::Suspending => "suspending",
            EventCategory::Suspended => "suspended",
            EventCategory::Resuming => "resuming",
            EventCategory::Stopping => "stopping",
            EventCategory::PoweredOff => "powered-off",
            EventCategory::Resetting => "resetting",
            EventCategory::Registered => "registered",
            EventCategory::Reconfigured => "reconfigured",
            EventCategory::Unrecognized => "unrecognized",
        }
    }

    /// The vim25 event type this category is reported as
    pub fn event_kind(&self) -> Option<&'static str> {
        let kind = match self {
            EventCategory::BeingCreated => "VmBeingCreatedEvent",
            EventCategory::Created => "VmCreatedEvent",
            EventCategory::Removed => "VmRemovedEvent",
            EventCategory::Starting => "VmStartingEvent",
            EventCategory::PoweredOn => "VmPoweredOnEvent",
            EventCategory::Suspending => "VmSuspendingEvent",
            EventCategory::Suspended => "VmSuspendedEvent",
            EventCategory::Resuming => "VmResumingEvent",
            EventCategory::Stopping => "VmStoppingEvent",
            EventCategory::PoweredOff => "VmPoweredOffEvent",
            EventCategory::Resetting => "VmResettingEvent",
            EventCategory::Registered => "VmRegisteredEvent",
            EventCategory::Reconfigured => "VmReconfiguredEvent",
            EventCategory::Unrecognized => return None,
        };
        Some(kind)
    }

    /// Map a vim25 event type to its category
    pub fn from_event_kind(kind: &str) -> Self {
        match kind {
            "VmBeingCreatedEvent" => EventCategory::BeingCreated,
            "VmCreatedEvent" => EventCategory::Created,
            "VmRemovedEvent" => EventCategory::Removed,
            "VmStartingEvent" => EventCategory::Starting,
            "VmPoweredOnEvent" => EventCategory::PoweredOn,
            "VmSuspendingEvent" => EventCategory::Suspending,
            "VmSuspendedEvent" => EventCategory::Suspended,
            "VmResumingEvent" => EventCategory::Resuming,
            "VmStoppingEvent" => EventCategory::Stopping,
            "VmPoweredOffEvent" => EventCategory::PoweredOff,
            "VmResettingEvent" => EventCategory::Resetting,
            "VmRegisteredEvent" => EventCategory::Registered,
            "VmReconfiguredEvent" => EventCategory::Reconfigured,
            _ => EventCategory::Unrecognized,
        }
    }

    /// Human-readable phrase used in log lines
    pub fn description(&self) -> &'static str {
        match self {
            EventCategory::BeingCreated => "VM being created",
            EventCategory::Created => "VM created",
            EventCategory::Removed => "VM removed",
            EventCategory::Starting => "VM starting",
            EventCategory::PoweredOn => "VM powered on",
            EventCategory::Suspending => "VM suspending",
            EventCategory::Suspended => "VM suspended",
            EventCategory::Resuming => "VM resuming",
            EventCategory::Stopping => "VM stopping",
            EventCategory::PoweredOff => "VM powered off",
            EventCategory::Resetting => "VM resetting",
            EventCategory::Registered => "VM registered",
            EventCategory::Reconfigured => "VM reconfigured",
            EventCategory::Unrecognized => "Unrecognized",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            EventCategory::Unrecognized => Severity::Diagnostic,
            _ => Severity::Informational,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How loudly a classified event should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Diagnostic,
}

/// A raw event reduced to what downstream consumers need
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEvent {
    pub category: EventCategory,
    pub severity: Severity,
    /// Name of the associated virtual machine
    pub name: Option<String>,
    /// Reference value of the associated virtual machine, e.g. `vm-100`
    pub reference: Option<String>,
    /// Original type name, set only for unrecognized events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrecognized_kind: Option<String>,
    pub key: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Classify a raw event. Total: every event maps to exactly one category.
pub fn classify(event: &RawEvent) -> ClassifiedEvent {
    let category = EventCategory::from_event_kind(&event.kind);
    let unrecognized_kind = match category {
        EventCategory::Unrecognized => Some(event.kind.clone()),
        _ => None,
    };

    ClassifiedEvent {
        category,
        severity: category.severity(),
        name: event.vm_name().map(str::to_string),
        reference: event.vm_reference().map(str::to_string),
        unrecognized_kind,
        key: event.key,
        created_time: event.created_time,
        user_name: event.user_name.clone(),
        message: event.message.clone(),
    }
}
