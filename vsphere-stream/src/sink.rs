//! Output sinks for classified events

use std::io::Write;

use tracing::{debug, info};

use crate::category::{ClassifiedEvent, Severity};
use crate::error::ForwardingError;

/// Destination for classified events
///
/// The dispatcher calls `record` once per event, sequentially, and never
/// concurrently. An error only affects the event it was returned for.
pub trait EventSink: Send {
    fn record(&mut self, event: &ClassifiedEvent) -> Result<(), ForwardingError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, event: &ClassifiedEvent) -> Result<(), ForwardingError> {
        (**self).record(event)
    }
}

/// Reports events through `tracing`
///
/// Recognized categories are logged at INFO, unrecognized ones at DEBUG.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: &ClassifiedEvent) -> Result<(), ForwardingError> {
        let name = event.name.as_deref().unwrap_or_default();
        let reference = event.reference.as_deref().unwrap_or_default();

        match event.severity {
            Severity::Informational => info!(
                category = %event.category,
                vm = name,
                reference,
                key = event.key,
                user = event.user_name.as_deref().unwrap_or_default(),
                message = event.message.as_deref().unwrap_or_default(),
                "{} event received",
                event.category.description()
            ),
            Severity::Diagnostic => debug!(
                kind = event.unrecognized_kind.as_deref().unwrap_or_default(),
                vm = name,
                reference,
                key = event.key,
                "Event ignored"
            ),
        }
        Ok(())
    }
}

/// Writes one JSON object per event and line
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn record(&mut self, event: &ClassifiedEvent) -> Result<(), ForwardingError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
