//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network, DNS or TLS failure before a response was received
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The server answered with a non-success HTTP status and no SOAP fault
    #[error("HTTP status {0}")]
    Http(u16),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the server
    #[error("SOAP fault {code}: {message}")]
    Fault {
        /// The `faultcode` element, e.g. `ServerFaultCode`
        code: String,
        /// The human readable `faultstring`
        message: String,
        /// The vim25 fault type carried in `detail`, e.g. `InvalidLogin`
        detail: Option<String>,
    },
}

impl SoapError {
    /// The vim25 fault type if this is a SOAP fault that carried one
    pub fn fault_kind(&self) -> Option<&str> {
        match self {
            SoapError::Fault { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}
