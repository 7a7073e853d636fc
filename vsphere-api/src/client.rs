use soap_client::SoapClient;

use crate::{Result, VimOperation};

/// A client for executing vim25 operations against one endpoint
///
/// This client bridges the stateless operation definitions and the actual
/// SOAP transport. Clones share the transport, including its cookie store,
/// so every clone speaks within the same server session.
#[derive(Debug, Clone)]
pub struct VimClient {
    soap_client: SoapClient,
    url: String,
}

impl VimClient {
    /// Create a client for the SDK URL, e.g. `https://esxi.lab/sdk`
    pub fn new(soap_client: SoapClient, url: impl Into<String>) -> Self {
        Self {
            soap_client,
            url: url.into(),
        }
    }

    /// The SDK URL this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a vim25 operation
    ///
    /// Builds the payload, sends it and parses the response. SOAP faults
    /// surface as [`ApiError::Fault`](crate::ApiError::Fault).
    pub fn execute<Op: VimOperation>(&self, request: &Op::Request) -> Result<Op::Response> {
        let payload = Op::build_payload(request);

        let xml = self.soap_client.call(&self.url, Op::ACTION, &payload)?;

        Op::parse_response(&xml)
    }
}
