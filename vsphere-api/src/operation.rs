//! Operation framework for vim25 calls
//!
//! Every call the monitor makes is described by a zero-sized operation type
//! implementing [`VimOperation`]: it knows its SOAP action name, how to turn
//! a typed request into the XML payload inside the action element, and how
//! to turn the `{action}Response` element back into a typed response.
//! [`VimClient::execute`](crate::VimClient::execute) glues the two halves to
//! the transport.

use xmltree::Element;

use crate::error::ApiError;

/// Base trait for all vim25 operations
pub trait VimOperation {
    /// The request type for this operation
    type Request;

    /// The response type for this operation
    type Response;

    /// The SOAP action (and body element) name for this operation
    const ACTION: &'static str;

    /// Build the SOAP payload from the request data
    ///
    /// The payload is the content of the action element, starting with the
    /// `_this` argument, without the surrounding envelope.
    fn build_payload(request: &Self::Request) -> String;

    /// Parse the `{action}Response` element into the typed response
    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError>;
}
