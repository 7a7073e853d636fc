//! Private SOAP client for vim25 communication
//!
//! This crate provides a minimal SOAP client specifically designed for
//! talking to the `/sdk` endpoint of an ESXi host or vCenter server. It
//! owns the HTTP agent (session cookie, TLS trust policy, timeouts) and the
//! envelope/fault handling; the typed operations live in `vsphere-api`.

mod error;

pub use error::SoapError;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use xmltree::Element;

/// SOAPAction announced on every request
pub const DEFAULT_SOAP_ACTION: &str = "urn:vim25/6.5";

/// Namespace of every vim25 request body element
pub const VIM25_NAMESPACE: &str = "urn:vim25";

/// Cookie carrying the vim25 session id
pub const SESSION_COOKIE: &str = "vmware_soap_session";

/// Transport configuration for a [`SoapClient`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Validate the server certificate chain and host name
    pub verify_certificates: bool,
    /// Timeout for establishing the TCP/TLS connection
    pub connect_timeout: Duration,
    /// Read timeout for responses. `None` lets long polls block indefinitely.
    pub read_timeout: Option<Duration>,
    /// Value of the `SOAPAction` header
    pub soap_action: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            soap_action: DEFAULT_SOAP_ACTION.to_string(),
        }
    }
}

/// A minimal SOAP client for vim25 communication
///
/// Cloning is cheap and clones share the underlying connection pool and
/// session cookie, so a session established through one clone is visible
/// to all of them.
///
/// The session cookie is echoed back exactly as the server set it. Servers
/// quote its value, which generic cookie stores refuse to send back.
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
    soap_action: String,
    session_cookie: Arc<Mutex<Option<String>>>,
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    pub fn new() -> Self {
        let config = TransportConfig::default();
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(config.connect_timeout)
                .build(),
            soap_action: config.soap_action,
            session_cookie: Arc::default(),
        }
    }

    /// Create a SOAP client honouring the given trust policy and timeouts
    pub fn with_config(config: &TransportConfig) -> Result<Self, SoapError> {
        let mut builder = ureq::AgentBuilder::new().timeout_connect(config.connect_timeout);

        if let Some(read_timeout) = config.read_timeout {
            builder = builder.timeout_read(read_timeout);
        }

        if !config.verify_certificates {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| SoapError::Network(format!("TLS setup failed: {}", e)))?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        Ok(Self {
            agent: builder.build(),
            soap_action: config.soap_action.clone(),
            session_cookie: Arc::default(),
        })
    }

    /// Send a SOAP request and return the parsed `{action}Response` element
    pub fn call(&self, url: &str, action: &str, payload: &str) -> Result<Element, SoapError> {
        let body = envelope(action, payload);
        let soap_action = format!("\"{}\"", self.soap_action);

        tracing::trace!(action, url, "sending SOAP request");

        let mut request = self
            .agent
            .post(url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPAction", &soap_action);
        if let Some(cookie) = self.session_cookie() {
            request = request.set("Cookie", &cookie);
        }

        match request.send_string(&body) {
            Ok(response) => {
                self.remember_session_cookie(&response);

                let xml_text = response
                    .into_string()
                    .map_err(|e| SoapError::Network(e.to_string()))?;

                let xml = Element::parse(xml_text.as_bytes())
                    .map_err(|e| SoapError::Parse(e.to_string()))?;

                self.extract_response(&xml, action)
            }
            // vim25 reports faults with HTTP 500 and a Fault body
            Err(ureq::Error::Status(status, response)) => {
                let xml_text = response.into_string().unwrap_or_default();
                match Element::parse(xml_text.as_bytes()) {
                    Ok(xml) => match self.extract_response(&xml, action) {
                        Err(fault @ SoapError::Fault { .. }) => Err(fault),
                        _ => Err(SoapError::Http(status)),
                    },
                    Err(_) => Err(SoapError::Http(status)),
                }
            }
            Err(ureq::Error::Transport(transport)) => Err(SoapError::Network(transport.to_string())),
        }
    }

    /// The session cookie currently sent with every request, as `name=value`
    pub fn session_cookie(&self) -> Option<String> {
        self.session_cookie
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn remember_session_cookie(&self, response: &ureq::Response) {
        let Some(cookie) = response
            .all("set-cookie")
            .into_iter()
            .find_map(session_cookie_pair)
        else {
            return;
        };

        tracing::trace!("storing vim25 session cookie");
        *self
            .session_cookie
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(cookie);
    }

    fn extract_response(&self, xml: &Element, action: &str) -> Result<Element, SoapError> {
        let body = xml
            .get_child("Body")
            .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

        // Check for SOAP fault first
        if let Some(fault) = body.get_child("Fault") {
            let code = fault
                .get_child("faultcode")
                .and_then(|c| c.get_text())
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| "ServerFaultCode".to_string());
            let message = fault
                .get_child("faultstring")
                .and_then(|c| c.get_text())
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            let detail = fault
                .get_child("detail")
                .and_then(|d| d.children.iter().find_map(|n| n.as_element()))
                .map(|e| {
                    e.attributes
                        .get("type")
                        .cloned()
                        .unwrap_or_else(|| e.name.trim_end_matches("Fault").to_string())
                });
            return Err(SoapError::Fault { code, message, detail });
        }

        // Extract the action response
        let response_name = format!("{}Response", action);
        body.get_child(response_name.as_str())
            .cloned()
            .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The `name=value` pair of a `Set-Cookie` header for the session cookie
///
/// The value is kept verbatim, quotes included.
fn session_cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name.trim() != SESSION_COOKIE || value.is_empty() {
        return None;
    }
    Some(format!("{}={}", SESSION_COOKIE, value.trim()))
}

/// Wrap a request payload in a vim25 SOAP envelope
pub fn envelope(action: &str, payload: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><soapenv:Body><{action} xmlns="{ns}">{payload}</{action}></soapenv:Body></soapenv:Envelope>"#,
        action = action,
        ns = VIM25_NAMESPACE,
        payload = payload
    )
}

/// Escape text for inclusion in an XML element body
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
