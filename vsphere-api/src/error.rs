use soap_client::SoapError;
use thiserror::Error;

/// High-level API errors for vim25 operations
///
/// This enum abstracts away the underlying SOAP communication details and
/// carries enough of the server's fault information for callers to decide
/// whether a failure is an authentication problem, a transport problem or
/// a malformed response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused, DNS resolution failure, TLS handshake or
    /// certificate validation failure, or a connection dropped mid-response.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The server answered with an HTTP error status and no SOAP fault
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response parsing error
    ///
    /// The server returned a well-formed HTTP response whose XML content
    /// could not be mapped onto the expected vim25 structure.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// SOAP fault returned by the server
    #[error("Server fault{}: {message}", fault_suffix(.kind))]
    Fault {
        /// vim25 fault type, e.g. `InvalidLogin` or `NotAuthenticated`
        kind: Option<String>,
        /// The server's fault string
        message: String,
    },
}

impl ApiError {
    /// The vim25 fault type if the server returned one
    pub fn fault_kind(&self) -> Option<&str> {
        match self {
            ApiError::Fault { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }

    /// Whether the server rejected the supplied credentials
    pub fn is_invalid_login(&self) -> bool {
        matches!(self.fault_kind(), Some("InvalidLogin"))
    }
}

fn fault_suffix(kind: &Option<String>) -> String {
    kind.as_deref().map(|k| format!(" ({})", k)).unwrap_or_default()
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Convert from SoapError to ApiError
impl From<SoapError> for ApiError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Network(msg) => ApiError::NetworkError(msg),
            SoapError::Http(status) => ApiError::HttpStatus(status),
            SoapError::Parse(msg) => ApiError::ParseError(msg),
            SoapError::Fault { message, detail, .. } => ApiError::Fault { kind: detail, message },
        }
    }
}

/// Errors produced while validating an endpoint URL
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The input is not a URL at all
    #[error("malformed endpoint URL: {0}")]
    Malformed(#[from] url::ParseError),

    /// Only `http` and `https` endpoints are supported
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    /// The URL has no host component
    #[error("endpoint URL has no host")]
    MissingHost,
}

/// Errors produced by the Session Manager while opening a session
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint URL carried no user name
    #[error("no credentials in endpoint URL")]
    MissingCredentials,

    /// The HTTP transport could not be configured
    #[error("failed to configure transport")]
    Transport(#[source] SoapError),

    /// The endpoint could not be reached or did not speak vim25
    #[error("failed to reach management endpoint {url}")]
    Handshake {
        url: String,
        #[source]
        source: ApiError,
    },

    /// The endpoint rejected the login
    #[error("authentication as '{user}' failed")]
    Authentication {
        user: String,
        #[source]
        source: ApiError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_soap_error_conversion() {
        let api_error: ApiError = SoapError::Network("connection refused".to_string()).into();
        assert!(matches!(api_error, ApiError::NetworkError(_)));

        let api_error: ApiError = SoapError::Parse("invalid XML".to_string()).into();
        assert!(matches!(api_error, ApiError::ParseError(_)));

        let api_error: ApiError = SoapError::Http(503).into();
        assert!(matches!(api_error, ApiError::HttpStatus(503)));

        let api_error: ApiError = SoapError::Fault {
            code: "ServerFaultCode".to_string(),
            message: "bad login".to_string(),
            detail: Some("InvalidLogin".to_string()),
        }
        .into();
        assert!(api_error.is_invalid_login());
    }

    #[test]
    fn test_error_display() {
        let network_err = ApiError::NetworkError("connection failed".to_string());
        assert_eq!(format!("{}", network_err), "Network error: connection failed");

        let fault = ApiError::Fault {
            kind: Some("NotAuthenticated".to_string()),
            message: "The session is not authenticated.".to_string(),
        };
        assert_eq!(
            format!("{}", fault),
            "Server fault (NotAuthenticated): The session is not authenticated."
        );

        let bare_fault = ApiError::Fault { kind: None, message: "boom".to_string() };
        assert_eq!(format!("{}", bare_fault), "Server fault: boom");
    }

    #[test]
    fn test_connection_error_keeps_cause_chain() {
        let err = ConnectionError::Handshake {
            url: "https://esxi.lab/sdk".to_string(),
            source: ApiError::NetworkError("dns error".to_string()),
        };

        assert_eq!(err.to_string(), "failed to reach management endpoint https://esxi.lab/sdk");
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "Network error: dns error");
    }
}
