//! Login and Logout operations on the SessionManager

use xmltree::Element;

use crate::types::{child_text, ManagedObjectReference, UserSession};
use crate::{ApiError, VimOperation};
use soap_client::escape;

/// Login operation
pub struct LoginOperation;

/// Request for Login operation
#[derive(Clone)]
pub struct LoginRequest {
    pub session_manager: ManagedObjectReference,
    pub user_name: String,
    pub password: String,
    pub locale: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("session_manager", &self.session_manager)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("locale", &self.locale)
            .finish()
    }
}

impl VimOperation for LoginOperation {
    type Request = LoginRequest;
    type Response = UserSession;

    const ACTION: &'static str = "Login";

    fn build_payload(request: &Self::Request) -> String {
        let mut payload = format!(
            "{}<userName>{}</userName><password>{}</password>",
            request.session_manager.as_this(),
            escape(&request.user_name),
            escape(&request.password)
        );
        if let Some(locale) = &request.locale {
            payload.push_str(&format!("<locale>{}</locale>", escape(locale)));
        }
        payload
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError> {
        let returnval = xml
            .get_child("returnval")
            .ok_or_else(|| ApiError::ParseError("Missing returnval element".to_string()))?;

        let key = child_text(returnval, "key")
            .ok_or_else(|| ApiError::ParseError("Missing session key".to_string()))?;
        let user_name = child_text(returnval, "userName")
            .ok_or_else(|| ApiError::ParseError("Missing userName element".to_string()))?;

        Ok(UserSession {
            key,
            user_name,
            full_name: child_text(returnval, "fullName"),
        })
    }
}

/// Logout operation
pub struct LogoutOperation;

/// Request for Logout operation
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    pub session_manager: ManagedObjectReference,
}

impl VimOperation for LogoutOperation {
    type Request = LogoutRequest;
    type Response = ();

    const ACTION: &'static str = "Logout";

    fn build_payload(request: &Self::Request) -> String {
        request.session_manager.as_this()
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(())
    }
}
