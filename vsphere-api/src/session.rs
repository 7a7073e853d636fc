//! The Session Manager: one authenticated login against the endpoint

use soap_client::{SoapClient, TransportConfig};
use tracing::{debug, info};

use crate::endpoint::{Endpoint, TrustPolicy};
use crate::error::{ConnectionError, Result};
use crate::operations::{
    LoginOperation, LoginRequest, LogoutOperation, LogoutRequest,
    RetrieveServiceContentOperation, RetrieveServiceContentRequest,
};
use crate::types::{ServiceContent, UserSession};
use crate::VimClient;

/// An authenticated session against a management endpoint
///
/// Created by [`Session::open`] and owned by whoever opened it. Higher
/// layers borrow the [`VimClient`] and [`ServiceContent`] to issue calls
/// within the session. Dropping a session does not log out; call
/// [`Session::logout`] to release it on the server.
#[derive(Debug)]
pub struct Session {
    client: VimClient,
    content: ServiceContent,
    user: UserSession,
}

impl Session {
    /// Perform a single authentication handshake against the endpoint
    ///
    /// There is no internal retry. Callers that want resilience call
    /// `open` again.
    pub fn open(endpoint: &Endpoint, trust: TrustPolicy) -> std::result::Result<Self, ConnectionError> {
        if !endpoint.has_credentials() {
            return Err(ConnectionError::MissingCredentials);
        }

        let transport = TransportConfig {
            verify_certificates: trust.verifies(),
            ..Default::default()
        };
        let soap_client = SoapClient::with_config(&transport).map_err(ConnectionError::Transport)?;
        let client = VimClient::new(soap_client, endpoint.sdk_url());

        debug!(url = %endpoint.sdk_url(), ?trust, "retrieving service content");
        let content = client
            .execute::<RetrieveServiceContentOperation>(&RetrieveServiceContentRequest)
            .map_err(|source| ConnectionError::Handshake {
                url: endpoint.sdk_url(),
                source,
            })?;

        debug!(
            product = %content.about.full_name,
            api_version = %content.about.api_version,
            "connected, logging in"
        );

        let request = LoginRequest {
            session_manager: content.session_manager.clone(),
            user_name: endpoint.username().to_string(),
            password: endpoint.password().to_string(),
            locale: None,
        };
        let user = client
            .execute::<LoginOperation>(&request)
            .map_err(|source| {
                if source.is_invalid_login() {
                    ConnectionError::Authentication {
                        user: endpoint.username().to_string(),
                        source,
                    }
                } else {
                    ConnectionError::Handshake {
                        url: endpoint.sdk_url(),
                        source,
                    }
                }
            })?;

        info!(host = %endpoint.host(), user = %user.user_name, "logged in to management endpoint");

        Ok(Self { client, content, user })
    }

    /// The client bound to this session's cookie
    pub fn client(&self) -> &VimClient {
        &self.client
    }

    /// Service content retrieved during the handshake
    pub fn content(&self) -> &ServiceContent {
        &self.content
    }

    /// The logged-in user session
    pub fn user(&self) -> &UserSession {
        &self.user
    }

    /// Log out, invalidating the session on the server
    pub fn logout(self) -> Result<()> {
        let request = LogoutRequest {
            session_manager: self.content.session_manager.clone(),
        };
        self.client.execute::<LogoutOperation>(&request)?;
        debug!(user = %self.user.user_name, "logged out");
        Ok(())
    }
}
