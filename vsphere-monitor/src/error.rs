//! Fatal errors of the binary and their exit codes

use std::error::Error as _;

use tracing::{debug, error};
use vsphere_api::{ConnectionError, EndpointError};
use vsphere_stream::DispatchError;

/// Everything that ends the process with a non-zero status
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing options, please specify a vsphere-url or a config file providing one")]
    MissingUrl,

    #[error("Unable to load the configuration")]
    Config(#[source] anyhow::Error),

    #[error("Unable to parse the vsphere-url")]
    InvalidUrl(#[source] EndpointError),

    #[error("Unable to connect to the vSphere endpoint")]
    Connection(#[source] ConnectionError),

    #[error("Error while running the event listener")]
    Listener(#[source] DispatchError),

    #[error("Unable to start the async runtime")]
    Runtime(#[source] std::io::Error),

    #[error("Connection worker failed")]
    Worker(#[source] tokio::task::JoinError),
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::MissingUrl | CliError::Config(_) => 1,
            CliError::Connection(ConnectionError::MissingCredentials) => 1,
            CliError::InvalidUrl(_) => 10,
            CliError::Connection(_)
            | CliError::Listener(_)
            | CliError::Runtime(_)
            | CliError::Worker(_) => 20,
        }
    }

    /// One summary line at error level; the cause chain at debug level
    pub fn report(&self) {
        error!("{}", self);

        let mut source = self.source();
        while let Some(cause) = source {
            debug!(cause = %cause, "caused by");
            source = cause.source();
        }
    }
}
