//! The `listen` command: log in, stream events until interrupted, log out

use std::time::Duration;

use tracing::{debug, info, warn};
use vsphere_api::Session;
use vsphere_stream::{
    Cancellation, Dispatcher, EventSink, JsonLinesSink, TracingSink, VimEventSource,
};

use crate::cli::OutputFormat;
use crate::config::ListenSettings;
use crate::error::CliError;

const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the listener until a shutdown signal or a fatal error
pub async fn run(settings: ListenSettings) -> Result<(), CliError> {
    let cancel = Cancellation::new();
    debug!("Setting up shutdown signal handling");
    let watcher = crate::signal::spawn_watcher(cancel.clone());

    let result = listen(&settings, &cancel).await;

    watcher.abort();
    result
}

async fn listen(settings: &ListenSettings, cancel: &Cancellation) -> Result<(), CliError> {
    info!("vsphere-monitor listener starting");

    let endpoint = settings.endpoint.clone();
    let trust = settings.trust;
    let opening = tokio::task::spawn_blocking(move || Session::open(&endpoint, trust));

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        opened = opening => Some(opened),
    };
    let session = match opened {
        None => return Ok(()),
        Some(joined) => joined.map_err(CliError::Worker)?.map_err(CliError::Connection)?,
    };

    let mut sink = sink_for(settings.format);
    let mut dispatcher = Dispatcher::new(VimEventSource::new(&session), settings.subscribe_options());
    let outcome = dispatcher.run(&mut sink, cancel).await;
    debug!(state = ?dispatcher.state(), "dispatcher stopped");

    logout(session).await;
    outcome.map_err(CliError::Listener)
}

fn sink_for(format: OutputFormat) -> Box<dyn EventSink> {
    match format {
        OutputFormat::Text => Box::new(TracingSink),
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    }
}

async fn logout(session: Session) {
    let logging_out = tokio::task::spawn_blocking(move || session.logout());

    match tokio::time::timeout(LOGOUT_TIMEOUT, logging_out).await {
        Ok(Ok(Ok(()))) => debug!("Logged out"),
        Ok(Ok(Err(e))) => warn!(error = %e, "Logout failed"),
        Ok(Err(e)) => warn!(error = %e, "Logout worker failed"),
        Err(_) => warn!("Timed out logging out"),
    }
}
