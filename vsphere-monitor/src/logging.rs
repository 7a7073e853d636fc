//! Logger setup

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level selected by the verbosity flags; debug wins over verbose
pub fn level(debug: bool, verbose: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Install the global subscriber
///
/// `RUST_LOG`, when set and valid, takes precedence over the flags. Logs
/// go to stderr so stdout stays free for event output.
pub fn init(debug: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level(debug, verbose).as_str().to_lowercase()));

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
