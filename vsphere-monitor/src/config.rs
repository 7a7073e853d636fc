//! Resolution of listener settings from arguments, environment and file
//!
//! Precedence, highest first: command line argument, environment variable,
//! configuration file, built-in default. Arguments and environment are
//! merged by clap; this module layers the file and the defaults below them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use vsphere_api::{Endpoint, TrustPolicy};
use vsphere_stream::SubscribeOptions;

use crate::cli::{ListenArgs, OutputFormat};
use crate::error::CliError;

/// Contents of the optional JSON configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub vsphere_url: Option<String>,
    pub debug: Option<bool>,
    pub verbose: Option<bool>,
    pub verify_certificates: Option<bool>,
    pub page_size: Option<u32>,
    pub include_history: Option<bool>,
    pub max_wait_seconds: Option<u32>,
    pub format: Option<OutputFormat>,
}

impl FileConfig {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;

        if config.page_size == Some(0) {
            anyhow::bail!("Invalid configuration file {}: page_size must be positive", path.display());
        }
        Ok(config)
    }
}

/// Everything the `listen` command needs, fully resolved
#[derive(Debug, Clone)]
pub struct ListenSettings {
    pub endpoint: Endpoint,
    pub trust: TrustPolicy,
    pub page_size: u32,
    pub tail_only: bool,
    pub max_wait_seconds: Option<u32>,
    pub format: OutputFormat,
}

impl ListenSettings {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Merge arguments with the file and validate the endpoint URL
    ///
    /// A missing URL is reported before the URL is parsed.
    pub fn resolve(args: &ListenArgs, file: &FileConfig) -> std::result::Result<Self, CliError> {
        let url = args
            .vsphere_url
            .as_deref()
            .or(file.vsphere_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .ok_or(CliError::MissingUrl)?;

        let endpoint = Endpoint::parse(url).map_err(CliError::InvalidUrl)?;

        let verify = args.verify_certificates || file.verify_certificates.unwrap_or(false);
        let include_history = args.include_history || file.include_history.unwrap_or(false);

        Ok(Self {
            endpoint,
            trust: if verify {
                TrustPolicy::Verify
            } else {
                TrustPolicy::SkipVerification
            },
            page_size: args
                .page_size
                .or(file.page_size)
                .unwrap_or(Self::DEFAULT_PAGE_SIZE),
            tail_only: !include_history,
            max_wait_seconds: args.max_wait_seconds.or(file.max_wait_seconds),
            format: args.format.or(file.format).unwrap_or_default(),
        })
    }

    pub fn subscribe_options(&self) -> SubscribeOptions {
        SubscribeOptions {
            page_size: self.page_size,
            include_full_detail: true,
            tail_only: self.tail_only,
            max_wait_seconds: self.max_wait_seconds,
            close_timeout: Duration::from_secs(5),
        }
    }

    /// Log the effective settings, password masked
    pub fn log_summary(&self) {
        info!(
            vsphere_url = %self.endpoint,
            trust = ?self.trust,
            page_size = self.page_size,
            tail_only = self.tail_only,
            max_wait_seconds = ?self.max_wait_seconds,
            format = ?self.format,
            "Listen command arguments"
        );
    }
}
