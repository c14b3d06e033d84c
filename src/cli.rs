//! Command-line interface parsing for apodcache
//!
//! This module handles parsing of CLI arguments using clap and turns them,
//! together with an optional TOML config file, into a validated [`Config`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use thiserror::Error;

use crate::config::{Config, ConfigError, Settings};
use crate::store::{StoreError, DEFAULT_PAGE_SIZE};

/// Name used for the platform config and data directories
const APP_NAME: &str = "apodcache";

/// Error types for the command-line front end
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Output could not be serialized
    #[error("Failed to write JSON output: {0}")]
    Output(#[from] serde_json::Error),
}

/// apodcache - mirror NASA's Astronomy Picture of the Day locally
#[derive(Parser, Debug)]
#[command(name = "apodcache")]
#[command(about = "Mirror the Astronomy Picture of the Day into a local store")]
#[command(version)]
pub struct Cli {
    /// TOML config file (defaults to config.toml in the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the stored pictures
    #[arg(long, global = true, value_name = "DIR")]
    pub store_path: Option<PathBuf>,

    /// Public base URL under which thumbnails are served
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// APOD API key
    #[arg(long, global = true, env = "APOD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// APOD endpoint URL
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// IANA timezone that decides what "today" is
    #[arg(long, global = true, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Earliest date to synchronize (YYYY-MM-DD)
    #[arg(long, global = true, value_name = "DATE")]
    pub start_date: Option<String>,

    /// Thumbnail width in pixels
    #[arg(long, global = true, value_name = "PX")]
    pub thumbnail_width: Option<u32>,

    /// Thumbnail height in pixels
    #[arg(long, global = true, value_name = "PX")]
    pub thumbnail_height: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show one page of stored pictures, newest first
    Page {
        /// Page number, 0 is the page ending today
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Days per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: usize,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch every missing day from today back to the start date
    Sync {
        /// Stop after this many download attempts
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Delete every stored record and thumbnail
    Clear,
}

impl Cli {
    /// Settings given directly on the command line
    pub fn overrides(&self) -> Settings {
        Settings {
            timezone: self.timezone.clone(),
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            start_date: self.start_date.clone(),
            thumbnail_width: self.thumbnail_width,
            thumbnail_height: self.thumbnail_height,
            store_path: self.store_path.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Default config file location, e.g. `~/.config/apodcache/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Default store directory, e.g. `~/.local/share/apodcache/pictures`
pub fn default_store_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("pictures"))
}

/// Builds the store configuration for a parsed command line
///
/// Layers, lowest priority first: the config file (explicit `--config`, or
/// the default location when it exists), then command-line flags. A missing
/// `store_path` falls back to the platform data directory; `base_url` has no
/// fallback.
///
/// # Returns
/// * `Ok(Config)` ready to build a store from
/// * `Err(CliError::Config)` if the file is unreadable or a value is invalid
pub fn resolve_config(cli: &Cli) -> Result<Config, CliError> {
    let file_settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => Settings::load(&path)?,
            None => Settings::default(),
        },
    };

    let mut settings = file_settings.overlay(cli.overrides());
    if settings.store_path.is_none() {
        settings.store_path = default_store_path();
    }

    Ok(Config::from_settings(settings)?)
}
