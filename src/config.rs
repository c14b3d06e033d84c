//! Configuration for the picture store
//!
//! Settings arrive in layers (TOML file, then command-line flags) as a
//! [`Settings`] value where every key is optional. [`Config::from_settings`]
//! fills in defaults, validates the required keys and produces the immutable
//! [`Config`] the rest of the crate works with.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

/// Default timezone used to decide what "today" is
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Demo key accepted by api.nasa.gov with a low rate limit
pub const DEFAULT_API_KEY: &str = "DEMO_KEY";

/// Default APOD endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.nasa.gov/planetary/apod";

/// Date of the first Astronomy Picture of the Day
pub const DEFAULT_START_DATE: &str = "1995-06-16";

/// Default thumbnail box width in pixels
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 300;

/// Default thumbnail box height in pixels
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 200;

/// Format of every date key in the store and in API requests
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was not supplied
    #[error("{0} must be set")]
    Missing(&'static str),

    /// The timezone is not a known IANA zone name
    #[error("Unknown timezone: '{0}'")]
    InvalidTimezone(String),

    /// The start date is not a YYYY-MM-DD date
    #[error("Invalid start_date '{0}': expected YYYY-MM-DD")]
    InvalidStartDate(String),

    /// A thumbnail dimension was zero
    #[error("Thumbnail dimensions must be non-zero, got {width}x{height}")]
    InvalidThumbnailSize { width: u32, height: u32 },

    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Settings`]
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw, partially-specified settings
///
/// Every field is optional so that layers can be merged before defaults and
/// validation are applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub timezone: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub start_date: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub store_path: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Settings {
    /// Loads settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns `self` with every key that `overrides` sets replaced
    pub fn overlay(self, overrides: Settings) -> Settings {
        Settings {
            timezone: overrides.timezone.or(self.timezone),
            api_key: overrides.api_key.or(self.api_key),
            endpoint: overrides.endpoint.or(self.endpoint),
            start_date: overrides.start_date.or(self.start_date),
            thumbnail_width: overrides.thumbnail_width.or(self.thumbnail_width),
            thumbnail_height: overrides.thumbnail_height.or(self.thumbnail_height),
            store_path: overrides.store_path.or(self.store_path),
            base_url: overrides.base_url.or(self.base_url),
        }
    }
}

/// Validated, immutable store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Timezone used to compute "today"
    pub timezone: Tz,
    /// API key sent with every request
    pub api_key: String,
    /// APOD endpoint URL
    pub endpoint: String,
    /// Earliest date synchronize walks back to (inclusive)
    pub start_date: NaiveDate,
    /// Thumbnail box width in pixels
    pub thumbnail_width: u32,
    /// Thumbnail box height in pixels
    pub thumbnail_height: u32,
    /// Directory holding the per-date files, without a trailing separator
    pub store_path: PathBuf,
    /// Public base URL for thumbnails, always ending in exactly one `/`
    pub base_url: String,
}

impl Config {
    /// Builds a configuration from raw settings
    ///
    /// Defaults are applied first, then the required keys (`store_path`,
    /// `base_url`) are checked, then the remaining values are parsed.
    ///
    /// # Returns
    /// * `Ok(Config)` with normalized paths
    /// * `Err(ConfigError)` on the first missing or invalid option
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let store_path = settings
            .store_path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("store_path"))?;
        let base_url = settings
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("base_url"))?;

        let timezone_name = settings
            .timezone
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        let start_date_str = settings
            .start_date
            .unwrap_or_else(|| DEFAULT_START_DATE.to_string());
        let start_date = NaiveDate::parse_from_str(&start_date_str, DATE_FORMAT)
            .map_err(|_| ConfigError::InvalidStartDate(start_date_str.clone()))?;

        let thumbnail_width = settings.thumbnail_width.unwrap_or(DEFAULT_THUMBNAIL_WIDTH);
        let thumbnail_height = settings
            .thumbnail_height
            .unwrap_or(DEFAULT_THUMBNAIL_HEIGHT);
        if thumbnail_width == 0 || thumbnail_height == 0 {
            return Err(ConfigError::InvalidThumbnailSize {
                width: thumbnail_width,
                height: thumbnail_height,
            });
        }

        Ok(Self {
            timezone,
            api_key: settings
                .api_key
                .unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            endpoint: settings
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            start_date,
            thumbnail_width,
            thumbnail_height,
            store_path: normalize_path(&store_path),
            base_url: normalize_base_url(&base_url),
        })
    }
}

/// Drops trailing separators (and redundant `.`/`//` segments)
fn normalize_path(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Strips trailing slashes and adds back exactly one
fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}
