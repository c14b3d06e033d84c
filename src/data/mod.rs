//! Core data models for the picture store
//!
//! This module contains the per-day [`Picture`] record together with the two
//! collaborators that produce its content: the APOD HTTP client and the
//! thumbnail generator.

pub mod apod;
pub mod thumbnail;

pub use apod::{ApodClient, FetchError, PictureSource};
pub use thumbnail::{ImageThumbnailer, ThumbnailError, Thumbnailer};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of media a day's entry points to
///
/// The provider only distinguishes images from everything else as far as
/// this crate is concerned; any other value is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    /// A still image that gets a thumbnail
    Image,
    /// Anything else (`video`, `other`, ...)
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Other(kind) => kind,
        }
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        if value == "image" {
            MediaType::Image
        } else {
            MediaType::Other(value)
        }
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Image => "image".to_string(),
            MediaType::Other(kind) => kind,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's record as returned by the provider
///
/// Only the fields this crate acts on are typed; everything else the provider
/// sends (title, explanation, copyright, concept tags, ...) is preserved in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    /// Kind of media at `url`
    pub media_type: MediaType,
    /// Location of the source media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Public URL of the locally stored thumbnail, if one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Remaining provider-supplied fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Picture {
    /// Returns a provider-supplied string field by name
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Returns the entry's title, if the provider sent one
    pub fn title(&self) -> Option<&str> {
        self.field_str("title")
    }

    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }
}
