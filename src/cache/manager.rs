//! Flat-file day cache
//!
//! Provides a `DayCache` that maps calendar dates to files in a single
//! directory: `<date>.json` holds the raw provider response and
//! `<date>.thumb.jpg` the optional thumbnail.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::DATE_FORMAT;
use crate::data::{FetchError, Picture};

/// Suffix of the metadata file for a date
const JSON_SUFFIX: &str = ".json";

/// Suffix of the thumbnail file for a date
const THUMBNAIL_SUFFIX: &str = ".thumb.jpg";

/// File extensions removed by [`DayCache::clear`]
const MANAGED_EXTENSIONS: [&str; 2] = ["json", "jpg"];

/// Errors raised while reading from or clearing the cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A stored file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored metadata file is not a valid record
    #[error("Corrupt record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A managed file could not be removed
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Manages the per-date files of the store
///
/// The existence of `<date>.json` is the only thing that makes a date
/// "stored"; the thumbnail is optional and never consulted for that.
#[derive(Debug, Clone)]
pub struct DayCache {
    /// Directory where the files live
    store_dir: PathBuf,
    /// Public base URL for thumbnails, ending in `/`
    base_url: String,
}

impl DayCache {
    /// Creates a cache over `store_dir`, publishing thumbnails under `base_url`
    pub fn new(store_dir: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            store_dir,
            base_url: base_url.into(),
        }
    }

    /// Directory holding the cache files
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn key(date: NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Path of the metadata file for `date`
    pub fn json_path(&self, date: NaiveDate) -> PathBuf {
        self.store_dir.join(format!("{}{}", Self::key(date), JSON_SUFFIX))
    }

    /// Path of the thumbnail file for `date`
    pub fn thumbnail_path(&self, date: NaiveDate) -> PathBuf {
        self.store_dir.join(format!("{}{}", Self::key(date), THUMBNAIL_SUFFIX))
    }

    /// Public URL under which the thumbnail for `date` is served
    pub fn thumbnail_url(&self, date: NaiveDate) -> String {
        format!("{}{}{}", self.base_url, Self::key(date), THUMBNAIL_SUFFIX)
    }

    /// Ensures the store directory exists
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.store_dir)
    }

    /// Returns true if the metadata file for `date` exists
    pub fn is_stored(&self, date: NaiveDate) -> bool {
        self.json_path(date).exists()
    }

    /// Returns true if a thumbnail file exists for `date`
    pub fn has_thumbnail(&self, date: NaiveDate) -> bool {
        self.thumbnail_path(date).exists()
    }

    /// Writes the raw provider body for `date` verbatim
    ///
    /// Creates the store directory when missing.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(FetchError::Persistence)` naming the path that could not be written
    pub fn write_raw(&self, date: NaiveDate, body: &str) -> Result<(), FetchError> {
        self.ensure_dir().map_err(|source| FetchError::Persistence {
            path: self.store_dir.clone(),
            source,
        })?;

        let path = self.json_path(date);
        fs::write(&path, body).map_err(|source| FetchError::Persistence { path, source })
    }

    /// Reads the stored record for `date`
    ///
    /// `thumbnail_url` is set exactly when the thumbnail file exists, whatever
    /// the record's own `media_type` says.
    ///
    /// # Returns
    /// * `Ok(Some(Picture))` if the record is stored
    /// * `Ok(None)` if no metadata file exists
    /// * `Err(CacheError)` if the file exists but cannot be read or decoded
    pub fn read(&self, date: NaiveDate) -> Result<Option<Picture>, CacheError> {
        let path = self.json_path(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        let mut picture: Picture = serde_json::from_str(&content)
            .map_err(|source| CacheError::Corrupt { path, source })?;

        picture.thumbnail_url = self
            .has_thumbnail(date)
            .then(|| self.thumbnail_url(date));

        Ok(Some(picture))
    }

    /// Removes every `*.json` and `*.jpg` file in the store directory
    ///
    /// A missing store directory counts as already clear.
    ///
    /// # Returns
    /// * `Ok(count)` with the number of files removed
    /// * `Err(CacheError)` on the first file that could not be removed
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.store_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.store_dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Read {
                path: self.store_dir.clone(),
                source,
            })?;
            let path = entry.path();

            if !path.is_file() || !is_managed(&path) {
                continue;
            }

            fs::remove_file(&path).map_err(|source| CacheError::Remove {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "removed cache file");
            removed += 1;
        }

        Ok(removed)
    }
}

fn is_managed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANAGED_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BODY: &str = r#"{"media_type":"image","url":"https://example.com/a.jpg","title":"A"}"#;

    fn create_test_cache() -> (DayCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = DayCache::new(temp_dir.path().to_path_buf(), "https://cdn.example.com/");
        (cache, temp_dir)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_paths_follow_date_convention() {
        let (cache, temp_dir) = create_test_cache();
        let day = date(2024, 1, 2);

        assert_eq!(cache.json_path(day), temp_dir.path().join("2024-01-02.json"));
        assert_eq!(
            cache.thumbnail_path(day),
            temp_dir.path().join("2024-01-02.thumb.jpg")
        );
        assert_eq!(
            cache.thumbnail_url(day),
            "https://cdn.example.com/2024-01-02.thumb.jpg"
        );
    }

    #[test]
    fn test_write_raw_is_verbatim_and_marks_stored() {
        let (cache, _temp_dir) = create_test_cache();
        let day = date(2024, 1, 2);
        assert!(!cache.is_stored(day));

        cache.write_raw(day, BODY).expect("Write should succeed");

        assert!(cache.is_stored(day));
        let content = fs::read_to_string(cache.json_path(day)).expect("Should read file");
        assert_eq!(content, BODY);
    }

    #[test]
    fn test_write_raw_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("store");
        let cache = DayCache::new(nested.clone(), "https://cdn.example.com/");

        cache
            .write_raw(date(2024, 1, 1), BODY)
            .expect("Write should succeed");

        assert!(nested.join("2024-01-01.json").exists());
    }

    #[test]
    fn test_write_raw_failure_is_persistence_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let not_a_dir = temp_dir.path().join("store");
        fs::write(&not_a_dir, "occupied").expect("write blocker file");
        let cache = DayCache::new(not_a_dir.clone(), "https://cdn.example.com/");
        let day = date(2024, 1, 1);

        match cache.write_raw(day, BODY) {
            Err(FetchError::Persistence { path, .. }) => assert_eq!(path, not_a_dir),
            other => panic!("expected persistence error, got {:?}", other),
        }
        assert!(!cache.is_stored(day));
        assert_eq!(
            fs::read_to_string(&not_a_dir).expect("blocker file"),
            "occupied"
        );
    }

    #[test]
    fn test_read_returns_none_for_missing_date() {
        let (cache, _temp_dir) = create_test_cache();
        assert!(cache.read(date(2024, 1, 2)).expect("read").is_none());
    }

    #[test]
    fn test_read_without_thumbnail_omits_url() {
        let (cache, _temp_dir) = create_test_cache();
        let day = date(2024, 1, 2);
        cache.write_raw(day, BODY).expect("write");

        let picture = cache.read(day).expect("read").expect("stored");

        assert_eq!(picture.title(), Some("A"));
        assert!(picture.thumbnail_url.is_none());
    }

    #[test]
    fn test_read_with_thumbnail_file_sets_url_regardless_of_media_type() {
        let (cache, _temp_dir) = create_test_cache();
        let day = date(2024, 1, 3);
        cache
            .write_raw(day, r#"{"media_type":"video","url":"https://youtu.be/x"}"#)
            .expect("write");
        fs::write(cache.thumbnail_path(day), b"jpeg").expect("write thumb");

        let picture = cache.read(day).expect("read").expect("stored");

        assert_eq!(
            picture.thumbnail_url.as_deref(),
            Some("https://cdn.example.com/2024-01-03.thumb.jpg")
        );
    }

    #[test]
    fn test_thumbnail_alone_is_not_stored() {
        let (cache, _temp_dir) = create_test_cache();
        let day = date(2024, 1, 4);
        fs::write(cache.thumbnail_path(day), b"jpeg").expect("write thumb");

        assert!(!cache.is_stored(day));
        assert!(cache.read(day).expect("read").is_none());
    }

    #[test]
    fn test_read_corrupt_file() {
        let (cache, _temp_dir) = create_test_cache();
        let day = date(2024, 1, 5);
        fs::write(cache.json_path(day), "{ not json").expect("write");

        let result = cache.read(day);
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_clear_removes_only_managed_files() {
        let (cache, temp_dir) = create_test_cache();
        let day = date(2024, 1, 2);
        cache.write_raw(day, BODY).expect("write");
        fs::write(cache.thumbnail_path(day), b"jpeg").expect("write thumb");
        fs::write(temp_dir.path().join("notes.txt"), "keep me").expect("write other");
        fs::create_dir(temp_dir.path().join("sub.json")).expect("create dir");

        let removed = cache.clear().expect("clear");

        assert_eq!(removed, 2);
        assert!(!cache.is_stored(day));
        assert!(!cache.has_thumbnail(day));
        assert!(temp_dir.path().join("notes.txt").exists());
        assert!(temp_dir.path().join("sub.json").exists());
    }

    #[test]
    fn test_clear_missing_directory_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = DayCache::new(temp_dir.path().join("never-created"), "https://x/");

        assert_eq!(cache.clear().expect("clear"), 0);
    }
}
