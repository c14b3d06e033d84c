//! Picture store façade
//!
//! [`PictureStore`] ties the APOD source, the thumbnailer and the on-disk
//! [`DayCache`] together and exposes the three store operations: paginate
//! over stored days, synchronize missing days from the API, and clear.

use chrono::{Days, NaiveDate};
use futures::stream::{self, Stream};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, DayCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::data::apod::parse_picture;
use crate::data::{
    ApodClient, FetchError, ImageThumbnailer, Picture, PictureSource, Thumbnailer,
};

/// Default number of days per page
pub const DEFAULT_PAGE_SIZE: usize = 24;

/// Errors returned by read operations on the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A page must span at least one day
    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    /// A stored file could not be read, decoded or removed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result of visiting one day during synchronization
#[derive(Debug)]
pub enum SyncOutcome {
    /// The day was missing and has now been fetched and stored
    Fetched { date: NaiveDate, picture: Picture },
    /// The day was already stored; no request was made
    Skipped { date: NaiveDate },
    /// Fetching or storing the day failed; the walk continues
    Failed { date: NaiveDate, error: FetchError },
}

impl SyncOutcome {
    /// The day this outcome belongs to
    pub fn date(&self) -> NaiveDate {
        match self {
            SyncOutcome::Fetched { date, .. }
            | SyncOutcome::Skipped { date }
            | SyncOutcome::Failed { date, .. } => *date,
        }
    }
}

/// Running tally of a synchronization
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Fetched { .. } => self.fetched += 1,
            SyncOutcome::Skipped { .. } => self.skipped += 1,
            SyncOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Walk state for [`PictureStore::synchronize`]
struct SyncCursor {
    next: Option<NaiveDate>,
    attempts: usize,
}

/// A date-indexed cache of daily pictures backed by the APOD API
pub struct PictureStore {
    config: Config,
    cache: DayCache,
    source: Box<dyn PictureSource>,
    thumbnailer: Box<dyn Thumbnailer>,
    clock: Box<dyn Clock>,
}

impl PictureStore {
    /// Create a store that fetches from `source`
    ///
    /// Uses [`ImageThumbnailer`] and the system clock; see
    /// [`PictureStore::with_thumbnailer`] and [`PictureStore::with_clock`].
    pub fn new(config: Config, source: impl PictureSource + 'static) -> Self {
        let cache = DayCache::new(config.store_path.clone(), config.base_url.clone());
        Self {
            config,
            cache,
            source: Box::new(source),
            thumbnailer: Box::new(ImageThumbnailer),
            clock: Box::new(SystemClock),
        }
    }

    /// Create a store talking to the configured APOD endpoint
    pub fn from_config(config: Config) -> Self {
        let client = ApodClient::from_config(&config);
        Self::new(config, client)
    }

    /// Replace the thumbnail generator
    pub fn with_thumbnailer(mut self, thumbnailer: impl Thumbnailer + 'static) -> Self {
        self.thumbnailer = Box::new(thumbnailer);
        self
    }

    /// Replace the clock used to decide what "today" is
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Today's date in the configured timezone
    pub fn today(&self) -> NaiveDate {
        self.clock.today(self.config.timezone)
    }

    /// Returns true if a record is stored for `date`
    pub fn is_stored(&self, date: NaiveDate) -> bool {
        self.cache.is_stored(date)
    }

    /// Reads the stored record for `date`, if any
    pub fn read_stored(&self, date: NaiveDate) -> Result<Option<Picture>, StoreError> {
        Ok(self.cache.read(date)?)
    }

    /// Returns the stored records of one page of days
    ///
    /// Page `page` covers the `page_size` days at offsets
    /// `[page * page_size, page * page_size + page_size)` before today, newest
    /// first. Days without a stored record are left out, so a page may hold
    /// fewer than `page_size` entries.
    ///
    /// # Returns
    /// * `Ok(Vec<(NaiveDate, Picture)>)` in descending date order
    /// * `Err(StoreError::InvalidPageSize)` if `page_size` is zero
    /// * `Err(StoreError::Cache)` if a stored record cannot be read
    pub fn paginate(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<(NaiveDate, Picture)>, StoreError> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }

        let today = self.today();
        let Some(start) = page.checked_mul(page_size) else {
            return Ok(Vec::new());
        };

        let mut pictures = Vec::new();
        for offset in start..start.saturating_add(page_size) {
            // Past the start of the calendar; nothing earlier can exist
            let Some(date) = today.checked_sub_days(Days::new(offset as u64)) else {
                break;
            };

            if let Some(picture) = self.cache.read(date)? {
                pictures.push((date, picture));
            }
        }

        Ok(pictures)
    }

    /// Walks backwards from today to `start_date`, fetching every missing day
    ///
    /// The returned stream is lazy: each day is only visited when the caller
    /// polls for the next outcome, and one day is fully handled before the
    /// next begins. A failed day produces [`SyncOutcome::Failed`] and the walk
    /// carries on with the previous day.
    ///
    /// `limit` caps the number of fetch attempts; stored days do not count.
    /// Once the cap is reached the stream ends.
    pub fn synchronize(&self, limit: Option<usize>) -> impl Stream<Item = SyncOutcome> + '_ {
        let cursor = SyncCursor {
            next: Some(self.today()),
            attempts: 0,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            let date = cursor.next?;
            if date < self.config.start_date {
                return None;
            }
            if limit.is_some_and(|max| cursor.attempts >= max) {
                debug!(%date, attempts = cursor.attempts, "sync limit reached");
                return None;
            }
            cursor.next = date.pred_opt();

            if self.cache.is_stored(date) {
                debug!(%date, "already stored");
                return Some((SyncOutcome::Skipped { date }, cursor));
            }

            cursor.attempts += 1;
            let outcome = match self.fetch_and_persist(date).await {
                Ok(picture) => {
                    info!(%date, media_type = %picture.media_type, "stored picture");
                    SyncOutcome::Fetched { date, picture }
                }
                Err(error) => {
                    warn!(%date, %error, "failed to fetch picture");
                    SyncOutcome::Failed { date, error }
                }
            };

            Some((outcome, cursor))
        })
    }

    /// Deletes every record and thumbnail in the store
    ///
    /// # Returns
    /// * `Ok(count)` with the number of files removed
    pub fn clear(&self) -> Result<usize, StoreError> {
        let removed = self.cache.clear()?;
        info!(
            removed,
            store = %self.cache.store_dir().display(),
            "cleared store"
        );
        Ok(removed)
    }

    /// Fetches one day, writes it to disk and thumbnails image entries
    ///
    /// The raw body is written before the thumbnail is attempted, so a day
    /// whose thumbnail fails is still stored, without a thumbnail.
    async fn fetch_and_persist(&self, date: NaiveDate) -> Result<Picture, FetchError> {
        let body = self.source.fetch_day(date).await?;
        let mut picture = parse_picture(&body)?;

        self.cache.write_raw(date, &body)?;

        if picture.is_image() {
            let url = picture.url.as_deref().ok_or(FetchError::MissingMediaUrl)?;
            let media = self.source.fetch_media(url).await?;

            self.thumbnailer.fit_to_box(
                &media,
                self.config.thumbnail_width,
                self.config.thumbnail_height,
                &self.cache.thumbnail_path(date),
            )?;
            picture.thumbnail_url = Some(self.cache.thumbnail_url(date));
        }

        Ok(picture)
    }
}
