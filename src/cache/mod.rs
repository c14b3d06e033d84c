//! Cache module for storing daily pictures on disk
//!
//! This module maps calendar dates to a flat directory of files: the raw
//! provider response per day plus an optional thumbnail. There is no index;
//! the directory listing is the store.

mod manager;

pub use manager::{CacheError, DayCache};
