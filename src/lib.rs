//! apodcache library
//!
//! A date-indexed flat-file cache of NASA's Astronomy Picture of the Day.
//! [`store::PictureStore`] is the entry point; the remaining modules are its
//! collaborators and the command-line front end.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod store;

pub use store::{PictureStore, SyncOutcome};
