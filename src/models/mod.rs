// src/models/mod.rs

//! Domain models for the frontier poller.
//!
//! This module contains the data structures shared by the poll pipeline
//! and the storage collaborators.

mod config;
mod cursor;
mod document;
mod item;

// Re-export all public types
pub use config::{BucketDecay, Config, PollerConfig, RuntimeConfig, StoreConfig};
pub use cursor::PollCursor;
pub use document::{Document, FieldValue, NEXT_FETCH_DATE_FIELD, URL_FIELD};
pub use item::{CrawlItem, Metadata};
