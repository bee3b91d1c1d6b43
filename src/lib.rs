// src/lib.rs

//! Frontier poller library
//!
//! Pulls batches of due URLs from a status store, collapses them per bucket,
//! skips URLs already in flight and buffers the rest for emission.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;
