//! Status store abstractions.
//!
//! The poller is a client of an indexed status store. This module holds the
//! query contract it speaks and the collaborator traits injected into it:
//!
//! - [`StatusStore`]: executes one [`StatusQuery`] per poll
//! - [`Connector`]: acquires a store connection at startup
//! - [`InFlight`]: read-only membership check for URLs already dispatched
//! - [`AckSink`]: in-progress/ack/fail bookkeeping owned by the scheduler

pub mod in_flight;
pub mod local;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::models::{Document, NEXT_FETCH_DATE_FIELD, StoreConfig};

// Re-export for convenience
pub use in_flight::InFlightRegistry;
pub use local::LocalConnector;
pub use memory::MemoryStore;

/// Sort direction of a sort clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    /// Earliest-due first.
    pub fn earliest_due() -> Self {
        Self {
            field: NEXT_FETCH_DATE_FIELD.to_string(),
            order: SortOrder::Asc,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{} {}", self.field, order)
    }
}

/// Group results by `field`, keeping one head per group chosen by `sort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapse {
    pub field: String,
    pub sort: Sort,
}

/// Return up to `rows` further members of each collapsed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expand {
    pub rows: usize,
    pub sort: Sort,
}

/// One retrieval request against the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    /// Only documents due at or before this instant match
    pub due_before: DateTime<Utc>,
    /// Pagination offset
    pub start: usize,
    /// Pagination size
    pub rows: usize,
    pub collapse: Option<Collapse>,
    pub expand: Option<Expand>,
}

impl fmt::Display for StatusQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "q=*:*&fq={}:[* TO {}]&start={}&rows={}",
            NEXT_FETCH_DATE_FIELD,
            self.due_before.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.start,
            self.rows
        )?;
        if let Some(collapse) = &self.collapse {
            write!(
                f,
                "&fq={{!collapse field={} sort='{}'}}",
                collapse.field, collapse.sort
            )?;
        }
        if let Some(expand) = &self.expand {
            write!(
                f,
                "&expand=true&expand.rows={}&expand.sort={}",
                expand.rows, expand.sort
            )?;
        }
        Ok(())
    }
}

/// Further members of one collapsed group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionGroup {
    /// Value of the collapse field shared by the group
    pub key: String,
    pub documents: Vec<Document>,
}

/// Store answer to a [`StatusQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    /// Primary results, in store order
    pub results: Vec<Document>,
    /// Expansion groups in response order, when expansion was requested
    pub expanded: Option<Vec<ExpansionGroup>>,
}

/// Trait for status store clients.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Execute a single query.
    async fn query(&self, query: &StatusQuery) -> Result<QueryResponse>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<()>;
}

/// Acquires a status store connection from configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn StatusStore>>;
}

/// Read-only view of the URLs currently dispatched downstream.
///
/// Implementations must tolerate concurrent mutation by the ack path.
pub trait InFlight: Send + Sync {
    fn contains(&self, url: &str) -> bool;
}

/// Acknowledgement channel back into the scheduler and store.
pub trait AckSink: Send + Sync {
    /// Record that `url` has been handed to a downstream worker.
    fn mark_in_progress(&self, url: &str);

    fn ack_success(&self, id: &str);

    fn ack_failure(&self, id: &str);
}
