// src/pipeline/query.rs

//! Status query construction.

use chrono::{DateTime, Utc};

use crate::models::PollCursor;
use crate::storage::{Collapse, Expand, Sort, StatusQuery};

use super::diversity::DiversityPolicy;

/// Builds one [`StatusQuery`] per poll from the cursor and diversity policy.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    page_size: usize,
}

impl QueryBuilder {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Build the query for the next page of the cursor's window.
    ///
    /// Opens the window at `now` if the cursor has none, and advances the
    /// diversity policy when it contributes a collapse clause.
    pub fn build(
        &self,
        cursor: &mut PollCursor,
        diversity: &mut DiversityPolicy,
        now: DateTime<Utc>,
    ) -> StatusQuery {
        let due_before = cursor.ensure_window(now);

        let mut query = StatusQuery {
            due_before,
            start: cursor.offset(),
            rows: self.page_size,
            collapse: None,
            expand: None,
        };

        if let Some(bucket) = diversity.next_request() {
            query.collapse = Some(Collapse {
                field: bucket.field,
                sort: Sort::earliest_due(),
            });
            query.expand = Some(Expand {
                rows: bucket.rows,
                sort: Sort::earliest_due(),
            });
        }

        query
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(10)
    }
}
