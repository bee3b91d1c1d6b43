// src/pipeline/poll.rs

//! Poll execution against the status store.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::PollError;
use crate::models::{Document, PollCursor};
use crate::storage::{StatusQuery, StatusStore};

use super::diversity::DiversityPolicy;
use super::query::QueryBuilder;

/// Flat candidate list produced by one successful poll.
#[derive(Debug, Clone)]
pub struct Candidates {
    /// Primary results followed by every expansion group's members
    pub documents: Vec<Document>,
    /// Number of primary results; expansions are not counted
    pub primary_hits: usize,
    /// Time spent in the store query
    pub elapsed: Duration,
}

/// Owns the cursor and diversity state and runs one query per poll.
#[derive(Debug, Clone)]
pub struct PollExecutor {
    builder: QueryBuilder,
    cursor: PollCursor,
    diversity: DiversityPolicy,
}

impl PollExecutor {
    pub fn new(builder: QueryBuilder, diversity: DiversityPolicy) -> Self {
        Self::with_cursor(builder, diversity, PollCursor::new())
    }

    /// Start from an existing cursor position.
    pub fn with_cursor(
        builder: QueryBuilder,
        diversity: DiversityPolicy,
        cursor: PollCursor,
    ) -> Self {
        Self {
            builder,
            cursor,
            diversity,
        }
    }

    /// Replace the cursor, e.g. to resume a saved position.
    pub fn resume(&mut self, cursor: PollCursor) {
        self.cursor = cursor;
    }

    pub fn cursor(&self) -> &PollCursor {
        &self.cursor
    }

    pub fn diversity(&self) -> &DiversityPolicy {
        &self.diversity
    }

    /// Issue exactly one query and flatten the response.
    ///
    /// The cursor only moves on success; a failed query leaves it untouched
    /// so the next tick retries the same window and offset.
    pub async fn poll(
        &mut self,
        store: &dyn StatusStore,
        now: DateTime<Utc>,
    ) -> Result<Candidates, PollError> {
        let query = self
            .builder
            .build(&mut self.cursor, &mut self.diversity, now);
        log::debug!("QUERY => {}", query);

        let started = Instant::now();
        let response = store.query(&query).await;
        let elapsed = started.elapsed();

        let response = response.map_err(|source| PollError::Query { elapsed, source })?;
        let primary_hits = response.results.len();

        let mut documents = response.results;
        if self.diversity.field().is_some() {
            if let Some(groups) = response.expanded {
                documents.extend(groups.into_iter().flat_map(|g| g.documents));
            }
        }

        self.cursor.advance(primary_hits);
        log_window(&query, &self.cursor);

        Ok(Candidates {
            documents,
            primary_hits,
            elapsed,
        })
    }
}

fn log_window(query: &StatusQuery, cursor: &PollCursor) {
    match cursor.window_upper_bound() {
        Some(_) => log::debug!(
            "Window {} advanced to offset {}",
            query.due_before,
            cursor.offset()
        ),
        None => log::debug!("Window {} exhausted, resetting cursor", query.due_before),
    }
}
