//! Pagination state carried across polls.

use chrono::{DateTime, Utc};

/// Offset into the current due-date window plus the window's upper bound.
///
/// A `None` bound means the next poll opens a fresh window anchored at "now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor {
    offset: usize,
    window_upper_bound: Option<DateTime<Utc>>,
}

impl PollCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned `offset` results into the window ending at `bound`.
    pub fn at(offset: usize, bound: DateTime<Utc>) -> Self {
        Self {
            offset,
            window_upper_bound: Some(bound),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn window_upper_bound(&self) -> Option<DateTime<Utc>> {
        self.window_upper_bound
    }

    /// Return the window bound, opening the window at `now` if none is set.
    pub fn ensure_window(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        *self.window_upper_bound.get_or_insert(now)
    }

    /// Record a successful poll that returned `hits` primary results.
    ///
    /// Zero hits means the window is exhausted and the cursor starts over.
    pub fn advance(&mut self, hits: usize) {
        if hits == 0 {
            self.reset();
        } else {
            self.offset += hits;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
