//! Per-poll observations.

use std::collections::VecDeque;
use std::time::Duration;

/// Number of latency samples kept by default.
pub const DEFAULT_LATENCY_WINDOW: usize = 32;

/// Summary of one refill attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Primary results (one per bucket when collapsing)
    pub primary_hits: usize,
    /// Documents returned including expansions
    pub returned: usize,
    /// Candidates skipped because they are in flight
    pub skipped_in_flight: usize,
    /// Candidates without a usable URL
    pub dropped: usize,
    /// Items appended to the buffer
    pub buffered: usize,
    /// Time spent in the store query
    pub elapsed: Duration,
}

/// Rolling window of recent query latencies.
#[derive(Debug, Clone)]
pub struct QueryTimes {
    capacity: usize,
    samples: VecDeque<Duration>,
    total_queries: u64,
}

impl QueryTimes {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            total_queries: 0,
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.total_queries = self.total_queries.saturating_add(1);
    }

    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Mean over the retained window.
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: Duration = self.samples.iter().sum();
        Some(sum / self.samples.len() as u32)
    }

    /// Queries recorded since creation, including evicted samples.
    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }
}

impl Default for QueryTimes {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_sample() {
        let mut times = QueryTimes::new(2);
        times.record(Duration::from_millis(10));
        times.record(Duration::from_millis(20));
        times.record(Duration::from_millis(40));

        assert_eq!(times.last(), Some(Duration::from_millis(40)));
        assert_eq!(times.average(), Some(Duration::from_millis(30)));
        assert_eq!(times.total_queries(), 3);
    }

    #[test]
    fn empty_window_has_no_average() {
        assert!(QueryTimes::default().average().is_none());
    }
}
