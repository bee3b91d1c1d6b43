//! Per-bucket diversity policy.
//!
//! When a bucket field is configured, each poll collapses results on that
//! field and expands every bucket to at most `bucket_size` members. With
//! [`BucketDecay::Shrink`] the size drops by one after every poll that uses
//! it; collapsing stops once the size reaches one.

use crate::models::{BucketDecay, PollerConfig};

/// Collapse/expand parameters for a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRequest {
    pub field: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiversityPolicy {
    field: Option<String>,
    bucket_size: usize,
    decay: BucketDecay,
}

impl DiversityPolicy {
    pub fn new(field: Option<String>, bucket_size: usize, decay: BucketDecay) -> Self {
        Self {
            field,
            bucket_size,
            decay,
        }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(
            config.bucket_field.clone(),
            config.bucket_max_size,
            config.bucket_decay,
        )
    }

    /// Policy that never collapses.
    pub fn disabled() -> Self {
        Self::new(None, 0, BucketDecay::Fixed)
    }

    /// The configured bucket field, ignoring blank values.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.trim().is_empty())
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Whether the next poll would collapse.
    pub fn is_active(&self) -> bool {
        self.field().is_some() && self.bucket_size > 1
    }

    /// Parameters for this poll, applying the decay afterwards.
    pub fn next_request(&mut self) -> Option<BucketRequest> {
        if !self.is_active() {
            return None;
        }
        let request = BucketRequest {
            field: self.field()?.to_string(),
            rows: self.bucket_size,
        };
        if self.decay == BucketDecay::Shrink {
            self.bucket_size -= 1;
        }
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_over(policy: &mut DiversityPolicy, polls: usize) -> Vec<Option<usize>> {
        (0..polls)
            .map(|_| policy.next_request().map(|r| r.rows))
            .collect()
    }

    #[test]
    fn shrinks_until_single_member_buckets() {
        let mut policy = DiversityPolicy::new(Some("host".into()), 5, BucketDecay::Shrink);
        assert_eq!(
            rows_over(&mut policy, 6),
            vec![Some(5), Some(4), Some(3), Some(2), None, None]
        );
        assert!(!policy.is_active());
        assert_eq!(policy.bucket_size(), 1);
    }

    #[test]
    fn fixed_decay_keeps_size() {
        let mut policy = DiversityPolicy::new(Some("host".into()), 3, BucketDecay::Fixed);
        assert_eq!(rows_over(&mut policy, 3), vec![Some(3), Some(3), Some(3)]);
    }

    #[test]
    fn blank_field_disables_collapse() {
        let mut policy = DiversityPolicy::new(Some("  ".into()), 5, BucketDecay::Shrink);
        assert!(policy.next_request().is_none());
        assert_eq!(policy.bucket_size(), 5);
        assert!(policy.field().is_none());
    }

    #[test]
    fn size_one_never_collapses() {
        let mut policy = DiversityPolicy::new(Some("host".into()), 1, BucketDecay::Shrink);
        assert!(policy.next_request().is_none());
        assert!(DiversityPolicy::disabled().next_request().is_none());
    }

    #[test]
    fn request_carries_field() {
        let mut policy = DiversityPolicy::new(Some("domain".into()), 2, BucketDecay::Shrink);
        assert_eq!(
            policy.next_request(),
            Some(BucketRequest {
                field: "domain".into(),
                rows: 2
            })
        );
    }
}
