// src/pipeline/poller.rs

//! Buffered frontier poller.
//!
//! Holds a FIFO buffer of crawl items and refills it from the status store
//! whenever it runs dry. One refill is one query: build, execute, flatten
//! expansions, skip in-flight URLs, buffer the rest.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::{PollError, Result};
use crate::models::{Config, CrawlItem, PollCursor, PollerConfig};
use crate::storage::{AckSink, Connector, InFlight, StatusStore};

use super::diversity::DiversityPolicy;
use super::materialize::Materializer;
use super::poll::PollExecutor;
use super::query::QueryBuilder;
use super::stats::{PollReport, QueryTimes};

pub struct FrontierPoller {
    store: Arc<dyn StatusStore>,
    in_flight: Arc<dyn InFlight>,
    acks: Arc<dyn AckSink>,
    executor: PollExecutor,
    materializer: Materializer,
    buffer: VecDeque<CrawlItem>,
    min_query_interval: Duration,
    last_query: Option<Instant>,
    query_times: QueryTimes,
    last_report: Option<PollReport>,
}

impl FrontierPoller {
    /// Validate `config`, connect to the status store and build a poller.
    ///
    /// Exactly one poller may run per status store: several instances would
    /// page through the same window and emit the same URLs. The orchestration
    /// layer enforces this through `runtime.instances`, which must be 1.
    ///
    /// Fails if the configuration is invalid or the store is unreachable.
    pub async fn open(
        config: &Config,
        connector: &dyn Connector,
        in_flight: Arc<dyn InFlight>,
        acks: Arc<dyn AckSink>,
    ) -> Result<Self> {
        config.validate()?;
        let store = connector.connect(&config.store).await.inspect_err(|e| {
            log::error!("Can't connect to status store: {}", e);
        })?;
        Ok(Self::new(store, &config.poller, in_flight, acks))
    }

    /// Build a poller over an already connected store.
    ///
    /// Same single-instance precondition as [`FrontierPoller::open`].
    pub fn new(
        store: Arc<dyn StatusStore>,
        config: &PollerConfig,
        in_flight: Arc<dyn InFlight>,
        acks: Arc<dyn AckSink>,
    ) -> Self {
        let executor = PollExecutor::new(
            QueryBuilder::new(config.max_results_per_poll),
            DiversityPolicy::from_config(config),
        );
        Self {
            store,
            in_flight,
            acks,
            executor,
            materializer: Materializer::new(&config.metadata_prefix),
            buffer: VecDeque::new(),
            min_query_interval: Duration::from_millis(config.min_query_interval_ms),
            last_query: None,
            query_times: QueryTimes::default(),
            last_report: None,
        }
    }

    /// Resume paging from a previously saved cursor.
    pub fn resume_from(mut self, cursor: PollCursor) -> Self {
        self.executor.resume(cursor);
        self
    }

    /// Release the store connection. Failures are logged, not returned.
    pub async fn close(self) {
        if let Err(e) = self.store.close().await {
            log::error!("Can't close connection to status store: {}", e);
        }
    }

    /// Next item to emit, refilling the buffer from the store if it is empty.
    ///
    /// `None` means no work is available on this tick.
    pub async fn next_item(&mut self) -> Option<CrawlItem> {
        if self.buffer.is_empty() && self.ready_to_query() {
            if let Err(e) = self.refill().await {
                log::error!("Exception while querying status store: {}", e);
            }
        }
        self.buffer.pop_front()
    }

    pub fn on_ack_success(&self, id: &str) {
        log::debug!("Ack for {}", id);
        self.acks.ack_success(id);
    }

    pub fn on_ack_failure(&self, id: &str) {
        log::info!("Fail for {}", id);
        self.acks.ack_failure(id);
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn cursor(&self) -> &PollCursor {
        self.executor.cursor()
    }

    pub fn diversity(&self) -> &DiversityPolicy {
        self.executor.diversity()
    }

    pub fn query_times(&self) -> &QueryTimes {
        &self.query_times
    }

    /// Summary of the most recent successful poll.
    pub fn last_report(&self) -> Option<PollReport> {
        self.last_report
    }

    fn ready_to_query(&self) -> bool {
        match self.last_query {
            Some(at) if !self.min_query_interval.is_zero() => {
                let ready = at.elapsed() >= self.min_query_interval;
                if !ready {
                    log::debug!(
                        "Skipping query, last one {:?} ago (min {:?})",
                        at.elapsed(),
                        self.min_query_interval
                    );
                }
                ready
            }
            _ => true,
        }
    }

    async fn refill(&mut self) -> std::result::Result<PollReport, PollError> {
        self.last_query = Some(Instant::now());
        let candidates = self.executor.poll(self.store.as_ref(), Utc::now()).await?;
        self.query_times.record(candidates.elapsed);

        let materialized = self
            .materializer
            .materialize(&candidates.documents, self.in_flight.as_ref());

        let report = PollReport {
            primary_hits: candidates.primary_hits,
            returned: candidates.documents.len(),
            skipped_in_flight: materialized.skipped_in_flight,
            dropped: materialized.dropped,
            buffered: materialized.items.len(),
            elapsed: candidates.elapsed,
        };
        self.buffer.extend(materialized.items);

        log::info!(
            "Status store returned {} results from {} buckets in {} msec including {} already being processed",
            report.returned,
            report.primary_hits,
            report.elapsed.as_millis(),
            report.skipped_in_flight
        );
        if report.dropped > 0 {
            log::debug!("Dropped {} documents without a url", report.dropped);
        }

        self.last_report = Some(report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{BucketDecay, Document, StoreConfig};
    use crate::storage::{InFlightRegistry, LocalConnector, MemoryStore};
    use chrono::{DateTime, TimeZone};
    use tempfile::TempDir;

    fn due(url: &str, host: &str) -> Document {
        Document::new()
            .with("url", url)
            .with("host", host)
            .with("nextFetchDate", "2020-01-01T00:00:00Z")
            .with("metadata.host", host)
    }

    fn poller_over(
        store: &Arc<MemoryStore>,
        config: &PollerConfig,
    ) -> (FrontierPoller, Arc<InFlightRegistry>) {
        let registry = Arc::new(InFlightRegistry::new());
        let poller = FrontierPoller::new(
            Arc::clone(store) as Arc<dyn StatusStore>,
            config,
            Arc::clone(&registry) as Arc<dyn InFlight>,
            Arc::clone(&registry) as Arc<dyn AckSink>,
        );
        (poller, registry)
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn fills_buffer_then_resets_on_empty_window() {
        let store = Arc::new(MemoryStore::from_documents(
            (0..8).map(|i| due(&format!("https://site{i}.example/"), "h")),
        ));
        let (mut poller, _) = poller_over(&store, &PollerConfig::default());

        let report = poller.refill().await.unwrap();
        assert_eq!(report.primary_hits, 8);
        assert_eq!(poller.buffered(), 8);
        assert_eq!(poller.cursor().offset(), 8);
        let bound = poller.cursor().window_upper_bound();
        assert!(bound.is_some());

        for i in 0..8 {
            let item = poller.next_item().await.unwrap();
            assert_eq!(item.url, format!("https://site{i}.example/"));
        }
        assert_eq!(store.received_queries().len(), 1);

        assert!(poller.next_item().await.is_none());
        assert_eq!(poller.buffered(), 0);
        assert_eq!(*poller.cursor(), PollCursor::new());
        assert_eq!(store.received_queries()[1].start, 8);
        assert_eq!(Some(store.received_queries()[1].due_before), bound);
    }

    #[tokio::test]
    async fn offset_accumulates_across_pages() {
        let store = Arc::new(MemoryStore::from_documents(
            (0..25).map(|i| due(&format!("https://p{i}.example/"), "h")),
        ));
        let (mut poller, _) = poller_over(&store, &PollerConfig::default());

        let mut expected_offset = 0;
        for hits in [10, 10, 5] {
            poller.refill().await.unwrap();
            expected_offset += hits;
            assert_eq!(poller.cursor().offset(), expected_offset);
            while poller.buffered() > 0 {
                poller.next_item().await;
            }
        }

        let bounds: Vec<_> = store
            .received_queries()
            .iter()
            .map(|q| q.due_before)
            .collect();
        assert!(bounds.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn in_flight_urls_are_not_buffered() {
        let store = Arc::new(MemoryStore::from_documents([
            due("https://a.example/", "a"),
            due("https://b.example/", "b"),
            due("https://c.example/", "c"),
        ]));
        let (mut poller, registry) = poller_over(&store, &PollerConfig::default());
        registry.mark_in_progress("https://b.example/");

        let report = poller.refill().await.unwrap();
        assert_eq!(report.returned, 3);
        assert_eq!(report.skipped_in_flight, 1);
        assert_eq!(report.buffered, 2);

        let first = poller.next_item().await.unwrap();
        let second = poller.next_item().await.unwrap();
        assert_eq!(first.url, "https://a.example/");
        assert_eq!(second.url, "https://c.example/");
        assert_eq!(first.metadata.get("host"), Some(&["a".to_string()][..]));
    }

    #[tokio::test]
    async fn query_failure_preserves_cursor_and_retries() {
        let store = Arc::new(MemoryStore::from_documents([due("https://a.example/", "a")]));
        store.fail_next_queries(1);
        let (poller, _) = poller_over(&store, &PollerConfig::default());
        let mut poller = poller.resume_from(PollCursor::at(30, t(1_700_000_000)));

        assert!(poller.next_item().await.is_none());
        assert_eq!(*poller.cursor(), PollCursor::at(30, t(1_700_000_000)));
        assert_eq!(poller.buffered(), 0);
        assert!(poller.last_report().is_none());

        let _ = poller.next_item().await;
        let queries = store.received_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].start, 30);
        assert_eq!(queries[1].due_before, t(1_700_000_000));
    }

    #[tokio::test]
    async fn bucket_size_shrinks_across_polls() {
        let store = Arc::new(MemoryStore::new());
        let config = PollerConfig {
            bucket_field: Some("host".into()),
            bucket_max_size: 5,
            ..PollerConfig::default()
        };
        let (mut poller, _) = poller_over(&store, &config);

        for _ in 0..6 {
            assert!(poller.next_item().await.is_none());
        }
        let sizes: Vec<Option<usize>> = store
            .received_queries()
            .iter()
            .map(|q| q.expand.as_ref().map(|e| e.rows))
            .collect();
        assert_eq!(sizes, vec![Some(5), Some(4), Some(3), Some(2), None, None]);
        assert!(!poller.diversity().is_active());
    }

    #[tokio::test]
    async fn expansions_follow_primary_results() {
        let store = Arc::new(MemoryStore::from_documents([
            due("https://a.example/1", "a"),
            due("https://a.example/2", "a"),
            due("https://b.example/1", "b"),
        ]));
        let config = PollerConfig {
            bucket_field: Some("host".into()),
            bucket_decay: BucketDecay::Fixed,
            ..PollerConfig::default()
        };
        let (mut poller, _) = poller_over(&store, &config);

        let report = poller.refill().await.unwrap();
        assert_eq!(report.primary_hits, 2);
        assert_eq!(report.returned, 3);
        assert_eq!(poller.cursor().offset(), 2);

        let mut urls = Vec::new();
        while poller.buffered() > 0 {
            urls.push(poller.next_item().await.unwrap().url);
        }
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[2], "https://a.example/2");
    }

    #[tokio::test]
    async fn min_query_interval_throttles_empty_polls() {
        let store = Arc::new(MemoryStore::new());
        let config = PollerConfig {
            min_query_interval_ms: 60_000,
            ..PollerConfig::default()
        };
        let (mut poller, _) = poller_over(&store, &config);

        assert!(poller.next_item().await.is_none());
        assert!(poller.next_item().await.is_none());
        assert_eq!(store.received_queries().len(), 1);
    }

    #[tokio::test]
    async fn new_window_sees_documents_added_between_polls() {
        let store = Arc::new(MemoryStore::new());
        let (mut poller, _) = poller_over(&store, &PollerConfig::default());

        assert!(poller.next_item().await.is_none());
        assert!(poller.cursor().window_upper_bound().is_none());

        store.upsert(due("https://late.example/", "late"));
        let item = poller.next_item().await.unwrap();
        assert_eq!(item.url, "https://late.example/");
        assert_eq!(poller.query_times().total_queries(), 2);
    }

    #[tokio::test]
    async fn acks_are_forwarded() {
        let store = Arc::new(MemoryStore::new());
        let (poller, registry) = poller_over(&store, &PollerConfig::default());
        registry.mark_in_progress("https://a.example/");
        registry.mark_in_progress("https://b.example/");

        poller.on_ack_success("https://a.example/");
        poller.on_ack_failure("https://b.example/");
        assert!(registry.is_empty());
        assert_eq!(poller.cursor().offset(), 0);
    }

    #[tokio::test]
    async fn open_fails_without_store() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            store: StoreConfig {
                path: tmp.path().join("missing.json"),
            },
            ..Config::default()
        };
        let registry = Arc::new(InFlightRegistry::new());

        let result = FrontierPoller::open(
            &config,
            &LocalConnector::new(),
            Arc::clone(&registry) as Arc<dyn InFlight>,
            registry as Arc<dyn AckSink>,
        )
        .await;
        assert!(matches!(result, Err(AppError::Connection { .. })));
    }

    #[tokio::test]
    async fn open_rejects_multiple_instances() {
        let mut config = Config::default();
        config.runtime.instances = 3;
        let registry = Arc::new(InFlightRegistry::new());

        let result = FrontierPoller::open(
            &config,
            &LocalConnector::new(),
            Arc::clone(&registry) as Arc<dyn InFlight>,
            registry as Arc<dyn AckSink>,
        )
        .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn open_and_close_local_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("status.json");
        std::fs::write(
            &path,
            r#"[{"url": "https://a.example/", "nextFetchDate": "2020-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let config = Config {
            store: StoreConfig { path },
            ..Config::default()
        };
        let registry = Arc::new(InFlightRegistry::new());

        let mut poller = FrontierPoller::open(
            &config,
            &LocalConnector::new(),
            Arc::clone(&registry) as Arc<dyn InFlight>,
            registry as Arc<dyn AckSink>,
        )
        .await
        .unwrap();
        assert_eq!(poller.next_item().await.unwrap().url, "https://a.example/");
        poller.close().await;
    }
}
