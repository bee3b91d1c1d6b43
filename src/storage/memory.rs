//! In-memory [`StatusStore`] implementation for local runs and testing.
//!
//! Uses a `Vec` behind `std::sync::RwLock`. Queries are evaluated by a full
//! scan: due filter, earliest-due ordering, optional collapse/expand, then
//! pagination over the primary result list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::Document;

use super::{ExpansionGroup, QueryResponse, Sort, SortOrder, StatusQuery, StatusStore};

/// In-memory status store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
    queries: Mutex<Vec<StatusQuery>>,
    pending_failures: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `docs`; later documents replace earlier ones with the same URL.
    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for doc in docs {
            store.upsert(doc);
        }
        store
    }

    /// Insert a document, replacing any existing one with the same URL.
    pub fn upsert(&self, doc: Document) {
        let mut docs = self.docs.write().unwrap_or_else(|p| p.into_inner());
        match doc
            .url()
            .and_then(|url| docs.iter().position(|d| d.url() == Some(url)))
        {
            Some(idx) => docs[idx] = doc,
            None => docs.push(doc),
        }
    }

    /// Remove the document with `url`. Returns whether one was present.
    pub fn remove(&self, url: &str) -> bool {
        let mut docs = self.docs.write().unwrap_or_else(|p| p.into_inner());
        let before = docs.len();
        docs.retain(|d| d.url() != Some(url));
        docs.len() != before
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `count` queries fail with a store error.
    pub fn fail_next_queries(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Queries received so far, oldest first.
    pub fn received_queries(&self) -> Vec<StatusQuery> {
        self.queries.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn evaluate(&self, query: &StatusQuery) -> QueryResponse {
        let docs = self.docs.read().unwrap_or_else(|p| p.into_inner());

        let mut due: Vec<&Document> = docs
            .iter()
            .filter(|d| d.next_fetch_date().is_some_and(|at| at <= query.due_before))
            .collect();
        sort_by(&mut due, &Sort::earliest_due());

        let Some(collapse) = &query.collapse else {
            let results = page(&due, query.start, query.rows);
            return QueryResponse {
                results,
                expanded: None,
            };
        };

        // Documents lacking the collapse field are ignored.
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&Document>> = HashMap::new();
        for doc in &due {
            if let Some(key) = doc.first(&collapse.field) {
                groups
                    .entry(key)
                    .or_insert_with(|| {
                        order.push(key);
                        Vec::new()
                    })
                    .push(doc);
            }
        }
        for members in groups.values_mut() {
            sort_by(members, &collapse.sort);
        }

        let mut heads: Vec<&Document> = order.iter().map(|key| groups[key][0]).collect();
        sort_by(&mut heads, &Sort::earliest_due());
        let results = page(&heads, query.start, query.rows);

        let expanded = query.expand.as_ref().map(|expand| {
            results
                .iter()
                .filter_map(|head| {
                    let key = head.first(&collapse.field)?;
                    let mut rest: Vec<&Document> = groups[key][1..].to_vec();
                    sort_by(&mut rest, &expand.sort);
                    let documents: Vec<Document> =
                        rest.into_iter().take(expand.rows).cloned().collect();
                    (!documents.is_empty()).then(|| ExpansionGroup {
                        key: key.to_string(),
                        documents,
                    })
                })
                .collect()
        });

        QueryResponse { results, expanded }
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn query(&self, query: &StatusQuery) -> Result<QueryResponse> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::store("connection closed"));
        }
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(query.clone());
        if self.take_failure() {
            return Err(AppError::store("injected query failure"));
        }
        Ok(self.evaluate(query))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

type SortKey<'a> = (Option<DateTime<Utc>>, Option<&'a str>, Option<&'a str>);

fn sort_key<'a>(doc: &'a Document, sort: &Sort) -> SortKey<'a> {
    let raw = doc.first(&sort.field);
    let parsed = raw
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    (parsed, raw, doc.url())
}

fn sort_by(docs: &mut [&Document], sort: &Sort) {
    docs.sort_by(|a, b| {
        let ord = sort_key(a, sort).cmp(&sort_key(b, sort));
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn page(docs: &[&Document], start: usize, rows: usize) -> Vec<Document> {
    docs.iter().skip(start).take(rows).map(|d| (*d).clone()).collect()
}
