// src/pipeline/materialize.rs

//! Turns candidate documents into crawl items.

use crate::models::{CrawlItem, Document, Metadata};
use crate::storage::InFlight;

/// Outcome of materializing one candidate list.
#[derive(Debug, Default)]
pub struct Materialized {
    /// Items in candidate order
    pub items: Vec<CrawlItem>,
    /// Candidates skipped because their URL is still in flight
    pub skipped_in_flight: usize,
    /// Candidates without a usable URL
    pub dropped: usize,
}

/// Copies prefixed document fields into item metadata.
#[derive(Debug, Clone)]
pub struct Materializer {
    prefix: String,
}

impl Materializer {
    /// Fields named `{metadata_prefix}.{key}` become metadata entries under `key`.
    pub fn new(metadata_prefix: &str) -> Self {
        Self {
            prefix: format!("{metadata_prefix}."),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build an item from a document, or `None` when it has no URL.
    pub fn item(&self, doc: &Document) -> Option<CrawlItem> {
        let url = doc.url()?;
        let mut metadata = Metadata::new();
        for (name, values) in doc.fields() {
            if let Some(key) = name.strip_prefix(self.prefix.as_str()) {
                for value in values {
                    metadata.add_value(key, value.as_str());
                }
            }
        }
        Some(CrawlItem::new(url, metadata))
    }

    /// Materialize every candidate whose URL is not in flight.
    pub fn materialize(&self, docs: &[Document], in_flight: &dyn InFlight) -> Materialized {
        let mut out = Materialized::default();
        for doc in docs {
            let Some(url) = doc.url() else {
                out.dropped += 1;
                continue;
            };
            if in_flight.contains(url) {
                out.skipped_in_flight += 1;
                continue;
            }
            if let Some(item) = self.item(doc) {
                out.items.push(item);
            }
        }
        out
    }
}
