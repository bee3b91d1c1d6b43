//! Local filesystem connector.
//!
//! Loads a JSON array of status documents into a [`MemoryStore`]. Used for
//! development runs of the CLI and for testing the connection lifecycle.
//!
//! ```json
//! [
//!   { "url": "https://example.com/", "nextFetchDate": "2026-01-01T00:00:00Z",
//!     "host": "example.com", "metadata.depth": "0" }
//! ]
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Document, StoreConfig};

use super::{Connector, MemoryStore, StatusStore};

/// Connects to a JSON document file on local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConnector;

impl LocalConnector {
    pub fn new() -> Self {
        Self
    }

    /// Connect and keep the concrete store type, for callers that mutate it.
    pub async fn open_store(&self, config: &StoreConfig) -> Result<Arc<MemoryStore>> {
        let target = config.path.display().to_string();
        let bytes = tokio::fs::read(&config.path)
            .await
            .map_err(|e| AppError::connection(&target, e))?;
        let docs: Vec<Document> =
            serde_json::from_slice(&bytes).map_err(|e| AppError::connection(&target, e))?;

        log::info!("Loaded {} status documents from {}", docs.len(), target);
        Ok(Arc::new(MemoryStore::from_documents(docs)))
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn StatusStore>> {
        let store: Arc<dyn StatusStore> = self.open_store(config).await?;
        Ok(store)
    }
}
