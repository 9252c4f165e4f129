use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::annotation::AnnotationId;
use crate::error::PersistenceError;
use crate::geometry::Region;

/// Durable record derived from a placed annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTranslation {
    pub id: AnnotationId,
    pub source_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub region: Region,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save(&self, record: SavedTranslation) -> Result<(), PersistenceError>;
    async fn get(&self, id: AnnotationId) -> Result<Option<SavedTranslation>, PersistenceError>;
    async fn list(&self) -> Result<Vec<SavedTranslation>, PersistenceError>;
    async fn delete(&self, id: AnnotationId) -> Result<(), PersistenceError>;
}

/// Process-local store keeping records in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<IndexMap<AnnotationId, SavedTranslation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn save(&self, record: SavedTranslation) -> Result<(), PersistenceError> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: AnnotationId) -> Result<Option<SavedTranslation>, PersistenceError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<SavedTranslation>, PersistenceError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: AnnotationId) -> Result<(), PersistenceError> {
        self.records
            .write()
            .await
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }
}
