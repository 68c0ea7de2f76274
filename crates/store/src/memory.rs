use async_trait::async_trait;
use chrono::Utc;
use llmgate_common::{GatewayError, Result};
use llmgate_llm::EmbeddingRecord;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::RecordStore;
use crate::types::{NewSystemMessage, StoredEmbedding, SystemMessage};

#[derive(Debug, Default)]
struct Tables {
    embeddings: BTreeMap<u64, StoredEmbedding>,
    hash_index: HashMap<String, u64>,
    messages: BTreeMap<u64, SystemMessage>,
    next_embedding_id: u64,
    next_message_id: u64,
}

impl Tables {
    fn name_taken(&self, name: &str, except: Option<u64>) -> bool {
        self.messages
            .values()
            .any(|m| m.name == name && Some(m.id) != except)
    }
}

/// In-process record store
///
/// Row ids are assigned in insertion order starting at 1. Contents live only
/// as long as the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get store statistics (embeddings, system messages)
    pub async fn stats(&self) -> (usize, usize) {
        let tables = self.tables.read().await;
        (tables.embeddings.len(), tables.messages.len())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_embedding_by_hash(&self, text_hash: &str) -> Result<Option<StoredEmbedding>> {
        let tables = self.tables.read().await;
        Ok(tables
            .hash_index
            .get(text_hash)
            .and_then(|id| tables.embeddings.get(id))
            .cloned())
    }

    async fn insert_embedding(&self, record: EmbeddingRecord) -> Result<StoredEmbedding> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .hash_index
            .get(&record.text_hash)
            .and_then(|id| tables.embeddings.get(id))
        {
            debug!("Embedding already stored for hash {}", record.text_hash);
            return Ok(existing.clone());
        }

        tables.next_embedding_id += 1;
        let stored = StoredEmbedding {
            id: tables.next_embedding_id,
            record,
            created_at: Utc::now(),
            updated_at: None,
        };

        tables
            .hash_index
            .insert(stored.record.text_hash.clone(), stored.id);
        tables.embeddings.insert(stored.id, stored.clone());

        info!(
            "Embedding stored: id={}, hash={}, dimension={}",
            stored.id,
            stored.record.text_hash,
            stored.record.embedding.len()
        );
        Ok(stored)
    }

    async fn get_embedding(&self, id: u64) -> Result<Option<StoredEmbedding>> {
        Ok(self.tables.read().await.embeddings.get(&id).cloned())
    }

    async fn list_embeddings(&self, skip: usize, limit: usize) -> Result<Vec<StoredEmbedding>> {
        let tables = self.tables.read().await;
        Ok(tables
            .embeddings
            .values()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_embedding(&self, id: u64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.embeddings.remove(&id) {
            Some(removed) => {
                tables.hash_index.remove(&removed.record.text_hash);
                info!("Embedding deleted: id={}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_system_message(&self, message: NewSystemMessage) -> Result<SystemMessage> {
        message.validate()?;
        let mut tables = self.tables.write().await;

        if tables.name_taken(&message.name, None) {
            return Err(GatewayError::conflict(format!(
                "System message '{}' already exists",
                message.name
            )));
        }

        tables.next_message_id += 1;
        let created = SystemMessage {
            id: tables.next_message_id,
            name: message.name,
            content: message.content,
            description: message.description,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.messages.insert(created.id, created.clone());

        info!("System message created: id={}, name={}", created.id, created.name);
        Ok(created)
    }

    async fn get_system_message(&self, id: u64) -> Result<Option<SystemMessage>> {
        Ok(self.tables.read().await.messages.get(&id).cloned())
    }

    async fn list_system_messages(&self, skip: usize, limit: usize) -> Result<Vec<SystemMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_system_message(
        &self,
        id: u64,
        message: NewSystemMessage,
    ) -> Result<Option<SystemMessage>> {
        message.validate()?;
        let mut tables = self.tables.write().await;

        if !tables.messages.contains_key(&id) {
            return Ok(None);
        }
        if tables.name_taken(&message.name, Some(id)) {
            return Err(GatewayError::conflict(format!(
                "System message '{}' already exists",
                message.name
            )));
        }

        let updated = tables.messages.get_mut(&id).map(|existing| {
            existing.name = message.name;
            existing.content = message.content;
            existing.description = message.description;
            existing.updated_at = Some(Utc::now());
            existing.clone()
        });

        debug!("System message updated: id={}", id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmgate_llm::content_hash;

    fn record(text: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            text: text.to_string(),
            text_hash: content_hash(text),
            embedding: vec![0.5, 0.25],
            model: "gemini-embed-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_hash() {
        let store = MemoryStore::new();
        let stored = store.insert_embedding(record("alpha")).await.unwrap();
        assert_eq!(stored.id, 1);

        let found = store
            .find_embedding_by_hash(&content_hash("alpha"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, stored);
        assert!(store
            .find_embedding_by_hash(&content_hash("beta"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_on_hash() {
        let store = MemoryStore::new();
        let first = store.insert_embedding(record("same")).await.unwrap();

        let mut again = record("same");
        again.embedding = vec![9.0];
        let second = store.insert_embedding(again).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.stats().await, (1, 0));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_delete() {
        let store = MemoryStore::new();
        for text in ["one", "two", "three"] {
            store.insert_embedding(record(text)).await.unwrap();
        }

        let listed = store.list_embeddings(0, 10).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|e| e.record.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two", "one"]);

        let page = store.list_embeddings(1, 1).await.unwrap();
        assert_eq!(page[0].record.text, "two");

        assert!(store.delete_embedding(2).await.unwrap());
        assert!(!store.delete_embedding(2).await.unwrap());
        assert!(store
            .find_embedding_by_hash(&content_hash("two"))
            .await
            .unwrap()
            .is_none());
        assert!(store.get_embedding(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_system_message_crud() {
        let store = MemoryStore::new();
        let created = store
            .create_system_message(NewSystemMessage::new("tutor", "Explain simply"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert!(created.updated_at.is_none());

        let fetched = store.get_system_message(1).await.unwrap().unwrap();
        assert_eq!(fetched.content, "Explain simply");

        let updated = store
            .update_system_message(
                1,
                NewSystemMessage::new("tutor", "Explain briefly").with_description("short"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "Explain briefly");
        assert_eq!(updated.description.as_deref(), Some("short"));
        assert!(updated.updated_at.is_some());

        assert!(store
            .update_system_message(42, NewSystemMessage::new("x", "y"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.list_system_messages(0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_system_message_names_are_unique() {
        let store = MemoryStore::new();
        store
            .create_system_message(NewSystemMessage::new("a", "first"))
            .await
            .unwrap();
        store
            .create_system_message(NewSystemMessage::new("b", "second"))
            .await
            .unwrap();

        let err = store
            .create_system_message(NewSystemMessage::new("a", "dup"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);

        let err = store
            .update_system_message(2, NewSystemMessage::new("a", "rename"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }
}
