use async_trait::async_trait;
use llmgate_common::Result;
use llmgate_llm::EmbeddingRecord;

use crate::types::{NewSystemMessage, StoredEmbedding, SystemMessage};

/// Keyed storage for embeddings and system messages
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up an embedding by content hash
    async fn find_embedding_by_hash(&self, text_hash: &str) -> Result<Option<StoredEmbedding>>;

    /// Store an embedding; an existing row with the same hash is returned unchanged
    async fn insert_embedding(&self, record: EmbeddingRecord) -> Result<StoredEmbedding>;

    async fn get_embedding(&self, id: u64) -> Result<Option<StoredEmbedding>>;

    /// Newest first
    async fn list_embeddings(&self, skip: usize, limit: usize) -> Result<Vec<StoredEmbedding>>;

    /// Returns false when nothing was deleted
    async fn delete_embedding(&self, id: u64) -> Result<bool>;

    async fn create_system_message(&self, message: NewSystemMessage) -> Result<SystemMessage>;

    async fn get_system_message(&self, id: u64) -> Result<Option<SystemMessage>>;

    async fn list_system_messages(&self, skip: usize, limit: usize) -> Result<Vec<SystemMessage>>;

    /// Returns None when no message has this id
    async fn update_system_message(
        &self,
        id: u64,
        message: NewSystemMessage,
    ) -> Result<Option<SystemMessage>>;
}
