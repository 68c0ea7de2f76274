use crate::client::ProviderClient;
use crate::types::{EmbeddingRecord, GenerationRequest, GenerationResult};
use async_trait::async_trait;
use llmgate_common::Result;

/// Common trait for provider clients
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text from a request
    async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResult>;

    /// Generate embedding for text
    async fn generate_embedding(&self, text: &str, model: Option<&str>)
        -> Result<EmbeddingRecord>;
}

#[async_trait]
impl LlmProvider for ProviderClient {
    async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResult> {
        ProviderClient::generate_text(self, request).await
    }

    async fn generate_embedding(
        &self,
        text: &str,
        model: Option<&str>,
    ) -> Result<EmbeddingRecord> {
        ProviderClient::generate_embedding(self, text, model).await
    }
}
