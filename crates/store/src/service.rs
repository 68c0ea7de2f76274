use llmgate_common::{GatewayError, ProviderError, Result};
use llmgate_llm::{content_hash, GenerationRequest, GenerationResult, LlmProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::RecordStore;
use crate::types::{StoredEmbedding, SystemMessage};

/// Generation result plus the stored system message that was applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayReply {
    #[serde(flatten)]
    pub result: GenerationResult,
    pub system_message: Option<SystemMessage>,
}

/// Stored embedding and whether it came from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedOutcome {
    #[serde(flatten)]
    pub embedding: StoredEmbedding,
    pub cached: bool,
}

/// Glue between the provider client and the record store
pub struct GatewayService {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RecordStore>,
}

impl GatewayService {
    pub fn new(provider: Arc<dyn LlmProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Generate text, resolving a stored system message by id first
    pub async fn generate(
        &self,
        mut request: GenerationRequest,
        system_message_id: Option<u64>,
    ) -> Result<GatewayReply> {
        let system_message = match system_message_id {
            Some(id) => Some(self.store.get_system_message(id).await?.ok_or_else(|| {
                GatewayError::not_found(format!("System message {} not found", id))
            })?),
            None => None,
        };

        if let Some(message) = &system_message {
            debug!("Applying system message '{}' (id={})", message.name, message.id);
            request.system_message = Some(message.content.clone());
        }

        let result = self.provider.generate_text(request).await?;

        Ok(GatewayReply {
            result,
            system_message,
        })
    }

    /// Embed text, reusing a stored vector when the content hash is known.
    ///
    /// The store is checked before the provider is called, so text that is
    /// already stored never costs a provider call.
    pub async fn embed(&self, text: &str, model: Option<&str>) -> Result<EmbedOutcome> {
        let text_hash = content_hash(text);

        if let Some(existing) = self.store.find_embedding_by_hash(&text_hash).await? {
            debug!("Embedding found in store: {}", text_hash);
            return Ok(EmbedOutcome {
                embedding: existing,
                cached: true,
            });
        }

        let record = self.provider.generate_embedding(text, model).await?;

        // An empty vector would otherwise be served from the store forever
        if record.embedding.is_empty() {
            return Err(ProviderError::malformed("provider returned an empty vector")
                .during("Embedding generation")
                .into());
        }

        let stored = self.store.insert_embedding(record).await?;
        info!("New embedding generated and stored: {}", stored.text_hash());

        Ok(EmbedOutcome {
            embedding: stored,
            cached: false,
        })
    }
}
