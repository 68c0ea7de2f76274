use chrono::{DateTime, Utc};
use llmgate_common::{GatewayError, Result};
use llmgate_llm::EmbeddingRecord;
use serde::{Deserialize, Serialize};

/// Stored embedding row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    /// Row ID
    pub id: u64,

    /// Text, hash, vector and model
    #[serde(flatten)]
    pub record: EmbeddingRecord,

    /// Timestamp when stored
    pub created_at: DateTime<Utc>,

    /// Timestamp of last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredEmbedding {
    pub fn text_hash(&self) -> &str {
        &self.record.text_hash
    }
}

/// Instruction text prepended to prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    /// Row ID
    pub id: u64,

    /// Unique name
    pub name: String,

    /// Message content
    pub content: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// System message fields supplied by callers on create/update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemMessage {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSystemMessage {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::invalid_input("System message name cannot be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(GatewayError::invalid_input(
                "System message content cannot be empty",
            ));
        }
        Ok(())
    }
}
