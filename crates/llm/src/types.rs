use llmgate_common::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// Sampling temperature used when the caller does not pick one
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Output token limit used when the caller does not pick one
pub const DEFAULT_MAX_TOKENS: u32 = 512;

const MAX_TEMPERATURE: f64 = 2.0;

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,

    /// Model override (client default when absent)
    #[serde(default)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Resolved system message text
    #[serde(default)]
    pub system_message: Option<String>,

    /// Context snippets, inserted in order
    #[serde(default)]
    pub context_texts: Option<Vec<String>>,
}

impl GenerationRequest {
    /// Create request with default sampling settings
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_message: None,
            context_texts: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_context<I, S>(mut self, context: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_texts = Some(context.into_iter().map(Into::into).collect());
        self
    }

    /// Check bounds before anything is sent
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::invalid_input("Prompt cannot be empty"));
        }
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(GatewayError::invalid_input(format!(
                "Temperature must be between 0.0 and {}, got {}",
                MAX_TEMPERATURE, self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(GatewayError::invalid_input("max_tokens must be positive"));
        }
        Ok(())
    }
}

/// Wire payload for the text endpoint
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TextRequestBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// Wire payload for the embedding endpoint
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmbedRequestBody<'a> {
    pub model: &'a str,
    pub text: &'a str,
}

/// Text generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Normalized text
    pub text: String,

    /// Provider response as received (diagnostics only)
    pub raw: serde_json::Value,

    /// Context that was sent
    pub used_context: Option<Vec<String>>,

    /// System message that was sent
    pub used_system_message: Option<String>,
}

/// Embedding keyed by the content hash of its text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Source text
    pub text: String,

    /// SHA-256 of the text bytes, hex encoded
    pub text_hash: String,

    /// Vector values (may be empty, see `MissingVectorPolicy`)
    pub embedding: Vec<f32>,

    /// Model that produced the vector
    pub model: String,
}

impl EmbeddingRecord {
    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
