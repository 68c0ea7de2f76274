use llmgate_common::{
    AppConfig, GatewayError, MissingVectorPolicy, ProviderCredentials, Result,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::hashing::content_hash;
use crate::normalize::{EmbeddingPayload, TextPayload};
use crate::prompts::assemble_prompt;
use crate::retry::RetryPolicy;
use crate::transport::ResilientTransport;
use crate::types::{
    EmbedRequestBody, EmbeddingRecord, GenerationRequest, GenerationResult, TextRequestBody,
};

/// Transport and normalization knobs for a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-call timeout
    pub timeout: Duration,
    /// Retry policy for every call
    pub retry: RetryPolicy,
    /// Embedding responses without a vector field
    pub missing_vector: MissingVectorPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            missing_vector: MissingVectorPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            retry: RetryPolicy::from_settings(&config.retry),
            missing_vector: config.missing_vector,
        }
    }
}

/// Provider API client
///
/// Holds immutable credentials and the transport that owns the connection
/// pool. Dropping the client (or calling [`ProviderClient::shutdown`])
/// releases the pool.
#[derive(Debug)]
pub struct ProviderClient {
    credentials: ProviderCredentials,
    transport: ResilientTransport,
    missing_vector: MissingVectorPolicy,
}

impl ProviderClient {
    /// Create new provider client
    pub fn new(credentials: ProviderCredentials, options: ClientOptions) -> Result<Self> {
        let transport = ResilientTransport::new(options.timeout, options.retry)?;

        if credentials.api_key.is_none() {
            warn!("Provider client created without an API key; calls will fail");
        }
        info!(
            "Provider client initialized: text={} ({}), embed={} ({})",
            credentials.text_endpoint,
            credentials.text_model,
            credentials.embed_endpoint,
            credentials.embed_model
        );

        Ok(Self {
            credentials,
            transport,
            missing_vector: options.missing_vector,
        })
    }

    /// Create client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.provider.clone(), ClientOptions::from_config(config))
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    /// Bearer headers; fails before any I/O when no key is configured
    fn auth_headers(&self) -> Result<HeaderMap> {
        let api_key = self.credentials.require_api_key()?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| GatewayError::config("API key contains invalid header characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Generate text for a prompt with optional system message and context
    pub async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        let headers = self.auth_headers()?;

        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.credentials.text_model);
        let context = request.context_texts.as_deref().unwrap_or(&[]);
        let prompt = assemble_prompt(request.system_message.as_deref(), context, &request.prompt);

        debug!(
            "Sending generate request - Model: {}, Prompt length: {}, Context entries: {}",
            model,
            prompt.len(),
            context.len()
        );

        let body = TextRequestBody {
            model,
            prompt: &prompt,
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        };

        let response = self
            .transport
            .post(&self.credentials.text_endpoint, headers, &body)
            .await
            .map_err(|e| e.during("Text generation"))?;

        let payload = TextPayload::from_body(&response.body);
        if let TextPayload::Unparsed(_) = payload {
            debug!("Text response is not JSON, using raw body");
        }
        let (text, raw) = payload.into_parts();

        Ok(GenerationResult {
            text,
            raw,
            used_context: request.context_texts,
            used_system_message: request.system_message,
        })
    }

    /// Generate embedding for text, keyed by its content hash
    pub async fn generate_embedding(
        &self,
        text: &str,
        model: Option<&str>,
    ) -> Result<EmbeddingRecord> {
        let headers = self.auth_headers()?;

        let model = model.unwrap_or(&self.credentials.embed_model);
        let text_hash = content_hash(text);

        debug!(
            "Generating embedding - Model: {}, Text length: {}, Hash: {}",
            model,
            text.len(),
            text_hash
        );

        let body = EmbedRequestBody { model, text };

        let response = self
            .transport
            .post(&self.credentials.embed_endpoint, headers, &body)
            .await
            .map_err(|e| e.during("Embedding generation"))?;

        let embedding = EmbeddingPayload::from_body(&response.body)
            .and_then(|payload| payload.into_vector(self.missing_vector))
            .map_err(|e| e.during("Embedding generation"))?;

        if embedding.is_empty() {
            warn!("Provider returned no vector for hash {}", text_hash);
        } else {
            debug!("Received embedding - Dimension: {}", embedding.len());
        }

        Ok(EmbeddingRecord {
            text: text.to_string(),
            text_hash,
            embedding,
            model: model.to_string(),
        })
    }

    /// Release the connection pool
    pub fn shutdown(self) {
        self.transport.shutdown();
    }
}
