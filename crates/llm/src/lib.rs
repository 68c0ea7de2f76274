//! llmgate provider client
//!
//! Resilient HTTP transport, prompt assembly, response normalization and
//! content-addressed embedding generation for an external LLM provider.

mod client;
mod hashing;
mod llm_trait;
mod normalize;
mod prompts;
mod retry;
mod transport;
mod types;

pub use client::{ClientOptions, ProviderClient};
pub use hashing::content_hash;
pub use llm_trait::LlmProvider;
pub use normalize::{EmbeddingPayload, TextPayload};
pub use prompts::assemble_prompt;
pub use retry::{AttemptFailure, RetryPolicy};
pub use transport::{ProviderResponse, ResilientTransport};
pub use types::{
    EmbeddingRecord, GenerationRequest, GenerationResult, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
