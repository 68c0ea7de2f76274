//! llmgate record store and gateway service
//!
//! Keeps system messages and embeddings keyed by content hash, and wires
//! them around the provider client (system message resolution,
//! dedup-then-generate embeddings).

mod memory;
mod service;
mod store;
mod types;

pub use memory::MemoryStore;
pub use service::{EmbedOutcome, GatewayReply, GatewayService};
pub use store::RecordStore;
pub use types::{NewSystemMessage, StoredEmbedding, SystemMessage};
