pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use crate::config::{AppConfig, MissingVectorPolicy, ProviderCredentials, RetrySettings};
pub use crate::error::{FailureKind, GatewayError, ProviderError};
pub type Result<T> = std::result::Result<T, GatewayError>;
