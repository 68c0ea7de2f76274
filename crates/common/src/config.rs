use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_TEXT_ENDPOINT: &str = "https://api.gemini.example/v1/generate";
const DEFAULT_EMBED_ENDPOINT: &str = "https://api.gemini.example/v1/embed";
const DEFAULT_TEXT_MODEL: &str = "gemini-1";
const DEFAULT_EMBED_MODEL: &str = "gemini-embed-1";

/// Provider credentials and endpoints
///
/// Immutable once a client has been built from it; use the `with_*`
/// methods to override individual values per instance.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCredentials {
    /// Bearer token sent to the provider
    pub api_key: Option<String>,

    /// Text generation endpoint (full URL)
    pub text_endpoint: String,

    /// Embedding endpoint (full URL)
    pub embed_endpoint: String,

    /// Default text generation model
    pub text_model: String,

    /// Default embedding model
    pub embed_model: String,
}

impl Default for ProviderCredentials {
    fn default() -> Self {
        Self {
            api_key: None,
            text_endpoint: DEFAULT_TEXT_ENDPOINT.to_string(),
            embed_endpoint: DEFAULT_EMBED_ENDPOINT.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("text_endpoint", &self.text_endpoint)
            .field("embed_endpoint", &self.embed_endpoint)
            .field("text_model", &self.text_model)
            .field("embed_model", &self.embed_model)
            .finish()
    }
}

impl ProviderCredentials {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_text_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.text_endpoint = endpoint.into();
        self
    }

    pub fn with_embed_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.embed_endpoint = endpoint.into();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// API key, or a configuration error when it is absent or blank
    pub fn require_api_key(&self) -> Result<&str, GatewayError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(GatewayError::config("PROVIDER_API_KEY is not configured")),
        }
    }
}

/// Retry settings for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_backoff_ms: u64,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: u32,

    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2,
            max_backoff_ms: 10_000,
        }
    }
}

/// What to do when an embedding response carries no vector field at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVectorPolicy {
    /// Return an empty vector; callers validate non-emptiness
    #[default]
    Empty,
    /// Fail with a malformed-response error
    Reject,
}

impl FromStr for MissingVectorPolicy {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "reject" => Ok(Self::Reject),
            other => Err(GatewayError::config(format!(
                "Unknown missing vector policy '{}' (expected 'empty' or 'reject')",
                other
            ))),
        }
    }
}

/// llmgate application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider credentials and endpoints
    pub provider: ProviderCredentials,

    /// Per-call timeout in seconds
    pub request_timeout_secs: u64,

    /// Retry settings
    pub retry: RetrySettings,

    /// Embedding responses without a vector field
    pub missing_vector: MissingVectorPolicy,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderCredentials::default(),
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            missing_vector: MissingVectorPolicy::default(),
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Callers load `.env` first (the CLI reads it from the project root).
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("PROVIDER_API_KEY").filter(|k| !k.trim().is_empty());
        let provider = ProviderCredentials {
            api_key,
            text_endpoint: lookup("PROVIDER_TEXT_ENDPOINT")
                .unwrap_or(defaults.provider.text_endpoint),
            embed_endpoint: lookup("PROVIDER_EMBED_ENDPOINT")
                .unwrap_or(defaults.provider.embed_endpoint),
            text_model: lookup("PROVIDER_TEXT_MODEL").unwrap_or(defaults.provider.text_model),
            embed_model: lookup("PROVIDER_EMBED_MODEL").unwrap_or(defaults.provider.embed_model),
        };

        let request_timeout_secs = match lookup("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => parse_number("PROVIDER_TIMEOUT_SECS", &raw)?,
            None => defaults.request_timeout_secs,
        };

        let mut retry = defaults.retry;
        if let Some(raw) = lookup("PROVIDER_MAX_ATTEMPTS") {
            retry.max_attempts = parse_number("PROVIDER_MAX_ATTEMPTS", &raw)?;
        }

        let missing_vector = match lookup("MISSING_VECTOR_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.missing_vector,
        };

        let config = Self {
            provider,
            request_timeout_secs,
            retry,
            missing_vector,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load layered configuration: optional file, then `LLMGATE_`-prefixed env vars
    ///
    /// Nested keys use a double underscore, e.g. `LLMGATE_PROVIDER__API_KEY`.
    /// A plain `PROVIDER_API_KEY` is used when neither layer sets a key.
    pub fn load(path: Option<&Path>) -> Result<Self, GatewayError> {
        let mut builder = ::config::Config::builder();
        if let Some(key) = std::env::var("PROVIDER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
        {
            builder = builder
                .set_default("provider.api_key", key)
                .map_err(|e| GatewayError::config(format!("Failed to load configuration: {}", e)))?;
        }
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("LLMGATE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to load configuration: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| GatewayError::config(format!("Invalid configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Per-call timeout
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration
    ///
    /// A missing API key is not a validation failure: it is reported as a
    /// configuration error by the first provider call instead.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for (name, url) in [
            ("text endpoint", &self.provider.text_endpoint),
            ("embedding endpoint", &self.provider.embed_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GatewayError::config(format!(
                    "Provider {} must start with http:// or https://",
                    name
                )));
            }
        }

        if self.provider.text_model.trim().is_empty() {
            return Err(GatewayError::config("Text model name cannot be empty"));
        }
        if self.provider.embed_model.trim().is_empty() {
            return Err(GatewayError::config("Embedding model name cannot be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(GatewayError::config("Request timeout cannot be 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(GatewayError::config("Retry attempts cannot be 0"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(GatewayError::config(
                "Initial backoff cannot exceed maximum backoff",
            ));
        }

        Ok(())
    }
}

/// Render a secret for logs: first four characters, rest hidden
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, GatewayError> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::config(format!("{} must be a number, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 1_000);
        assert_eq!(config.retry.max_backoff_ms, 10_000);
        assert_eq!(config.missing_vector, MissingVectorPolicy::Empty);
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_from_lookup_reads_provider_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PROVIDER_API_KEY", "sk-test-123456"),
            ("PROVIDER_TEXT_ENDPOINT", "http://localhost:9000/generate"),
            ("PROVIDER_TEXT_MODEL", "custom-model"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
            ("MISSING_VECTOR_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test-123456"));
        assert_eq!(config.provider.text_endpoint, "http://localhost:9000/generate");
        assert_eq!(config.provider.text_model, "custom-model");
        assert_eq!(config.provider.embed_model, DEFAULT_EMBED_MODEL);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.missing_vector, MissingVectorPolicy::Reject);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = AppConfig::from_lookup(lookup_from(&[("PROVIDER_API_KEY", "   ")])).unwrap();
        assert!(config.provider.api_key.is_none());
        assert!(config.provider.require_api_key().unwrap_err().is_config());
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = AppConfig::from_lookup(lookup_from(&[("PROVIDER_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.provider.embed_endpoint = "ftp://example".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.retry.max_attempts = 0;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "request_timeout_secs = 12\nlog_level = \"debug\"\n\n[provider]\napi_key = \"file-key-abcdef\"\ntext_model = \"file-model\"\n\n[retry]\nmax_attempts = 5"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.provider.api_key.as_deref(), Some("file-key-abcdef"));
        assert_eq!(config.provider.text_model, "file-model");
        assert_eq!(config.provider.text_endpoint, DEFAULT_TEXT_ENDPOINT);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.max_backoff_ms, 10_000);
    }

    #[test]
    fn test_load_reads_prefixed_env_vars() {
        // Keys not asserted by test_load_from_file, which runs concurrently
        std::env::set_var("LLMGATE_PROVIDER__EMBED_MODEL", "env-embed-model");
        std::env::set_var("LLMGATE_LOG_DIR", "/tmp/llmgate-env-logs");

        let config = AppConfig::load(None);

        std::env::remove_var("LLMGATE_PROVIDER__EMBED_MODEL");
        std::env::remove_var("LLMGATE_LOG_DIR");

        let config = config.unwrap();
        assert_eq!(config.provider.embed_model, "env-embed-model");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/llmgate-env-logs"));
        assert_eq!(config.provider.text_model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn test_load_falls_back_to_plain_api_key() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[provider]\ntext_model = \"fallback-model\"").unwrap();

        std::env::set_var("PROVIDER_API_KEY", "plain-env-key-123");
        let config = AppConfig::load(Some(file.path()));
        std::env::remove_var("PROVIDER_API_KEY");

        let config = config.unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("plain-env-key-123"));
        assert_eq!(config.provider.text_model, "fallback-model");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let creds = ProviderCredentials::default().with_api_key("sk-very-secret-key");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("sk-very-secret-key"));
        assert!(rendered.contains("sk-v****"));
    }

    #[test]
    fn test_mask_secret_short() {
        assert_eq!(mask_secret("abc"), "****");
    }
}
