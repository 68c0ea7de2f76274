use std::fmt;

/// Boxed underlying cause of a provider failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure class of a call to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection-level failure (DNS, refused, timeout)
    Transport,
    /// Provider answered with a non-success HTTP status
    UpstreamStatus,
    /// Provider answered with a body that could not be interpreted
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport failure"),
            Self::UpstreamStatus => write!(f, "upstream status"),
            Self::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Uniform wrapper for every provider-facing failure.
///
/// Callers only need to know that the upstream is unavailable; the kind,
/// status and detail are kept for logging and diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    kind: FailureKind,
    status: Option<u16>,
    detail: Option<String>,
    attempts: u32,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProviderError {
    /// Connection-level failure with its cause attached
    pub fn transport<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: FailureKind::Transport,
            status: None,
            detail: None,
            attempts: 1,
            message: format!("transport failure: {}", source),
            source: Some(Box::new(source)),
        }
    }

    /// Non-success status with the best-effort detail extracted from the body
    pub fn upstream_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind: FailureKind::UpstreamStatus,
            status: Some(status),
            message: format!("upstream returned {} - {}", status, detail),
            detail: Some(detail),
            attempts: 1,
            source: None,
        }
    }

    /// Body could not be interpreted
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        let msg = msg.into();
        Self {
            kind: FailureKind::MalformedResponse,
            status: None,
            detail: None,
            attempts: 1,
            message: format!("malformed response: {}", msg),
            source: None,
        }
    }

    /// Attach an underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Record how many attempts were made before giving up
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Prefix the message with the operation that failed
    pub fn during(mut self, operation: &str) -> Self {
        self.message = format!("{} failed: {}", operation, self.message);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// llmgate error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid credentials/configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream provider failure
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Provider failure, if this is one
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// HTTP status mapping for whatever boundary sits in front of the gateway
impl GatewayError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Provider(_) => 502,
            Self::Config(_) => 500,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }
}
