//! Error types for the PitchScout domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them for callers that do not care which context failed.

use thiserror::Error;

/// The top-level error type for all PitchScout operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Retrieval errors ---
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the retrieval oracle.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Search authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Search network error: {0}")]
    Network(String),

    #[error("Malformed search response: {0}")]
    InvalidResponse(String),
}

/// The structured-extraction oracle produced something that does not fit
/// the requested schema, or could not be reached at all.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("extraction provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("extraction output does not match schema `{schema}`: {reason}")]
    SchemaMismatch { schema: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("Unknown capability: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {capability}: {reason}")]
    InvalidArguments { capability: String, reason: String },

    #[error("Capability execution failed: {capability} — {reason}")]
    ExecutionFailed { capability: String, reason: String },

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl CapabilityError {
    /// Shorthand for wrapping an oracle failure inside a capability.
    pub fn execution(capability: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExecutionFailed {
            capability: capability.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Capability already registered: {0}")]
    Duplicate(String),
}
