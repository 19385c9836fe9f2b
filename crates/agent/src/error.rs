use pitchscout_core::error::ProviderError;
use thiserror::Error;

/// Failures that abort a run. Capability failures never end up here; they
/// are recorded as failed steps instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("decision oracle failed: {0}")]
    Oracle(#[from] ProviderError),

    #[error("decision oracle stream ended without a decision or final answer")]
    OracleStream,
}
