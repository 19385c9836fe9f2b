//! LLM and web search clients for PitchScout.
//!
//! Chat models implement `pitchscout_core::Provider`; the search backend
//! implements `pitchscout_core::SearchProvider`. Both are built from
//! `AppConfig` once at startup and handed to the agent as trait objects.

pub mod exa;
pub mod openai_compat;

use std::sync::Arc;
use pitchscout_config::AppConfig;
use pitchscout_core::error::{ProviderError, SearchError};
use pitchscout_core::provider::Provider;
use pitchscout_core::search::SearchProvider;

pub use exa::ExaSearch;
pub use openai_compat::OpenAiCompatProvider;

/// Build the chat-completions provider from configuration.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key: set PITCHSCOUT_API_KEY or OPENAI_API_KEY".into(),
        )
    })?;
    Ok(Arc::new(OpenAiCompatProvider::new(
        provider_name(&config.api_url),
        &config.api_url,
        api_key,
    )))
}

/// Build the search client from configuration.
pub fn build_search(config: &AppConfig) -> Result<Arc<dyn SearchProvider>, SearchError> {
    let api_key = config.search.api_key.clone().ok_or_else(|| {
        SearchError::AuthenticationFailed("no search API key: set EXA_API_KEY".into())
    })?;
    Ok(Arc::new(ExaSearch::new(
        &config.search.api_url,
        api_key,
        config.search.timeout_secs,
    )))
}

/// Name a provider after the host it points at.
fn provider_name(api_url: &str) -> &'static str {
    if api_url.contains("openrouter.ai") {
        "openrouter"
    } else if api_url.contains("api.openai.com") {
        "openai"
    } else if api_url.contains("localhost:11434") {
        "ollama"
    } else {
        "custom"
    }
}
