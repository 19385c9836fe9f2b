pub mod capabilities;
pub mod config_cmd;
pub mod research;

use pitchscout_config::AppConfig;
use pitchscout_core::provider::Provider;
use pitchscout_core::search::SearchProvider;
use pitchscout_research::ResearchClients;
use std::sync::Arc;

/// Research clients with the model roles from configuration.
pub fn research_clients(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchProvider>,
) -> ResearchClients {
    ResearchClients::new(search, provider)
        .with_fast_model(&config.models.fast)
        .with_synthesis_model(&config.models.synthesis)
        .with_reasoning_model(&config.models.reasoning)
        .with_max_tokens(config.max_tokens)
}
