//! `pitchscout capabilities` — list what the agent can call.

use std::sync::Arc;
use pitchscout_config::AppConfig;
use pitchscout_providers::{ExaSearch, OpenAiCompatProvider};
use pitchscout_research::default_registry;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Listing never calls a service, so missing keys are fine here.
    let provider = Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        config.api_key.clone().unwrap_or_default(),
    ));
    let search = Arc::new(ExaSearch::new(
        &config.search.api_url,
        config.search.api_key.clone().unwrap_or_default(),
        config.search.timeout_secs,
    ));
    let registry = default_registry(super::research_clients(&config, provider, search))?;
    let definitions = registry.definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!();
    for def in &definitions {
        let fields: Vec<&str> = def.parameters["properties"]
            .as_object()
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        println!("  {:<26} {}", def.name, def.description);
        println!("  {:<26} ({})", "", fields.join(", "));
    }
    println!();
    println!("  {} capabilities, step ceiling {}", definitions.len(), config.agent.max_steps);
    Ok(())
}
