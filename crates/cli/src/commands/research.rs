//! `pitchscout research` — run the agent on one request.

use std::io::Write;
use std::sync::Arc;
use pitchscout_agent::{AgentEvent, AgentLoop, ProviderOracle, RunStatus, StepOutcome};
use pitchscout_config::AppConfig;
use pitchscout_research::default_registry;
use tokio::sync::mpsc;
use tracing::debug;

const DEFAULT_REQUEST: &str = "Please write an investment pitch for investing in the Tesla pin.";

/// Longest capability output echoed to the terminal.
const PREVIEW_CHARS: usize = 400;

pub async fn run(
    request: Option<String>,
    max_steps: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = max_steps {
        config.agent.max_steps = max;
        config.validate()?;
    }

    if !config.has_api_key() || config.search.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: Missing API keys.");
        eprintln!();
        eprintln!("  Set these environment variables:");
        eprintln!("    OPENAI_API_KEY (or PITCHSCOUT_API_KEY)   chat completions");
        eprintln!("    EXA_API_KEY                              web search");
        eprintln!();
        eprintln!("  Or add them to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = pitchscout_providers::build_provider(&config)?;
    let search = pitchscout_providers::build_search(&config)?;
    let registry = default_registry(super::research_clients(&config, provider.clone(), search))?;
    debug!(
        capabilities = registry.len(),
        decision_model = %config.models.decision,
        "Agent assembled"
    );

    let mut oracle =
        ProviderOracle::new(provider, &config.models.decision).with_temperature(config.temperature);
    if let Some(prompt) = &config.agent.system_prompt {
        oracle = oracle.with_system_prompt(prompt);
    }
    let agent = AgentLoop::new(Arc::new(oracle), Arc::new(registry))
        .with_max_steps(config.agent.max_steps);

    let request = request.unwrap_or_else(|| DEFAULT_REQUEST.to_string());
    let (tx, rx) = mpsc::channel(64);
    let (report, ()) = tokio::join!(agent.run(&request, tx), print_events(rx, json));
    let report = report?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!();
    if let RunStatus::BudgetExhausted { ceiling } = report.status {
        eprintln!();
        eprintln!("  Step ceiling ({ceiling}) reached; the answer above is partial.");
    }
    eprintln!(
        "  {} steps, {} failed",
        report.steps.len(),
        report.failed_steps()
    );
    Ok(())
}

async fn print_events(mut rx: mpsc::Receiver<AgentEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
            continue;
        }

        match event {
            AgentEvent::Chunk { content } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            AgentEvent::Decision {
                step,
                capability,
                arguments,
                ..
            } => {
                eprintln!();
                eprintln!("  [{step}] → {capability} {arguments}");
            }
            AgentEvent::StepResult {
                step,
                capability,
                outcome,
                duration_ms,
                ..
            } => match &outcome {
                StepOutcome::Success { .. } => {
                    eprintln!("  [{step}] ✓ {capability} ({duration_ms} ms)");
                    println!("{}", preview(&outcome.render()));
                }
                StepOutcome::Failure { message, .. } => {
                    eprintln!("  [{step}] ✗ {capability}: {message}");
                }
            },
            AgentEvent::Done { .. } => {}
            AgentEvent::Error { message } => {
                eprintln!();
                eprintln!("  ERROR: {message}");
            }
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
