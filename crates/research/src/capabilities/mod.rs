//! The research capabilities offered to the decision oracle.
//!
//! Every capability receives its oracle clients through [`ResearchClients`]
//! at construction; none of them holds global state.

mod company;
mod competitors;
mod financials;
mod founder_fit;
mod memo;
mod person;

pub use company::{CompanyInfo, CompanyProfile};
pub use competitors::{Competitor, CompetitorLandscape, Competitors};
pub use financials::{FinancialInformation, FinancialProfile, FundingRound};
pub use founder_fit::{FounderFitQuery, FounderMarketFit};
pub use memo::{InvestmentPitch, PitchInputs};
pub use person::{PersonInfo, PersonProfile, PersonQuery};

use crate::fanout::FanOut;
use crate::synth::Synthesizer;
use pitchscout_core::capability::{CapabilityRegistry, Typed};
use pitchscout_core::error::RegistryError;
use pitchscout_core::model::ModelClient;
use pitchscout_core::provider::Provider;
use pitchscout_core::search::SearchProvider;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Input shared by the company-level capabilities.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyQuery {
    pub company_name: String,
}

/// Oracle clients the capabilities are built from.
#[derive(Clone)]
pub struct ResearchClients {
    pub search: Arc<dyn SearchProvider>,
    /// Summaries and small extractions
    pub fast: ModelClient,
    /// Merging raw results
    pub synthesis: ModelClient,
    /// Founder assessment and memo writing
    pub reasoning: ModelClient,
}

impl ResearchClients {
    /// All three roles on one provider with the default model names.
    pub fn new(search: Arc<dyn SearchProvider>, provider: Arc<dyn Provider>) -> Self {
        let fast = ModelClient::new(provider, "gpt-4o-mini");
        Self {
            search,
            synthesis: fast.with_model("gpt-4o"),
            reasoning: fast.with_model("o3-mini"),
            fast,
        }
    }

    pub fn with_fast_model(mut self, model: impl Into<String>) -> Self {
        self.fast = self.fast.with_model(model);
        self
    }

    pub fn with_synthesis_model(mut self, model: impl Into<String>) -> Self {
        self.synthesis = self.synthesis.with_model(model);
        self
    }

    pub fn with_reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning = self.reasoning.with_model(model);
        self
    }

    /// Cap response length for every role.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.fast = self.fast.with_max_tokens(max);
        self.synthesis = self.synthesis.with_max_tokens(max);
        self.reasoning = self.reasoning.with_max_tokens(max);
        self
    }

    pub(crate) fn fanout(&self) -> FanOut {
        FanOut::new(self.search.clone(), self.fast.clone())
    }

    pub(crate) fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(self.synthesis.clone())
    }
}

/// Register the six research capabilities.
pub fn default_registry(clients: ResearchClients) -> Result<CapabilityRegistry, RegistryError> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Typed::boxed(CompanyInfo::new(clients.clone())))?;
    registry.register(Typed::boxed(Competitors::new(clients.clone())))?;
    registry.register(Typed::boxed(PersonInfo::new(clients.clone())))?;
    registry.register(Typed::boxed(FounderMarketFit::new(clients.clone())))?;
    registry.register(Typed::boxed(FinancialInformation::new(clients.clone())))?;
    registry.register(Typed::boxed(InvestmentPitch::new(clients)))?;
    Ok(registry)
}
