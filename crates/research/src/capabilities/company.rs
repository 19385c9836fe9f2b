use super::{CompanyQuery, ResearchClients};
use crate::fanout::{Settled, settle_all};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use pitchscout_core::search::SearchQuery;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Merged company overview.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyProfile {
    pub description: String,
    /// The products offered by the company
    pub products: Vec<String>,
    /// The sources used
    pub sources: Vec<String>,
}

/// What the web branch extracts from search results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct WebFacts {
    description: String,
    /// The products offered by the company
    products: Vec<String>,
}

fn overview_prompt(company: &str) -> String {
    format!(
        "For the following company provide:\n\
         - a brief company description\n\
         - what do they sell / what products do they offer\n\n\
         <company>{company}</company>"
    )
}

/// `getCompanyInfo`: a model summary and a search-backed extraction, run
/// side by side and merged into one profile.
pub struct CompanyInfo {
    clients: ResearchClients,
}

impl CompanyInfo {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }

    async fn summary(&self, company: &str) -> Result<serde_json::Value, CapabilityError> {
        let text = self
            .clients
            .fast
            .generate_text(&overview_prompt(company))
            .await
            .map_err(|e| CapabilityError::execution(Self::NAME, e))?;
        Ok(serde_json::json!({ "description": text }))
    }

    async fn web_facts(&self, company: &str) -> Result<serde_json::Value, CapabilityError> {
        let query = SearchQuery::new(company, 5).live();
        let hits = self
            .clients
            .search
            .search(&query)
            .await
            .map_err(|e| CapabilityError::execution(Self::NAME, e))?;

        let prompt = format!(
            "{}\n\n<search_results>{}</search_results>",
            overview_prompt(company),
            serde_json::to_string(&hits).unwrap_or_default()
        );
        let facts: WebFacts = self.clients.fast.generate(&prompt).await?;
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        Ok(serde_json::json!({ "facts": facts, "urls": urls }))
    }
}

#[async_trait]
impl TypedCapability for CompanyInfo {
    type Input = CompanyQuery;
    type Output = CompanyProfile;
    const NAME: &'static str = "getCompanyInfo";

    fn description(&self) -> &str {
        "Get information about a company"
    }

    async fn run(&self, input: CompanyQuery) -> Result<CompanyProfile, CapabilityError> {
        let company = input.company_name.as_str();
        let branches: Vec<BoxFuture<'_, Result<serde_json::Value, CapabilityError>>> =
            vec![self.summary(company).boxed(), self.web_facts(company).boxed()];

        let settled: Vec<Settled<serde_json::Value>> = settle_all(branches)
            .await
            .into_iter()
            .map(Settled::from)
            .collect();
        if settled.iter().all(|s| !s.is_ok()) {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("every source failed for {company}"),
            ));
        }
        if settled.iter().any(|s| !s.is_ok()) {
            warn!(company, "Company lookup continuing with one source missing");
        }

        let instructions = format!("The user has asked for a detailed overview of {company}.");
        Ok(self.clients.synthesizer().merge(&instructions, &settled).await?)
    }
}
