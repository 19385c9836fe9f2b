use super::{CompanyQuery, ResearchClients};
use crate::fanout::SubQuery;
use async_trait::async_trait;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use pitchscout_core::search::SearchQuery;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Competitor {
    pub name: String,
    /// What the competitor offers and how it overlaps
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompetitorLandscape {
    pub competitors: Vec<Competitor>,
    /// The sources used
    pub sources: Vec<String>,
}

/// `getCompetitors`: web search and model knowledge, merged.
pub struct Competitors {
    clients: ResearchClients,
}

impl Competitors {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedCapability for Competitors {
    type Input = CompanyQuery;
    type Output = CompetitorLandscape;
    const NAME: &'static str = "getCompetitors";

    fn description(&self) -> &str {
        "Get competitors of a company"
    }

    async fn run(&self, input: CompanyQuery) -> Result<CompetitorLandscape, CapabilityError> {
        let company = &input.company_name;
        let report = self
            .clients
            .fanout()
            .run_all(vec![
                SubQuery::Search(SearchQuery::new(format!("{company} competitors"), 5).live()),
                SubQuery::complete(format!(
                    "List the main competitors of the following company and briefly \
                     describe what each of them offers.\n\n<company>{company}</company>"
                )),
            ])
            .await;
        if report.all_failed() {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("every source failed for {company}"),
            ));
        }

        let instructions = format!(
            "The user has asked for the competitive landscape of {company}. \
             Do not list {company} itself."
        );
        Ok(self
            .clients
            .synthesizer()
            .merge(&instructions, &report.to_raw())
            .await?)
    }
}
