use super::{CompanyQuery, ResearchClients};
use crate::fanout::SubQuery;
use async_trait::async_trait;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use pitchscout_core::search::SearchQuery;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundingRound {
    /// e.g. "Seed", "Series B"
    pub round: String,
    pub amount: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub lead_investors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProfile {
    /// Total funding raised to date, null if unknown
    pub total_raised: Option<String>,
    /// Most recent reported valuation, null if unknown
    pub latest_valuation: Option<String>,
    /// Reported revenue or revenue estimate, null if unknown
    pub revenue: Option<String>,
    pub funding_rounds: Vec<FundingRound>,
    pub investors: Vec<String>,
    /// The sources used
    pub sources: Vec<String>,
}

/// `getFinancialInformation`: news search and funding databases, merged.
pub struct FinancialInformation {
    clients: ResearchClients,
}

impl FinancialInformation {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedCapability for FinancialInformation {
    type Input = CompanyQuery;
    type Output = FinancialProfile;
    const NAME: &'static str = "getFinancialInformation";

    fn description(&self) -> &str {
        "Get financial information about a company"
    }

    async fn run(&self, input: CompanyQuery) -> Result<FinancialProfile, CapabilityError> {
        let company = &input.company_name;
        let report = self
            .clients
            .fanout()
            .run_all(vec![
                SubQuery::Search(
                    SearchQuery::new(format!("{company} funding round valuation revenue"), 5).live(),
                ),
                SubQuery::Search(
                    SearchQuery::new(format!("{company} funding"), 3)
                        .domains(["crunchbase.com", "pitchbook.com"]),
                ),
            ])
            .await;
        if report.all_failed() {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("no financial sources reachable for {company}"),
            ));
        }

        let instructions = format!(
            "The user has asked for the financial history of {company}. \
             Use null for figures the sources do not state."
        );
        Ok(self
            .clients
            .synthesizer()
            .merge(&instructions, &report.to_raw())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RoutedProvider, StubSearch};
    use std::sync::Arc;

    #[tokio::test]
    async fn partial_sources_are_enough() {
        let search = Arc::new(
            StubSearch::new()
                .fail("valuation")
                .hit("Acme funding", "https://crunchbase.com/organization/acme"),
        );
        let provider = Arc::new(RoutedProvider::new().reply(
            "Synthesize",
            r#"{"totalRaised": "$12M", "latestValuation": null, "revenue": null,
                "fundingRounds": [{"round": "Seed", "amount": "$2M", "date": "2021"}],
                "investors": ["Initech Ventures"], "sources": ["https://crunchbase.com/organization/acme"]}"#,
        ));
        let capability = FinancialInformation::new(ResearchClients::new(search.clone(), provider.clone()));

        let profile = capability
            .run(CompanyQuery {
                company_name: "Acme".into(),
            })
            .await
            .unwrap();
        assert_eq!(profile.total_raised.as_deref(), Some("$12M"));
        assert!(profile.latest_valuation.is_none());
        assert!(profile.funding_rounds[0].lead_investors.is_empty());

        let queries = search.recorded();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].include_domains, vec!["crunchbase.com", "pitchbook.com"]);

        let synth = provider.requests_containing("Synthesize");
        assert!(synth[0].messages[0].content.contains("connection reset"));
    }
}
