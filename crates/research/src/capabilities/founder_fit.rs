use super::ResearchClients;
use async_trait::async_trait;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use schemars::JsonSchema;
use serde::Deserialize;

const INVESTOR_PROMPT: &str = "You are a partner at a VC fund looking to invest in a startup. \
Assess how well the founder's background fits the market the company operates in. \
Be specific about strengths, gaps and open questions.";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FounderFitQuery {
    pub founder_name: String,
    /// Everything known about the company so far
    pub company_info: String,
}

/// `assessFounderMarketFit`: one call to the reasoning model.
pub struct FounderMarketFit {
    clients: ResearchClients,
}

impl FounderMarketFit {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedCapability for FounderMarketFit {
    type Input = FounderFitQuery;
    type Output = String;
    const NAME: &'static str = "assessFounderMarketFit";

    fn description(&self) -> &str {
        "Assess the market fit of a founder"
    }

    async fn run(&self, input: FounderFitQuery) -> Result<String, CapabilityError> {
        let context = serde_json::json!({ "companyInfo": input.company_info });
        let prompt = format!(
            "<founder_name>{}</founder_name>\n\n<search_results>{context}</search_results>",
            input.founder_name
        );
        self.clients
            .reasoning
            .generate_text_with_system(Some(INVESTOR_PROMPT), &prompt)
            .await
            .map_err(|e| CapabilityError::execution(Self::NAME, e))
    }
}
