use super::ResearchClients;
use async_trait::async_trait;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const MEMO_PROMPT: &str = "You are a partner at a VC fund writing an investment memo for your \
partnership. Cover the company, the product, the market and competition, the team, the \
financials, the key risks and your recommendation. Only use facts from the research provided.";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PitchInputs {
    pub company_name: String,
    pub company_info: String,
    pub competitors: Vec<String>,
    pub founder_info: String,
    pub financial_info: String,
}

/// `generateInvestmentPitch`: writes the memo from research gathered so far.
pub struct InvestmentPitch {
    clients: ResearchClients,
}

impl InvestmentPitch {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedCapability for InvestmentPitch {
    type Input = PitchInputs;
    type Output = String;
    const NAME: &'static str = "generateInvestmentPitch";

    fn description(&self) -> &str {
        "Generate an investment pitch for a company"
    }

    async fn run(&self, input: PitchInputs) -> Result<String, CapabilityError> {
        let research = serde_json::json!({
            "companyInfo": input.company_info,
            "competitors": input.competitors,
            "founderInfo": input.founder_info,
            "financialInfo": input.financial_info,
        });
        let prompt = format!(
            "Write an investment pitch for <company>{}</company>.\n\n<research>{research}</research>",
            input.company_name
        );
        self.clients
            .reasoning
            .generate_text_with_system(Some(MEMO_PROMPT), &prompt)
            .await
            .map_err(|e| CapabilityError::execution(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RoutedProvider, StubSearch};
    use std::sync::Arc;

    #[tokio::test]
    async fn memo_carries_all_research() {
        let provider = Arc::new(RoutedProvider::new().reply("Write an investment pitch", "# Humane\nInvest."));
        let capability = InvestmentPitch::new(ResearchClients::new(Arc::new(StubSearch::new()), provider.clone()));

        let memo = capability
            .run(PitchInputs {
                company_name: "Humane".into(),
                company_info: "AI Pin maker".into(),
                competitors: vec!["Rabbit".into(), "Meta".into()],
                founder_info: "ex-Apple designers".into(),
                financial_info: "$230M raised".into(),
            })
            .await
            .unwrap();
        assert!(memo.starts_with("# Humane"));

        let requests = provider.requests.lock().unwrap();
        let prompt = &requests[0].messages[1].content;
        for needle in ["<company>Humane</company>", "AI Pin maker", "Rabbit", "ex-Apple", "$230M"] {
            assert!(prompt.contains(needle), "prompt missing {needle}");
        }
    }

    #[tokio::test]
    async fn rejects_missing_fields_at_the_boundary() {
        use pitchscout_core::capability::{Capability, Typed};

        let provider = Arc::new(RoutedProvider::new());
        let capability = Typed::new(InvestmentPitch::new(ResearchClients::new(Arc::new(StubSearch::new()), provider.clone())));

        let err = capability
            .execute(serde_json::json!({"companyName": "Humane"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments { .. }));
        assert!(provider.requests.lock().unwrap().is_empty());
    }
}
