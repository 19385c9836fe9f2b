use super::ResearchClients;
use crate::fanout::{Settled, SubQuery, settle_all};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use pitchscout_core::capability::TypedCapability;
use pitchscout_core::error::CapabilityError;
use pitchscout_core::search::{SearchHit, SearchKind, SearchQuery};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SOCIAL_DOMAINS: [&str; 2] = ["x.com", "twitter.com"];

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PersonQuery {
    pub name: String,
}

/// Three independent views of a person. Each carries its payload or the
/// error that branch hit.
#[derive(Debug, Clone, Serialize)]
pub struct PersonProfile {
    pub social: Settled<serde_json::Value>,
    pub background: Settled<serde_json::Value>,
    pub publications: Settled<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SocialHistory {
    username: Option<String>,
    tweets: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct Publications {
    website: Option<String>,
    page: Option<SearchHit>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TwitterHandle {
    /// The person's Twitter username without the leading @, or null if none is found
    username: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PersonalSite {
    /// The person's personal website, or null if none is found. Only the domain name, e.g. www.example.com
    url: Option<String>,
}

/// `getPersonInfo`: social history, professional background and personal
/// publications, gathered side by side.
pub struct PersonInfo {
    clients: ResearchClients,
}

impl PersonInfo {
    pub fn new(clients: ResearchClients) -> Self {
        Self { clients }
    }

    fn search_failed(e: impl std::fmt::Display) -> CapabilityError {
        CapabilityError::execution(Self::NAME, e)
    }

    async fn social(&self, name: &str) -> Result<serde_json::Value, CapabilityError> {
        let profiles = self
            .clients
            .search
            .search(
                &SearchQuery::new(format!("{name} Twitter (X) profile:"), 3)
                    .kind(SearchKind::Keyword)
                    .live()
                    .domains(SOCIAL_DOMAINS),
            )
            .await
            .map_err(Self::search_failed)?;

        let prompt = format!(
            "Please extract the Twitter username for {name} from the following text: {}",
            serde_json::to_string(&profiles).unwrap_or_default()
        );
        let handle: TwitterHandle = self.clients.fast.generate(&prompt).await?;
        let Some(username) = handle.username.filter(|u| !u.trim().is_empty()) else {
            debug!(person = name, "No Twitter username found");
            return to_value(SocialHistory {
                username: None,
                tweets: Vec::new(),
                note: Some(format!("Could not find Twitter username for {name}")),
            });
        };

        let tweets = self
            .clients
            .search
            .search(
                &SearchQuery::new(format!("tweets from:{username} -filter:replies"), 10)
                    .kind(SearchKind::Keyword)
                    .live()
                    .domains(SOCIAL_DOMAINS)
                    .containing(&username),
            )
            .await
            .map_err(Self::search_failed)?;

        to_value(SocialHistory {
            username: Some(username),
            tweets,
            note: None,
        })
    }

    async fn background(&self, name: &str) -> Result<serde_json::Value, CapabilityError> {
        let report = self
            .clients
            .fanout()
            .run_all(vec![
                SubQuery::complete(format!(
                    "Please provide a brief summary of the following person's background. \
                     <person_name>{name}</person_name>."
                )),
                SubQuery::Search(
                    SearchQuery::new(format!("{name} Linkedin profile"), 2)
                        .kind(SearchKind::Keyword)
                        .live()
                        .domains(["linkedin.com"]),
                ),
            ])
            .await;
        if report.all_failed() {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("no background source reachable for {name}"),
            ));
        }
        Ok(report.to_raw())
    }

    async fn publications(&self, name: &str) -> Result<serde_json::Value, CapabilityError> {
        let results = self
            .clients
            .search
            .search(
                &SearchQuery::new(format!("{name} website"), 4)
                    .kind(SearchKind::Keyword)
                    .live(),
            )
            .await
            .map_err(Self::search_failed)?;

        let prompt = format!(
            "From the following search results, extract the website URL of the following person \
             <person_name>{name}</person_name>.\n\n<search_results>{}</search_results>",
            serde_json::to_string(&results).unwrap_or_default()
        );
        let site: PersonalSite = self.clients.synthesis.generate(&prompt).await?;
        let Some(url) = site.url.filter(|u| !u.trim().is_empty()) else {
            debug!(person = name, "No personal website found");
            return to_value(Publications {
                website: None,
                page: None,
            });
        };

        let pages = self
            .clients
            .search
            .search(
                &SearchQuery::new(url.as_str(), 1)
                    .kind(SearchKind::Neural)
                    .category("personal site")
                    .live()
                    .subpages(2, ["blog", "posts", "writing"])
                    .domains([url.as_str()]),
            )
            .await
            .map_err(Self::search_failed)?;

        to_value(Publications {
            website: Some(url),
            page: pages.into_iter().next(),
        })
    }
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value, CapabilityError> {
    serde_json::to_value(value).map_err(|e| CapabilityError::execution(PersonInfo::NAME, e))
}

#[async_trait]
impl TypedCapability for PersonInfo {
    type Input = PersonQuery;
    type Output = PersonProfile;
    const NAME: &'static str = "getPersonInfo";

    fn description(&self) -> &str {
        "Get information (tweets, blog posts, linkedin profile) about a person"
    }

    async fn run(&self, input: PersonQuery) -> Result<PersonProfile, CapabilityError> {
        let name = input.name.as_str();
        let branches: Vec<BoxFuture<'_, Result<serde_json::Value, CapabilityError>>> = vec![
            self.social(name).boxed(),
            self.background(name).boxed(),
            self.publications(name).boxed(),
        ];

        let mut settled = settle_all(branches).await.into_iter().map(Settled::from);
        let mut next = || settled.next().unwrap_or_else(|| Settled::Failed("branch missing".into()));
        let profile = PersonProfile {
            social: next(),
            background: next(),
            publications: next(),
        };

        if !(profile.social.is_ok() || profile.background.is_ok() || profile.publications.is_ok()) {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("every source failed for {name}"),
            ));
        }
        Ok(profile)
    }
}
