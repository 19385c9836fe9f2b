//! Exa search client — the retrieval oracle.
//!
//! Calls `POST {base}/search` with page contents requested inline, so every
//! hit comes back with its extracted text (and crawled subpages when asked).

use async_trait::async_trait;
use pitchscout_core::error::SearchError;
use pitchscout_core::search::{SearchHit, SearchProvider, SearchQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub struct ExaSearch {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExaSearch {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn request_body(query: &SearchQuery) -> ApiSearchRequest<'_> {
        ApiSearchRequest {
            query: &query.query,
            num_results: query.num_results,
            kind: query.kind,
            category: query.category.as_deref(),
            include_domains: &query.include_domains,
            include_text: &query.include_text,
            contents: ApiContents {
                text: true,
                livecrawl: query.freshness,
                subpages: (query.subpages > 0).then_some(query.subpages),
                subpage_target: &query.subpage_target,
            },
        }
    }
}

#[async_trait]
impl SearchProvider for ExaSearch {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        debug!(query = %query.query, num_results = query.num_results, "Sending search request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&Self::request_body(query))
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(SearchError::AuthenticationFailed(
                "Invalid search API key".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Search backend returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let parsed: ApiSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed.results.into_iter().map(ApiResult::into_hit).collect())
    }
}

// --- Exa API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    kind: pitchscout_core::search::SearchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    include_domains: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    include_text: &'a [String],
    contents: ApiContents<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiContents<'a> {
    text: bool,
    livecrawl: pitchscout_core::search::Freshness,
    #[serde(skip_serializing_if = "Option::is_none")]
    subpages: Option<u32>,
    #[serde(skip_serializing_if = "is_empty")]
    subpage_target: &'a [String],
}

fn is_empty(values: &&[String]) -> bool {
    values.is_empty()
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    results: Vec<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiResult {
    fn into_hit(self) -> SearchHit {
        SearchHit {
            url: self.url,
            title: self.title,
            content: self.text.unwrap_or_default(),
            metadata: self.extra,
        }
    }
}
