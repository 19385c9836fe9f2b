//! Scripted oracles for research tests.

use async_trait::async_trait;
use pitchscout_core::error::{ProviderError, SearchError};
use pitchscout_core::message::Message;
use pitchscout_core::provider::{Provider, ProviderRequest, ProviderResponse};
use pitchscout_core::search::{SearchHit, SearchProvider, SearchQuery};
use std::sync::Mutex;
use std::time::Duration;

/// A provider that answers by looking for a needle in the prompt.
///
/// The first rule whose needle appears in any message wins. A request no
/// rule matches fails with a 404 so missing scripts show up as errors.
pub struct RoutedProvider {
    rules: Vec<(String, Option<String>)>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl RoutedProvider {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.into(), Some(text.into())));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((needle.into(), None));
        self
    }

    /// Requests whose prompt contains `needle`.
    pub fn requests_containing(&self, needle: &str) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.messages.iter().any(|m| m.content.contains(needle)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Provider for RoutedProvider {
    fn name(&self) -> &str {
        "routed"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let rule = self
            .rules
            .iter()
            .find(|(needle, _)| request.messages.iter().any(|m| m.content.contains(needle.as_str())))
            .map(|(_, reply)| reply.clone());
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        match rule {
            Some(Some(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model,
            }),
            Some(None) => Err(ProviderError::Timeout("scripted failure".into())),
            None => Err(ProviderError::ApiError {
                status_code: 404,
                message: "no scripted reply".into(),
            }),
        }
    }
}

type SearchRule = (String, Result<Vec<SearchHit>, SearchError>, Duration);

/// A search backend keyed on substrings of the query text.
///
/// Unmatched queries return no hits.
pub struct StubSearch {
    rules: Vec<SearchRule>,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl StubSearch {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn hits(mut self, needle: &str, hits: Vec<SearchHit>) -> Self {
        self.rules.push((needle.into(), Ok(hits), Duration::ZERO));
        self
    }

    pub fn hit(self, needle: &str, url: &str) -> Self {
        self.hits(needle, vec![page(url, &format!("page about {needle}"))])
    }

    pub fn hit_after(mut self, needle: &str, url: &str, delay: Duration) -> Self {
        self.rules.push((needle.into(), Ok(vec![page(url, needle)]), delay));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((
            needle.into(),
            Err(SearchError::Network("connection reset".into())),
            Duration::ZERO,
        ));
        self
    }

    pub fn recorded(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.clone());
        let Some((_, result, delay)) = self
            .rules
            .iter()
            .find(|(needle, _, _)| query.query.contains(needle.as_str()))
        else {
            return Ok(Vec::new());
        };
        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        result.clone()
    }
}

pub fn page(url: &str, content: &str) -> SearchHit {
    SearchHit {
        url: url.into(),
        title: None,
        content: content.into(),
        metadata: serde_json::Map::new(),
    }
}
