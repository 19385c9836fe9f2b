//! Fan-out aggregator.
//!
//! Runs independent sub-queries against the retrieval and generation
//! oracles at the same time and waits for every one of them. A failing
//! branch never cancels the others; its error is kept next to its query so
//! the caller can decide what to do with the gap. Output order always
//! matches input order, whatever order the branches finish in.

use futures::future::join_all;
use pitchscout_core::error::{ProviderError, SearchError};
use pitchscout_core::model::ModelClient;
use pitchscout_core::search::{SearchHit, SearchProvider, SearchQuery};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Await every branch concurrently and return all outcomes in input order.
///
/// No retry, no cancellation: the call returns once each branch has
/// produced a value or an error.
pub async fn settle_all<F, T, E>(branches: Vec<F>) -> Vec<Result<T, E>>
where
    F: Future<Output = Result<T, E>>,
{
    join_all(branches).await
}

/// One question for one oracle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "oracle", rename_all = "snake_case")]
pub enum SubQuery {
    /// Web search with page contents.
    Search(SearchQuery),
    /// Free-text generation.
    Complete { prompt: String },
}

impl SubQuery {
    pub fn complete(prompt: impl Into<String>) -> Self {
        Self::Complete {
            prompt: prompt.into(),
        }
    }

    /// Short label used when the result is shown to the synthesizer.
    pub fn label(&self) -> &str {
        match self {
            Self::Search(query) => &query.query,
            Self::Complete { .. } => "generation",
        }
    }
}

/// What a successful sub-query produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubResult {
    Hits(Vec<SearchHit>),
    Text(String),
}

#[derive(Debug, Clone, Error)]
pub enum FanOutError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Generation(#[from] ProviderError),
}

/// A settled branch as the synthesizer sees it: `{"result": ...}` or
/// `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Settled<T> {
    #[serde(rename = "result")]
    Ok(T),
    #[serde(rename = "error")]
    Failed(String),
}

impl<T, E: fmt::Display> From<Result<T, E>> for Settled<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

impl<T> Settled<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Summary of the branches that failed in a fan-out. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutPartialFailure {
    pub failed: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl fmt::Display for FanoutPartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} sub-queries failed: {}",
            self.failed,
            self.total,
            self.errors.join("; ")
        )
    }
}

/// Every sub-query with its outcome, in input order.
#[derive(Debug)]
pub struct FanOutReport {
    pub entries: Vec<(SubQuery, Result<SubResult, FanOutError>)>,
}

impl FanOutReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.failed() == self.entries.len()
    }

    /// `Some` when at least one branch failed.
    pub fn partial_failure(&self) -> Option<FanoutPartialFailure> {
        let errors: Vec<String> = self
            .entries
            .iter()
            .filter_map(|(query, result)| {
                result
                    .as_ref()
                    .err()
                    .map(|e| format!("{}: {e}", query.label()))
            })
            .collect();
        (!errors.is_empty()).then(|| FanoutPartialFailure {
            failed: errors.len(),
            total: self.entries.len(),
            errors,
        })
    }

    /// The raw bag handed to the synthesizer.
    pub fn to_raw(&self) -> serde_json::Value {
        let bag: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|(query, result)| {
                let settled: Settled<&SubResult> = result.as_ref().into();
                serde_json::json!({
                    "source": query.label(),
                    "outcome": settled,
                })
            })
            .collect();
        serde_json::Value::Array(bag)
    }

    pub fn into_results(self) -> Vec<Result<SubResult, FanOutError>> {
        self.entries.into_iter().map(|(_, r)| r).collect()
    }
}

/// Runs [`SubQuery`]s against injected oracle clients.
#[derive(Clone)]
pub struct FanOut {
    search: Arc<dyn SearchProvider>,
    model: ModelClient,
}

impl FanOut {
    pub fn new(search: Arc<dyn SearchProvider>, model: ModelClient) -> Self {
        Self { search, model }
    }

    pub async fn run_all(&self, queries: Vec<SubQuery>) -> FanOutReport {
        debug!(count = queries.len(), "Fanning out sub-queries");
        let results = settle_all(queries.iter().map(|q| self.run_one(q)).collect()).await;
        let report = FanOutReport {
            entries: queries.into_iter().zip(results).collect(),
        };
        if let Some(partial) = report.partial_failure() {
            warn!(
                failed = partial.failed,
                total = partial.total,
                "Fan-out finished with failures: {partial}"
            );
        }
        report
    }

    async fn run_one(&self, query: &SubQuery) -> Result<SubResult, FanOutError> {
        match query {
            SubQuery::Search(q) => Ok(SubResult::Hits(self.search.search(q).await?)),
            SubQuery::Complete { prompt } => Ok(SubResult::Text(self.model.generate_text(prompt).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RoutedProvider, StubSearch};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn settle_all_keeps_input_order() {
        let delays = [30u64, 10, 20];
        let branches: Vec<_> = delays
            .iter()
            .enumerate()
            .map(|(i, &ms)| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                if i == 1 { Err(format!("branch {i} failed")) } else { Ok(i) }
            })
            .collect();

        let results = settle_all(branches).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("branch 1 failed".to_string()));
        assert_eq!(results[2], Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn branches_run_concurrently() {
        let start = tokio::time::Instant::now();
        let branches: Vec<_> = (0..4)
            .map(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, String>(())
            })
            .collect();
        settle_all(branches).await;
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn run_all_tolerates_failures_in_order() {
        let search = Arc::new(
            StubSearch::new()
                .hit_after("slow", "https://slow.example", Duration::from_millis(50))
                .fail("broken")
                .hit_after("fast", "https://fast.example", Duration::from_millis(5)),
        );
        let model = ModelClient::new(Arc::new(RoutedProvider::new().reply("Summarize", "summary text")), "gpt-4o-mini");
        let fanout = FanOut::new(search, model);

        let report = fanout
            .run_all(vec![
                SubQuery::Search(SearchQuery::new("slow", 5)),
                SubQuery::Search(SearchQuery::new("broken", 5)),
                SubQuery::complete("Summarize Acme"),
                SubQuery::Search(SearchQuery::new("fast", 5)),
            ])
            .await;

        assert_eq!(report.len(), 4);
        let labels: Vec<&str> = report.entries.iter().map(|(q, _)| q.label()).collect();
        assert_eq!(labels, vec!["slow", "broken", "generation", "fast"]);

        assert!(matches!(&report.entries[0].1, Ok(SubResult::Hits(h)) if h[0].url == "https://slow.example"));
        assert!(matches!(&report.entries[1].1, Err(FanOutError::Search(_))));
        assert!(matches!(&report.entries[2].1, Ok(SubResult::Text(t)) if t == "summary text"));
        assert!(matches!(&report.entries[3].1, Ok(SubResult::Hits(_))));

        let partial = report.partial_failure().unwrap();
        assert_eq!(partial.failed, 1);
        assert_eq!(partial.total, 4);
        assert!(partial.errors[0].starts_with("broken:"));
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn all_branches_failing_is_reported_not_raised() {
        let search = Arc::new(StubSearch::new().fail("a").fail("b"));
        let model = ModelClient::new(Arc::new(RoutedProvider::new()), "gpt-4o-mini");
        let report = FanOut::new(search, model)
            .run_all(vec![
                SubQuery::Search(SearchQuery::new("a", 1)),
                SubQuery::Search(SearchQuery::new("b", 1)),
            ])
            .await;

        assert!(report.all_failed());
        assert_eq!(report.partial_failure().unwrap().failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn all_branches_succeeding_has_no_failure() {
        let search = Arc::new(
            StubSearch::new()
                .hit_after("news", "https://news.example", Duration::from_millis(40))
                .hit_after("crunchbase", "https://crunchbase.example", Duration::from_millis(10)),
        );
        let model = ModelClient::new(Arc::new(RoutedProvider::new().reply("Describe", "a description")), "gpt-4o-mini");
        let report = FanOut::new(search, model)
            .run_all(vec![
                SubQuery::Search(SearchQuery::new("news", 5)),
                SubQuery::complete("Describe Acme"),
                SubQuery::Search(SearchQuery::new("crunchbase", 3)),
            ])
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed(), 0);
        assert!(report.partial_failure().is_none());
        assert!(!report.all_failed());

        let results = report.into_results();
        assert!(matches!(&results[0], Ok(SubResult::Hits(h)) if h[0].url == "https://news.example"));
        assert!(matches!(&results[1], Ok(SubResult::Text(t)) if t == "a description"));
        assert!(matches!(&results[2], Ok(SubResult::Hits(h)) if h[0].url == "https://crunchbase.example"));
    }

    #[tokio::test]
    async fn empty_fanout_has_no_failure() {
        let search = Arc::new(StubSearch::new());
        let model = ModelClient::new(Arc::new(RoutedProvider::new()), "gpt-4o-mini");
        let report = FanOut::new(search, model).run_all(vec![]).await;
        assert!(report.is_empty());
        assert!(report.partial_failure().is_none());
        assert!(!report.all_failed());
    }

    #[test]
    fn raw_bag_marks_errors() {
        let report = FanOutReport {
            entries: vec![
                (SubQuery::complete("p"), Ok(SubResult::Text("hello".into()))),
                (
                    SubQuery::Search(SearchQuery::new("acme funding", 5)),
                    Err(FanOutError::Search(SearchError::Network("reset".into()))),
                ),
            ],
        };
        let raw = report.to_raw();
        assert_eq!(raw[0]["source"], "generation");
        assert_eq!(raw[0]["outcome"]["result"], "hello");
        assert_eq!(raw[1]["source"], "acme funding");
        assert!(raw[1]["outcome"]["error"].as_str().unwrap().contains("reset"));
    }
}
