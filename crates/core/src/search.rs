//! Retrieval oracle — web search with page contents.
//!
//! The research capabilities never talk to a search API directly; they go
//! through [`SearchProvider`] so a stub can stand in for the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SearchError;

/// How the search backend should pick results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Auto,
    Keyword,
    Neural,
}

/// Whether page contents should be fetched live instead of from cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    #[default]
    Fallback,
    Always,
    Never,
}

/// A single retrieval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,

    /// Number of results to return
    pub num_results: u32,

    #[serde(default)]
    pub kind: SearchKind,

    #[serde(default)]
    pub freshness: Freshness,

    /// Restrict results to these domains
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,

    /// Only return pages containing this text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_text: Vec<String>,

    /// Content category hint, e.g. "personal site"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// How many linked subpages to crawl per result
    #[serde(default)]
    pub subpages: u32,

    /// Keywords used to pick which subpages to crawl
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subpage_target: Vec<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, num_results: u32) -> Self {
        Self {
            query: query.into(),
            num_results,
            kind: SearchKind::Auto,
            freshness: Freshness::Fallback,
            include_domains: Vec::new(),
            include_text: Vec::new(),
            category: None,
            subpages: 0,
            subpage_target: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: SearchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn live(mut self) -> Self {
        self.freshness = Freshness::Always;
        self
    }

    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.include_text.push(text.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn subpages<I, S>(mut self, count: u32, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subpages = count;
        self.subpage_target = targets.into_iter().map(Into::into).collect();
        self
    }
}

/// One search result with its extracted page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub content: String,

    /// Backend-specific fields (author, published date, score, subpages)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError>;
}
