// src/search/mod.rs
//! News search seam. The pipeline never fails on search problems: errors are
//! folded into an explanatory digest string instead of propagating.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_NEWS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub snippet: String,
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>>;
}

/// Render hits into the prompt-ready digest. Failures become a short
/// explanatory line so the context block stays well-formed.
pub async fn news_digest(search: &dyn NewsSearch, query: &str, limit: usize) -> String {
    match search.news(query, limit).await {
        Ok(items) if items.is_empty() => "No recent news found.".to_string(),
        Ok(items) => items
            .iter()
            .map(|n| format!("Title: {}\nSnippet: {}", n.title, n.snippet))
            .collect::<Vec<_>>()
            .join("\n\n"),
        Err(e) => {
            tracing::warn!(error = ?e, query, "news search failed");
            format!("Search Error: {e}")
        }
    }
}

/// News search over the SerpApi Google News engine.
pub struct SerpApiSearch {
    http: reqwest::Client,
    api_key: String,
}

impl SerpApiSearch {
    pub fn new(api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("market-copilot/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiBody {
    #[serde(default)]
    news_results: Vec<SerpApiNews>,
}

#[derive(Debug, Deserialize)]
struct SerpApiNews {
    title: Option<String>,
    snippet: Option<String>,
}

#[async_trait]
impl NewsSearch for SerpApiSearch {
    async fn news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>> {
        if self.api_key.is_empty() {
            anyhow::bail!("search api key not configured");
        }
        let resp = self
            .http
            .get("https://serpapi.com/search.json")
            .query(&[
                ("engine", "google_news"),
                ("q", query),
                ("hl", "en"),
                ("gl", "us"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("news search request")?;
        if !resp.status().is_success() {
            anyhow::bail!("news search returned {}", resp.status());
        }
        let body: SerpApiBody = resp.json().await.context("news search body")?;

        Ok(body
            .news_results
            .into_iter()
            .filter_map(|n| {
                let title = n.title?;
                Some(NewsItem {
                    title,
                    snippet: n.snippet.unwrap_or_default(),
                })
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch(Vec<NewsItem>);

    #[async_trait]
    impl NewsSearch for FixedSearch {
        async fn news(&self, _query: &str, limit: usize) -> Result<Vec<NewsItem>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct BrokenSearch;

    #[async_trait]
    impl NewsSearch for BrokenSearch {
        async fn news(&self, _query: &str, _limit: usize) -> Result<Vec<NewsItem>> {
            anyhow::bail!("upstream quota exhausted")
        }
    }

    #[tokio::test]
    async fn digest_joins_hits_with_blank_lines() {
        let s = FixedSearch(vec![
            NewsItem {
                title: "A".into(),
                snippet: "first".into(),
            },
            NewsItem {
                title: "B".into(),
                snippet: "second".into(),
            },
        ]);
        let d = news_digest(&s, "AAPL stock news", 5).await;
        assert_eq!(d, "Title: A\nSnippet: first\n\nTitle: B\nSnippet: second");
    }

    #[tokio::test]
    async fn digest_explains_empty_and_error_cases() {
        let empty = FixedSearch(Vec::new());
        assert_eq!(news_digest(&empty, "q", 5).await, "No recent news found.");

        let broken = BrokenSearch;
        let d = news_digest(&broken, "q", 5).await;
        assert!(d.starts_with("Search Error:"));
    }
}
