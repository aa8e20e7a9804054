// src/ingest/providers/social.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedItem, SourceProvider};

const SOCIAL_LABEL: &str = "Social";

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: String,
}

/// Social-feed provider backed by a hosted scrape task. Running the task
/// synchronously returns the dataset items directly; the call can take many
/// seconds, hence the generous timeout.
pub struct SocialFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl SocialFeedProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_task(token: &str, task_id: &str) -> Self {
        let url = format!(
            "https://api.apify.com/v2/tasks/{task_id}/run-sync-get-dataset-items?token={token}"
        );
        let client = reqwest::Client::builder()
            .user_agent("market-copilot/0.1")
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            mode: Mode::Http { url, client },
        }
    }

    fn convert(posts: Vec<Post>) -> Vec<FeedItem> {
        posts
            .into_iter()
            .filter_map(|p| {
                let title = normalize_text(&p.text);
                if title.is_empty() || p.url.is_empty() {
                    return None;
                }
                Some(FeedItem {
                    title,
                    link: p.url,
                    source_label: SOCIAL_LABEL.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for SocialFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => {
                let posts: Vec<Post> = serde_json::from_str(s).context("parsing social fixture")?;
                Ok(Self::convert(posts))
            }
            Mode::Http { url, client } => {
                let resp = client.post(url).send().await.context("social task run")?;
                if !resp.status().is_success() {
                    anyhow::bail!("social task returned {}", resp.status());
                }
                let posts: Vec<Post> = resp.json().await.context("social task items")?;
                Ok(Self::convert(posts))
            }
        }
    }

    fn name(&self) -> &str {
        SOCIAL_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_parse_skips_items_without_text_or_url() {
        let json = r#"[
            {"text": "Navy intercepted a supertanker", "url": "https://x.com/a/status/1"},
            {"text": "", "url": "https://x.com/a/status/2"},
            {"text": "no url on this one"}
        ]"#;
        let p = SocialFeedProvider::from_fixture(json);
        let items = p.fetch_latest().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://x.com/a/status/1");
        assert_eq!(items[0].source_label, "Social");
    }
}
