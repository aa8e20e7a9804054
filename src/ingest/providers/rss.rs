// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedItem, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
}

/// RSS provider for one configured feed. Fixture mode parses a captured XML
/// document; HTTP mode downloads the feed with a bounded timeout.
pub struct RssProvider {
    label: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture(label: &str, content: &str) -> Self {
        Self {
            label: label.to_string(),
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_url(label: &str, url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("market-copilot/0.1")
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            label: label.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    fn parse_items(&self, xml: &str) -> Result<Vec<FeedItem>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let link = it.link.unwrap_or_default();
            if title.is_empty() || link.is_empty() {
                continue;
            }
            out.push(FeedItem {
                title,
                link,
                source_label: self.label.clone(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("rss get {url}"))?;
                if !resp.status().is_success() {
                    anyhow::bail!("rss feed {} returned {}", self.label, resp.status());
                }
                let body = resp.text().await.context("rss body")?;
                self.parse_items(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Feeds routinely embed bare HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
