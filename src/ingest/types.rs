// src/ingest/types.rs
use anyhow::Result;

/// One raw item pulled from a feed or social source, before filtering.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub source_label: String, // e.g., "gCaptain", "Social"
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Pull the latest batch. Errors are isolated per source by the cycle
    /// runner; a failing provider contributes an empty batch.
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &str;
}
