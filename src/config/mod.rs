// src/config/mod.rs
//! Runtime configuration: environment-driven settings plus the feed-source
//! file loader.

pub mod feeds;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Key for the generation backend; startup fails without it.
    pub generation_api_key: String,
    pub generation_model: String,
    /// Key for the news search provider; empty disables search.
    pub search_api_key: String,
    /// Token + task id for the hosted social scrape task; absent disables
    /// the social loop.
    pub social_api_token: Option<String>,
    pub social_task_id: String,
    pub run_background_tasks: bool,
    pub social_interval_secs: u64,
    pub rss_interval_secs: u64,
    pub occupancy_interval_secs: u64,
    pub dedup_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let generation_api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is required (set it in the environment or .env)")?;

        Ok(Self {
            generation_api_key,
            generation_model: env_or("GEN_MODEL", "gpt-4o-mini"),
            search_api_key: env_or("SERPAPI_API_KEY", ""),
            social_api_token: std::env::var("APIFY_API_TOKEN").ok(),
            social_task_id: env_or("SOCIAL_TASK_ID", "arbi-watch"),
            run_background_tasks: env_or("RUN_BACKGROUND_TASKS", "1") != "0",
            social_interval_secs: env_parsed("SOCIAL_INTERVAL_SECS", 900),
            rss_interval_secs: env_parsed("RSS_INTERVAL_SECS", 300),
            occupancy_interval_secs: env_parsed("OCCUPANCY_INTERVAL_SECS", 1800),
            dedup_capacity: env_parsed("DEDUP_CAPACITY", 1000),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
