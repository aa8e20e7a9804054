// src/assistant/mod.rs
//! Query pipeline: extraction -> conditional enrichment -> generation.
//! Every stage contains its own failures; callers always get a well-formed
//! answer object.

pub mod backend;
pub mod prompts;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::assistant::backend::{strip_code_blocks, ResponseFormat, SharedBackend};
use crate::market::MarketData;
use crate::search::{news_digest, NewsSearch, DEFAULT_NEWS_LIMIT};

/// Answer text returned when the final generation call fails.
pub const GENERATION_FALLBACK: &str =
    "The assistant is temporarily unavailable. Please try again in a moment.";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("assistant_queries_total", "Queries run through the pipeline.");
        describe_counter!(
            "assistant_generation_errors_total",
            "Final generation calls that fell back to the error answer."
        );
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnswer {
    pub text: String,
    pub ticker: Option<String>,
}

/// Structured record the extraction stage asks the model for.
#[derive(Debug, Deserialize)]
struct ExtractedIntent {
    ticker: Option<String>,
    #[serde(default)]
    intent: String,
}

pub struct AssistantEngine {
    backend: SharedBackend,
    market: Arc<dyn MarketData>,
    search: Arc<dyn NewsSearch>,
}

impl AssistantEngine {
    pub fn new(
        backend: SharedBackend,
        market: Arc<dyn MarketData>,
        search: Arc<dyn NewsSearch>,
    ) -> Self {
        Self {
            backend,
            market,
            search,
        }
    }

    /// Run the full pipeline for one query. Never fails; at worst the answer
    /// text is [`GENERATION_FALLBACK`] with no ticker.
    pub async fn answer(&self, user_query: &str) -> QueryAnswer {
        ensure_metrics_described();
        counter!("assistant_queries_total").increment(1);

        // --- Stage 1: extraction (failure here is non-fatal) ---
        let ticker = self.extract_ticker(user_query).await;

        // --- Stage 2: enrichment, only with a detected ticker ---
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string();
        let (ticker, context_block) = match ticker {
            Some(raw) => {
                let t = raw.trim().to_uppercase();
                let block = self.build_context(&t, &now).await;
                (Some(t), block)
            }
            None => (None, String::new()),
        };

        // --- Stage 3: final generation ---
        let prompt = prompts::final_prompt(&now, &context_block, user_query);
        match self.backend.generate(&prompt, ResponseFormat::Text).await {
            Ok(text) => QueryAnswer { text, ticker },
            Err(e) => {
                tracing::warn!(error = ?e, backend = self.backend.name(), "generation failed");
                counter!("assistant_generation_errors_total").increment(1);
                QueryAnswer {
                    text: GENERATION_FALLBACK.to_string(),
                    ticker: None,
                }
            }
        }
    }

    async fn extract_ticker(&self, user_query: &str) -> Option<String> {
        let prompt = prompts::extraction_prompt(user_query);
        let raw = match self.backend.generate(&prompt, ResponseFormat::Json).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = ?e, "extraction call failed; proceeding without ticker");
                return None;
            }
        };
        let parsed: ExtractedIntent = match serde_json::from_str(strip_code_blocks(&raw)) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = ?e, "extraction result unparseable; proceeding without ticker");
                return None;
            }
        };
        tracing::debug!(intent = %parsed.intent, "extracted intent");
        parsed.ticker.filter(|t| !t.trim().is_empty())
    }

    /// Assemble the context block for a normalized ticker. All-or-nothing:
    /// without a fundamental snapshot, technicals and news are discarded and
    /// a single warning line stands in for the whole block.
    async fn build_context(&self, ticker: &str, now: &str) -> String {
        let news_query = format!("{ticker} stock news");
        let (snapshot, technicals, news) = tokio::join!(
            self.market.snapshot(ticker),
            self.market.technicals(ticker),
            news_digest(self.search.as_ref(), &news_query, DEFAULT_NEWS_LIMIT),
        );

        let Some(snapshot) = snapshot else {
            return format!(
                "WARNING: Could not fetch real-time data for {ticker}. \
                 It might be delisted or an unsupported instrument."
            );
        };

        let price = snapshot
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let (rsi, trend) = match &technicals {
            Some(t) => (t.rsi.to_string(), t.trend.clone()),
            None => ("N/A".to_string(), "N/A".to_string()),
        };

        format!(
            "--- LIVE MARKET DATA ---\n\
             Date: {now}\n\
             Ticker: {ticker}\n\
             Current Price: {price} {currency}\n\
             Sector: {sector}\n\
             \n\
             --- TECHNICAL INDICATORS ---\n\
             RSI (14): {rsi}\n\
             Trend (SMA200): {trend}\n\
             \n\
             --- LATEST NEWS ---\n\
             {news}",
            currency = snapshot.currency,
            sector = snapshot.sector,
        )
    }
}
