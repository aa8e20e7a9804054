// src/market/yahoo.rs
//! Market data over the public Yahoo Finance JSON endpoints. Failures of any
//! kind (network, HTTP status, shape) collapse to `None` per the trait
//! contract; details go to the logs only.

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    prepare_history, round2, trend_label, MarketData, PriceHistory, Snapshot, Technicals,
};

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";

pub struct YahooMarketData {
    http: reqwest::Client,
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooMarketData {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("market-copilot/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, url, "market data request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), url, "market data non-success");
            return None;
        }
        match resp.json::<T>().await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = ?e, url, "market data parse failed");
                None
            }
        }
    }
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn snapshot(&self, ticker: &str) -> Option<Snapshot> {
        let url = format!("{SUMMARY_BASE}/{ticker}?modules=price,summaryProfile,summaryDetail");
        let body: SummaryEnvelope = self.get_json(&url).await?;
        let result = body.quote_summary?.result?.into_iter().next()?;

        let price_block = result.price?;
        let price = price_block.regular_market_price.and_then(|w| w.raw);

        let profile = result.summary_profile.unwrap_or_default();
        let detail = result.summary_detail.unwrap_or_default();

        Some(Snapshot {
            price: price.map(round2),
            currency: price_block.currency.unwrap_or_else(|| "USD".to_string()),
            sector: profile.sector.unwrap_or_else(|| "N/A".to_string()),
            pe_ratio: detail.trailing_pe.and_then(|w| w.raw),
            summary: profile
                .long_business_summary
                .unwrap_or_else(|| "No summary available.".to_string()),
        })
    }

    async fn technicals(&self, ticker: &str) -> Option<Technicals> {
        let hist = self.history(ticker).await?;
        let last_close = *hist.closes.last()?;
        let last_rsi = *hist.rsi.last()?;
        Some(Technicals {
            rsi: round2(last_rsi),
            trend: trend_label(&hist.closes).to_string(),
            price: round2(last_close),
        })
    }

    async fn history(&self, ticker: &str) -> Option<PriceHistory> {
        let url = format!("{CHART_BASE}/{ticker}?range=1y&interval=1d");
        let body: ChartEnvelope = self.get_json(&url).await?;
        let result = body.chart?.result?.into_iter().next()?;
        let quote = result.indicators?.quote.into_iter().next()?;

        // Drop rows with missing close or volume, keeping columns aligned.
        let mut closes = Vec::with_capacity(quote.close.len());
        let mut volumes = Vec::with_capacity(quote.close.len());
        for (close, volume) in quote.close.into_iter().zip(quote.volume) {
            if let (Some(c), Some(v)) = (close, volume) {
                closes.push(c);
                volumes.push(v);
            }
        }
        prepare_history(closes, volumes)
    }
}

// --- wire shapes (only the fields we read) ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Option<ChartBody>,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: Option<SummaryBody>,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    price: Option<PriceBlock>,
    #[serde(rename = "summaryProfile")]
    summary_profile: Option<ProfileBlock>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<DetailBlock>,
}

#[derive(Debug, Deserialize)]
struct PriceBlock {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<RawValue>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileBlock {
    sector: Option<String>,
    #[serde(rename = "longBusinessSummary")]
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailBlock {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}
