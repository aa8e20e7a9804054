// src/market/mod.rs
//! Market data seam: snapshot/technicals/history contracts plus the pure
//! indicator math shared by the HTTP implementation and the quant surface.

pub mod yahoo;

use async_trait::async_trait;

pub const RSI_PERIOD: usize = 14;
pub const TREND_SMA_WINDOW: usize = 200;

/// Fundamental snapshot for one instrument.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub price: Option<f64>,
    pub currency: String,
    pub sector: String,
    pub pe_ratio: Option<f64>,
    pub summary: String,
}

/// Latest technical readout derived from daily history.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Technicals {
    pub rsi: f64,
    pub trend: String,
    pub price: f64,
}

/// Daily history with indicator columns aligned; RSI warm-up rows dropped.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
    pub rsi: Vec<f64>,
}

impl PriceHistory {
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Provider of live market data. All methods signal "unavailable" with
/// `None`; callers substitute their own fallbacks.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn snapshot(&self, ticker: &str) -> Option<Snapshot>;
    async fn technicals(&self, ticker: &str) -> Option<Technicals>;
    async fn history(&self, ticker: &str) -> Option<PriceHistory>;
}

/// RSI over closes using simple moving averages of gains/losses. Entries
/// before the warm-up window are `None`; a flat window is `None` as well
/// (no meaningful ratio).
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut gains = vec![0.0f64; n];
    let mut losses = vec![0.0f64; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    for i in period..n {
        let lo = i + 1 - period;
        let avg_gain: f64 = gains[lo..=i].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[lo..=i].iter().sum::<f64>() / period as f64;
        out[i] = if avg_loss == 0.0 && avg_gain == 0.0 {
            None
        } else if avg_loss == 0.0 {
            Some(100.0)
        } else {
            Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
        };
    }
    out
}

/// Align closes/volumes with RSI and drop warm-up rows.
pub fn prepare_history(closes: Vec<f64>, volumes: Vec<f64>) -> Option<PriceHistory> {
    if closes.is_empty() || closes.len() != volumes.len() {
        return None;
    }
    let rsi = rsi_series(&closes, RSI_PERIOD);

    let mut out = PriceHistory::default();
    for ((close, volume), rsi) in closes.into_iter().zip(volumes).zip(rsi) {
        if let Some(r) = rsi {
            out.closes.push(close);
            out.volumes.push(volume);
            out.rsi.push(r);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Nominal trend from the last close against the long moving average.
/// Shorter histories fall back to the average of what is available.
pub fn trend_label(closes: &[f64]) -> &'static str {
    let last = match closes.last() {
        Some(v) => *v,
        None => return "Bearish (Downtrend)",
    };
    let window = closes.len().min(TREND_SMA_WINDOW);
    let sma = closes[closes.len() - window..].iter().sum::<f64>() / window as f64;
    if last > sma {
        "Bullish (Uptrend)"
    } else {
        "Bearish (Downtrend)"
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_needs_a_full_warmup_window() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        assert!(rsi_series(&closes, RSI_PERIOD).iter().all(|r| r.is_none()));
    }

    #[test]
    fn monotonic_rise_pins_rsi_at_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = rsi_series(&closes, RSI_PERIOD);
        assert_eq!(rsi[29], Some(100.0));
        assert!(rsi[13].is_none());
        assert!(rsi[14].is_some());
    }

    #[test]
    fn prepare_history_drops_warmup_rows() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let volumes = vec![1000.0; 40];
        let hist = prepare_history(closes, volumes).unwrap();
        assert_eq!(hist.len(), 40 - RSI_PERIOD);
        assert!(hist.rsi.iter().all(|r| (0.0..=100.0).contains(r)));
    }

    #[test]
    fn trend_follows_close_vs_average() {
        let rising: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        assert_eq!(trend_label(&rising), "Bullish (Uptrend)");
        let falling: Vec<f64> = (0..50).map(|i| 150.0 - i as f64).collect();
        assert_eq!(trend_label(&falling), "Bearish (Downtrend)");
    }
}
