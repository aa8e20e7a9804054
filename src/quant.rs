// src/quant.rs
//! Volatility/density surface: a volume-weighted Gaussian KDE over a
//! price x RSI grid, serialized as plain JSON grids for client-side
//! rendering. Pure math lives in free functions; the engine only does I/O.

use std::sync::Arc;

use serde::Serialize;

use crate::market::{MarketData, PriceHistory};

pub const GRID_SIZE: usize = 40;
/// Fewer usable rows than this yields a placeholder figure.
pub const MIN_ROWS: usize = 30;

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceFigure {
    pub ticker: String,
    /// Price values, row-major GRID_SIZE x GRID_SIZE mesh.
    pub x: Vec<Vec<f64>>,
    /// RSI values, same mesh layout.
    pub y: Vec<Vec<f64>>,
    /// Density values.
    pub z: Vec<Vec<f64>>,
    pub colorscale: &'static str,
    /// Set only on placeholder figures (no data / numerical failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SurfaceFigure {
    fn placeholder(ticker: &str, message: String) -> Self {
        Self {
            ticker: ticker.to_string(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            colorscale: "Jet",
            message: Some(message),
        }
    }
}

pub struct QuantEngine {
    market: Arc<dyn MarketData>,
}

impl QuantEngine {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }

    pub async fn volatility_surface(&self, ticker: &str) -> SurfaceFigure {
        let hist = match self.market.history(ticker).await {
            Some(h) if h.len() >= MIN_ROWS => h,
            _ => return SurfaceFigure::placeholder(ticker, format!("NO DATA FOR {ticker}")),
        };

        match kde_surface(&hist, GRID_SIZE) {
            Some((x, y, z)) => SurfaceFigure {
                ticker: ticker.to_string(),
                x,
                y,
                z,
                colorscale: "Jet",
                message: None,
            },
            None => SurfaceFigure::placeholder(ticker, "MATH ERROR".to_string()),
        }
    }
}

type Mesh = Vec<Vec<f64>>;

/// Volume-weighted 2D Gaussian KDE over (close, rsi) evaluated on a
/// grid x grid mesh. Returns `None` when the sample covariance is singular
/// (e.g. all points identical) or otherwise numerically unusable.
pub fn kde_surface(hist: &PriceHistory, grid: usize) -> Option<(Mesh, Mesh, Mesh)> {
    let xs = &hist.closes;
    let ys = &hist.rsi;
    let n = xs.len();
    if n < 2 || grid < 2 {
        return None;
    }

    // Normalize volumes into weights summing to one.
    let max_vol = hist.volumes.iter().cloned().fold(f64::MIN, f64::max);
    if !(max_vol > 0.0) {
        return None;
    }
    let raw: Vec<f64> = hist.volumes.iter().map(|v| v / max_vol).collect();
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();

    // Weighted mean and covariance.
    let mean_x: f64 = xs.iter().zip(&weights).map(|(x, w)| x * w).sum();
    let mean_y: f64 = ys.iter().zip(&weights).map(|(y, w)| y * w).sum();
    let mut c_xx = 0.0;
    let mut c_xy = 0.0;
    let mut c_yy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        c_xx += weights[i] * dx * dx;
        c_xy += weights[i] * dx * dy;
        c_yy += weights[i] * dy * dy;
    }

    // Scott's rule with the effective sample size of the weights.
    let n_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();
    let scott = n_eff.powf(-1.0 / 6.0);
    let factor = scott * scott;
    let h_xx = c_xx * factor;
    let h_xy = c_xy * factor;
    let h_yy = c_yy * factor;

    let det = h_xx * h_yy - h_xy * h_xy;
    if !(det > 0.0) || !det.is_finite() {
        return None;
    }
    let inv_xx = h_yy / det;
    let inv_xy = -h_xy / det;
    let inv_yy = h_xx / det;
    let norm = 1.0 / (2.0 * std::f64::consts::PI * det.sqrt());

    // Evaluation grid spanning the observed ranges.
    let (x_min, x_max) = min_max(xs)?;
    let (y_min, y_max) = min_max(ys)?;
    let x_grid = linspace(x_min, x_max, grid);
    let y_grid = linspace(y_min, y_max, grid);

    let mut mesh_x = vec![vec![0.0; grid]; grid];
    let mut mesh_y = vec![vec![0.0; grid]; grid];
    let mut mesh_z = vec![vec![0.0; grid]; grid];
    for (i, gx) in x_grid.iter().enumerate() {
        for (j, gy) in y_grid.iter().enumerate() {
            let mut density = 0.0;
            for k in 0..n {
                let dx = gx - xs[k];
                let dy = gy - ys[k];
                let quad = dx * dx * inv_xx + 2.0 * dx * dy * inv_xy + dy * dy * inv_yy;
                density += weights[k] * (-0.5 * quad).exp();
            }
            mesh_x[i][j] = *gx;
            mesh_y[i][j] = *gy;
            mesh_z[i][j] = density * norm;
        }
    }

    Some((mesh_x, mesh_y, mesh_z))
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scattered_history(n: usize) -> PriceHistory {
        let mut h = PriceHistory::default();
        for i in 0..n {
            h.closes.push(100.0 + (i as f64 * 1.7) % 25.0);
            h.rsi.push(30.0 + (i as f64 * 3.1) % 40.0);
            h.volumes.push(1000.0 + (i as f64 * 13.0) % 500.0);
        }
        h
    }

    #[test]
    fn surface_has_grid_dimensions_and_positive_density() {
        let hist = scattered_history(60);
        let (x, y, z) = kde_surface(&hist, GRID_SIZE).unwrap();
        assert_eq!(x.len(), GRID_SIZE);
        assert_eq!(y[0].len(), GRID_SIZE);
        assert_eq!(z.len(), GRID_SIZE);
        assert!(z.iter().flatten().all(|v| v.is_finite() && *v >= 0.0));
        assert!(z.iter().flatten().any(|v| *v > 0.0));
    }

    #[test]
    fn identical_points_are_rejected_as_singular() {
        let mut h = PriceHistory::default();
        for _ in 0..40 {
            h.closes.push(100.0);
            h.rsi.push(50.0);
            h.volumes.push(1000.0);
        }
        assert!(kde_surface(&h, GRID_SIZE).is_none());
    }
}
