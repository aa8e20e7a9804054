// src/occupancy.rs
//! "Popular times"-style occupancy index for a curated set of venues near
//! decision-making hubs. Simulation mode synthesizes plausible curves; a
//! real lookup path can replace it behind the same surface.

use std::sync::Mutex;

use chrono::Timelike;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct OccupancyTarget {
    pub id: String,
    pub name: String,
    /// Place query a real data path would search for.
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReading {
    pub name: String,
    pub status: &'static str,
    pub spike_pct: i64,
    pub live_value: u32,
    pub historical: Vec<u32>,
    pub current_hour: u32,
}

pub struct OccupancyService {
    targets: Vec<OccupancyTarget>,
    cache: Mutex<Vec<OccupancyReading>>,
}

impl OccupancyService {
    pub fn with_targets(targets: Vec<OccupancyTarget>) -> Self {
        Self {
            targets,
            cache: Mutex::new(Vec::new()),
        }
    }

    pub fn from_defaults() -> Self {
        let mk = |id: &str, name: &str, query: &str| OccupancyTarget {
            id: id.to_string(),
            name: name.to_string(),
            query: query.to_string(),
        };
        Self::with_targets(vec![
            mk(
                "pentagon",
                "DOMINO'S (PENTAGON)",
                "Domino's Pizza 2800 S Joyce St, Arlington, VA",
            ),
            mk(
                "wh_house",
                "PAPA JOHN'S (WHITE HOUSE)",
                "Papa John's Pizza 1300 L St NW, Washington, DC",
            ),
            mk(
                "cia_hq",
                "DOMINO'S (LANGLEY/CIA)",
                "Domino's Pizza 1432 Chain Bridge Rd, McLean, VA",
            ),
        ])
    }

    /// Recompute all readings and refresh the cache. Called by the polling
    /// loop; the HTTP handler reads the cached copy.
    pub async fn refresh(&self) -> Vec<OccupancyReading> {
        let hour = chrono::Utc::now().hour();
        let readings: Vec<OccupancyReading> = self
            .targets
            .iter()
            .map(|t| simulate_reading(&t.name, hour))
            .collect();
        *self.cache.lock().expect("occupancy mutex poisoned") = readings.clone();
        readings
    }

    /// Latest readings; computes a first batch when the loop has not run yet.
    pub async fn index(&self) -> Vec<OccupancyReading> {
        {
            let g = self.cache.lock().expect("occupancy mutex poisoned");
            if !g.is_empty() {
                return g.clone();
            }
        }
        self.refresh().await
    }
}

/// Synthesize one reading: a 24-hour baseline curve with an evening peak,
/// a live value for the current hour, and a spike classification. Targets
/// named PENTAGON get a deliberate anomaly for demo purposes.
fn simulate_reading(target_name: &str, current_hour: u32) -> OccupancyReading {
    let mut rng = rand::rng();

    let mut historical = Vec::with_capacity(24);
    for h in 0u32..24 {
        let base: u32 = match h {
            0..=9 => rng.random_range(5..=15),
            10..=15 => rng.random_range(20..=50),
            16..=19 => rng.random_range(50..=80),
            _ => rng.random_range(10..=30),
        };
        historical.push(base);
    }

    let baseline = historical[current_hour as usize].max(1);
    let live_value: u32 = if target_name.contains("PENTAGON") {
        (baseline * 4).min(100)
    } else {
        let jitter: f64 = rng.random_range(0.9..=1.1);
        (baseline as f64 * jitter).round() as u32
    };

    let spike_pct = ((live_value as i64 - baseline as i64) * 100) / baseline as i64;
    let status = if spike_pct > 100 {
        "SPIKE"
    } else if spike_pct > 20 {
        "BUSY"
    } else if spike_pct < -20 {
        "QUIET"
    } else {
        "NOMINAL"
    };

    OccupancyReading {
        name: target_name.to_string(),
        status,
        spike_pct,
        live_value,
        historical,
        current_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_have_full_day_curves_and_known_status() {
        let r = simulate_reading("PAPA JOHN'S (WHITE HOUSE)", 12);
        assert_eq!(r.historical.len(), 24);
        assert!(["SPIKE", "BUSY", "QUIET", "NOMINAL"].contains(&r.status));
        assert!(r.historical.iter().all(|v| *v <= 100));
    }

    #[test]
    fn pentagon_target_carries_the_demo_anomaly() {
        let r = simulate_reading("DOMINO'S (PENTAGON)", 18);
        assert!(r.live_value <= 100);
        assert!(r.spike_pct > 100 || r.live_value == 100);
    }

    #[tokio::test]
    async fn index_populates_cache_on_first_use() {
        let svc = OccupancyService::from_defaults();
        let first = svc.index().await;
        assert_eq!(first.len(), 3);
        let again = svc.index().await;
        assert_eq!(again.len(), 3);
    }
}
