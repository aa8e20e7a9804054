//! Market Copilot — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and the
//! background intelligence loops.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_copilot::api::{self, AppState};
use market_copilot::assistant::backend::build_backend;
use market_copilot::assistant::AssistantEngine;
use market_copilot::config::{feeds, AppConfig};
use market_copilot::ingest::providers::rss::RssProvider;
use market_copilot::ingest::providers::social::SocialFeedProvider;
use market_copilot::ingest::scheduler::{self, RSS_MARKER, SOCIAL_MARKER};
use market_copilot::ingest::types::SourceProvider;
use market_copilot::ingest::CyclePolicy;
use market_copilot::market::{yahoo::YahooMarketData, MarketData};
use market_copilot::metrics::Metrics;
use market_copilot::occupancy::OccupancyService;
use market_copilot::quant::QuantEngine;
use market_copilot::search::{NewsSearch, SerpApiSearch};
use market_copilot::store::ConversationStore;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - COPILOT_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("COPILOT_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = AppConfig::from_env().expect("Failed to load configuration");
    let metrics = Metrics::init(cfg.dedup_capacity as u64);

    // --- Shared engines (collaborators injected, never ambient) ---
    let store = Arc::new(ConversationStore::new());
    let backend = build_backend(&cfg.generation_api_key, &cfg.generation_model);
    let market: Arc<dyn MarketData> = Arc::new(YahooMarketData::new());
    let search: Arc<dyn NewsSearch> = Arc::new(SerpApiSearch::new(&cfg.search_api_key));
    let assistant = Arc::new(AssistantEngine::new(backend, market.clone(), search));
    let quant = Arc::new(QuantEngine::new(market));
    let occupancy = Arc::new(OccupancyService::from_defaults());

    // --- Background intelligence loops ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if cfg.run_background_tasks {
        let sources = feeds::load_feeds_default().expect("Failed to load feed sources");
        let rss_providers: Vec<Box<dyn SourceProvider>> = sources
            .iter()
            .map(|f| Box::new(RssProvider::from_url(&f.label, &f.url)) as Box<dyn SourceProvider>)
            .collect();
        let _rss = scheduler::spawn_ingest_loop(
            "rss",
            Duration::from_secs(cfg.rss_interval_secs),
            rss_providers,
            CyclePolicy::TrustedFeeds,
            RSS_MARKER,
            cfg.dedup_capacity,
            store.clone(),
            shutdown_rx.clone(),
        );

        if let Some(token) = &cfg.social_api_token {
            let social: Vec<Box<dyn SourceProvider>> = vec![Box::new(
                SocialFeedProvider::from_task(token, &cfg.social_task_id),
            )];
            let _social = scheduler::spawn_ingest_loop(
                "social",
                Duration::from_secs(cfg.social_interval_secs),
                social,
                CyclePolicy::SocialSignals,
                SOCIAL_MARKER,
                cfg.dedup_capacity,
                store.clone(),
                shutdown_rx.clone(),
            );
        } else {
            tracing::info!("social loop disabled: no APIFY_API_TOKEN configured");
        }

        let _occupancy = scheduler::spawn_occupancy_loop(
            Duration::from_secs(cfg.occupancy_interval_secs),
            occupancy.clone(),
            shutdown_rx.clone(),
        );

        tracing::info!("intelligence loops online");
    }

    // Flip the shutdown signal on ctrl-c; loops exit at their next
    // suspension point.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let state = AppState {
        store,
        assistant,
        quant,
        occupancy,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
