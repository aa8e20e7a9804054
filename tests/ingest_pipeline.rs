// tests/ingest_pipeline.rs
//
// End-to-end cycle behavior against fixture providers: keep policies,
// fingerprint dedup across cycles, and deterministic timeline order.

use market_copilot::ingest::dedup::DedupLedger;
use market_copilot::ingest::providers::rss::RssProvider;
use market_copilot::ingest::providers::social::SocialFeedProvider;
use market_copilot::ingest::scheduler::{RSS_MARKER, SOCIAL_MARKER};
use market_copilot::ingest::types::SourceProvider;
use market_copilot::ingest::{run_cycle, CyclePolicy};
use market_copilot::store::{ConversationStore, Role, INTEL_SESSION};

const TRUSTED_XML: &str = include_str!("fixtures/rss_trusted.xml");
const AGGREGATOR_XML: &str = include_str!("fixtures/rss_aggregator.xml");
const SOCIAL_JSON: &str = include_str!("fixtures/social_posts.json");

fn rss_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(RssProvider::from_fixture("gCaptain", TRUSTED_XML)),
        Box::new(RssProvider::from_fixture("Alerts", AGGREGATOR_XML)),
    ]
}

#[tokio::test]
async fn rss_cycle_keeps_trusted_wholesale_and_filters_aggregator() {
    let store = ConversationStore::new();
    let mut ledger = DedupLedger::default();

    let outcome = run_cycle(
        &rss_providers(),
        CyclePolicy::TrustedFeeds,
        RSS_MARKER,
        &mut ledger,
        &store,
    )
    .await;

    // 2 curated items + the OPEC alert; the charity gala is dropped.
    assert_eq!(outcome.fetched, 4);
    assert_eq!(outcome.appended, 3);

    let timeline = store.history(INTEL_SESSION);
    assert_eq!(timeline.len(), 3);
    assert!(timeline.iter().all(|m| m.role == Role::System));
    assert!(timeline[2].content.contains("OPEC weighs surprise output cut"));
}

#[tokio::test]
async fn second_cycle_is_fully_deduplicated() {
    let store = ConversationStore::new();
    let mut ledger = DedupLedger::default();
    let providers = rss_providers();

    let first = run_cycle(
        &providers,
        CyclePolicy::TrustedFeeds,
        RSS_MARKER,
        &mut ledger,
        &store,
    )
    .await;
    let second = run_cycle(
        &providers,
        CyclePolicy::TrustedFeeds,
        RSS_MARKER,
        &mut ledger,
        &store,
    )
    .await;

    assert_eq!(first.appended, 3);
    assert_eq!(second.appended, 0);
    // Discarded items were marked seen too: nothing is reconsidered.
    assert_eq!(second.deduped, second.fetched);
    assert_eq!(store.history(INTEL_SESSION).len(), 3);
}

#[tokio::test]
async fn social_cycle_applies_block_list_before_allow_list() {
    let store = ConversationStore::new();
    let mut ledger = DedupLedger::default();
    let providers: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(SocialFeedProvider::from_fixture(SOCIAL_JSON))];

    let outcome = run_cycle(
        &providers,
        CyclePolicy::SocialSignals,
        SOCIAL_MARKER,
        &mut ledger,
        &store,
    )
    .await;

    // The accident post is blocked even though "refinery" chatter could
    // look interesting; the greeting is neutral; two signals survive.
    assert_eq!(outcome.fetched, 4);
    assert_eq!(outcome.appended, 2);

    let timeline = store.history(INTEL_SESSION);
    assert!(timeline[0].content.starts_with("[INTEL] Social:"));
    assert!(timeline[0].content.contains("Navy intercepted"));
    assert!(timeline[1].content.contains("sanction package"));
    assert!(timeline[1]
        .content
        .ends_with("https://x.com/watcher/status/1003"));
}

#[tokio::test]
async fn replaying_the_same_inputs_reproduces_the_timeline_order() {
    let mut orders = Vec::new();
    for _ in 0..3 {
        let store = ConversationStore::new();
        let mut ledger = DedupLedger::default();
        run_cycle(
            &rss_providers(),
            CyclePolicy::TrustedFeeds,
            RSS_MARKER,
            &mut ledger,
            &store,
        )
        .await;
        let contents: Vec<String> = store
            .history(INTEL_SESSION)
            .into_iter()
            .map(|m| m.content)
            .collect();
        orders.push(contents);
    }
    assert_eq!(orders[0], orders[1]);
    assert_eq!(orders[1], orders[2]);

    // Configured source order, then feed order within a source.
    assert!(orders[0][0].contains("Port congestion"));
    assert!(orders[0][1].contains("bunker prices"));
    assert!(orders[0][2].contains("OPEC"));
}

#[tokio::test]
async fn failing_source_is_isolated_from_the_others() {
    struct BrokenProvider;

    #[async_trait::async_trait]
    impl SourceProvider for BrokenProvider {
        async fn fetch_latest(&self) -> anyhow::Result<Vec<market_copilot::ingest::types::FeedItem>> {
            anyhow::bail!("connection refused")
        }
        fn name(&self) -> &str {
            "Broken"
        }
    }

    let store = ConversationStore::new();
    let mut ledger = DedupLedger::default();
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(BrokenProvider),
        Box::new(RssProvider::from_fixture("gCaptain", TRUSTED_XML)),
    ];

    let outcome = run_cycle(
        &providers,
        CyclePolicy::TrustedFeeds,
        RSS_MARKER,
        &mut ledger,
        &store,
    )
    .await;

    assert_eq!(outcome.appended, 2);
}
