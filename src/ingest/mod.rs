// src/ingest/mod.rs
pub mod classify;
pub mod dedup;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::ingest::classify::{
    classify, Classification, ALPHA_KEYWORDS_RSS, ALPHA_KEYWORDS_SOCIAL, GARBAGE_KEYWORDS,
};
use crate::ingest::dedup::DedupLedger;
use crate::ingest::types::{FeedItem, SourceProvider};
use crate::store::{ConversationStore, Role, INTEL_SESSION};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw items fetched from sources.");
        describe_counter!(
            "ingest_kept_total",
            "Items appended to the intelligence timeline."
        );
        describe_counter!("ingest_dedup_total", "Items skipped by the fingerprint ledger.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse errors (isolated per cycle)."
        );
        describe_gauge!("ingest_last_run_ts", "Unix ts when an ingest cycle last ran.");
    });
}

/// Normalize display text: entity-decode, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // Length cap: 500 chars is plenty for a headline or post body.
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }

    out
}

/// Links routed through an alerts aggregator carry more noise than the
/// curated feeds, so they get the stricter allow-list treatment.
pub fn is_aggregator_link(link: &str) -> bool {
    let l = link.to_ascii_lowercase();
    l.contains("google.com/alerts") || l.contains("news.google")
}

/// Per-instance keep policy; the classifier itself is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Social loop: block-list discards (priority), allow-list keeps, rest drops.
    SocialSignals,
    /// RSS loop: curated feeds are kept wholesale; aggregator links need a signal match.
    TrustedFeeds,
}

pub fn should_keep(policy: CyclePolicy, item: &FeedItem) -> bool {
    match policy {
        CyclePolicy::SocialSignals => {
            classify(&item.title, GARBAGE_KEYWORDS, ALPHA_KEYWORDS_SOCIAL) == Classification::Signal
        }
        CyclePolicy::TrustedFeeds => {
            if is_aggregator_link(&item.link) {
                classify(&item.title, &[], ALPHA_KEYWORDS_RSS) == Classification::Signal
            } else {
                true
            }
        }
    }
}

/// Timeline message for one accepted item.
pub fn format_intel(marker: &str, item: &FeedItem) -> String {
    format!("{marker} {}: {}\n{}", item.source_label, item.title, item.link)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleOutcome {
    pub fetched: usize,
    pub deduped: usize,
    pub appended: usize,
}

/// Run one ingestion cycle: concurrent fan-out fetch, then a deterministic
/// dedup/classify/append pass (sources in configured order, items in feed
/// order). A failing source contributes an empty batch and never blocks the
/// others.
pub async fn run_cycle(
    providers: &[Box<dyn SourceProvider>],
    policy: CyclePolicy,
    marker: &str,
    ledger: &mut DedupLedger,
    store: &ConversationStore,
) -> CycleOutcome {
    ensure_metrics_described();

    let batches = futures::future::join_all(providers.iter().map(|p| p.fetch_latest())).await;

    let mut outcome = CycleOutcome::default();
    for (provider, batch) in providers.iter().zip(batches) {
        let items = match batch {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, provider = provider.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                continue;
            }
        };
        for item in items {
            outcome.fetched += 1;
            let fp = DedupLedger::fingerprint(&item.link);
            if ledger.seen(&fp) {
                outcome.deduped += 1;
                continue;
            }
            // Mark seen before classifying so discarded items are not
            // reconsidered next cycle.
            ledger.record(&fp);
            if should_keep(policy, &item) {
                store.add_message(INTEL_SESSION, Role::System, &format_intel(marker, &item));
                outcome.appended += 1;
            }
        }
    }

    counter!("ingest_items_total").increment(outcome.fetched as u64);
    counter!("ingest_kept_total").increment(outcome.appended as u64);
    counter!("ingest_dedup_total").increment(outcome.deduped as u64);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, link: &str) -> FeedItem {
        FeedItem {
            title: title.into(),
            link: link.into(),
            source_label: "Test".into(),
        }
    }

    #[test]
    fn normalize_text_strips_tags_and_collapses_ws() {
        let s = "  <b>Tanker&nbsp;&nbsp;seized</b> near   strait ";
        assert_eq!(normalize_text(s), "Tanker seized near strait");
    }

    #[test]
    fn social_policy_blocks_before_allowing() {
        let it = item("Accident at sanction checkpoint", "https://x.com/1");
        assert!(!should_keep(CyclePolicy::SocialSignals, &it));
        let ok = item("Sanction round hits offshore exports", "https://x.com/2");
        assert!(should_keep(CyclePolicy::SocialSignals, &ok));
    }

    #[test]
    fn trusted_feeds_keep_everything_but_aggregators_filter() {
        let curated = item("Weekly port congestion report", "https://gcaptain.com/a");
        assert!(should_keep(CyclePolicy::TrustedFeeds, &curated));

        let noisy = item(
            "Local bake sale raises funds",
            "https://www.google.com/alerts/feeds/123/456",
        );
        assert!(!should_keep(CyclePolicy::TrustedFeeds, &noisy));

        let alerting = item(
            "OPEC surprise cut rattles futures",
            "https://www.google.com/alerts/feeds/123/789",
        );
        assert!(should_keep(CyclePolicy::TrustedFeeds, &alerting));
    }

    #[test]
    fn format_intel_embeds_label_title_and_link() {
        let it = item("Pipeline halted", "https://example.com/p");
        assert_eq!(
            format_intel("[RSS]", &it),
            "[RSS] Test: Pipeline halted\nhttps://example.com/p"
        );
    }
}
