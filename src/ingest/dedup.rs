// src/ingest/dedup.rs
//! Bounded in-memory fingerprint ledger. One instance per ingestion loop,
//! alive for the process lifetime; a restart forgets everything.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

pub const DEFAULT_LEDGER_CAPACITY: usize = 1000;

/// Set of content fingerprints with a soft capacity. Once the set is full,
/// it is cleared wholesale before the next insert — no recency tracking, so
/// previously seen items may be re-admitted after a clear.
#[derive(Debug)]
pub struct DedupLedger {
    seen: HashSet<String>,
    capacity: usize,
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }
}

impl DedupLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Fingerprint of an item's canonical identity (its link).
    pub fn fingerprint(identity: &str) -> String {
        let digest = Sha256::digest(identity.as_bytes());
        let mut out = String::with_capacity(32);
        for b in digest.iter().take(16) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }

    pub fn seen(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn record(&mut self, fingerprint: &str) {
        if self.seen.len() >= self.capacity {
            self.seen.clear();
        }
        self.seen.insert(fingerprint.to_string());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_then_record_then_seen() {
        let mut ledger = DedupLedger::default();
        let fp = DedupLedger::fingerprint("https://example.com/a");
        assert!(!ledger.seen(&fp));
        ledger.record(&fp);
        assert!(ledger.seen(&fp));
    }

    #[test]
    fn fingerprints_are_stable_and_distinct() {
        let a = DedupLedger::fingerprint("https://example.com/a");
        let b = DedupLedger::fingerprint("https://example.com/b");
        assert_eq!(a, DedupLedger::fingerprint("https://example.com/a"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn overflow_clears_instead_of_growing() {
        let mut ledger = DedupLedger::with_capacity(10);
        for i in 0..35 {
            ledger.record(&DedupLedger::fingerprint(&format!("item-{i}")));
            assert!(ledger.len() <= 10);
        }
        // The most recent entry always survives the clear.
        assert!(ledger.seen(&DedupLedger::fingerprint("item-34")));
    }
}
