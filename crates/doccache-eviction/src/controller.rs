//! Victim selection and the cleanup cycle body

use doccache_backend::CacheBackend;
use doccache_core::{CacheEntry, EvictionStrategy, QueryFingerprint, Result};

/// What one cleanup cycle removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed because their TTL had elapsed
    pub expired: usize,
    /// Entries removed to enforce the max_items bound
    pub evicted: usize,
}

/// Selects and removes cache entries when a backend is over capacity.
///
/// Selection is deterministic: victims are the entries with the k smallest
/// strategy metric, ties broken by insertion sequence (earliest first).
#[derive(Debug, Clone, Copy)]
pub struct EvictionController {
    strategy: EvictionStrategy,
}

impl EvictionController {
    pub fn new(strategy: EvictionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    fn metric(&self, entry: &CacheEntry) -> u64 {
        match self.strategy {
            EvictionStrategy::Lru => entry.last_access_ms(),
            EvictionStrategy::Lfu => entry.access_count(),
            EvictionStrategy::ExecutionCost => entry.execution_time_ms,
        }
    }

    /// Pick `max(0, N - max_items)` victims from an entry snapshot.
    ///
    /// Pure selection over metadata; performs no I/O.
    pub fn select_victims(
        &self,
        entries: &[CacheEntry],
        max_items: usize,
    ) -> Vec<QueryFingerprint> {
        let overflow = entries.len().saturating_sub(max_items);
        if overflow == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(u64, u64, &QueryFingerprint)> = entries
            .iter()
            .map(|e| (self.metric(e), e.sequence, &e.fingerprint))
            .collect();
        ranked.sort_unstable_by_key(|(metric, sequence, _)| (*metric, *sequence));

        ranked
            .into_iter()
            .take(overflow)
            .map(|(_, _, fp)| fp.clone())
            .collect()
    }

    /// One full cleanup pass over a backend: reclaim TTL-expired entries,
    /// then enforce the max_items bound with the configured strategy.
    pub async fn run_cleanup_once(&self, backend: &dyn CacheBackend) -> Result<CleanupReport> {
        let entries = backend.entries().await?;
        if entries.is_empty() {
            return Ok(CleanupReport::default());
        }

        let ttl = backend.ttl_seconds();
        let mut live = Vec::with_capacity(entries.len());
        let mut report = CleanupReport::default();

        for entry in entries {
            if entry.is_expired(ttl) {
                backend.delete(&entry.fingerprint).await?;
                backend.stats().record_expiration();
                report.expired += 1;
            } else {
                live.push(entry);
            }
        }

        for victim in self.select_victims(&live, backend.max_items()) {
            backend.delete(&victim).await?;
            backend.stats().record_eviction();
            report.evicted += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccache_backend::InMemoryBackend;
    use doccache_core::{CacheConfig, CachedValue};
    use serde_json::json;

    fn entry(name: &str, cost_ms: u64, sequence: u64) -> CacheEntry {
        CacheEntry::new(
            QueryFingerprint::find_one(Some(json!({"name": name}))),
            CachedValue::Single(None),
            "stocks",
            cost_ms,
            sequence,
        )
    }

    #[test]
    fn test_no_victims_under_bound() {
        let controller = EvictionController::new(EvictionStrategy::Lru);
        let entries = vec![entry("a", 1, 0), entry("b", 1, 1)];
        assert!(controller.select_victims(&entries, 2).is_empty());
        assert!(controller.select_victims(&entries, 10).is_empty());
    }

    #[test]
    fn test_lru_selects_least_recently_accessed() {
        let controller = EvictionController::new(EvictionStrategy::Lru);
        let entries = vec![entry("a", 1, 0), entry("b", 1, 1), entry("c", 1, 2)];

        // Touch b and c so a holds the stalest access time.
        std::thread::sleep(std::time::Duration::from_millis(5));
        entries[1].touch();
        entries[2].touch();

        let victims = controller.select_victims(&entries, 2);
        assert_eq!(victims, vec![entries[0].fingerprint.clone()]);
    }

    #[test]
    fn test_lfu_selects_least_frequent() {
        let controller = EvictionController::new(EvictionStrategy::Lfu);
        let entries = vec![entry("a", 1, 0), entry("b", 1, 1), entry("c", 1, 2)];

        entries[0].touch();
        entries[0].touch();
        entries[2].touch();

        // b has zero hits and is the only victim needed.
        let victims = controller.select_victims(&entries, 2);
        assert_eq!(victims, vec![entries[1].fingerprint.clone()]);
    }

    #[test]
    fn test_cost_evicts_cheapest_first() {
        let controller = EvictionController::new(EvictionStrategy::ExecutionCost);
        let entries = vec![
            entry("cheap", 5, 0),
            entry("medium", 50, 1),
            entry("expensive", 500, 2),
        ];

        let victims = controller.select_victims(&entries, 2);
        assert_eq!(victims, vec![entries[0].fingerprint.clone()]);
    }

    #[test]
    fn test_tie_break_by_insertion_order() {
        let controller = EvictionController::new(EvictionStrategy::ExecutionCost);
        // Equal costs; the earliest inserted must go first.
        let entries = vec![entry("a", 10, 7), entry("b", 10, 3), entry("c", 10, 5)];

        let victims = controller.select_victims(&entries, 1);
        assert_eq!(
            victims,
            vec![entries[1].fingerprint.clone(), entries[2].fingerprint.clone()]
        );
    }

    #[tokio::test]
    async fn test_cleanup_enforces_bound() {
        let config = CacheConfig::default()
            .with_max_items(2)
            .with_eviction_strategy(EvictionStrategy::ExecutionCost);
        let backend = InMemoryBackend::new("stocks", config);
        let controller = EvictionController::new(EvictionStrategy::ExecutionCost);

        for (name, cost) in [("cheap", 5), ("medium", 50), ("expensive", 500)] {
            backend
                .set(
                    QueryFingerprint::find_one(Some(json!({"name": name}))),
                    CachedValue::Single(None),
                    cost,
                )
                .await
                .unwrap();
        }

        let report = controller.run_cleanup_once(&backend).await.unwrap();
        assert_eq!(report.evicted, 1);
        assert_eq!(backend.len(), 2);

        // The 5 ms entry is the one gone; the expensive ones survive.
        let gone = QueryFingerprint::find_one(Some(json!({"name": "cheap"})));
        assert!(backend.get(&gone).await.unwrap().is_none());
        assert_eq!(backend.stats().evictions(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_reclaims_expired_entries() {
        let config = CacheConfig::default().with_ttl_seconds(1);
        let backend = InMemoryBackend::new("stocks", config);
        let controller = EvictionController::new(EvictionStrategy::Lru);

        backend
            .set(
                QueryFingerprint::find_one(Some(json!({"name": "AAPL"}))),
                CachedValue::Single(None),
                1,
            )
            .await
            .unwrap();

        // Nothing expired yet: the cycle is a no-op.
        let report = controller.run_cleanup_once(&backend).await.unwrap();
        assert_eq!(report, CleanupReport::default());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_on_empty_backend_is_noop() {
        let backend = InMemoryBackend::new("stocks", CacheConfig::default());
        let controller = EvictionController::new(EvictionStrategy::Lru);

        let report = controller.run_cleanup_once(&backend).await.unwrap();
        assert_eq!(report, CleanupReport::default());
    }
}
