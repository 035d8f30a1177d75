//! [`DownloadCache`]: bookkeeping for artifacts fetched through a selected
//! source, with age- and size-bounded LRU eviction (§3.1, §4.7).

use std::collections::HashMap;

/// Cache key: (ecosystem, package name, version).
pub type CacheKey = (String, String, String);

/// One cached artifact's bookkeeping (§3.1).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Size on disk, in bytes.
    pub size_bytes: u64,
    /// Unix-epoch milliseconds when first cached.
    pub created_at: i64,
    /// Unix-epoch milliseconds of the most recent access.
    pub last_access: i64,
    /// Number of times this entry has been served.
    pub access_count: u64,
}

/// Eviction policy applied by [`DownloadCache::evict`].
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    /// Entries older than this (in milliseconds) are evicted regardless of size pressure.
    pub max_age_millis: i64,
    /// Total cache size, in bytes, above which the least-recently-used entries are evicted.
    pub max_size_bytes: u64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_age_millis: 30 * 24 * 60 * 60 * 1000,
            max_size_bytes: 10 * 1024 * 1024 * 1024,
        }
    }
}

/// In-memory download-cache bookkeeping; the artifacts themselves live
/// wherever the (out-of-scope) installer adapter placed them.
#[derive(Debug, Clone, Default)]
pub struct DownloadCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl DownloadCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly downloaded artifact.
    pub fn record(&mut self, key: CacheKey, size_bytes: u64, now_millis: i64) {
        self.entries.insert(
            key,
            CacheEntry {
                size_bytes,
                created_at: now_millis,
                last_access: now_millis,
                access_count: 1,
            },
        );
    }

    /// Record a cache hit on an already-downloaded artifact.
    pub fn touch(&mut self, key: &CacheKey, now_millis: i64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access = now_millis;
            entry.access_count += 1;
        }
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Total cached size, in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Evict entries older than `policy.max_age_millis`, then evict the
    /// least-recently-used entries until under `policy.max_size_bytes`.
    /// Returns the evicted keys.
    pub fn evict(&mut self, policy: EvictionPolicy, now_millis: i64) -> Vec<CacheKey> {
        let mut evicted = Vec::new();

        let aged_out: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| now_millis.saturating_sub(e.created_at) > policy.max_age_millis)
            .map(|(k, _)| k.clone())
            .collect();
        for key in aged_out {
            self.entries.remove(&key);
            evicted.push(key);
        }

        while self.total_size() > policy.max_size_bytes {
            let Some(lru_key) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.entries.remove(&lru_key);
            evicted.push(lru_key);
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        ("pypi".to_string(), name.to_string(), "1.0".to_string())
    }

    #[test]
    fn touch_increments_access_count() {
        let mut cache = DownloadCache::new();
        cache.record(key("flask"), 1_000, 0);
        cache.touch(&key("flask"), 10);
        assert_eq!(cache.get(&key("flask")).unwrap().access_count, 2);
    }

    #[test]
    fn evicts_entries_older_than_max_age() {
        let mut cache = DownloadCache::new();
        cache.record(key("flask"), 1_000, 0);
        let policy = EvictionPolicy {
            max_age_millis: 100,
            max_size_bytes: u64::MAX,
        };
        let evicted = cache.evict(policy, 1_000);
        assert_eq!(evicted, vec![key("flask")]);
        assert!(cache.get(&key("flask")).is_none());
    }

    #[test]
    fn evicts_lru_entry_when_over_size_budget() {
        let mut cache = DownloadCache::new();
        cache.record(key("flask"), 1_000, 0);
        cache.touch(&key("flask"), 50);
        cache.record(key("django"), 1_000, 10);

        let policy = EvictionPolicy {
            max_age_millis: i64::MAX,
            max_size_bytes: 1_500,
        };
        let evicted = cache.evict(policy, 100);
        assert_eq!(evicted, vec![key("django")]);
        assert!(cache.get(&key("flask")).is_some());
    }
}
