use std::time::Duration;

use moka::sync::Cache;

/// Key of a memoized fuzzy resolution.
///
/// The registry size is part of the key, so entries computed before more
/// handlers were loaded are never consulted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    tokens: Vec<String>,
    registry_size: usize,
}

impl MatchKey {
    /// Key for `tokens` resolved against a registry of `registry_size` handlers.
    #[must_use]
    pub fn new(tokens: &[String], registry_size: usize) -> Self {
        Self {
            tokens: tokens.to_vec(),
            registry_size,
        }
    }
}

/// A memoized fuzzy resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMatch {
    /// Name of the matched handler
    pub handler: String,
    /// Similarity score at the time of matching
    pub confidence: f64,
}

/// Bounded, expiring memo of fuzzy-tier results shared by all workers.
#[derive(Debug, Clone)]
pub struct MatchCache {
    cache: Cache<MatchKey, CachedMatch>,
}

impl MatchCache {
    /// Cache holding at most `capacity` entries, each expiring after `ttl`.
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity.max(1))
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cached resolution for `key`, if still live.
    #[must_use]
    pub fn get(&self, key: &MatchKey) -> Option<CachedMatch> {
        self.cache.get(key)
    }

    /// Records a resolution.
    pub fn insert(&self, key: MatchKey, value: CachedMatch) {
        self.cache.insert(key, value);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(words: &[&str], size: usize) -> MatchKey {
        let tokens: Vec<String> = words.iter().map(|word| (*word).to_owned()).collect();
        MatchKey::new(&tokens, size)
    }

    #[test]
    fn test_registry_size_partitions_entries() {
        let cache = MatchCache::new(16, Duration::from_secs(60));
        let hit = CachedMatch {
            handler: "weather".to_owned(),
            confidence: 0.9,
        };
        cache.insert(key(&["trời", "mưa"], 5), hit.clone());

        assert_eq!(cache.get(&key(&["trời", "mưa"], 5)), Some(hit));
        assert_eq!(cache.get(&key(&["trời", "mưa"], 6)), None);
        assert_eq!(cache.get(&key(&["mưa", "trời"], 5)), None);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = MatchCache::new(2, Duration::from_secs(60));
        for index in 0..10 {
            cache.insert(
                key(&[&index.to_string()], 1),
                CachedMatch {
                    handler: "h".to_owned(),
                    confidence: 1.0,
                },
            );
        }
        assert!(cache.entry_count() <= 2);
    }

    #[test]
    fn test_clear() {
        let cache = MatchCache::new(4, Duration::from_secs(60));
        cache.insert(
            key(&["x"], 1),
            CachedMatch {
                handler: "h".to_owned(),
                confidence: 1.0,
            },
        );
        cache.clear();
        assert_eq!(cache.get(&key(&["x"], 1)), None);
    }
}
