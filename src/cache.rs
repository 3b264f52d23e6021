use dashmap::DashMap;
use std::time::{Duration, Instant};

// Subject keys are company/ticker strings; lookups are case-insensitive.
pub fn normalize_subject(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// Cache entry with the time it was fetched
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

// Time-boxed store for volatile upstream data. Staleness is decided lazily
// on read; stale entries stay in place until the next put overwrites them.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, subject: &str) -> Option<V> {
        self.get_at(subject, Instant::now())
    }

    pub fn put(&self, subject: &str, value: V) {
        self.put_at(subject, value, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn get_at(&self, subject: &str, now: Instant) -> Option<V> {
        let entry = self.entries.get(&normalize_subject(subject))?;
        if now.duration_since(entry.fetched_at) < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn put_at(&self, subject: &str, value: V, now: Instant) {
        self.entries.insert(
            normalize_subject(subject),
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }
}
