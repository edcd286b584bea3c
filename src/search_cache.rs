// Availability search cache
// Sits in front of the availability query for repeated searches. Every committed
// booking clears it; room allocation never reads from it.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::availability::AvailableRoomType;
use crate::config::SearchCacheConfig;
use crate::filter::FilterSet;

#[derive(Debug, Default)]
struct SearchCacheStats {
    items_count: AtomicUsize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    expired_count: AtomicUsize,
    eviction_count: AtomicUsize,
    invalidation_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchCacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub eviction_count: usize,
    pub invalidation_count: usize,
}

pub fn create_cache_key(
    arrival: NaiveDate,
    departure: NaiveDate,
    party_size: u32,
    filters: &FilterSet,
) -> String {
    format!(
        "{}:{}:{}:{:?}:{:?}:{:?}",
        arrival, departure, party_size, filters.max_price, filters.floor, filters.pets_allowed
    )
}

struct CacheEntry {
    data: Vec<AvailableRoomType>,
    created_at: Instant,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

pub struct SearchCache {
    entries: DashMap<String, CacheEntry>,
    config: SearchCacheConfig,
    stats: SearchCacheStats,
    // bumped by every invalidation
    generation: AtomicU64,
}

impl SearchCache {
    pub fn new(config: SearchCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: SearchCacheStats::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn remove_entry(&self, key: &str, expired: bool) {
        if self.entries.remove(key).is_some() {
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            if expired {
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
            } else {
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn remove_least_recently_used(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_accessed)
            .map(|entry| entry.key().clone());

        if let Some(oldest_key) = oldest_key {
            self.remove_entry(&oldest_key, false);
        }
    }

    pub fn store(&self, key: String, data: Vec<AvailableRoomType>) -> bool {
        if self.config.max_entries == 0 {
            return false;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.remove_least_recently_used();
        }

        let now = Instant::now();
        let entry = CacheEntry {
            data,
            created_at: now,
            last_accessed: now,
        };
        if self.entries.insert(key, entry).is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    // Stores a result computed while `generation` was current. If an invalidation
    // happened since, the entry is dropped again so stale availability is never served.
    pub fn store_if_current(
        &self,
        key: String,
        data: Vec<AvailableRoomType>,
        generation: u64,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }
        if !self.store(key.clone(), data) {
            return false;
        }
        if self.generation() != generation {
            if self.entries.remove(&key).is_some() {
                self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            }
            return false;
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<Vec<AvailableRoomType>> {
        let ttl = self.config.ttl();

        let expired = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired(ttl) {
                    true
                } else {
                    entry.last_accessed = Instant::now();
                    self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                    return Some(entry.data.clone());
                }
            }
            None => false,
        };

        // The shard guard is released before removing
        if expired {
            self.remove_entry(key, true);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    // Drops every cached search; returns how many were removed
    pub fn invalidate_all(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(&key).is_some() {
                self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
                removed += 1;
            }
        }
        self.stats
            .invalidation_count
            .fetch_add(removed, Ordering::SeqCst);
        removed
    }

    pub fn stats(&self) -> SearchCacheStatsReport {
        SearchCacheStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            invalidation_count: self.stats.invalidation_count.load(Ordering::SeqCst),
        }
    }
}
