//! Bounded, expiring cache of analyses keyed by route.
//!
//! Lives in the serving layer; the tracker itself keeps no state between calls.

use crate::models::PriceAnalysis;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    analysis: Arc<PriceAnalysis>,
    inserted_at: Instant,
    last_used: u64,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
}

/// LRU cache with a time-to-live per entry
pub struct RouteCache {
    capacity: usize,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl RouteCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Cached analysis for `route` whose week count matches, if still fresh
    pub fn get(&self, route: &str, weeks: u32) -> Option<Arc<PriceAnalysis>> {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        let expired = match state.entries.get_mut(route) {
            None => return None,
            Some(entry) if entry.inserted_at.elapsed() >= self.ttl => true,
            Some(entry) if entry.analysis.track_weeks != weeks => return None,
            Some(entry) => {
                entry.last_used = tick;
                return Some(entry.analysis.clone());
            }
        };

        if expired {
            debug!(route, "Cached analysis expired");
            state.entries.remove(route);
        }
        None
    }

    /// Store an analysis under its route, evicting the least recently used
    /// entry when full
    pub fn insert(&self, analysis: PriceAnalysis) -> Arc<PriceAnalysis> {
        let analysis = Arc::new(analysis);
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        if !state.entries.contains_key(&analysis.route) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(route, _)| route.clone());
            if let Some(route) = oldest {
                debug!(route = %route, "Evicting least recently used analysis");
                state.entries.remove(&route);
            }
        }

        state.entries.insert(
            analysis.route.clone(),
            CacheEntry {
                analysis: analysis.clone(),
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
        analysis
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationLevel;
    use chrono::Utc;

    fn analysis(route: &str, weeks: u32) -> PriceAnalysis {
        PriceAnalysis {
            route: route.to_string(),
            track_weeks: weeks,
            data_points: Vec::new(),
            min_price: 0.0,
            max_price: 0.0,
            avg_price: 0.0,
            best_date: None,
            recommendation: String::new(),
            recommendation_level: RecommendationLevel::Stable,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_after_insert() {
        let cache = RouteCache::new(4, Duration::from_secs(60));
        cache.insert(analysis("TPE-TYO", 4));

        assert!(cache.get("TPE-TYO", 4).is_some());
        assert!(cache.get("TPE-TYO", 8).is_none());
        assert!(cache.get("TPE-OSA", 4).is_none());
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = RouteCache::new(2, Duration::from_secs(60));
        cache.insert(analysis("TPE-TYO", 4));
        cache.insert(analysis("TPE-OSA", 4));
        assert!(cache.get("TPE-TYO", 4).is_some());

        cache.insert(analysis("TPE-SEL", 4));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("TPE-TYO", 4).is_some());
        assert!(cache.get("TPE-OSA", 4).is_none());
        assert!(cache.get("TPE-SEL", 4).is_some());
    }

    #[test]
    fn test_reinserting_route_replaces_entry() {
        let cache = RouteCache::new(1, Duration::from_secs(60));
        cache.insert(analysis("TPE-TYO", 4));
        cache.insert(analysis("TPE-TYO", 8));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("TPE-TYO", 8).is_some());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = RouteCache::new(4, Duration::ZERO);
        cache.insert(analysis("TPE-TYO", 4));
        assert!(cache.get("TPE-TYO", 4).is_none());
        assert!(cache.is_empty());
    }
}
