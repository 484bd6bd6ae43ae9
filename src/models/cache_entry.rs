// file: src/models/cache_entry.rs
// description: persisted cache record keyed by document fingerprint
// reference: internal data structures

use crate::models::breakdown::ProductionBreakdown;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Never mutated after creation; the cache replaces or evicts whole entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub breakdown: Arc<ProductionBreakdown>,
    pub created_at: u64,
}

impl CacheEntry {
    pub fn new(fingerprint: String, breakdown: ProductionBreakdown) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();

        Self {
            fingerprint,
            breakdown: Arc::new(breakdown),
            created_at,
        }
    }

    pub fn age_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    pub fn is_expired(&self, max_age_secs: u64, now: u64) -> bool {
        max_age_secs > 0 && self.age_secs(now) > max_age_secs
    }
}
