//! Global registry for per-wrapper cache statistics.
//!
//! Every wrapper created by [`GenericCache`](crate::GenericCache) registers
//! its [`CacheStats`] here under `prefix + key_type`, so hit/miss numbers can
//! be inspected without a handle to the wrapper itself. Wrappers sharing a
//! name share the same counters.
//!
//! The registry is process-global; tests touching it should serialize access
//! (see the `serial_test` usage in this crate's test suite).

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::stats::CacheStats;

static STATS_REGISTRY: Lazy<RwLock<HashMap<String, Arc<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the stats handle registered under `name`, creating it on first
/// registration. Called by the orchestrator at wrap time.
pub fn register(name: &str) -> Arc<CacheStats> {
    let mut registry = STATS_REGISTRY.write();
    Arc::clone(
        registry
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CacheStats::new())),
    )
}

/// Looks up the stats for a registered wrapper.
pub fn get(name: &str) -> Option<Arc<CacheStats>> {
    let registry = STATS_REGISTRY.read();
    registry.get(name).map(Arc::clone)
}

/// Names of every registered wrapper.
pub fn list() -> Vec<String> {
    let registry = STATS_REGISTRY.read();
    registry.keys().cloned().collect()
}

/// Resets the counters of one wrapper. Returns `false` if it is unknown.
pub fn reset(name: &str) -> bool {
    let registry = STATS_REGISTRY.read();
    match registry.get(name) {
        Some(stats) => {
            stats.reset();
            true
        }
        None => false,
    }
}

/// Removes every registration. Existing handles keep counting; they are just
/// no longer reachable by name.
pub fn clear() {
    let mut registry = STATS_REGISTRY.write();
    registry.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests share the process-global registry with each other and with
    // the integration suite, so they use names no other test touches.

    #[test]
    fn test_register_is_idempotent() {
        let first = register("unit-reg-idem");
        let second = register("unit-reg-idem");
        first.record_hit();
        assert_eq!(second.hits(), 1);
    }

    #[test]
    fn test_get_unknown_name() {
        assert!(get("unit-reg-unknown").is_none());
    }

    #[test]
    fn test_reset_known_and_unknown() {
        let stats = register("unit-reg-reset");
        stats.record_hit();
        assert!(reset("unit-reg-reset"));
        assert_eq!(stats.hits(), 0);
        assert!(!reset("unit-reg-nope"));
    }

    #[test]
    fn test_list_contains_registered_name() {
        register("unit-reg-list");
        assert!(list().contains(&"unit-reg-list".to_string()));
    }
}
