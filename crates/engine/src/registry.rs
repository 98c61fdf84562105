//! Process-wide name-to-handle directory.
//!
//! Stages locate shared tables by `(spider_id, key)` rather than by having a
//! reference threaded through their options, mirroring an Erlang process
//! registry. Entries are created during setup and removed implicitly when
//! the process (or, in our realization, the owning Engine) terminates.

use dashmap::{DashMap, DashSet};
use lazy_static::lazy_static;

use crate::error::{EngineError, EngineResult};
use crate::ids::SpiderId;
use crate::table::TableHandle;

lazy_static! {
    static ref REGISTRY: DashMap<(SpiderId, String), TableHandle> = DashMap::new();
    static ref LIVE_SPIDERS: DashSet<SpiderId> = DashSet::new();
}

/// Reserve a spider id for a starting engine. Fails if an engine for this
/// spider is already live, standing in for the unique-actor-name guarantee
/// an Erlang process registry gives for free.
pub fn reserve_spider(spider: &SpiderId) -> EngineResult<()> {
    if !LIVE_SPIDERS.insert(spider.clone()) {
        return Err(EngineError::DuplicateSpider { spider: spider.to_string() });
    }
    Ok(())
}

/// Publish a table handle under `(spider, key)`. Overwrites any previous
/// entry for the same key.
pub fn publish(spider: &SpiderId, key: &str, handle: TableHandle) {
    REGISTRY.insert((spider.clone(), key.to_string()), handle);
}

/// Look up a previously published table handle.
pub fn lookup(spider: &SpiderId, key: &str) -> Option<TableHandle> {
    REGISTRY.get(&(spider.clone(), key.to_string())).map(|e| e.value().clone())
}

/// Remove every entry registered for a spider and release its reservation,
/// so a future engine with the same id can start cleanly.
pub fn unregister_spider(spider: &SpiderId) {
    REGISTRY.retain(|(s, _), _| s != spider);
    LIVE_SPIDERS.remove(spider);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TableRole;

    #[test]
    fn publish_then_lookup_round_trips() {
        let spider = SpiderId::new("registry_test_spider");
        let handle = TableHandle::new(TableRole::Spider);
        handle.insert("k", serde_json::json!(1));

        publish(&spider, "spider_tid", handle.clone());
        let found = lookup(&spider, "spider_tid").expect("published handle must be found");
        assert_eq!(found.get("k"), Some(serde_json::json!(1)));

        unregister_spider(&spider);
        assert!(lookup(&spider, "spider_tid").is_none());
    }

    #[test]
    fn reserve_spider_rejects_a_second_live_reservation() {
        let spider = SpiderId::new("registry_test_spider_reservation");

        reserve_spider(&spider).expect("first reservation must succeed");
        let err = reserve_spider(&spider).expect_err("second reservation must be rejected");
        assert!(matches!(err, EngineError::DuplicateSpider { .. }));

        unregister_spider(&spider);
        reserve_spider(&spider).expect("reservation is released after unregister_spider");
        unregister_spider(&spider);
    }
}
