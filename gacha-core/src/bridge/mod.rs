//! FFI bridge: gacha core <-> embedding host (web shell, native launcher)
//!
//! Exposes stateless C-ABI functions. Data crosses the boundary as JSON; the
//! host owns persistence and passes the stored collection string in.
//! All returned strings are heap-allocated; the caller must free them with
//! `free_string`.

use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;
use tracing::warn;

use crate::catalog::{Catalog, Item, RarityWeights};
use crate::collection::{
    CollectionProgress, CollectionStore, GroupedEntry, MemoryStorage, RecordOutcome, StorageKeys,
};
use crate::constants::{ANNOUNCEMENT_STORAGE_KEY, COLLECTION_STORAGE_KEY, CORE_VERSION};
use crate::draw::rng::SeededSource;
use crate::draw::DrawEngine;
use crate::logging;
use crate::simulation::{self, SimConfig};

// ========================
// Data transfer types
// ========================

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub items: Vec<Item>,
    pub weights: RarityWeights,
}

/// Everything the host must persist after a record, plus what happened
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub collection: Vec<Item>,
    pub outcome: RecordOutcome,
    /// Announcement marker to store; `None` means leave it unset
    pub marker: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub progress: CollectionProgress,
    pub grouped: Vec<GroupedEntry>,
}

// ========================
// Helpers
// ========================

fn json_to_cstring<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_owned()) }
}

fn default_engine() -> Option<DrawEngine> {
    DrawEngine::new(Arc::new(Catalog::default()), RarityWeights::default()).ok()
}

/// Store over the default catalog, loaded from a host-supplied collection
/// string. Malformed input loads as an empty collection.
fn store_from_json(collection_json: &str) -> CollectionStore<MemoryStorage> {
    let storage = MemoryStorage::new().with_entry(COLLECTION_STORAGE_KEY, collection_json);
    CollectionStore::open(
        Arc::new(Catalog::default()),
        storage,
        StorageKeys::default(),
    )
}

// ========================
// C-ABI: Core
// ========================

/// Version string
#[no_mangle]
pub extern "C" fn gacha_version() -> *mut c_char {
    CString::new(CORE_VERSION).unwrap_or_default().into_raw()
}

/// Free a string allocated by Rust.
/// ptr must come from a prior call into this bridge, or be null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

// ========================
// C-ABI: Catalog & Draw
// ========================

/// Default catalog and weight table as JSON
#[no_mangle]
pub extern "C" fn gacha_catalog() -> *mut c_char {
    let catalog = Catalog::default();
    json_to_cstring(&CatalogResponse {
        items: catalog.items().to_vec(),
        weights: RarityWeights::default(),
    })
}

/// One seeded draw; returns the drawn item as JSON
#[no_mangle]
pub extern "C" fn gacha_draw(seed: u64) -> *mut c_char {
    let Some(engine) = default_engine() else {
        return std::ptr::null_mut();
    };
    let mut rng = SeededSource::new(seed);
    match engine.draw(&mut rng) {
        Ok(item) => json_to_cstring(&item),
        Err(e) => {
            warn!(error = %e, "bridge draw failed");
            std::ptr::null_mut()
        }
    }
}

/// Tier id (0=common .. 3=ultra-rare) for a roll in [0, 100), -1 otherwise
#[no_mangle]
pub extern "C" fn gacha_tier_for_roll(roll: f64) -> i32 {
    match RarityWeights::default().tier_for_roll(roll) {
        Some(tier) => tier.id() as i32,
        None => -1,
    }
}

// ========================
// C-ABI: Collection
// ========================

/// Append `item_id` to the collection and return the updated collection
/// JSON. Null input or an unknown id returns null.
#[no_mangle]
pub extern "C" fn gacha_record(collection_json: *const c_char, item_id: u32) -> *mut c_char {
    let Some(json) = parse_cstr(collection_json) else {
        return std::ptr::null_mut();
    };
    let mut store = store_from_json(&json);
    match store.record_id(item_id) {
        Ok(_) => json_to_cstring(&store.entries()),
        Err(e) => {
            warn!(error = %e, "bridge record rejected");
            std::ptr::null_mut()
        }
    }
}

/// Append `item_id` with the host's stored announcement marker (null when
/// unset) and return a `RecordResponse`. The host stores `collection` and
/// `marker` back so the completion announcement fires at most once.
#[no_mangle]
pub extern "C" fn gacha_record_with_marker(
    collection_json: *const c_char,
    marker: *const c_char,
    item_id: u32,
) -> *mut c_char {
    let Some(json) = parse_cstr(collection_json) else {
        return std::ptr::null_mut();
    };
    let mut storage = MemoryStorage::new().with_entry(COLLECTION_STORAGE_KEY, &json);
    if let Some(marker) = parse_cstr(marker) {
        storage = storage.with_entry(ANNOUNCEMENT_STORAGE_KEY, &marker);
    }
    let mut store = CollectionStore::open(
        Arc::new(Catalog::default()),
        storage,
        StorageKeys::default(),
    );
    match store.record_id(item_id) {
        Ok(outcome) => json_to_cstring(&RecordResponse {
            collection: store.entries().to_vec(),
            outcome,
            marker: store
                .storage()
                .raw(ANNOUNCEMENT_STORAGE_KEY)
                .map(str::to_owned),
        }),
        Err(e) => {
            warn!(error = %e, "bridge record rejected");
            std::ptr::null_mut()
        }
    }
}

/// Progress counters and grouped view for a stored collection
#[no_mangle]
pub extern "C" fn gacha_summary(collection_json: *const c_char) -> *mut c_char {
    let Some(json) = parse_cstr(collection_json) else {
        return std::ptr::null_mut();
    };
    let store = store_from_json(&json);
    json_to_cstring(&SummaryResponse {
        progress: store.progress(),
        grouped: store.grouped_view().to_vec(),
    })
}

// ========================
// C-ABI: Simulation
// ========================

/// Run the Monte-Carlo simulation with a `SimConfig` JSON; null on bad input
/// or when the run exceeds the simulation limits
#[no_mangle]
pub extern "C" fn gacha_simulate(config_json: *const c_char) -> *mut c_char {
    let Some(json) = parse_cstr(config_json) else {
        return std::ptr::null_mut();
    };
    let Ok(config) = serde_json::from_str::<SimConfig>(&json) else {
        return std::ptr::null_mut();
    };
    if let Err(e) = config.check_limits() {
        warn!(error = %e, "bridge simulation rejected");
        return std::ptr::null_mut();
    }
    let Some(engine) = default_engine() else {
        return std::ptr::null_mut();
    };
    match simulation::run_simulation(&engine, &config) {
        Ok(report) => json_to_cstring(&report),
        Err(e) => {
            warn!(error = %e, "bridge simulation failed");
            std::ptr::null_mut()
        }
    }
}

// ========================
// C-ABI: Logging
// ========================

/// Default logging configuration as JSON
#[no_mangle]
pub extern "C" fn logging_get_default_config() -> *mut c_char {
    json_to_cstring(&logging::TracingConfig::default())
}

/// Initialize logging with a JSON config; ignored if unparseable
#[no_mangle]
pub extern "C" fn logging_init(config_json: *const c_char) {
    if let Some(json_str) = parse_cstr(config_json) {
        if let Some(config) = logging::TracingConfig::from_json(&json_str) {
            logging::init_tracing(&config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
        free_string(ptr);
        s
    }

    #[test]
    fn test_version() {
        assert_eq!(take(gacha_version()), CORE_VERSION);
    }

    #[test]
    fn test_catalog_json() {
        let response: CatalogResponse = serde_json::from_str(&take(gacha_catalog())).unwrap();
        assert_eq!(response.items.len(), 7);
        assert_eq!(response.weights, RarityWeights::default());
    }

    #[test]
    fn test_draw_is_seeded() {
        let a = take(gacha_draw(99));
        let b = take(gacha_draw(99));
        assert_eq!(a, b);
        let item: Item = serde_json::from_str(&a).unwrap();
        assert!((1..=7).contains(&item.id));
    }

    #[test]
    fn test_tier_for_roll() {
        assert_eq!(gacha_tier_for_roll(0.0), 3);
        assert_eq!(gacha_tier_for_roll(5.0), 2);
        assert_eq!(gacha_tier_for_roll(15.0), 1);
        assert_eq!(gacha_tier_for_roll(40.0), 0);
        assert_eq!(gacha_tier_for_roll(100.0), -1);
        assert_eq!(gacha_tier_for_roll(-0.5), -1);
        assert_eq!(gacha_tier_for_roll(f64::NAN), -1);
    }

    #[test]
    fn test_record_and_summary() {
        let empty = CString::new("[]").unwrap();
        let one = take(gacha_record(empty.as_ptr(), 3));
        let one_c = CString::new(one).unwrap();
        let two = take(gacha_record(one_c.as_ptr(), 3));
        let two_c = CString::new(two).unwrap();

        let summary: SummaryResponse =
            serde_json::from_str(&take(gacha_summary(two_c.as_ptr()))).unwrap();
        assert_eq!(summary.progress.total, 2);
        assert_eq!(summary.progress.unique, 1);
        assert_eq!(summary.grouped[0].item.id, 3);
        assert_eq!(summary.grouped[0].quantity, 2);
    }

    #[test]
    fn test_record_unknown_id_is_null() {
        let empty = CString::new("[]").unwrap();
        assert!(gacha_record(empty.as_ptr(), 0).is_null());
        assert!(gacha_record(empty.as_ptr(), 8).is_null());
    }

    fn record_with_marker(collection: &str, marker: Option<&str>, id: u32) -> RecordResponse {
        let collection = CString::new(collection).unwrap();
        let marker = marker.map(|m| CString::new(m).unwrap());
        let marker_ptr = marker.as_ref().map_or(std::ptr::null(), |m| m.as_ptr());
        let json = take(gacha_record_with_marker(collection.as_ptr(), marker_ptr, id));
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_record_with_marker_announces_once() {
        let mut collection = "[]".to_string();
        let mut marker: Option<String> = None;
        let mut fired = 0;
        for id in 1..=7 {
            let response = record_with_marker(&collection, marker.as_deref(), id);
            if response.outcome.announced {
                fired += 1;
                assert_eq!(id, 7);
                assert!(response.outcome.complete);
            }
            collection = serde_json::to_string(&response.collection).unwrap();
            marker = response.marker;
        }
        assert_eq!(fired, 1);
        assert_eq!(marker.as_deref(), Some("true"));

        // Passing the marker back keeps the latch closed
        let again = record_with_marker(&collection, marker.as_deref(), 3);
        assert!(again.outcome.complete);
        assert!(!again.outcome.announced);
        assert_eq!(again.outcome.total, 8);
        assert_eq!(again.marker.as_deref(), Some("true"));

        // Without the marker the host gets a second announcement
        let forgotten = record_with_marker(&collection, None, 3);
        assert!(forgotten.outcome.announced);
    }

    #[test]
    fn test_record_with_marker_null_collection_is_null() {
        let marker = CString::new("true").unwrap();
        assert!(gacha_record_with_marker(std::ptr::null(), marker.as_ptr(), 1).is_null());
    }

    #[test]
    fn test_free_null_is_safe() {
        free_string(std::ptr::null_mut());
    }
}
