//! Edge case & boundary tests
//!
//! Behavior at system boundaries:
//! - Corrupt or foreign persisted data → empty collection, never a crash
//! - Storage that refuses writes → in-memory state stays authoritative
//! - Null pointer / malformed JSON across the bridge → null or neutral value
//! - Broken catalog definitions → construction errors

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use gacha_core::bridge::*;
use gacha_core::catalog::{Catalog, CatalogDefinition, Item, RarityTier, RarityWeights};
use gacha_core::collection::{
    AnnouncementState, CollectionStore, KeyValueStore, MemoryStorage, StorageKeys,
};
use gacha_core::constants::{ANNOUNCEMENT_STORAGE_KEY, COLLECTION_STORAGE_KEY};
use gacha_core::error::{GachaError, StorageError};

// ============================================================
// Helpers
// ============================================================

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn ptr_to_string(ptr: *mut c_char) -> String {
    assert!(!ptr.is_null(), "FFI returned null pointer");
    let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
    free_string(ptr);
    s
}

fn open_with(storage: MemoryStorage) -> CollectionStore<MemoryStorage> {
    CollectionStore::open(
        Arc::new(Catalog::default()),
        storage,
        StorageKeys::default(),
    )
}

/// Storage whose every call fails
struct BrokenStorage;

impl KeyValueStore for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disabled".into()))
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded {
            key: key.to_string(),
        })
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disabled".into()))
    }
}

// ============================================================
// 1. Corrupt persisted data
// ============================================================

#[test]
fn corrupt_collection_variants_load_empty() {
    for raw in ["", "not json", "{}", "42", "null", "[1, 2, 3]", "[{\"id\": \"x\"}]"] {
        let s = open_with(MemoryStorage::new().with_entry(COLLECTION_STORAGE_KEY, raw));
        assert_eq!(s.total_count(), 0, "raw = {raw:?}");
        assert_eq!(s.unique_count(), 0);
        assert!(!s.is_complete());
    }
}

#[test]
fn unknown_rarity_string_is_corrupt() {
    let raw = r#"[{"id":1,"name":"n","description":"d","image":"i","rarity":"legendary"}]"#;
    let mut s = CollectionStore::new(
        Arc::new(Catalog::default()),
        MemoryStorage::new().with_entry(COLLECTION_STORAGE_KEY, raw),
    );
    let report = s.load();
    assert!(report.corrupt);
    assert_eq!(s.total_count(), 0);
}

#[test]
fn corrupt_marker_counts_as_absent() {
    for raw in ["", "yes", "1", "{", "false", "\"false\""] {
        let s = open_with(MemoryStorage::new().with_entry(ANNOUNCEMENT_STORAGE_KEY, raw));
        assert_eq!(
            s.announcement_state(),
            AnnouncementState::NotAnnounced,
            "raw = {raw:?}"
        );
    }
}

#[test]
fn record_after_corrupt_load_overwrites_garbage() {
    let mut s = open_with(MemoryStorage::new().with_entry(COLLECTION_STORAGE_KEY, "garbage"));
    s.record_id(1).unwrap();
    let stored: Vec<Item> =
        serde_json::from_str(s.storage().raw(COLLECTION_STORAGE_KEY).unwrap()).unwrap();
    assert_eq!(stored.len(), 1);
}

// ============================================================
// 2. Failing storage
// ============================================================

#[test]
fn unreadable_storage_loads_empty() {
    let s = CollectionStore::open(Arc::new(Catalog::default()), BrokenStorage, StorageKeys::default());
    assert_eq!(s.total_count(), 0);
    assert_eq!(s.announcement_state(), AnnouncementState::NotAnnounced);
}

#[test]
fn failed_writes_still_complete_and_announce() {
    let mut s = CollectionStore::new(Arc::new(Catalog::default()), BrokenStorage);
    let mut last = None;
    for id in 1..=7 {
        let outcome = s.record_id(id).unwrap();
        assert!(!outcome.persisted);
        last = Some(outcome);
    }
    let last = last.unwrap();
    assert!(last.complete);
    assert!(last.announced);
    assert!(s.take_celebration());
}

#[test]
fn admin_resets_tolerate_failing_storage() {
    let mut s = CollectionStore::new(Arc::new(Catalog::default()), BrokenStorage);
    s.record_id(1).unwrap();
    s.clear_collection();
    s.reset_announcement_marker();
    assert_eq!(s.total_count(), 0);
}

#[test]
fn rejected_writes_keep_previous_stored_value() {
    let mut s = open_with(MemoryStorage::new());
    s.record_id(1).unwrap();
    s.storage_mut().set_reject_writes(true);
    s.record_id(2).unwrap();
    assert_eq!(s.total_count(), 2);
    let stored: Vec<Item> =
        serde_json::from_str(s.storage().raw(COLLECTION_STORAGE_KEY).unwrap()).unwrap();
    assert_eq!(stored.len(), 1);
}

// ============================================================
// 3. Bridge: null pointers & malformed input
// ============================================================

#[test]
fn null_input_record() {
    assert!(gacha_record(std::ptr::null(), 1).is_null());
}

#[test]
fn null_input_summary() {
    assert!(gacha_summary(std::ptr::null()).is_null());
}

#[test]
fn null_input_simulate() {
    assert!(gacha_simulate(std::ptr::null()).is_null());
}

#[test]
fn null_input_logging_init() {
    logging_init(std::ptr::null());
}

#[test]
fn malformed_collection_treated_as_empty() {
    let bad = cstr("{{{{");
    let json = ptr_to_string(gacha_record(bad.as_ptr(), 5));
    let items: Vec<Item> = serde_json::from_str(&json).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 5);

    let summary = ptr_to_string(gacha_summary(bad.as_ptr()));
    let value: serde_json::Value = serde_json::from_str(&summary).unwrap();
    assert_eq!(value["progress"]["total"], 0);
    assert_eq!(value["grouped"].as_array().unwrap().len(), 0);
}

#[test]
fn malformed_sim_config_is_null() {
    let bad = cstr("not a config");
    assert!(gacha_simulate(bad.as_ptr()).is_null());
}

#[test]
fn small_sim_config_runs() {
    let cfg = cstr(r#"{"draws": 1000, "trials": 5}"#);
    let json = ptr_to_string(gacha_simulate(cfg.as_ptr()));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["distribution"]["total_draws"], 1000);
    assert_eq!(value["completion"]["trials"], 5);
}

#[test]
fn oversized_sim_config_rejected() {
    for json in [
        r#"{"draws": 1000, "trials": 1000000000000000000}"#,
        r#"{"draws": 18446744073709551615, "trials": 5}"#,
        r#"{"draws": 1000, "trials": 5, "max_draws_per_trial": 100000000}"#,
    ] {
        let cfg = cstr(json);
        assert!(gacha_simulate(cfg.as_ptr()).is_null(), "{json}");
    }
}

#[test]
fn extreme_rolls() {
    assert_eq!(gacha_tier_for_roll(f64::INFINITY), -1);
    assert_eq!(gacha_tier_for_roll(f64::NEG_INFINITY), -1);
    assert_eq!(gacha_tier_for_roll(99.999_999), 0);
    assert_eq!(gacha_tier_for_roll(4.999_999), 3);
}

#[test]
fn extreme_seeds_draw() {
    for seed in [0, 1, u64::MAX] {
        let json = ptr_to_string(gacha_draw(seed));
        let item: Item = serde_json::from_str(&json).unwrap();
        assert!((1..=7).contains(&item.id));
    }
}

#[test]
fn double_free_null_safe() {
    free_string(std::ptr::null_mut());
    free_string(std::ptr::null_mut());
}

// ============================================================
// 4. Catalog configuration errors
// ============================================================

#[test]
fn empty_tier_rejected() {
    let items: Vec<Item> = Catalog::default()
        .items()
        .iter()
        .filter(|i| i.rarity != RarityTier::UltraRare)
        .cloned()
        .collect();
    assert!(matches!(
        Catalog::new(items),
        Err(GachaError::EmptyTier(RarityTier::UltraRare))
    ));
}

#[test]
fn duplicate_id_rejected() {
    let mut items = Catalog::default().items().to_vec();
    items[1].id = items[0].id;
    assert!(matches!(
        Catalog::new(items),
        Err(GachaError::DuplicateItemId(1))
    ));
}

#[test]
fn weights_not_summing_to_100_rejected() {
    let weights = RarityWeights {
        common: 60,
        rare: 25,
        super_rare: 10,
        ultra_rare: 6,
    };
    assert!(matches!(
        weights.validate(),
        Err(GachaError::WeightSum { total: 101 })
    ));
}

#[test]
fn unparseable_definition_rejected() {
    assert!(matches!(
        CatalogDefinition::from_ron("(items: [ (id: 1, "),
        Err(GachaError::Definition(_))
    ));
}
