use std::collections::HashMap;

use {
    breadcord_common::ArrayStrategy,
    serde_json::{Map, Value},
};

use crate::{
    error::{CacheError, Result},
    key::CacheKey,
    merge::merge_records,
};

/// A cached value: one JSON object.
pub type Record = Map<String, Value>;

struct Slot {
    /// Insertion order; kept when an existing key is overwritten.
    order: u64,
    record: Record,
}

/// Records keyed by [`CacheKey`], merged on update.
///
/// Reads and writes copy, so callers never alias stored data. Entries live
/// until deleted or cleared.
pub struct ObjectCache {
    strategy: ArrayStrategy,
    slots: HashMap<CacheKey, Slot>,
    next_order: u64,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new(ArrayStrategy::default())
    }
}

impl ObjectCache {
    pub fn new(strategy: ArrayStrategy) -> Self {
        Self {
            strategy,
            slots: HashMap::new(),
            next_order: 0,
        }
    }

    pub fn strategy(&self) -> ArrayStrategy {
        self.strategy
    }

    pub fn get(&self, key: impl Into<CacheKey>) -> Option<Record> {
        self.slots.get(&key.into()).map(|slot| slot.record.clone())
    }

    pub fn has(&self, key: impl Into<CacheKey>) -> bool {
        self.slots.contains_key(&key.into())
    }

    /// Store `value` under `key`, replacing any existing record.
    pub fn set(&mut self, key: impl Into<CacheKey>, value: &Value) -> Result<()> {
        let Value::Object(record) = value else {
            return Err(CacheError::not_a_record(value));
        };
        self.set_record(key, record.clone());
        Ok(())
    }

    pub fn set_record(&mut self, key: impl Into<CacheKey>, record: Record) {
        let key = key.into();
        match self.slots.get_mut(&key) {
            Some(slot) => slot.record = record,
            None => {
                let order = self.bump_order();
                self.slots.insert(key, Slot { order, record });
            },
        }
    }

    /// Deep-merge `patch` into the record at `key`, creating it if absent.
    /// Returns a copy of the stored result.
    pub fn update(&mut self, key: impl Into<CacheKey>, patch: &Value) -> Result<Record> {
        let Value::Object(patch) = patch else {
            return Err(CacheError::not_a_record(patch));
        };
        Ok(self.update_record(key, patch))
    }

    pub fn update_record(&mut self, key: impl Into<CacheKey>, patch: &Record) -> Record {
        let key = key.into();
        if let Some(slot) = self.slots.get_mut(&key) {
            merge_records(&mut slot.record, patch, self.strategy);
            return slot.record.clone();
        }
        let order = self.bump_order();
        self.slots.insert(key, Slot {
            order,
            record: patch.clone(),
        });
        patch.clone()
    }

    /// Returns whether the key was present.
    pub fn delete(&mut self, key: impl Into<CacheKey>) -> bool {
        self.slots.remove(&key.into()).is_some()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.ordered().into_iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Record> {
        self.ordered()
            .into_iter()
            .map(|(_, slot)| slot.record.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<(CacheKey, Record)> {
        self.ordered()
            .into_iter()
            .map(|(k, slot)| (k.clone(), slot.record.clone()))
            .collect()
    }

    fn ordered(&self) -> Vec<(&CacheKey, &Slot)> {
        let mut slots: Vec<_> = self.slots.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.order);
        slots
    }

    fn bump_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCache")
            .field("strategy", &self.strategy)
            .field("len", &self.slots.len())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn update_creates_then_merges() {
        let mut cache = ObjectCache::new(ArrayStrategy::Replace);
        let created = cache.update("1", &json!({"name": "a", "tags": [1, 2]})).unwrap();
        assert_eq!(Value::Object(created), json!({"name": "a", "tags": [1, 2]}));

        let merged = cache.update("1", &json!({"tags": [3], "x": 1})).unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({"name": "a", "tags": [3], "x": 1})
        );
    }

    #[test]
    fn concat_cache_appends() {
        let mut cache = ObjectCache::new(ArrayStrategy::Concat);
        cache.update(7, &json!({"a": [1, 2]})).unwrap();
        let merged = cache.update(7, &json!({"a": [3]})).unwrap();
        assert_eq!(merged["a"], json!([1, 2, 3]));
    }

    #[test]
    fn rejects_non_records() {
        let mut cache = ObjectCache::default();
        assert_eq!(
            cache.set("k", &json!([1])),
            Err(CacheError::NotARecord { found: "an array" })
        );
        assert_eq!(
            cache.update("k", &json!("text")).unwrap_err().to_string(),
            "expected a record, found a string"
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_are_copies() {
        let mut cache = ObjectCache::default();
        cache.set("k", &json!({"v": 1})).unwrap();

        let mut copy = cache.get("k").unwrap();
        copy.insert("v".into(), json!(2));
        assert_eq!(cache.get("k").unwrap()["v"], json!(1));

        let mut returned = cache.update("k", &json!({"w": 1})).unwrap();
        returned.clear();
        assert_eq!(cache.get("k").unwrap().len(), 2);
    }

    #[test]
    fn delete_clear_and_len() {
        let mut cache = ObjectCache::default();
        cache.set("a", &json!({})).unwrap();
        cache.set(1, &json!({})).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.has("a"));
        assert!(!cache.has("1"));

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn listing_follows_insertion_order() {
        let mut cache = ObjectCache::default();
        for id in ["c", "a", "b"] {
            cache.set(id, &json!({"id": id})).unwrap();
        }
        // Overwriting keeps the original position.
        cache.set("c", &json!({"id": "c", "v": 2})).unwrap();
        assert_eq!(
            cache.keys(),
            vec![CacheKey::from("c"), CacheKey::from("a"), CacheKey::from("b")]
        );
        assert_eq!(cache.values()[0]["v"], json!(2));
        assert_eq!(cache.entries()[2].0, CacheKey::from("b"));
    }
}
