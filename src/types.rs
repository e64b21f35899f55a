use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{error::DbError, utils::HandyRwLock};

/// Shared, lock-protected ownership of a single value. Pages handed out by
/// the buffer pool travel as pods; byte-level consistency across
/// transactions is enforced by the lock table, the inner `RwLock` only
/// guards struct integrity.
pub type Pod<T> = Arc<RwLock<T>>;

pub type ResultPod<T> = Result<Pod<T>, DbError>;
pub type DbResult = Result<(), DbError>;

/// A `HashMap` behind a `RwLock`, with the lock kept private so every
/// access site is forced through an explicit read or write guard.
pub struct ConcurrentHashMap<K, V> {
    map: RwLock<HashMap<K, V>>,
}

impl<K, V> ConcurrentHashMap<K, V> {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_inner_rl(&self) -> RwLockReadGuard<HashMap<K, V>> {
        self.map.rl()
    }

    pub fn get_inner_wl(&self) -> RwLockWriteGuard<HashMap<K, V>> {
        self.map.wl()
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        K: std::cmp::Eq + std::hash::Hash,
        V: Clone,
    {
        self.map.rl().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V>
    where
        K: std::cmp::Eq + std::hash::Hash,
    {
        self.map.wl().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V>
    where
        K: std::cmp::Eq + std::hash::Hash,
    {
        self.map.wl().remove(key)
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.map.rl().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.map.rl().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.rl().is_empty()
    }

    pub fn clear(&self) {
        self.map.wl().clear();
    }
}

impl<K, V> Default for ConcurrentHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
