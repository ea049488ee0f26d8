//! Thread-Safe Storage Engine with Expiry Support
//!
//! The engine owns two independent maps, each behind its own `RwLock`:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       StorageEngine                          │
//! │  ┌───────────────────────────┐  ┌─────────────────────────┐  │
//! │  │ strings: RwLock<          │  │ hashes: RwLock<         │  │
//! │  │   HashMap<key, Entry>>    │  │   HashMap<name,         │  │
//! │  │                           │  │     HashMap<field,      │  │
//! │  │                           │  │       Entry>>>          │  │
//! │  └───────────────────────────┘  └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads (GET, HGET, HGETALL, KEYS) take the shared lock for one map
//! lookup plus the expiry check. Writes (SET, HSET, the sweep) take the
//! exclusive lock for one mutation. No lock is held across a whole request
//! and there is no ordering between the two maps.
//!
//! An entry whose deadline has passed is absent for every read even while
//! it is still physically stored. GET removes such an entry on the spot;
//! the sweeper removes the rest.

use crate::storage::pattern::GlobPattern;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Payload kinds an entry can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    String(Bytes),
}

impl StoredValue {
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            StoredValue::String(b) => b,
        }
    }
}

/// One stored datum with its creation time and optional deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: StoredValue,
    pub created_at: Instant,
    /// None = never expires
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Bytes) -> Self {
        Self {
            value: StoredValue::String(value),
            created_at: Instant::now(),
            expires_at: None,
        }
    }

    /// Creates an entry that expires `ttl` from now. A zero TTL is already
    /// expired; a TTL past what `Instant` can represent never expires.
    pub fn with_ttl(value: Bytes, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value: StoredValue::String(value),
            created_at: now,
            expires_at: now.checked_add(ttl),
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

type StringMap = HashMap<Bytes, Entry>;
type HashMapStore = HashMap<Bytes, HashMap<Bytes, Entry>>;

/// Shared key-value store for every connection and the sweeper.
///
/// Wrap it in an `Arc` and hand clones to the command handlers. Separate
/// instances are fully independent, which is what the tests rely on.
///
/// # Example
///
/// ```
/// use ferrokv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("foo"), Bytes::from("bar"));
/// assert_eq!(engine.get(&Bytes::from("foo")), Some(Bytes::from("bar")));
///
/// engine.hset(Bytes::from("user"), vec![(Bytes::from("name"), Bytes::from("ada"))]);
/// assert_eq!(
///     engine.hget(&Bytes::from("user"), &Bytes::from("name")),
///     Some(Bytes::from("ada"))
/// );
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    strings: RwLock<StringMap>,
    hashes: RwLock<HashMapStore>,

    /// Entries removed because their deadline passed (lazy + active)
    expired_count: AtomicU64,
}

/// Point-in-time counters for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// String keys physically stored, expired-but-unswept included
    pub keys: usize,
    pub hashes: usize,
    pub expired: u64,
}

impl StorageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding a guard leaves the maps structurally intact, so
    // a poisoned lock is still safe to use.
    fn strings_read(&self) -> RwLockReadGuard<'_, StringMap> {
        self.strings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn strings_write(&self) -> RwLockWriteGuard<'_, StringMap> {
        self.strings.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes_read(&self) -> RwLockReadGuard<'_, HashMapStore> {
        self.hashes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes_write(&self) -> RwLockWriteGuard<'_, HashMapStore> {
        self.hashes.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // STRING OPERATIONS
    // ========================================================================

    /// Stores `value` under `key` with no expiry, replacing any previous
    /// entry.
    ///
    /// Returns `true` if the key was not present before.
    pub fn set(&self, key: Bytes, value: Bytes) -> bool {
        self.insert(key, Entry::new(value))
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        self.insert(key, Entry::with_ttl(value, ttl))
    }

    fn insert(&self, key: Bytes, entry: Entry) -> bool {
        self.strings_write().insert(key, entry).is_none()
    }

    /// Returns the value for `key`, or `None` if it is absent or expired.
    ///
    /// An expired entry found here is removed immediately.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        {
            let strings = self.strings_read();
            match strings.get(key) {
                Some(entry) if !entry.is_expired() => {
                    return Some(entry.value.as_bytes().clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: retake as writer. Another task may have replaced the
        // entry in between, so check again.
        let mut strings = self.strings_write();
        match strings.get(key) {
            Some(entry) if entry.is_expired() => {
                strings.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => Some(entry.value.as_bytes().clone()),
            None => None,
        }
    }

    /// Returns a copy of the live entry for `key`, metadata included.
    pub fn get_entry(&self, key: &Bytes) -> Option<Entry> {
        self.strings_read()
            .get(key)
            .filter(|entry| !entry.is_expired())
            .cloned()
    }

    /// Removes `key`. Returns `true` if a live entry was removed.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.strings_write()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Lists live string keys matching a glob pattern.
    ///
    /// `*` lists everything. `?`, `[...]` classes and `\` escapes are also
    /// understood.
    pub fn keys(&self, pattern: &[u8]) -> Vec<Bytes> {
        let pattern = GlobPattern::new(pattern);
        let now = Instant::now();

        self.strings_read()
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Physically removes every expired string entry.
    ///
    /// Hash fields are not swept. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Instant::now();
        let mut strings = self.strings_write();
        let before = strings.len();

        strings.retain(|_, entry| !entry.is_expired_at(now));

        let removed = (before - strings.len()) as u64;
        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }
        removed
    }

    // ========================================================================
    // HASH OPERATIONS
    // ========================================================================

    /// Writes every field/value pair into the hash `name`, creating it if
    /// needed. Fields carry no expiry.
    ///
    /// Returns how many of the fields were new.
    pub fn hset(&self, name: Bytes, pairs: Vec<(Bytes, Bytes)>) -> usize {
        let mut hashes = self.hashes_write();
        let fields = hashes.entry(name).or_default();

        let mut added = 0;
        for (field, value) in pairs {
            if fields.insert(field, Entry::new(value)).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Returns the value of `field` in hash `name`.
    pub fn hget(&self, name: &Bytes, field: &Bytes) -> Option<Bytes> {
        self.hashes_read()
            .get(name)
            .and_then(|fields| fields.get(field))
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.as_bytes().clone())
    }

    /// Returns every live field/value pair of hash `name`, in no
    /// particular order, or `None` if the hash does not exist.
    ///
    /// A hash whose fields were all deleted still exists and yields an
    /// empty list.
    pub fn hgetall(&self, name: &Bytes) -> Option<Vec<(Bytes, Bytes)>> {
        let now = Instant::now();
        self.hashes_read().get(name).map(|fields| {
            fields
                .iter()
                .filter(|(_, entry)| !entry.is_expired_at(now))
                .map(|(field, entry)| (field.clone(), entry.value.as_bytes().clone()))
                .collect()
        })
    }

    /// Removes one field from hash `name`. The hash itself is kept even if
    /// it becomes empty.
    pub fn hdel(&self, name: &Bytes, field: &Bytes) -> bool {
        self.hashes_write()
            .get_mut(name)
            .and_then(|fields| fields.remove(field))
            .is_some()
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Number of string entries physically stored.
    pub fn len(&self) -> usize {
        self.strings_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hash_count(&self) -> usize {
        self.hashes_read().len()
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            hashes: self.hash_count(),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}
