//! Open-addressing string-keyed hash table.
//!
//! Linear probing from `hash & mask`. Deleted slots become tombstones so
//! probe chains running through them stay intact; tombstones are dropped
//! on the next rehash. Capacity is 0 or a power of two >= 8, and the table
//! grows before an insert would reach a 0.6 load factor.

use crate::string::Str;
use crate::value::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Grow once `capacity * LOAD_FACTOR <= used + 1`.
pub const LOAD_FACTOR: f64 = 0.6;
/// Capacity of the first allocation.
pub const MIN_CAPACITY: usize = 8;

#[derive(Debug)]
struct Entry {
    key: Rc<Str>,
    value: Value,
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Tombstone,
    Full(Entry),
}

/// A `Str -> Value` map.
///
/// `length()` counts entries whose value is not `Null`; storing `Null`
/// keeps the key but removes it from the logical count. The count is cached
/// and recomputed only after a mutable access.
#[derive(Debug, Default)]
pub struct HashTable {
    slots: Vec<Slot>,
    occupied: usize,
    tombstones: usize,
    live: Cell<usize>,
    dirty: Cell<bool>,
}

impl HashTable {
    pub fn new() -> Self {
        HashTable::default()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of keys present, including those holding `Null`.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn contains(&self, key: &Str) -> bool {
        self.find(key).is_some()
    }

    /// Look up `key` for reading.
    pub fn lookup(&self, key: &Str) -> Option<&Value> {
        let i = self.find(key)?;
        match &self.slots[i] {
            Slot::Full(e) => Some(&e.value),
            _ => None,
        }
    }

    /// Look up `key` for in-place modification. `for_insert` marks the
    /// logical length stale, since the caller may store or clear a value.
    pub fn lookup_mut(&mut self, key: &Str, for_insert: bool) -> Option<&mut Value> {
        if for_insert {
            self.dirty.set(true);
        }
        let i = self.find(key)?;
        match &mut self.slots[i] {
            Slot::Full(e) => Some(&mut e.value),
            _ => None,
        }
    }

    /// The value slot for `key`, created holding `Null` if absent.
    pub fn entry(&mut self, key: &Rc<Str>) -> &mut Value {
        self.dirty.set(true);
        let i = match self.find(key) {
            Some(i) => i,
            None => self.claim(Rc::clone(key)),
        };
        match &mut self.slots[i] {
            Slot::Full(e) => &mut e.value,
            _ => unreachable!(),
        }
    }

    /// Store `value` under `key`, returning the stored slot.
    pub fn insert(&mut self, key: &Rc<Str>, value: Value) -> &mut Value {
        let slot = self.entry(key);
        *slot = value;
        slot
    }

    /// Remove `key`, leaving a tombstone. Returns the removed value.
    pub fn delete(&mut self, key: &Str) -> Option<Value> {
        let i = self.find(key)?;
        self.dirty.set(true);
        self.occupied -= 1;
        self.tombstones += 1;
        match std::mem::replace(&mut self.slots[i], Slot::Tombstone) {
            Slot::Full(e) => Some(e.value),
            _ => None,
        }
    }

    /// Number of entries whose value is not `Null`.
    pub fn length(&self) -> usize {
        if self.dirty.get() {
            let live = self.iter().filter(|(_, v)| !v.is_null()).count();
            self.live.set(live);
            self.dirty.set(false);
        }
        self.live.get()
    }

    /// All entries in slot order, `Null`-valued ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<Str>, &Value)> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Full(e) => Some((&e.key, &e.value)),
            _ => None,
        })
    }

    fn find(&self, key: &Str) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let hash = key.hash_code();
        let mask = self.slots.len() - 1;
        let mut i = hash as usize & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Full(e) if e.key.hash_code() == hash && e.key.as_bytes() == key.as_bytes() => {
                    return Some(i);
                }
                _ => {}
            }
            i = (i + 1) & mask;
        }
        None
    }

    /// Place a new key, growing first if the load factor demands it.
    fn claim(&mut self, key: Rc<Str>) -> usize {
        let used = self.occupied + self.tombstones;
        if (self.capacity() as f64) * LOAD_FACTOR <= (used + 1) as f64 {
            self.rehash();
        }
        let i = self.free_slot(key.hash_code());
        if matches!(self.slots[i], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[i] = Slot::Full(Entry {
            key,
            value: Value::Null,
        });
        self.occupied += 1;
        i
    }

    /// First empty or tombstoned slot on the probe sequence for `hash`.
    fn free_slot(&self, hash: u32) -> usize {
        let mask = self.slots.len() - 1;
        let mut i = hash as usize & mask;
        while let Slot::Full(_) = self.slots[i] {
            i = (i + 1) & mask;
        }
        i
    }

    fn rehash(&mut self) {
        let old_cap = self.capacity();
        let new_cap = if old_cap == 0 {
            MIN_CAPACITY
        } else if self.tombstones > self.occupied {
            old_cap
        } else {
            old_cap * 2
        };
        trace!(
            old_cap,
            new_cap,
            entries = self.occupied,
            tombstones = self.tombstones,
            "hash part rehash"
        );
        let old = std::mem::take(&mut self.slots);
        self.slots.resize_with(new_cap, Slot::default);
        self.tombstones = 0;
        for slot in old {
            if let Slot::Full(e) = slot {
                let i = self.free_slot(e.key.hash_code());
                self.slots[i] = Slot::Full(e);
            }
        }
    }
}
