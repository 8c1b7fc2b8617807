//! Hybrid array+hash table.
//!
//! Non-negative integer keys below the array length live in the array part.
//! Every other key lives in the hash part under a string form (see
//! [`TableKey::normalize`]), except the `Null` key, which has a dedicated slot.
//! Integer keys at or above the array length always live in the hash part.

use crate::hash::HashTable;
use crate::number::{format_float, parse_int_exact};
use crate::string::Str;
use crate::value::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Minimum load the array part must keep after admitting a new key.
pub const MIN_ARRAY_LOAD: f64 = 0.5;

/// A key after normalization across the Int/Float/Str domains.
#[derive(Clone, Debug, PartialEq)]
pub enum TableKey {
    Null,
    Index(i64),
    Hashed(Rc<Str>),
}

impl TableKey {
    /// Normalize a key. Integral floats and strings that spell an integer
    /// collapse to `Index`, so `t[5]`, `t[5.0]` and `t["5"]` share a slot.
    /// Other kinds are hashed without the integer parse.
    pub fn normalize(key: &Value) -> TableKey {
        match key {
            Value::Null => TableKey::Null,
            Value::Int(i) => TableKey::Index(*i),
            Value::Float(f) => match float_to_index(*f) {
                Some(i) => TableKey::Index(i),
                None => TableKey::Hashed(Rc::new(Str::from(format_float(*f)))),
            },
            Value::Str(s) => match parse_int_exact(s.as_bytes()) {
                Some(i) => TableKey::Index(i),
                None => TableKey::Hashed(Rc::clone(s)),
            },
            // Slashes keep `/abc/` apart from the string "abc".
            Value::Regex(src) => {
                let mut bytes = Vec::with_capacity(src.len() + 2);
                bytes.push(b'/');
                bytes.extend_from_slice(src.as_bytes());
                bytes.push(b'/');
                TableKey::Hashed(Rc::new(Str::from(bytes)))
            }
            // Ranges and identity tags never spell an integer.
            other => TableKey::Hashed(Rc::new(Str::from(other.to_bytes()))),
        }
    }
}

fn float_to_index(f: f64) -> Option<i64> {
    // -2^63 <= f < 2^63 is exactly the set of floats that fit in i64.
    if f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn index_key(i: i64) -> Rc<Str> {
    Rc::new(Str::from(i.to_string()))
}

/// The language's compound value.
#[derive(Debug, Default)]
pub struct Table {
    /// `None` marks a slot that was never assigned (or was deleted).
    array: Vec<Option<Value>>,
    /// Number of `Some` slots in `array`.
    array_used: usize,
    hash: HashTable,
    /// Number of hash-part keys that spell an integer.
    hash_index_keys: usize,
    null_slot: Option<Value>,
    array_live: Cell<usize>,
    array_dirty: Cell<bool>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// A table whose array part is allocated once with exactly `n` slots.
    pub fn with_array(n: usize) -> Self {
        let mut array = Vec::with_capacity(n);
        array.resize_with(n, || None);
        Table {
            array,
            ..Table::default()
        }
    }

    pub fn array_capacity(&self) -> usize {
        self.array.len()
    }

    pub fn hash_part(&self) -> &HashTable {
        &self.hash
    }

    /// Look up `key` for reading.
    pub fn lookup(&self, key: &Value) -> Option<&Value> {
        match TableKey::normalize(key) {
            TableKey::Null => self.null_slot.as_ref(),
            TableKey::Index(i) => self.lookup_index(i),
            TableKey::Hashed(s) => self.hash.lookup(&s),
        }
    }

    /// The value under `key`, or `Null`.
    pub fn get(&self, key: &Value) -> Value {
        self.lookup(key).cloned().unwrap_or_default()
    }

    /// Mutable access to an existing entry. `for_insert` marks the logical
    /// length stale.
    pub fn lookup_mut(&mut self, key: &Value, for_insert: bool) -> Option<&mut Value> {
        match TableKey::normalize(key) {
            TableKey::Null => self.null_slot.as_mut(),
            TableKey::Index(i) => {
                if for_insert {
                    self.array_dirty.set(true);
                }
                if i >= 0 && (i as u64) < self.array.len() as u64 {
                    self.array[i as usize].as_mut()
                } else if self.hash_index_keys > 0 {
                    self.hash.lookup_mut(&index_key(i), for_insert)
                } else {
                    None
                }
            }
            TableKey::Hashed(s) => self.hash.lookup_mut(&s, for_insert),
        }
    }

    /// The slot for `key`, created holding `Null` if absent. May grow the
    /// array part.
    pub fn entry(&mut self, key: &Value) -> &mut Value {
        match TableKey::normalize(key) {
            TableKey::Null => self.null_slot.get_or_insert(Value::Null),
            TableKey::Index(i) => self.index_entry(i),
            TableKey::Hashed(s) => self.hash.entry(&s),
        }
    }

    /// Store `value` under `key`, returning the stored slot.
    pub fn insert(&mut self, key: &Value, value: Value) -> &mut Value {
        let slot = self.entry(key);
        *slot = value;
        slot
    }

    /// Store at array index `i` without running the growth heuristic.
    /// Used to fill a table created by `with_array`.
    pub fn insert_forced(&mut self, i: usize, value: Value) {
        if i < self.array.len() {
            self.array_dirty.set(true);
            if self.array[i].is_none() {
                self.array_used += 1;
            }
            self.array[i] = Some(value);
        } else {
            self.insert(&Value::Int(i as i64), value);
        }
    }

    /// Remove `key` entirely. Returns the removed value.
    pub fn delete(&mut self, key: &Value) -> Option<Value> {
        match TableKey::normalize(key) {
            TableKey::Null => self.null_slot.take(),
            TableKey::Index(i) => {
                if i >= 0 && (i as u64) < self.array.len() as u64 {
                    let old = self.array[i as usize].take();
                    if old.is_some() {
                        self.array_used -= 1;
                        self.array_dirty.set(true);
                    }
                    old
                } else if self.hash_index_keys > 0 {
                    let old = self.hash.delete(&index_key(i));
                    if old.is_some() {
                        self.hash_index_keys -= 1;
                    }
                    old
                } else {
                    None
                }
            }
            TableKey::Hashed(s) => self.hash.delete(&s),
        }
    }

    /// Number of entries whose value is not `Null`.
    pub fn length(&self) -> usize {
        if self.array_dirty.get() {
            let live = self
                .array
                .iter()
                .filter(|v| matches!(v, Some(v) if !v.is_null()))
                .count();
            self.array_live.set(live);
            self.array_dirty.set(false);
        }
        let null = usize::from(matches!(&self.null_slot, Some(v) if !v.is_null()));
        self.array_live.get() + self.hash.length() + null
    }

    /// Every live key: the null key, then array indices as `Int`, then
    /// hash-part keys as `Str`.
    pub fn collect_keys(&self) -> Vec<Value> {
        let mut keys = Vec::with_capacity(self.length());
        if matches!(&self.null_slot, Some(v) if !v.is_null()) {
            keys.push(Value::Null);
        }
        for (i, slot) in self.array.iter().enumerate() {
            if matches!(slot, Some(v) if !v.is_null()) {
                keys.push(Value::Int(i as i64));
            }
        }
        for (k, v) in self.hash.iter() {
            if !v.is_null() {
                keys.push(Value::Str(Rc::clone(k)));
            }
        }
        keys
    }

    fn lookup_index(&self, i: i64) -> Option<&Value> {
        if i >= 0 && (i as u64) < self.array.len() as u64 {
            self.array[i as usize].as_ref()
        } else if self.hash_index_keys > 0 {
            self.hash.lookup(&index_key(i))
        } else {
            None
        }
    }

    fn index_entry(&mut self, i: i64) -> &mut Value {
        self.array_dirty.set(true);
        if i >= 0 {
            let k = i as usize;
            if k >= self.array.len() && self.admits(k) {
                self.grow_array(k + 1);
            }
            if k < self.array.len() {
                if self.array[k].is_none() {
                    self.array_used += 1;
                }
                return self.array[k].get_or_insert(Value::Null);
            }
        }
        let key = index_key(i);
        if !self.hash.contains(&key) {
            self.hash_index_keys += 1;
        }
        self.hash.entry(&key)
    }

    /// Would the array part stay at least `MIN_ARRAY_LOAD` full if it grew
    /// just far enough to hold index `k`?
    fn admits(&self, k: usize) -> bool {
        (self.array_used + 1) as f64 / (k as f64 + 1.0) >= MIN_ARRAY_LOAD
    }

    /// Grow the array part to `new_len` slots and pull any integer keys in
    /// the new range out of the hash part.
    fn grow_array(&mut self, new_len: usize) {
        let old_len = self.array.len();
        trace!(old_len, new_len, "array part growth");
        self.array.resize_with(new_len, || None);
        if self.hash_index_keys == 0 {
            return;
        }
        let moved: Vec<(Rc<Str>, usize)> = self
            .hash
            .iter()
            .filter_map(|(k, _)| {
                let i = parse_int_exact(k.as_bytes())?;
                let i = usize::try_from(i).ok()?;
                (old_len..new_len).contains(&i).then(|| (Rc::clone(k), i))
            })
            .collect();
        for (key, i) in moved {
            if let Some(v) = self.hash.delete(&key) {
                self.hash_index_keys -= 1;
                self.array[i] = Some(v);
                self.array_used += 1;
            }
        }
    }
}
