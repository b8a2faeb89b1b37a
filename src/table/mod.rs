//! Open-addressed hash table keyed by interned strings.
//!
//! Used twice by the VM: as the intern index (values unused) and as the
//! globals map. Keys compare by object handle; the cached hash only picks the
//! starting slot.

use crate::object::{Arena, Obj, ObjRef};
use crate::value::Value;

const MIN_CAPACITY: usize = 8;

/// An interned string handle together with its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    obj: ObjRef,
    hash: u32,
}

impl Key {
    pub fn new(obj: ObjRef, hash: u32) -> Self {
        Key { obj, hash }
    }

    pub fn obj(self) -> ObjRef {
        self.obj
    }

    pub fn hash(self) -> u32 {
        self.hash
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Slot {
    #[default]
    Empty,
    Tombstone,
    Occupied { key: Key, value: Value },
}

/// Linear-probing table with tombstone deletion.
///
/// Capacity is zero or a power of two, so `hash & (capacity - 1)` is the same
/// slot as `hash % capacity`. Live entries plus tombstones never exceed three
/// quarters of the capacity, which guarantees every probe sequence reaches an
/// empty slot.
#[derive(Debug, Clone, Default)]
pub struct Table {
    slots: Vec<Slot>,
    live: usize,
    tombstones: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        if self.live == 0 {
            return None;
        }
        match self.slots[find_slot(&self.slots, key)] {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. Returns `true` when the key was not present.
    pub fn set(&mut self, key: Key, value: Value) -> bool {
        if (self.live + self.tombstones + 1) * 4 > self.capacity() * 3 {
            self.grow();
        }

        let index = find_slot(&self.slots, key);
        let is_new = match self.slots[index] {
            Slot::Empty => {
                self.live += 1;
                true
            }
            Slot::Tombstone => {
                self.live += 1;
                self.tombstones -= 1;
                true
            }
            Slot::Occupied { .. } => false,
        };
        self.slots[index] = Slot::Occupied { key, value };
        is_new
    }

    /// Overwrite an existing entry. Returns `false`, leaving the table
    /// untouched, when the key is absent.
    pub fn assign(&mut self, key: Key, value: Value) -> bool {
        if self.live == 0 {
            return false;
        }
        let index = find_slot(&self.slots, key);
        match &mut self.slots[index] {
            Slot::Occupied { value: slot, .. } => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Remove an entry, leaving a tombstone so later probes keep going.
    pub fn delete(&mut self, key: Key) -> bool {
        if self.live == 0 {
            return false;
        }
        let index = find_slot(&self.slots, key);
        if !matches!(self.slots[index], Slot::Occupied { .. }) {
            return false;
        }
        self.slots[index] = Slot::Tombstone;
        self.live -= 1;
        self.tombstones += 1;
        true
    }

    /// Copy every live entry into `to`, overwriting existing keys.
    pub fn add_all(&self, to: &mut Table) {
        for (key, value) in self.iter() {
            to.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Value)> + '_ {
        self.slots.iter().filter_map(|slot| match *slot {
            Slot::Occupied { key, value } => Some((key, value)),
            _ => None,
        })
    }

    /// Content lookup used for interning: finds a key whose string equals
    /// `chars` without needing a handle first.
    pub fn find_string(&self, arena: &Arena, chars: &str, hash: u32) -> Option<ObjRef> {
        if self.live == 0 {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            match self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied { key, .. } if key.hash == hash => {
                    let same = arena
                        .get(key.obj)
                        .and_then(Obj::as_string)
                        .is_some_and(|s| s.as_str() == chars);
                    if same {
                        return Some(key.obj);
                    }
                }
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Rehash into a fresh slot array, dropping tombstones. Capacity doubles
    /// unless the tombstones alone were what filled the table.
    fn grow(&mut self) {
        let capacity = if self.slots.is_empty() {
            MIN_CAPACITY
        } else if (self.live + 1) * 8 <= self.capacity() * 3 {
            self.capacity()
        } else {
            self.capacity() * 2
        };

        let mut slots = vec![Slot::Empty; capacity];
        for slot in &self.slots {
            if let Slot::Occupied { key, value } = *slot {
                let index = find_slot(&slots, key);
                slots[index] = Slot::Occupied { key, value };
            }
        }
        self.slots = slots;
        self.tombstones = 0;
    }
}

/// Slot holding `key`, or the slot an insert of `key` should use: the first
/// tombstone passed, else the empty slot that ended the probe.
fn find_slot(slots: &[Slot], key: Key) -> usize {
    let mask = slots.len() - 1;
    let mut index = key.hash as usize & mask;
    let mut tombstone = None;
    loop {
        match slots[index] {
            Slot::Empty => return tombstone.unwrap_or(index),
            Slot::Tombstone => {
                tombstone.get_or_insert(index);
            }
            Slot::Occupied { key: k, .. } if k == key => return index,
            Slot::Occupied { .. } => {}
        }
        index = (index + 1) & mask;
    }
}
