//! Heap objects and the arena that owns them.
//!
//! Every object a VM creates lives in one `Arena` for the lifetime of that VM
//! and is addressed by an `ObjRef` index. Nothing is freed individually;
//! dropping the `Heap` releases everything at once.

use crate::table::{Key, Table};
use crate::value::Value;

/// Stable handle to an object in an `Arena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(u32);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub enum Obj {
    String(ObjString),
}

impl Obj {
    pub fn as_string(&self) -> Option<&ObjString> {
        match self {
            Obj::String(s) => Some(s),
        }
    }
}

/// Immutable string contents with their hash computed once at allocation.
#[derive(Debug)]
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

/// 32-bit FNV-1a.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in chars.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

#[derive(Debug, Default)]
pub struct Arena {
    objects: Vec<Obj>,
}

impl Arena {
    fn alloc(&mut self, obj: Obj) -> ObjRef {
        let index = u32::try_from(self.objects.len()).expect("object arena exhausted");
        self.objects.push(obj);
        ObjRef(index)
    }

    /// `None` when `r` was issued by a different arena.
    pub fn get(&self, r: ObjRef) -> Option<&Obj> {
        self.objects.get(r.index())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, &Obj)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjRef(i as u32), o))
    }
}

/// The arena plus the intern index over its strings.
#[derive(Debug, Default)]
pub struct Heap {
    arena: Arena,
    strings: Table,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical string for `chars`, copying it into the heap only
    /// when it has not been seen before.
    pub fn intern(&mut self, chars: &str) -> ObjRef {
        let hash = hash_string(chars);
        match self.strings.find_string(&self.arena, chars, hash) {
            Some(existing) => existing,
            None => self.alloc_string(chars.into(), hash),
        }
    }

    /// Like `intern`, but takes ownership of an already-built buffer. The
    /// buffer is dropped if an equal string already exists.
    pub fn take_string(&mut self, chars: String) -> ObjRef {
        let hash = hash_string(&chars);
        match self.strings.find_string(&self.arena, &chars, hash) {
            Some(existing) => existing,
            None => self.alloc_string(chars.into_boxed_str(), hash),
        }
    }

    fn alloc_string(&mut self, chars: Box<str>, hash: u32) -> ObjRef {
        let r = self.arena.alloc(Obj::String(ObjString { chars, hash }));
        self.strings.set(Key::new(r, hash), Value::Nil);
        r
    }

    /// Look up an interned string without allocating.
    pub fn find_interned(&self, chars: &str) -> Option<ObjRef> {
        self.strings.find_string(&self.arena, chars, hash_string(chars))
    }

    pub fn get(&self, r: ObjRef) -> Option<&Obj> {
        self.arena.get(r)
    }

    pub fn as_string(&self, r: ObjRef) -> Option<&ObjString> {
        self.arena.get(r).and_then(Obj::as_string)
    }

    /// Table key for a string object, or `None` for other object kinds.
    pub fn key(&self, r: ObjRef) -> Option<Key> {
        self.as_string(r).map(|s| Key::new(r, s.hash()))
    }

    pub fn object_count(&self) -> usize {
        self.arena.len()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn strings(&self) -> &Table {
        &self.strings
    }
}
