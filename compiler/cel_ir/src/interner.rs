//! String interner.
//!
//! The core is single-threaded per compilation (see the concurrency notes
//! in the design docs), so unlike a server-style compiler this interner
//! needs no sharding or locking: one [`StringInterner`] is owned by one
//! `Source`/parse/check pipeline.

use super::Name;
use rustc_hash::FxHashMap;

/// Append-only string interner producing O(1)-comparable [`Name`]s.
#[derive(Debug)]
pub struct StringInterner {
    map: FxHashMap<Box<str>, u32>,
    strings: Vec<Box<str>>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        let empty: Box<str> = "".into();
        interner.map.insert(empty.clone(), 0);
        interner.strings.push(empty);
        interner
    }

    /// Intern `s`, returning its `Name`. Interning the same content twice
    /// always returns the same `Name`.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&idx) = self.map.get(s) {
            return Name::from_raw(idx);
        }
        let idx = self.strings.len() as u32;
        let owned: Box<str> = s.into();
        self.strings.push(owned.clone());
        self.map.insert(owned, idx);
        Name::from_raw(idx)
    }

    /// Resolve a `Name` back to its string content.
    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.raw() as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
