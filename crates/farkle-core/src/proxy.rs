//! Thin aliases over the standard collections used throughout the crate.
//!
//! The grammar builder and binary reader only ever need deterministic
//! iteration order and straightforward ownership; there's no call for a
//! hashing crate here, so these are plain `std` containers named for the role
//! they play rather than their implementation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub type Array<T> = Vec<T>;
pub type OrderedMap<K, V> = BTreeMap<K, V>;
pub type OrderedSet<T> = BTreeSet<T>;
pub type Map<K, V> = HashMap<K, V>;
pub type Set<T> = HashSet<T>;

/// A deduplicating string interner. Grammar symbol names, special names, and
/// group names all flow through here before landing in the string heap, so
/// equal names always compare equal by handle rather than by content.
#[derive(Debug, Default, Clone)]
pub struct StringStore {
  strings: Array<String>,
  lookup: Map<String, IString>,
}

/// A handle into a [StringStore]. `0` is never issued by [StringStore::intern]
/// and is reserved to mean "no name".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IString(pub u32);

impl IString {
  pub const NONE: IString = IString(0);

  pub fn is_none(&self) -> bool {
    self.0 == 0
  }
}

impl StringStore {
  pub fn new() -> Self {
    Self { strings: vec![String::new()], lookup: Map::default() }
  }

  pub fn intern(&mut self, s: &str) -> IString {
    if let Some(id) = self.lookup.get(s) {
      return *id;
    }
    let id = IString(self.strings.len() as u32);
    self.strings.push(s.to_string());
    self.lookup.insert(s.to_string(), id);
    id
  }

  pub fn get(&self, id: IString) -> &str {
    self.strings.get(id.0 as usize).map(|s| s.as_str()).unwrap_or("")
  }

  /// Reverse lookup: the handle already assigned to `s`, if any. Used by
  /// special-name resolution, which only ever reads names a build already
  /// interned rather than interning new ones on the fly.
  pub fn lookup(&self, s: &str) -> Option<IString> {
    self.lookup.get(s).copied()
  }
}
