//! Constant pool for bytecode modules

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::operand::ConstantIndex;

/// String table referenced by index from instruction operands.
///
/// Indices never change once a pool is built or decoded. Lookups are
/// lenient: any index outside the pool resolves to the empty string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConstantPool {
    strings: Vec<String>,
    #[serde(skip)]
    lookup: FxHashMap<String, u32>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create constant pool with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: Vec::with_capacity(capacity),
            lookup: FxHashMap::default(),
        }
    }

    /// Rebuild a pool from decoded strings, keeping their order verbatim.
    ///
    /// Duplicates in the input are kept so that every decoded index still
    /// points at the same string.
    pub fn from_strings(strings: Vec<String>) -> Self {
        let mut lookup = FxHashMap::default();
        for (idx, s) in strings.iter().enumerate() {
            lookup.entry(s.clone()).or_insert(idx as u32);
        }
        Self { strings, lookup }
    }

    /// Add a string to the pool, returns its index
    ///
    /// Deduplicates identical strings.
    pub fn add(&mut self, s: &str) -> ConstantIndex {
        if let Some(&idx) = self.lookup.get(s) {
            return ConstantIndex::new(idx as i32);
        }

        let idx = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), idx);
        ConstantIndex::new(idx as i32)
    }

    /// Resolve an index, returning `""` when it is out of range
    #[inline]
    pub fn get(&self, index: ConstantIndex) -> &str {
        usize::try_from(index.index())
            .ok()
            .and_then(|i| self.strings.get(i))
            .map_or("", String::as_str)
    }

    /// Number of strings in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over strings in index order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }
}
