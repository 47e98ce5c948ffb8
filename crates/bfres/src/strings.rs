//! Pooled string storage.
//!
//! Every single byte string referenced by a file lives in one pool after the records. The saver
//! collects strings by content while records are written and emits each distinct string once, in
//! ordinal order, after which all pointers to it are patched.
//!
//! | Layout | Block header                                 | Entry                                   | Pointer target |
//! |--------|----------------------------------------------|-----------------------------------------|----------------|
//! | WiiU   | none                                         | u32 length, bytes, 0, aligned to 4      | first byte     |
//! | Switch | `_STR`, u32 block size, u64 count excl. `""` | u16 length, bytes, 0, aligned to 2      | length prefix  |

use std::collections::HashMap;

use indexmap::IndexMap;

/// Signature of the Switch string block
pub const STRING_TABLE_MAGIC: &[u8; 4] = b"_STR";

/// Strings referenced by a file being saved, with the pointer slots waiting on each
#[derive(Debug, Default)]
pub struct StringPool<'a> {
    entries: IndexMap<&'a str, Vec<u64>>,
}

impl<'a> StringPool<'a> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the pointer at `slot` should point at `value`.
    pub fn add(&mut self, value: &'a str, slot: u64) {
        self.entries.entry(value).or_default().push(slot);
    }

    /// Make sure `value` is emitted even if nothing points at it.
    pub fn ensure(&mut self, value: &'a str) {
        self.entries.entry(value).or_default();
    }

    /// Number of distinct strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no strings have been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the distinct strings in emission order, together with their pointer slots.
    pub fn drain_sorted(&mut self) -> Vec<(&'a str, Vec<u64>)> {
        self.entries.sort_keys();
        self.entries.drain(..).collect()
    }
}

/// Strings already decoded during one load, keyed by the position they were read from
#[derive(Debug, Default)]
pub struct StringCache {
    strings: HashMap<u64, String>,
}

impl StringCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the string stored at `position`.
    pub fn get(&self, position: u64) -> Option<&str> {
        self.strings.get(&position).map(String::as_str)
    }

    /// Remember the string stored at `position`.
    pub fn insert(&mut self, position: u64, value: String) {
        self.strings.insert(position, value);
    }

    /// Number of cached strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{StringCache, StringPool};

    #[test]
    fn pool_deduplicates_by_content() {
        let owned = String::from("FMAT");
        let mut pool = StringPool::new();
        pool.add("FMAT", 0x10);
        pool.add("Mt_Body", 0x18);
        pool.add(owned.as_str(), 0x20);

        assert_eq!(pool.len(), 2);
        assert_eq!(
            pool.drain_sorted(),
            vec![("FMAT", vec![0x10, 0x20]), ("Mt_Body", vec![0x18])]
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn pool_sorts_ordinally() {
        let mut pool = StringPool::new();
        for (slot, value) in ["b", "B", "ab", "a"].into_iter().enumerate() {
            pool.add(value, slot as u64);
        }
        pool.ensure("");

        let order: Vec<_> = pool.drain_sorted().into_iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["", "B", "a", "ab", "b"]);
    }

    #[test]
    fn cache_by_position() {
        let mut cache = StringCache::new();
        cache.insert(0x40, "skl_root".to_owned());
        assert_eq!(cache.get(0x40), Some("skl_root"));
        assert_eq!(cache.get(0x42), None);
        assert_eq!(cache.len(), 1);
    }
}
