//! Named collections stored as binary Patricia tries.
//!
//! Every named child collection in a BFRES file is stored as a `ResDict`: a flat array of trie nodes
//! starting with a synthetic root node that carries no key. Each node stores the bit position at which
//! its two subtrees diverge (its *reference*) and the indices of its left and right children.
//!
//! | Offset (bytes) | Field       | Description                                         |
//! |----------------|-------------|-----------------------------------------------------|
//! | 0x0000         | Reference   | 4 bytes: Bit position tested at this node           |
//! | 0x0004         | Left index  | 2 bytes: Child followed when the tested bit is 0    |
//! | 0x0006         | Right index | 2 bytes: Child followed when the tested bit is 1    |
//! | 0x0008         | Key         | Offset to the pooled key string                     |
//! | (WiiU only)    | Value       | Offset to the entry's data                          |
//!
//! The tested bit of a key is bit `reference & 7` of byte `reference >> 3`; bits past the end of the
//! key read as zero. The topology is recomputed from the final keys before every save, so editing a
//! dictionary only has to keep the keys unique.

use std::iter;

use indexmap::IndexMap;

use crate::error::{Error, NotFoundError, Result};

/// Signature of a Switch key dictionary
pub const DICT_MAGIC: &[u8; 4] = b"_DIC";

/// A single node of the on-disk trie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictNode {
    /// Bit position at which the subtrees below this node diverge
    pub reference: u32,
    /// Index of the child followed when the tested bit is 0
    pub left: u16,
    /// Index of the child followed when the tested bit is 1
    pub right: u16,
}

impl DictNode {
    /// The synthetic node at index 0.
    pub const ROOT: DictNode = DictNode {
        reference: u32::MAX,
        left: 0,
        right: 0,
    };

    fn child(&self, direction: u8) -> usize {
        if direction == 1 {
            self.right as usize
        } else {
            self.left as usize
        }
    }
}

/// An ordered, uniquely keyed collection backed by a binary Patricia trie
#[derive(Debug, Clone)]
pub struct ResDict<T> {
    entries: IndexMap<String, T>,
    nodes: Vec<DictNode>,
}

/// Dictionaries compare by their entries in order; the stored trie is derived from the keys.
impl<T: PartialEq> PartialEq for ResDict<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().eq(other.entries.iter())
    }
}

impl<T> Default for ResDict<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResDict<T> {
    /// Create an empty dictionary containing only the root node.
    pub fn new() -> Self {
        ResDict {
            entries: IndexMap::new(),
            nodes: vec![DictNode::ROOT],
        }
    }

    /// Assemble a dictionary from loaded nodes and entries in node order.
    pub(crate) fn from_parts(nodes: Vec<DictNode>, entries: IndexMap<String, T>) -> Self {
        ResDict { entries, nodes }
    }

    /// Number of entries, not counting the root node.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this dictionary contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The trie nodes as loaded or as produced by the last [`ResDict::rebuild`], root first.
    pub fn nodes(&self) -> &[DictNode] {
        &self.nodes
    }

    /// Add a new entry at the end of the collection.
    pub fn add(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(Error::DuplicateKey(key));
        }
        self.entries.insert(key, value);
        self.nodes.push(DictNode::ROOT);
        Ok(())
    }

    /// Whether an entry with this key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether an entry holds this value.
    pub fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.entries.values().any(|v| v == value)
    }

    /// Get the position of an entry by key, if it's present.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Get an entry's value by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Get a mutable reference to an entry's value by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    /// Search for an entry by key
    pub fn by_key(&self, key: &str) -> Result<&T> {
        self.get(key)
            .ok_or_else(|| NotFoundError::Key(key.to_owned()).into())
    }

    /// Get an entry by its position in the collection
    pub fn by_index(&self, index: usize) -> Result<(&str, &T)> {
        self.entries
            .get_index(index)
            .map(|(key, value)| (key.as_str(), value))
            .ok_or(NotFoundError::Index(index).into())
    }

    /// Replace the value stored under an existing key, returning the previous value.
    pub fn set(&mut self, key: &str, value: T) -> Result<T> {
        let slot = self
            .entries
            .get_mut(key)
            .ok_or_else(|| Error::from(NotFoundError::Key(key.to_owned())))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Replace the value stored at a position, returning the previous value.
    pub fn set_index(&mut self, index: usize, value: T) -> Result<T> {
        let (_, slot) = self
            .entries
            .get_index_mut(index)
            .ok_or(Error::from(NotFoundError::Index(index)))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Change the key of an entry, keeping its position.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        if old == new {
            return Ok(());
        }
        if self.entries.contains_key(&new) {
            return Err(Error::DuplicateKey(new));
        }
        let (index, _, value) = self
            .entries
            .shift_remove_full(old)
            .ok_or_else(|| Error::from(NotFoundError::Key(old.to_owned())))?;
        self.entries.shift_insert(index, new, value);
        Ok(())
    }

    /// Remove an entry by key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let (index, _, value) = self.entries.shift_remove_full(key)?;
        self.nodes.remove(index + 1);
        Some(value)
    }

    /// Remove an entry by position.
    pub fn remove_index(&mut self, index: usize) -> Option<(String, T)> {
        let entry = self.entries.shift_remove_index(index)?;
        self.nodes.remove(index + 1);
        Some(entry)
    }

    /// Remove the first entry holding this value.
    pub fn remove_value(&mut self, value: &T) -> Option<(String, T)>
    where
        T: PartialEq,
    {
        let index = self.entries.values().position(|v| v == value)?;
        self.remove_index(index)
    }

    /// Iterate over the entries in node order, root excluded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterate over the keys in node order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| key.as_str())
    }

    /// Iterate over the values in node order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Iterate mutably over the values in node order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    /// Recompute the trie from the current keys.
    pub fn rebuild(&mut self) -> Result<()> {
        self.nodes = build_nodes(self.keys())?;
        Ok(())
    }

    /// Walk the stored trie for `key` and return the value on the node it ends at.
    ///
    /// This follows the on-disk topology, so it only reflects edits after a [`ResDict::rebuild`].
    pub fn traverse(&self, key: &str) -> Result<&T> {
        let (_, found) = walk(&self.nodes, key.as_bytes(), |_| true)?;
        let entry = found
            .checked_sub(1)
            .and_then(|index| self.entries.get_index(index));
        match entry {
            Some((found_key, value)) if found_key == key => Ok(value),
            _ => Err(Error::LookupMismatch {
                expected: key.to_owned(),
                found: entry.map(|(found_key, _)| found_key.clone()),
            }),
        }
    }
}

impl<'a, T> IntoIterator for &'a ResDict<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = indexmap::map::Iter<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Value of the bit tested at `reference`; bits past the end of the key are zero.
pub fn direction(key: &[u8], reference: u32) -> u8 {
    let byte = (reference >> 3) as usize;
    match key.get(byte) {
        Some(value) => (value >> (reference & 7)) & 1,
        None => 0,
    }
}

/// Descend from the root while references decrease and `descend` accepts the child.
///
/// Returns the indices of the last parent and the child the walk stopped at.
fn walk(
    nodes: &[DictNode],
    key: &[u8],
    descend: impl Fn(&DictNode) -> bool,
) -> Result<(usize, usize)> {
    let node = move |index: usize| {
        nodes.get(index).ok_or_else(|| {
            Error::InvalidValue(format!(
                "dictionary node {index} is out of range for {} nodes",
                nodes.len()
            ))
        })
    };

    let mut parent = 0;
    let mut child = node(0)?.left as usize;
    while node(parent)?.reference > node(child)?.reference && descend(node(child)?) {
        parent = child;
        let next = node(child)?;
        child = next.child(direction(key, next.reference));
    }
    Ok((parent, child))
}

fn node_index(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| Error::InvalidValue(format!("dictionary node {index} does not fit 16 bits")))
}

/// Compute the node array for a set of keys given in collection order.
///
/// The root is treated as holding the empty key while building, so an empty key cannot be stored.
pub fn build_nodes<'k>(keys: impl IntoIterator<Item = &'k str>) -> Result<Vec<DictNode>> {
    let keys: Vec<&[u8]> = iter::once(&b""[..])
        .chain(keys.into_iter().map(str::as_bytes))
        .collect();

    let mut nodes = Vec::with_capacity(keys.len());
    nodes.push(DictNode::ROOT);

    for (index, key) in keys.iter().enumerate().skip(1) {
        let (_, closest) = walk(&nodes, key, |_| true)?;
        let other = keys[closest];

        let mut reference = (key.len().max(other.len()) * 8) as u32;
        while direction(other, reference) == direction(key, reference) {
            if reference == 0 {
                return Err(Error::DuplicateKey(String::from_utf8_lossy(key).into_owned()));
            }
            reference -= 1;
        }

        let (parent, child) = walk(&nodes, key, |node| node.reference > reference)?;
        let (child, index) = (node_index(child)?, node_index(index)?);
        let (left, right) = if direction(key, reference) == 1 {
            (child, index)
        } else {
            (index, child)
        };
        nodes.push(DictNode {
            reference,
            left,
            right,
        });

        if direction(key, nodes[parent].reference) == 1 {
            nodes[parent].right = index;
        } else {
            nodes[parent].left = index;
        }
    }

    Ok(nodes)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};

    use super::{build_nodes, direction, DictNode, ResDict};

    fn dict(keys: &[&str]) -> Result<ResDict<usize>> {
        let mut dict = ResDict::new();
        for (value, key) in keys.iter().enumerate() {
            dict.add(*key, value)?;
        }
        dict.rebuild()?;
        Ok(dict)
    }

    #[test]
    fn direction_reads_bits_from_the_start_of_the_key() {
        assert_eq!(direction(b"a", 0), 1);
        assert_eq!(direction(b"a", 1), 0);
        assert_eq!(direction(b"a", 6), 1);
        assert_eq!(direction(b"ab", 14), 1);
        assert_eq!(direction(b"a", 8), 0);
        assert_eq!(direction(b"a", u32::MAX), 0);
    }

    #[test]
    fn empty_dictionary_has_only_the_root() -> Result<()> {
        let dict = dict(&[])?;
        assert_eq!(dict.len(), 0);
        assert_eq!(dict.nodes(), &[DictNode::ROOT]);
        Ok(())
    }

    #[test]
    fn known_layout_for_prefix_keys() -> Result<()> {
        let dict = dict(&["a", "ab", "b"])?;

        #[rustfmt::skip]
        let expected = vec![
            DictNode { reference: u32::MAX, left: 2, right: 0 },
            DictNode { reference: 6, left: 0, right: 3 },
            DictNode { reference: 14, left: 1, right: 2 },
            DictNode { reference: 1, left: 1, right: 3 },
        ];
        assert_eq!(dict.nodes(), expected.as_slice());

        assert_eq!(*dict.traverse("ab")?, 1);
        assert_eq!(*dict.traverse("a")?, 0);
        assert_eq!(*dict.traverse("b")?, 2);
        Ok(())
    }

    #[test]
    fn traverse_finds_every_key() -> Result<()> {
        let keys = [
            "Mt_Body", "Mt_Eye", "Mt_Hair", "Mt_Body_Alpha", "_a0", "_n0", "_s0", "gsys_alpha",
            "gsys_color_blend", "Z", "z", "tex_coord0", "tex_coord1", "tex_coord10",
        ];
        let dict = dict(&keys)?;
        for (value, key) in keys.iter().enumerate() {
            assert_eq!(*dict.traverse(key)?, value);
        }
        assert!(matches!(
            dict.traverse("missing"),
            Err(Error::LookupMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn rebuild_is_deterministic() -> Result<()> {
        let keys = ["skl_root", "Head", "Arm_L", "Arm_R", "Leg_L", "Leg_R"];
        let first = build_nodes(keys)?;
        let second = build_nodes(keys)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn empty_key_collides_with_root() {
        assert!(matches!(build_nodes([""]), Err(Error::DuplicateKey(_))));
    }

    #[test]
    fn add_rejects_duplicates() -> Result<()> {
        let mut dict = dict(&["first"])?;
        assert!(matches!(dict.add("first", 9), Err(Error::DuplicateKey(_))));
        assert_eq!(dict.len(), 1);
        Ok(())
    }

    #[test]
    fn rename_keeps_position() -> Result<()> {
        let mut dict = dict(&["a", "b", "c"])?;
        dict.rename("b", "renamed")?;
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "renamed", "c"]);
        assert!(matches!(dict.rename("a", "c"), Err(Error::DuplicateKey(_))));
        assert!(matches!(dict.rename("nope", "x"), Err(Error::NotFound(_))));

        dict.rebuild()?;
        assert_eq!(*dict.traverse("renamed")?, 1);
        Ok(())
    }

    #[test]
    fn remove_by_key_value_and_index() -> Result<()> {
        let mut dict = dict(&["a", "b", "c", "d"])?;
        assert_eq!(dict.remove("b"), Some(1));
        assert_eq!(dict.remove_value(&3), Some(("d".to_owned(), 3)));
        assert_eq!(dict.remove_index(0), Some(("a".to_owned(), 0)));
        assert_eq!(dict.nodes().len(), 2);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["c"]);

        dict.rebuild()?;
        assert_eq!(*dict.traverse("c")?, 2);
        Ok(())
    }

    #[test]
    fn traverse_after_remove_fails_until_rebuilt() -> Result<()> {
        let mut dict = dict(&["a", "b", "c"])?;
        dict.remove("a");
        dict.remove("b");
        assert!(matches!(dict.traverse("c"), Err(Error::InvalidValue(_))));

        dict.rebuild()?;
        assert_eq!(*dict.traverse("c")?, 2);
        Ok(())
    }

    #[test]
    fn out_of_range_nodes_are_rejected() {
        let nodes = vec![
            DictNode {
                left: 0x40,
                ..DictNode::ROOT
            },
            DictNode {
                reference: 0,
                left: 0,
                right: 1,
            },
        ];
        let dict = ResDict::from_parts(nodes, [("a".to_owned(), 0)].into_iter().collect());
        assert!(matches!(dict.traverse("a"), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn node_indices_must_fit_16_bits() -> Result<()> {
        let keys: Vec<String> = (0..=u16::MAX as usize).map(|index| format!("{index:05}")).collect();
        assert!(matches!(
            build_nodes(keys.iter().map(String::as_str)),
            Err(Error::InvalidValue(_))
        ));
        assert_eq!(build_nodes(keys[1..].iter().map(String::as_str))?.len(), 0x10000);
        Ok(())
    }

    #[test]
    fn get_and_set() -> Result<()> {
        let mut dict = dict(&["a", "b"])?;
        assert_eq!(dict.by_index(1)?, ("b", &1));
        assert!(matches!(dict.by_index(2), Err(Error::NotFound(_))));
        assert!(matches!(dict.by_key("c"), Err(Error::NotFound(_))));
        assert_eq!(dict.set("a", 10)?, 0);
        assert_eq!(dict.set_index(1, 11)?, 1);
        assert_eq!(dict.values().copied().collect::<Vec<_>>(), vec![10, 11]);
        assert!(dict.contains_key("a"));
        assert!(dict.contains_value(&11));
        assert!(dict.set("zz", 0).is_err());
        Ok(())
    }
}
