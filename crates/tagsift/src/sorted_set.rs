//
// sorted_set.rs
//
// Sorted, duplicate-free set of category ids with copy-on-write snapshots
//

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a category (or any other filterable entity).
pub type CategoryId = i64;

/// Ascending, duplicate-free set of ids.
///
/// Every mutating operation returns a new snapshot and leaves `self` untouched,
/// so holders of an older snapshot never observe a change. Cloning is cheap
/// (the backing slice is shared), and two snapshots can be compared either by
/// value (`==`) or by identity ([`SortedIndexSet::ptr_eq`]).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SortedIndexSet {
    items: Arc<[CategoryId]>,
}

impl Default for SortedIndexSet {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
        }
    }
}

impl SortedIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[CategoryId] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CategoryId> {
        self.items.iter()
    }

    /// Whether both snapshots share the same backing storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Binary search for `id`.
    ///
    /// `Ok(index)` when present, `Err(insert_at)` with the position that keeps
    /// the set ascending otherwise.
    fn search(&self, id: CategoryId) -> Result<usize, usize> {
        self.items.binary_search(&id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.search(id).is_ok()
    }

    /// Index of `id` within the set, used to highlight active filters.
    pub fn locate(&self, id: CategoryId) -> Option<usize> {
        self.search(id).ok()
    }

    /// Remove `id` if present, insert it at its ascending position otherwise.
    ///
    /// Toggling is self-inverse: `s.toggle(x).toggle(x) == s`.
    pub fn toggle(&self, id: CategoryId) -> Self {
        let mut next = Vec::with_capacity(self.items.len() + 1);
        match self.search(id) {
            Ok(found) => {
                next.extend_from_slice(&self.items[..found]);
                next.extend_from_slice(&self.items[found + 1..]);
            }
            Err(insert_at) => {
                next.extend_from_slice(&self.items[..insert_at]);
                next.push(id);
                next.extend_from_slice(&self.items[insert_at..]);
            }
        }
        Self {
            items: Arc::from(next),
        }
    }

    /// Insert `id` unless already present.
    ///
    /// An existing id returns a clone of `self` sharing its storage.
    pub fn insert(&self, id: CategoryId) -> Self {
        match self.search(id) {
            Ok(_) => self.clone(),
            Err(_) => self.toggle(id),
        }
    }
}

impl From<Vec<CategoryId>> for SortedIndexSet {
    fn from(mut ids: Vec<CategoryId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self {
            items: Arc::from(ids),
        }
    }
}

impl FromIterator<CategoryId> for SortedIndexSet {
    fn from_iter<I: IntoIterator<Item = CategoryId>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a SortedIndexSet {
    type Item = &'a CategoryId;
    type IntoIter = std::slice::Iter<'a, CategoryId>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Debug for SortedIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl Serialize for SortedIndexSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

impl<'de> Deserialize<'de> for SortedIndexSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<CategoryId>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_on_empty_inserts_at_front() {
        let set = SortedIndexSet::new().toggle(7);
        assert_eq!(set.as_slice(), &[7]);
        assert_eq!(set.locate(7), Some(0));
    }

    #[test]
    fn test_toggle_keeps_ascending_order() {
        let set = SortedIndexSet::new()
            .toggle(5)
            .toggle(1)
            .toggle(9)
            .toggle(3);
        assert_eq!(set.as_slice(), &[1, 3, 5, 9]);
    }

    #[test]
    fn test_toggle_removes_existing() {
        let set = SortedIndexSet::from(vec![1, 3, 5]);
        let next = set.toggle(3);
        assert_eq!(next.as_slice(), &[1, 5]);
        // Original snapshot untouched
        assert_eq!(set.as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn test_toggle_last_element_yields_empty() {
        let set = SortedIndexSet::from(vec![42]).toggle(42);
        assert!(set.is_empty());
        assert_eq!(set, SortedIndexSet::new());
    }

    #[test]
    fn test_locate_absent() {
        let set = SortedIndexSet::from(vec![2, 4, 6]);
        assert_eq!(set.locate(4), Some(1));
        assert_eq!(set.locate(5), None);
        assert!(!set.contains(0));
        assert!(set.contains(6));
    }

    #[test]
    fn test_insert_existing_shares_storage() {
        let set = SortedIndexSet::from(vec![1, 2]);
        let same = set.insert(2);
        assert!(same.ptr_eq(&set));
        let grown = set.insert(0);
        assert!(!grown.ptr_eq(&set));
        assert_eq!(grown.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_toggle_produces_new_snapshot() {
        let set = SortedIndexSet::from(vec![1]);
        let toggled = set.toggle(2).toggle(2);
        assert_eq!(toggled, set);
        assert!(!toggled.ptr_eq(&set));
    }

    #[test]
    fn test_from_vec_normalizes() {
        let set = SortedIndexSet::from(vec![3, 1, 3, -2, 1]);
        assert_eq!(set.as_slice(), &[-2, 1, 3]);
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let set: SortedIndexSet = serde_json::from_str("[9, 2, 2, 5]").unwrap();
        assert_eq!(set.as_slice(), &[2, 5, 9]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[2,5,9]");
    }
}
