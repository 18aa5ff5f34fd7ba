//
// property_tests.rs
//
// Property-based tests for the sorted index set
//

#![cfg(test)]

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::sorted_set::{CategoryId, SortedIndexSet};

fn ids() -> impl Strategy<Value = Vec<CategoryId>> {
    prop::collection::vec(-50..50i64, 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// For any interleaving of toggles, items stay strictly ascending.
    #[test]
    fn prop_toggles_keep_strict_order(toggles in ids()) {
        let mut set = SortedIndexSet::new();
        for id in toggles {
            set = set.toggle(id);
            prop_assert!(set.as_slice().windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// toggle(toggle(S, x), x) == S
    #[test]
    fn prop_toggle_is_self_inverse(initial in ids(), x in -60..60i64) {
        let set = SortedIndexSet::from(initial);
        prop_assert_eq!(set.toggle(x).toggle(x), set);
    }

    /// Toggling an absent id makes it a member; toggling again removes it.
    #[test]
    fn prop_toggle_membership(initial in ids(), x in -60..60i64) {
        let set = SortedIndexSet::from(initial).insert(x).toggle(x);
        prop_assert!(!set.contains(x));
        let once = set.toggle(x);
        prop_assert!(once.contains(x));
        prop_assert_eq!(once.locate(x).map(|i| once.as_slice()[i]), Some(x));
        prop_assert!(!once.toggle(x).contains(x));
    }

    /// Toggle semantics match symmetric difference on a reference set.
    #[test]
    fn prop_toggle_matches_reference(toggles in ids()) {
        let mut set = SortedIndexSet::new();
        let mut reference = BTreeSet::new();
        for id in toggles {
            set = set.toggle(id);
            if !reference.remove(&id) {
                reference.insert(id);
            }
        }
        let expected: Vec<_> = reference.into_iter().collect();
        prop_assert_eq!(set.as_slice(), expected.as_slice());
    }

    /// A snapshot is never affected by toggles applied to it afterwards.
    #[test]
    fn prop_snapshots_are_immutable(initial in ids(), toggles in ids()) {
        let snapshot = SortedIndexSet::from(initial.clone());
        let before: Vec<_> = snapshot.iter().copied().collect();
        let mut current = snapshot.clone();
        for id in toggles {
            current = current.toggle(id);
        }
        prop_assert_eq!(snapshot.as_slice(), before.as_slice());
    }
}
