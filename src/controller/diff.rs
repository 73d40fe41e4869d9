//! # Set Diff
//!
//! Computes the minimal add/remove delta that turns an observed child
//! collection (principals, attachment resources, tags) into the desired one.
//!
//! Descriptors are compared only by the key the caller extracts. A descriptor
//! whose key appears on both sides is left alone even when its other fields
//! differ, so a change confined to non-key fields produces an empty delta.
//!
//! ```rust
//! use globalaccelerator_reconciler::controller::diff::diff;
//!
//! let observed = vec!["111111111111".to_string(), "accelerator/ABCD".to_string()];
//! let desired = vec!["111111111111".to_string(), "accelerator/WXYZ".to_string()];
//!
//! let delta = diff(Some(observed.as_slice()), Some(desired.as_slice()), String::clone);
//! assert_eq!(delta.to_add, vec!["accelerator/WXYZ".to_string()]);
//! assert_eq!(delta.to_remove, vec!["accelerator/ABCD".to_string()]);
//! ```

use std::collections::HashSet;
use std::hash::Hash;

/// Descriptors to add and remove, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T> Default for Delta<T> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

impl<T> Delta<T> {
    /// Nothing to add and nothing to remove
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `desired` against `observed` by `key_of`
///
/// `None` and an empty collection are equivalent. Within each side, only the
/// first descriptor for a given key is kept.
pub fn diff<T, K, F>(observed: Option<&[T]>, desired: Option<&[T]>, key_of: F) -> Delta<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let observed = observed.unwrap_or_default();
    let desired = desired.unwrap_or_default();

    let observed_keys: HashSet<K> = observed.iter().map(&key_of).collect();
    let desired_keys: HashSet<K> = desired.iter().map(&key_of).collect();

    Delta {
        to_add: missing_from(desired, &observed_keys, &key_of),
        to_remove: missing_from(observed, &desired_keys, &key_of),
    }
}

fn missing_from<T, K, F>(items: &[T], keys: &HashSet<K>, key_of: &F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|&item| {
            let key = key_of(item);
            !keys.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Endpoint {
        id: &'static str,
        weight: u8,
    }

    fn ep(id: &'static str, weight: u8) -> Endpoint {
        Endpoint { id, weight }
    }

    #[test]
    fn test_identical_sets_produce_empty_delta() {
        let set = vec![ep("a", 1), ep("b", 2)];
        assert!(diff(Some(set.as_slice()), Some(set.as_slice()), |e| e.id).is_empty());
    }

    #[test]
    fn test_absent_equals_empty() {
        let empty: Vec<Endpoint> = Vec::new();
        let desired = vec![ep("a", 1)];
        assert_eq!(
            diff(None, Some(desired.as_slice()), |e| e.id),
            diff(Some(empty.as_slice()), Some(desired.as_slice()), |e| e.id)
        );
        assert!(diff::<Endpoint, _, _>(None, None, |e| e.id).is_empty());
    }

    #[test]
    fn test_non_key_change_is_not_reported() {
        let observed = vec![ep("a", 1)];
        let desired = vec![ep("a", 200)];
        assert!(diff(Some(observed.as_slice()), Some(desired.as_slice()), |e| e.id).is_empty());
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let desired = vec![ep("a", 1), ep("a", 2)];
        let delta = diff(None, Some(desired.as_slice()), |e| e.id);
        assert_eq!(delta.to_add, vec![ep("a", 1)]);
    }

    #[test]
    fn test_swapping_sides_swaps_add_and_remove() {
        let pairs: Vec<(Vec<Endpoint>, Vec<Endpoint>)> = vec![
            (vec![ep("a", 1), ep("b", 1)], vec![ep("c", 1), ep("d", 1)]),
            (vec![ep("a", 1), ep("b", 1)], vec![ep("b", 9), ep("c", 1)]),
            (Vec::new(), vec![ep("a", 1), ep("b", 1)]),
            (
                vec![ep("a", 1), ep("a", 2), ep("b", 1)],
                vec![ep("b", 1), ep("c", 1), ep("c", 3)],
            ),
            (vec![ep("a", 1)], vec![ep("a", 1)]),
        ];

        for (a, b) in &pairs {
            let forward = diff(Some(a.as_slice()), Some(b.as_slice()), |e| e.id);
            let backward = diff(Some(b.as_slice()), Some(a.as_slice()), |e| e.id);
            assert_eq!(forward.to_add, backward.to_remove, "pair {a:?} / {b:?}");
            assert_eq!(forward.to_remove, backward.to_add, "pair {a:?} / {b:?}");
        }
    }

    #[test]
    fn test_diff_against_self_is_empty_for_any_set() {
        let sets = vec![
            Vec::new(),
            vec![ep("a", 1)],
            vec![ep("a", 1), ep("b", 2), ep("c", 3)],
            vec![ep("a", 1), ep("a", 2)],
        ];
        for set in &sets {
            assert!(
                diff(Some(set.as_slice()), Some(set.as_slice()), |e| e.id).is_empty(),
                "set {set:?}"
            );
        }
    }

    #[test]
    fn test_overlap_only_reports_differing_keys() {
        let observed = vec![ep("a", 1), ep("b", 1)];
        let desired = vec![ep("b", 5), ep("c", 1)];
        let delta = diff(Some(observed.as_slice()), Some(desired.as_slice()), |e| e.id);
        assert_eq!(delta.to_add, vec![ep("c", 1)]);
        assert_eq!(delta.to_remove, vec![ep("a", 1)]);
    }
}
