use crate::types::Aggregate;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Merge two set-valued mappings: result keys are the union of both key
/// sets, result values the per-key set union (missing key = empty set).
/// Union is associative and commutative, and keys merge independently of
/// one another, so the mapping merge inherits both properties.
pub fn merge_sets<K, V>(
    mut a: HashMap<K, HashSet<V>>,
    b: HashMap<K, HashSet<V>>,
) -> HashMap<K, HashSet<V>>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    for (key, set) in b {
        a.entry(key).or_default().extend(set);
    }
    a
}

/// Merge two count-valued mappings: per-key addition over the union of
/// both key sets (missing key = 0). Associative and commutative for the
/// same per-key-independence reason as [`merge_sets`].
pub fn merge_counts<K>(mut a: HashMap<K, u64>, b: HashMap<K, u64>) -> HashMap<K, u64>
where
    K: Eq + Hash,
{
    for (key, n) in b {
        *a.entry(key).or_default() += n;
    }
    a
}

impl Aggregate {
    /// Combine two aggregates. Built from commutative, associative parts,
    /// so any fold order over any number of worker aggregates yields the
    /// same global result.
    pub fn merge(self, other: Aggregate) -> Aggregate {
        Aggregate {
            cell_languages: merge_sets(self.cell_languages, other.cell_languages),
            cell_counts: merge_counts(self.cell_counts, other.cell_counts),
            language_counts: merge_counts(self.language_counts, other.language_counts),
            dropped: self.dropped + other.dropped,
        }
    }
}
