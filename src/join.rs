// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural merge of partial observations.
//!
//! Two observations of the same entity are combined attribute by attribute.
//! A value that cannot be reconciled makes only its own attribute unresolvable;
//! the attribute then falls back to its empty placeholder (see [`merge_field`]).

use std::collections::{BTreeMap, BTreeSet};

/// Combine two observations into one, or `None` when they are incompatible.
pub trait Merge: Sized {
    fn merge(&self, other: &Self) -> Option<Self>;
}

/// Merge one attribute of a record.
/// An incompatible pair degrades to the attribute's placeholder (`None`, empty collection, `false`).
pub fn merge_field<T: Merge + Default>(a: &T, b: &T) -> T {
    a.merge(b).unwrap_or_default()
}

/// Greedy matching of two sets.
///
/// Each left element is paired with the first unconsumed right element it combines with;
/// the pair is replaced by the combination. Unpaired elements on either side pass through.
pub fn merge_sets<'a, T, L, R>(left: L, right: R) -> BTreeSet<T>
where
    T: Merge + Ord + Clone + 'a,
    L: IntoIterator<Item = &'a T>,
    R: IntoIterator<Item = &'a T>,
{
    let right: Vec<&T> = right.into_iter().collect();
    let mut consumed = vec![false; right.len()];
    let mut result = BTreeSet::new();

    for l in left {
        let mut combined = None;
        for (idx, r) in right.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            if let Some(c) = l.merge(r) {
                consumed[idx] = true;
                combined = Some(c);
                break;
            }
        }
        result.insert(combined.unwrap_or_else(|| l.clone()));
    }

    for (idx, r) in right.into_iter().enumerate() {
        if !consumed[idx] {
            result.insert(r.clone());
        }
    }
    result
}

macro_rules! scalar_merge {
    ($($t:ty),*) => {
        $(
            impl Merge for $t {
                fn merge(&self, other: &Self) -> Option<Self> {
                    if self == other {
                        Some(self.clone())
                    } else {
                        None
                    }
                }
            }
        )*
    };
}

scalar_merge!(bool, u32, u64, usize, i64, String);

impl<T: Merge + Clone> Merge for Option<T> {
    // Absence never conflicts. Two present values that cannot be reconciled
    // leave the attribute absent instead of failing the enclosing record.
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(match (self, other) {
            (None, None) => None,
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (Some(a), Some(b)) => a.merge(b),
        })
    }
}

impl<T: Merge + Clone + Default> Merge for Vec<T> {
    // Positional: both sequences describe the same positional schema.
    // The shorter one is padded with missing entries, and a position that
    // cannot be reconciled degrades to its placeholder on its own.
    fn merge(&self, other: &Self) -> Option<Self> {
        let len = self.len().max(other.len());
        let mut result = Vec::with_capacity(len);
        for idx in 0..len {
            match (self.get(idx), other.get(idx)) {
                (Some(a), Some(b)) => result.push(merge_field(a, b)),
                (Some(a), None) => result.push(a.clone()),
                (None, Some(b)) => result.push(b.clone()),
                (None, None) => break,
            }
        }
        Some(result)
    }
}

impl<V: Merge + Clone> Merge for BTreeMap<String, V> {
    fn merge(&self, other: &Self) -> Option<Self> {
        let mut result = self.clone();
        for (key, value) in other {
            let merged = match self.get(key) {
                Some(existing) => existing.merge(value)?,
                None => value.clone(),
            };
            result.insert(key.clone(), merged);
        }
        Some(result)
    }
}

impl<T: Merge + Ord + Clone> Merge for BTreeSet<T> {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(merge_sets(self, other))
    }
}
