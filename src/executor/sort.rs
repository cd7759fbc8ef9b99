// ============================================================================
// src/executor/sort.rs - Result Ordering
// ============================================================================
//
// Multi-key, stable ordering of candidate tuples.
//
// NULL handling follows SQL: NULLS LAST for ascending keys, NULLS FIRST for
// descending keys. A slot left empty by an outer join sorts as NULL.
//
// ============================================================================

use std::cmp::Ordering;
use crate::core::Value;
use crate::evaluator::{Slot, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    /// ASC → NULLS LAST, DESC → NULLS FIRST
    pub fn default_for_direction(descending: bool) -> Self {
        if descending {
            Self::NullsFirst
        } else {
            Self::NullsLast
        }
    }
}

/// One ORDER BY key, resolved to a tuple slot.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub slot: Slot,
    pub descending: bool,
    pub null_ordering: NullOrdering,
}

impl SortKey {
    pub fn new(slot: Slot, descending: bool) -> Self {
        Self {
            slot,
            descending,
            null_ordering: NullOrdering::default_for_direction(descending),
        }
    }
}

pub struct TupleComparator<'k> {
    sort_keys: &'k [SortKey],
}

impl<'k> TupleComparator<'k> {
    pub fn new(sort_keys: &'k [SortKey]) -> Self {
        Self { sort_keys }
    }

    pub fn compare(&self, left: &Tuple<'_>, right: &Tuple<'_>) -> Ordering {
        for key in self.sort_keys {
            let ordering = Self::compare_values(key.slot.read(left), key.slot.read(right), key);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn compare_values(left: Option<&Value>, right: Option<&Value>, key: &SortKey) -> Ordering {
        let left = left.filter(|v| !v.is_null());
        let right = right.filter(|v| !v.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            // NULL placement is independent of direction.
            (None, Some(_)) => match key.null_ordering {
                NullOrdering::NullsFirst => Ordering::Less,
                NullOrdering::NullsLast => Ordering::Greater,
            },
            (Some(_), None) => match key.null_ordering {
                NullOrdering::NullsFirst => Ordering::Greater,
                NullOrdering::NullsLast => Ordering::Less,
            },
            (Some(a), Some(b)) => {
                // Both sides come from the same typed field.
                let ordering = a.cmp(b);
                if key.descending { ordering.reverse() } else { ordering }
            }
        }
    }
}

/// Stable sort: tuples with equal keys keep their scan order.
pub fn sort_tuples(tuples: &mut [Tuple<'_>], sort_keys: &[SortKey]) {
    if sort_keys.is_empty() {
        return;
    }
    let comparator = TupleComparator::new(sort_keys);
    tuples.sort_by(|a, b| comparator.compare(a, b));
}
