//! 共集（coset）：两两并发的条件集合；割（cut）为极大共集，
//! 其库所多重集等于原网的某个可达标识。
use std::fmt;

use smallvec::SmallVec;

use crate::unfolding::node::ConditionId;

/// A set of conditions kept sorted by id, so that equality and hashing are
/// structural over the member set.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Coset {
    conds: SmallVec<[ConditionId; 4]>,
}

/// A cut: maximal coset of the prefix.
pub type Cut = Coset;

impl Coset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(condition: ConditionId) -> Self {
        let mut coset = Self::new();
        coset.insert(condition);
        coset
    }

    /// Sorted insert; returns `false` if the condition was already present.
    pub fn insert(&mut self, condition: ConditionId) -> bool {
        match self.conds.binary_search(&condition) {
            Ok(_) => false,
            Err(idx) => {
                self.conds.insert(idx, condition);
                true
            }
        }
    }

    pub fn remove(&mut self, condition: ConditionId) -> bool {
        match self.conds.binary_search(&condition) {
            Ok(idx) => {
                self.conds.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, condition: ConditionId) -> bool {
        self.conds.binary_search(&condition).is_ok()
    }

    pub fn contains_all(&self, other: &Coset) -> bool {
        other.iter().all(|c| self.contains(c))
    }

    /// `true` iff the two cosets share a condition.
    pub fn overlaps(&self, other: &Coset) -> bool {
        let (mut left, mut right) = (self.conds.iter(), other.conds.iter());
        let (mut a, mut b) = (left.next(), right.next());
        while let (Some(x), Some(y)) = (a, b) {
            match x.cmp(y) {
                std::cmp::Ordering::Less => a = left.next(),
                std::cmp::Ordering::Greater => b = right.next(),
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.conds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.conds.iter().copied()
    }

    pub fn first(&self) -> Option<ConditionId> {
        self.conds.first().copied()
    }
}

impl fmt::Debug for Coset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.conds.iter()).finish()
    }
}

impl FromIterator<ConditionId> for Coset {
    fn from_iter<I: IntoIterator<Item = ConditionId>>(iter: I) -> Self {
        let mut coset = Self::new();
        for condition in iter {
            coset.insert(condition);
        }
        coset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ids::Idx;

    fn c(raw: usize) -> ConditionId {
        ConditionId::from_usize(raw)
    }

    #[test]
    fn insert_keeps_sorted_set_semantics() {
        let mut coset = Coset::new();
        assert!(coset.insert(c(3)));
        assert!(coset.insert(c(1)));
        assert!(!coset.insert(c(3)));
        assert_eq!(coset.iter().collect::<Vec<_>>(), vec![c(1), c(3)]);
        assert_eq!(coset.len(), 2);
    }

    #[test]
    fn structural_equality_ignores_insertion_order() {
        let left: Coset = [c(2), c(0), c(7)].into_iter().collect();
        let right: Coset = [c(7), c(2), c(0)].into_iter().collect();
        assert_eq!(left, right);
    }

    #[test]
    fn containment_and_overlap() {
        let big: Coset = [c(0), c(1), c(2)].into_iter().collect();
        let small: Coset = [c(0), c(2)].into_iter().collect();
        let disjoint: Coset = [c(5), c(9)].into_iter().collect();

        assert!(big.contains_all(&small));
        assert!(!small.contains_all(&big));
        assert!(big.overlaps(&small));
        assert!(!big.overlaps(&disjoint));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut coset: Coset = [c(4)].into_iter().collect();
        assert!(!coset.remove(c(0)));
        assert!(coset.remove(c(4)));
        assert!(coset.is_empty());
    }
}
