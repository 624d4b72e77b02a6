use std::collections::BTreeSet;
use std::fmt;

use absint_ir::{HasBottom, Lattice};

use crate::AbstractDomain;

/// Powerset lattice over opaque identifiers: join is union, the order is
/// set inclusion and bottom is the empty set.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetLattice<T: Ord> {
    items: BTreeSet<T>,
}

impl<T: Ord> Default for SetLattice<T> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SetLattice<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(item: T) -> Self {
        Self {
            items: BTreeSet::from([item]),
        }
    }

    /// Returns `true` if `item` was not present.
    pub fn insert(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    /// Returns `true` if `item` was present.
    pub fn remove(&mut self, item: &T) -> bool {
        self.items.remove(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn meet(&self, other: &Self) -> Self {
        self.items.intersection(&other.items).cloned().collect()
    }
}

impl<T: Ord + Clone> Lattice for SetLattice<T> {
    fn join(&self, other: &Self) -> Self {
        self.items.union(&other.items).cloned().collect()
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.items.is_subset(&other.items)
    }
}

impl<T: Ord + Clone> HasBottom for SetLattice<T> {
    fn bottom() -> Self {
        Self::default()
    }
}

impl<T: Ord + Clone + fmt::Debug> AbstractDomain for SetLattice<T> {}

impl<T: Ord> FromIterator<T> for SetLattice<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: Ord> Extend<T> for SetLattice<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a, T: Ord> IntoIterator for &'a SetLattice<T> {
    type Item = &'a T;
    type IntoIter = std::collections::btree_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Ord + fmt::Debug> fmt::Debug for SetLattice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl<T: Ord + fmt::Display> fmt::Display for SetLattice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_union_and_order_is_inclusion() {
        let a: SetLattice<u32> = [1, 2].into_iter().collect();
        let b: SetLattice<u32> = [2, 3].into_iter().collect();

        assert_eq!(a.join(&b), [1, 2, 3].into_iter().collect());
        assert_eq!(a.meet(&b), SetLattice::singleton(2));
        assert!(SetLattice::singleton(1).is_subseteq(&a));
        assert!(!a.is_subseteq(&b));
        assert!(SetLattice::<u32>::bottom().is_subseteq(&a));
    }

    #[test]
    fn test_insert_remove_report_membership_changes() {
        let mut set = SetLattice::new();
        assert!(set.insert(4u32));
        assert!(!set.insert(4));
        assert!(set.contains(&4));
        assert!(set.remove(&4));
        assert!(!set.remove(&4));
        assert!(set.is_empty());
    }

    #[test]
    fn test_display_is_sorted() {
        let set: SetLattice<u32> = [3, 1, 2].into_iter().collect();
        assert_eq!(set.to_string(), "{1, 2, 3}");
        assert_eq!(format!("{set:?}"), "{1, 2, 3}");
        assert_eq!(SetLattice::<u32>::new().to_string(), "{}");
    }
}
