//! Finite, shrink-only candidate domains

use indexmap::IndexSet;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Ordered set of candidate values for one variable
///
/// Values keep their insertion order; the first remaining value is the default
/// extraction choice. After construction a domain only ever loses values.
#[derive(Debug, Clone)]
pub struct Domain<T> {
    values: IndexSet<T>,
}

impl<T: Clone + Eq + Hash> Domain<T> {
    /// Build a domain, dropping duplicate values while keeping first occurrences
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Whether `value` is still a candidate
    pub fn contains(&self, value: &T) -> bool {
        self.values.contains(value)
    }

    /// Remove a value; removing an absent value is a no-op. Returns whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.values.shift_remove(value)
    }

    /// Remove every listed value, returning how many were actually removed
    pub fn remove_all(&mut self, values: &[T]) -> usize {
        if values.is_empty() {
            return 0;
        }
        let doomed: HashSet<&T> = values.iter().collect();
        let before = self.values.len();
        self.values.retain(|v| !doomed.contains(v));
        before - self.values.len()
    }

    /// True once every candidate has been removed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of remaining candidates
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Exactly one candidate remains
    pub fn is_singleton(&self) -> bool {
        self.values.len() == 1
    }

    /// Earliest remaining candidate in insertion order
    pub fn first(&self) -> Option<&T> {
        self.values.get_index(0)
    }

    /// Candidate at position `index` in insertion order
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get_index(index)
    }

    /// Ordered copy of the remaining values
    pub fn possible_values(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }

    /// Remaining values in insertion order
    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.values.iter()
    }
}

impl<T: PartialEq> PartialEq for Domain<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len() && self.values.iter().eq(other.values.iter())
    }
}

impl<T: Eq> Eq for Domain<T> {}

impl<T: fmt::Display> fmt::Display for Domain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_keeps_order() {
        let domain = Domain::new(vec![3, 1, 2, 1]);
        assert_eq!(domain.possible_values(), &[3, 1, 2]);
        assert_eq!(domain.first(), Some(&3));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut domain = Domain::new(1..=3);
        assert!(domain.remove(&2));
        assert!(!domain.remove(&2));
        assert!(!domain.remove(&42));
        assert_eq!(domain.possible_values(), &[1, 3]);
    }

    #[test]
    fn test_remove_all() {
        let mut domain = Domain::new(1..=5);
        let removed = domain.remove_all(&[2, 4, 9]);
        assert_eq!(removed, 2);
        assert_eq!(domain.possible_values(), &[1, 3, 5]);
        assert!(domain.contains(&5));
        assert!(!domain.contains(&4));
    }

    #[test]
    fn test_shrinks_to_empty() {
        let mut domain = Domain::new(vec![7]);
        assert!(domain.is_singleton());
        domain.remove(&7);
        assert!(domain.is_empty());
        assert_eq!(domain.first(), None);
        assert_eq!(domain.remove_all(&[7]), 0);
        assert!(domain.is_empty());
    }

    #[test]
    fn test_equality_respects_order() {
        assert_eq!(Domain::new(vec![1, 2]), Domain::new(vec![1, 2, 2]));
        assert_ne!(Domain::new(vec![1, 2]), Domain::new(vec![2, 1]));
    }

    #[test]
    fn test_large_domain_shrinks_in_order() {
        let mut domain = Domain::new(0..200_000i64);
        assert_eq!(domain.len(), 200_000);

        let evens: Vec<i64> = (0..200_000).step_by(2).collect();
        assert_eq!(domain.remove_all(&evens), 100_000);
        assert_eq!(domain.first(), Some(&1));
        assert!(domain.remove(&1));
        assert_eq!(domain.first(), Some(&3));
        assert_eq!(domain.iter().nth(1), Some(&5));
        assert!(!domain.contains(&199_998));
    }

    #[test]
    fn test_display() {
        let domain = Domain::new(vec![1, 2]);
        assert_eq!(domain.to_string(), "{1, 2}");
    }
}
