//! Cache Entry
//!
//! One immutable snapshot of a whole collection. Entries are never edited in
//! place: a refresh builds a new one and swaps it in.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A normalized collection plus the moment it was captured.
#[derive(Debug)]
pub struct CacheEntry<T> {
    items: Arc<Vec<T>>,
    captured_at: DateTime<Utc>,
    pages: usize,
}

// Manual impl: cloning shares the items and must not require `T: Clone`.
impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            captured_at: self.captured_at,
            pages: self.pages,
        }
    }
}

impl<T> CacheEntry<T> {
    /// `captured_at` is when the last page of the producing refresh started
    /// being read.
    pub fn new(items: Vec<T>, captured_at: DateTime<Utc>, pages: usize) -> Self {
        Self {
            items: Arc::new(items),
            captured_at,
            pages,
        }
    }

    /// Shared handle to the items, in source order.
    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Number of upstream pages the producing refresh read.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Age of the entry at `now`; zero if `now` precedes the capture.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Items matching `predicate`, in original relative order.
    pub fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        T: Clone,
        P: Fn(&T) -> bool,
    {
        self.items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// First item for which `matches` holds.
    pub fn find<P>(&self, matches: P) -> Option<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.iter().find(|item| matches(item))
    }

    /// True if both entries share the same item allocation.
    pub fn same_snapshot(&self, other: &CacheEntry<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accessors() {
        let captured = Utc::now();
        let entry = CacheEntry::new(vec![1, 2, 3], captured, 1);

        assert_eq!(entry.len(), 3);
        assert!(!entry.is_empty());
        assert_eq!(entry.captured_at(), captured);
        assert_eq!(entry.pages(), 1);
        assert_eq!(entry.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_clone_shares_items() {
        let entry = CacheEntry::new(vec!["a".to_string()], Utc::now(), 1);
        let cloned = entry.clone();

        assert!(entry.same_snapshot(&cloned));
        assert!(Arc::ptr_eq(&entry.items(), &cloned.items()));

        let rebuilt = CacheEntry::new(vec!["a".to_string()], entry.captured_at(), 1);
        assert!(!entry.same_snapshot(&rebuilt));
    }

    #[test]
    fn test_age() {
        let captured = Utc::now();
        let entry = CacheEntry::new(Vec::<u8>::new(), captured, 0);

        let later = captured + chrono::Duration::seconds(90);
        assert_eq!(entry.age(later), Duration::from_secs(90));

        let earlier = captured - chrono::Duration::seconds(5);
        assert_eq!(entry.age(earlier), Duration::ZERO);
    }

    #[test]
    fn test_filter_preserves_order() {
        let entry = CacheEntry::new(vec![5, 2, 8, 3, 6], Utc::now(), 1);

        assert_eq!(entry.filter(|n| n % 2 == 0), vec![2, 8, 6]);
        assert_eq!(entry.find(|n| *n > 5), Some(&8));
        assert!(entry.filter(|n| *n > 100).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_filter_is_ordered_subsequence(items in prop::collection::vec(0u32..1000, 0..60), modulus in 1u32..7) {
                let entry = CacheEntry::new(items.clone(), Utc::now(), 1);
                let kept = entry.filter(|n| n % modulus == 0);

                let expected: Vec<u32> = items.into_iter().filter(|n| n % modulus == 0).collect();
                prop_assert_eq!(kept, expected);
            }
        }
    }
}
