//! In-memory rating aggregates.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::application::ports::{RatingStore, StoreError};
use crate::domain::rating::Rating;

/// Volatile rating aggregates keyed by laptop id.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the aggregate for `laptop_id`, if it has been rated.
    #[must_use]
    pub fn get(&self, laptop_id: &str) -> Option<Rating> {
        self.ratings.read().get(laptop_id).copied()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError> {
        let mut ratings = self.ratings.write();
        let rating = ratings
            .entry(laptop_id.to_string())
            .and_modify(|rating| rating.add(score))
            .or_insert_with(|| Rating::first(score));
        Ok(*rating)
    }

    fn len(&self) -> usize {
        self.ratings.read().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn first_add_creates_aggregate() {
        let store = InMemoryRatingStore::new();

        let rating = store.add("a", 7.0).unwrap();

        assert_eq!(rating, Rating { count: 1, sum: 7.0 });
        assert_eq!(rating.average(), 7.0);
    }

    #[test]
    fn second_add_accumulates() {
        let store = InMemoryRatingStore::new();
        store.add("a", 3.0).unwrap();

        let rating = store.add("a", 8.0).unwrap();

        assert_eq!(rating, Rating { count: 2, sum: 11.0 });
        assert_eq!(rating.average(), 5.5);
        assert_eq!(store.get("a"), Some(rating));
    }

    #[test]
    fn ids_are_independent() {
        let store = InMemoryRatingStore::new();
        store.add("a", 1.0).unwrap();
        store.add("b", 9.0).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").map(|r| r.count), Some(1));
        assert_eq!(store.get("b").map(|r| r.sum), Some(9.0));
        assert_eq!(store.get("c"), None);
    }

    #[test]
    fn returned_copy_is_detached() {
        let store = InMemoryRatingStore::new();
        let mut rating = store.add("a", 2.0).unwrap();
        rating.add(100.0);

        assert_eq!(store.get("a"), Some(Rating::first(2.0)));
    }

    #[test]
    fn thread_safety_concurrent_adds() {
        let store = Arc::new(InMemoryRatingStore::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.add("shared", 1.0).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let rating = store.get("shared").unwrap();
        assert_eq!(rating.count, 1000);
        assert_eq!(rating.sum, 1000.0);
    }

    proptest! {
        #[test]
        fn two_adds_average_to_midpoint(s1 in 1.0_f64..10.0, s2 in 1.0_f64..10.0) {
            let store = InMemoryRatingStore::new();
            store.add("id", s1).unwrap();
            let rating = store.add("id", s2).unwrap();

            prop_assert_eq!(rating.count, 2);
            prop_assert!((rating.sum - (s1 + s2)).abs() < 1e-12);
            prop_assert!((rating.average() - (s1 + s2) / 2.0).abs() < 1e-12);
        }
    }
}
