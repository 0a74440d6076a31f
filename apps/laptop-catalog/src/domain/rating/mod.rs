//! Rating Aggregate
//!
//! Running count and sum of the scores a laptop has received. The average is
//! derived on read and never stored.

use serde::{Deserialize, Serialize};

/// Aggregate of every score submitted for one laptop.
///
/// Once an aggregate exists its `count` is at least one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Number of scores received.
    pub count: u32,
    /// Sum of all scores received.
    pub sum: f64,
}

impl Rating {
    /// Aggregate holding a single score.
    #[must_use]
    pub const fn first(score: f64) -> Self {
        Self {
            count: 1,
            sum: score,
        }
    }

    /// Fold one more score into the aggregate.
    pub fn add(&mut self, score: f64) {
        self.count = self.count.saturating_add(1);
        self.sum += score;
    }

    /// Mean score.
    #[must_use]
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / f64::from(self.count)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_first_score() {
        let rating = Rating::first(7.0);
        assert_eq!(rating.count, 1);
        assert_eq!(rating.sum, 7.0);
        assert_eq!(rating.average(), 7.0);
    }

    #[test]
    fn test_add_accumulates() {
        let mut rating = Rating::first(4.0);
        rating.add(9.0);
        assert_eq!(rating.count, 2);
        assert_eq!(rating.sum, 13.0);
        assert_eq!(rating.average(), 6.5);
    }

    #[test]
    fn test_average_of_empty_is_zero() {
        let rating = Rating { count: 0, sum: 0.0 };
        assert_eq!(rating.average(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_count_tracks_submissions(scores in prop::collection::vec(1.0_f64..10.0, 1..50)) {
            let mut rating = Rating::first(scores[0]);
            for score in &scores[1..] {
                rating.add(*score);
            }
            prop_assert_eq!(rating.count as usize, scores.len());
            let expected: f64 = scores.iter().sum();
            prop_assert!((rating.sum - expected).abs() < 1e-9);
            prop_assert!(rating.average() > 1.0 - 1e-9 && rating.average() < 10.0 + 1e-9);
        }
    }
}
