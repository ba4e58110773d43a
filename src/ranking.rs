// Competition ranking with average ties
// Matches standard statistical ranking: tied values receive the mean of the
// positions they occupy, ranks are assigned descending by value.

use serde::{Deserialize, Serialize};

/// One row of a ranking output (products or sales reps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    /// Product id or sales-rep name
    pub key: String,

    /// Revenue summed over the selection
    pub revenue: f64,

    /// revenue / total selection revenue, rounded to 4 decimal places
    pub participation: f64,

    /// 1.0 = highest revenue; tied revenues share the mean of their tied
    /// positions, so ranks are fractional in the presence of ties
    pub rank: f64,
}

/// Rank values descending, ties receiving the mean of their tied positions.
///
/// `[3000.0, 1000.0, 2000.0]` ranks as `[1.0, 3.0, 2.0]`;
/// `[1500.0, 1500.0]` ranks as `[1.5, 1.5]`.
pub fn average_rank_descending(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    // Descending by value; values are finite revenue sums
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the run of positions holding the same value
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }

        // Positions are 1-based; the run i..j shares their mean
        let mean_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = mean_rank;
        }

        i = j;
    }

    ranks
}

/// Round to 4 decimal places (participation share precision).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_distinct_values() {
        let ranks = average_rank_descending(&[1000.0, 3000.0, 2000.0]);
        assert_eq!(ranks, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rank_two_way_tie_at_top() {
        // Both tie for positions 1 and 2, sharing their mean 1.5
        let ranks = average_rank_descending(&[1500.0, 1500.0]);
        assert_eq!(ranks, vec![1.5, 1.5]);
    }

    #[test]
    fn test_rank_tie_in_the_middle() {
        let ranks = average_rank_descending(&[5000.0, 2000.0, 2000.0, 1000.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_rank_three_way_tie() {
        // Positions 1, 2, 3 averaged => 2.0 for each
        let ranks = average_rank_descending(&[700.0, 700.0, 700.0]);
        assert_eq!(ranks, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_rank_single_value() {
        assert_eq!(average_rank_descending(&[42.0]), vec![1.0]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(average_rank_descending(&[]).is_empty());
    }

    #[test]
    fn test_equal_values_share_equal_ranks() {
        // Competition-ranking law: revenue(A) == revenue(B) => rank(A) == rank(B)
        let values = [10.0, 20.0, 10.0, 30.0, 20.0];
        let ranks = average_rank_descending(&values);
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] == values[j] {
                    assert_eq!(ranks[i], ranks[j]);
                }
            }
        }
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.75), 0.75);
        assert_eq!(round4(1.0 / 3.0), 0.3333);
    }
}
