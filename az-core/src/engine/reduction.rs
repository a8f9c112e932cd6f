//! Sample batch statistics
//!
//! An accepted batch is trimmed by dropping its single highest and single lowest
//! sample, then the remainder is folded into one value.

use std::cmp::Ordering;

use crate::data::{Position, ReductionMethod};

/// Max z minus min z over the batch (0 for an empty batch)
pub fn spread(batch: &[Position]) -> f64 {
    let mut zs = batch.iter().map(|p| p.z);
    let first = match zs.next() {
        Some(z) => z,
        None => return 0.0,
    };
    let (min, max) = zs.fold((first, first), |(min, max), z| (min.min(z), max.max(z)));
    max - min
}

/// Z values of the batch without one max and one min, sorted ascending
///
/// Batches shorter than three samples are returned sorted but untrimmed.
pub fn trim_extremes(batch: &[Position]) -> Vec<f64> {
    let mut zs: Vec<f64> = batch.iter().map(|p| p.z).collect();
    zs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    if zs.len() < 3 {
        return zs;
    }
    zs[1..zs.len() - 1].to_vec()
}

/// Fold sorted z values into one
///
/// Median of an even count is the mean of the two centre values.
pub fn reduce(sorted: &[f64], method: ReductionMethod) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    match method {
        ReductionMethod::Average => sorted.iter().sum::<f64>() / sorted.len() as f64,
        ReductionMethod::Median => {
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 1 {
                sorted[mid]
            } else {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(zs: &[f64]) -> Vec<Position> {
        zs.iter().map(|&z| Position::new(120.0, 120.0, z)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_spread() {
        assert!(close(spread(&batch(&[1.00, 1.02, 0.99, 1.01, 5.00])), 4.01));
        assert_eq!(spread(&[]), 0.0);
    }

    #[test]
    fn test_trim_removes_exactly_one_max_and_min() {
        let trimmed = trim_extremes(&batch(&[0.3, 0.1, 0.5, 0.2, 0.4]));
        assert_eq!(trimmed, vec![0.2, 0.3, 0.4]);

        // Duplicated extremes only lose one copy each
        let trimmed = trim_extremes(&batch(&[0.1, 0.1, 0.2, 0.5, 0.5]));
        assert_eq!(trimmed, vec![0.1, 0.2, 0.5]);

        // Three samples leave exactly one
        assert_eq!(trim_extremes(&batch(&[2.0, 1.0, 3.0])), vec![2.0]);
    }

    #[test]
    fn test_average_and_median() {
        let trimmed = trim_extremes(&batch(&[1.0, 2.0, 3.0, 10.0, 0.0, 4.0]));
        assert_eq!(trimmed.len(), 4);
        assert!(close(reduce(&trimmed, ReductionMethod::Average), 2.5));
        // Even remainder: mean of the two centre values (2.0, 3.0)
        assert!(close(reduce(&trimmed, ReductionMethod::Median), 2.5));

        let odd = trim_extremes(&batch(&[0.0, 1.0, 1.5, 9.0, 10.0]));
        assert!(close(reduce(&odd, ReductionMethod::Median), 1.5));
        assert!(close(reduce(&odd, ReductionMethod::Average), 11.5 / 3.0));
    }

    #[test]
    fn test_reduction_ignores_input_order() {
        let a = batch(&[0.12, 0.10, 0.11, 0.13, 0.09, 0.10]);
        let mut b = a.clone();
        b.reverse();
        b.swap(0, 3);
        for method in [ReductionMethod::Average, ReductionMethod::Median] {
            assert!(close(reduce(&trim_extremes(&a), method), reduce(&trim_extremes(&b), method)));
        }
    }
}
