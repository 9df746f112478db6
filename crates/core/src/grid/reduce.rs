//! Global reductions over per-subdomain partials
//!
//! Subdomain scans run in parallel and each returns a small partial result.
//! These helpers combine partials in rank order so a reduction gives the same
//! bits regardless of how rayon scheduled the scans.

/// Global sum of counts
pub fn sum_counts(partials: &[usize]) -> usize {
    partials.iter().sum()
}

/// Global minimum; `f64::INFINITY` for no partials
pub fn min(partials: &[f64]) -> f64 {
    partials.iter().fold(f64::INFINITY, |acc, &v| acc.min(v))
}

/// Global maximum; `f64::NEG_INFINITY` for no partials
pub fn max(partials: &[f64]) -> f64 {
    partials.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
}

/// Element-wise sum of equally sized per-rank vectors
pub fn sum_elementwise(partials: &[Vec<f64>]) -> Vec<f64> {
    let len = partials.first().map_or(0, Vec::len);
    let mut total = vec![0.0; len];
    for part in partials {
        debug_assert_eq!(part.len(), len);
        for (t, &v) in total.iter_mut().zip(part) {
            *t += v;
        }
    }
    total
}

/// Element-wise sum of equally sized per-rank count vectors
pub fn sum_counts_elementwise(partials: &[Vec<usize>]) -> Vec<usize> {
    let len = partials.first().map_or(0, Vec::len);
    let mut total = vec![0; len];
    for part in partials {
        debug_assert_eq!(part.len(), len);
        for (t, &v) in total.iter_mut().zip(part) {
            *t += v;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reductions() {
        let partials = [3.0, -1.5, 7.25];
        assert_eq!(min(&partials), -1.5);
        assert_eq!(max(&partials), 7.25);
        assert_eq!(sum_counts(&[2, 0, 5]), 7);
    }

    #[test]
    fn test_empty_reductions_are_identities() {
        assert_eq!(min(&[]), f64::INFINITY);
        assert_eq!(max(&[]), f64::NEG_INFINITY);
        assert!(sum_elementwise(&[]).is_empty());
    }

    #[test]
    fn test_elementwise_sum() {
        let partials = vec![vec![1.0, 2.0], vec![0.5, -2.0], vec![0.0, 1.0]];
        assert_eq!(sum_elementwise(&partials), vec![1.5, 1.0]);

        let counts = vec![vec![1, 0, 4], vec![2, 3, 0]];
        assert_eq!(sum_counts_elementwise(&counts), vec![3, 3, 4]);
    }
}
