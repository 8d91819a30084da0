//! Rank normalisation for correlation scoring.
//!
//! Each profile is rank-transformed (ties averaged), centred and scaled to
//! unit length. The Pearson correlation of two rank vectors is then their dot
//! product, i.e. Spearman's rank correlation of the raw profiles.

use ndarray::ArrayView1;

use ferrocyte_common::stats::average_ranks;

/// Centred, unit-norm ranks of `values`.
///
/// A constant profile has no rank variance; it maps to the zero vector, so
/// its correlation with anything is 0.
pub fn scaled_ranks<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let raw: Vec<f64> = values.into_iter().copied().collect();
    let n = raw.len();
    if n == 0 {
        return vec![];
    }

    let mut ranks = average_ranks(&raw);
    let mean = (n as f64 + 1.0) / 2.0;
    for r in &mut ranks {
        *r -= mean;
    }

    let norm = ranks.iter().map(|r| r * r).sum::<f64>().sqrt();
    if norm <= f64::EPSILON {
        return vec![0.0; n];
    }
    for r in &mut ranks {
        *r /= norm;
    }
    ranks
}

/// Ranks of `profile` restricted to the given rows, in row order.
pub fn scaled_ranks_of(profile: ArrayView1<'_, f64>, rows: &[usize]) -> Vec<f64> {
    let picked: Vec<f64> = rows.iter().map(|&r| profile[r]).collect();
    scaled_ranks(&picked)
}

/// Correlation of two scaled rank vectors.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| x * y)
        .sum::<f64>()
        .clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_scaled_ranks_unit_norm() {
        let r = scaled_ranks(&[10.0, 30.0, 20.0]);
        let norm: f64 = r.iter().map(|x| x * x).sum();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert!(r[1] > r[2] && r[2] > r[0]);
    }

    #[test]
    fn test_constant_profile_is_zero() {
        assert_eq!(scaled_ranks(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);
        let c = correlation(&scaled_ranks(&[2.0, 2.0, 2.0]), &scaled_ranks(&[1.0, 2.0, 3.0]));
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_spearman_known_values() {
        // Monotone but nonlinear: rank correlation is exactly 1.
        let a = scaled_ranks(&[1.0, 2.0, 3.0, 4.0]);
        let b = scaled_ranks(&[1.0, 10.0, 100.0, 1000.0]);
        assert_abs_diff_eq!(correlation(&a, &b), 1.0, epsilon = 1e-12);

        let c = scaled_ranks(&[4.0, 3.0, 2.0, 1.0]);
        assert_abs_diff_eq!(correlation(&a, &c), -1.0, epsilon = 1e-12);

        // 1 - 6·Σd² / (n(n²-1)) with ranks (1,2,3,4) vs (2,1,4,3): Σd² = 4 → 0.6
        let d = scaled_ranks(&[2.0, 1.0, 4.0, 3.0]);
        assert_abs_diff_eq!(correlation(&a, &d), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_restricted_rows() {
        let profile = array![5.0, 0.0, 1.0, 9.0];
        let r = scaled_ranks_of(profile.view(), &[3, 0]);
        assert!(r[0] > 0.0 && r[1] < 0.0);
    }
}
