//! Multipole weighting applied to every estimate.
//!
//! Training tables store `ℓ(ℓ+1)C_ℓ/2π`-style values; estimators return
//! `Z(ℓ) · value` with `Z(ℓ) = 2π / (ℓ(ℓ+1))`.

use std::f64::consts::PI;

/// First multipole present in the training tables.
pub const ELL_MIN: u32 = 2;

/// `Z(ℓ) = 2π / (ℓ(ℓ+1))`.
pub fn cl_weight(ell: u32) -> f64 {
    let l = ell as f64;
    2.0 * PI / (l * (l + 1.0))
}

/// Multipoles `2, 3, …` for `count` retained columns.
pub fn multipoles(count: usize) -> Vec<u32> {
    (0..count as u32).map(|i| ELL_MIN + i).collect()
}

/// Multiply each raw value by `Z(ℓ)` in place.
///
/// `NaN` inputs stay `NaN`.
pub fn apply_cl_weight(ell: &[u32], values: &mut [f64]) {
    debug_assert_eq!(ell.len(), values.len());
    for (v, &l) in values.iter_mut().zip(ell) {
        *v *= cl_weight(l);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_matches_closed_form() {
        for &(ell, expected) in &[
            (2u32, 2.0 * PI / 6.0),
            (10, 2.0 * PI / 110.0),
            (100, 2.0 * PI / 10_100.0),
        ] {
            assert!((cl_weight(ell) - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn multipoles_start_at_two() {
        assert_eq!(multipoles(4), vec![2, 3, 4, 5]);
        assert!(multipoles(0).is_empty());
    }

    #[test]
    fn weighting_is_elementwise() {
        let ell = multipoles(99);
        let mut values = vec![3.0; ell.len()];
        apply_cl_weight(&ell, &mut values);
        for (&l, &v) in ell.iter().zip(&values) {
            assert_eq!(v, 3.0 * cl_weight(l));
        }

        let mut nan = vec![f64::NAN];
        apply_cl_weight(&[2], &mut nan);
        assert!(nan[0].is_nan());
    }
}
