//! Bivariate monomial basis.
//!
//! For total degree `D` the basis is every term `x^a · y^b` with `a + b ≤ D`,
//! constant included, so there are `C(D + 2, 2) = (D + 1)(D + 2) / 2` features.
//!
//! Terms are ordered by total degree, then by decreasing power of `x`:
//!
//! ```text
//! 1, x, y, x², xy, y², x³, x²y, xy², y³, ...
//! ```
//!
//! Numerical notes:
//! - Raw parameters live on narrow, offset intervals (e.g. `s ∈ [0.8, 1.2]`,
//!   `τ ∈ [0.05, 0.2]`), which makes high-degree Vandermonde columns nearly
//!   collinear. `AxisScaler` maps each axis onto `[-1, 1]` first. The map is
//!   affine, so the span of the basis (and therefore every least-squares
//!   prediction) is unchanged.

/// Number of monomials of two variables with total degree `≤ degree`.
pub fn feature_count(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

/// Exponent pairs `(a, b)` for `x^a · y^b`, in basis order.
pub fn monomial_exponents(degree: usize) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(feature_count(degree));
    for total in 0..=degree as u32 {
        for b in 0..=total {
            out.push((total - b, b));
        }
    }
    out
}

/// Fill `out` with the monomial expansion of `(x, y)`.
///
/// # Panics
/// Panics if `out.len() != feature_count(degree)`.
pub fn fill_feature_row(x: f64, y: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), feature_count(degree), "feature row has wrong length");

    // Powers are built by repeated multiplication so the expansion is exact
    // for small integers and deterministic across platforms.
    let mut xp = Vec::with_capacity(degree + 1);
    let mut yp = Vec::with_capacity(degree + 1);
    xp.push(1.0);
    yp.push(1.0);
    for k in 1..=degree {
        xp.push(xp[k - 1] * x);
        yp.push(yp[k - 1] * y);
    }

    let mut j = 0;
    for total in 0..=degree {
        for b in 0..=total {
            out[j] = xp[total - b] * yp[b];
            j += 1;
        }
    }
}

/// Affine map of one axis onto `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScaler {
    center: f64,
    half_width: f64,
}

impl AxisScaler {
    /// Scaler for values spanning `[min, max]`.
    ///
    /// A degenerate axis (`max == min`) maps every value to `v - min`. The
    /// training values land on 0, so every power of that axis is a zero column
    /// and the minimum-norm solve gives it zero weight.
    pub fn from_range(min: f64, max: f64) -> Self {
        let half_width = 0.5 * (max - min);
        if half_width > 0.0 && half_width.is_finite() {
            Self {
                center: 0.5 * (max + min),
                half_width,
            }
        } else {
            Self {
                center: min,
                half_width: 1.0,
            }
        }
    }

    pub fn apply(&self, v: f64) -> f64 {
        (v - self.center) / self.half_width
    }
}
