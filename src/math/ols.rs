//! Ordinary least squares solver.
//!
//! The polynomial estimator solves one regression per multipole, but every
//! regression shares the same design matrix `X`:
//!
//! ```text
//! minimize ‖X β_ℓ - y_ℓ‖²   for each output column ℓ
//! ```
//!
//! so we decompose `X` once and solve for all columns together
//! (`Y` is `N × C`, `B` is `F × C`).
//!
//! Implementation choices:
//! - SVD, because `X` is tall (more rows than columns) and Nalgebra's
//!   `QR::solve` is intended for square systems.
//! - Singular values below `max(σ) · max(N, F) · ε` are treated as zero, which
//!   yields the minimum-norm solution when `X` is rank deficient (duplicated
//!   training points, degenerate axes).

use nalgebra::DMatrix;

/// Solution of a (multi right-hand side) least-squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Coefficients, one column per right-hand side.
    pub coefficients: DMatrix<f64>,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

impl LeastSquares {
    pub fn is_full_rank(&self) -> bool {
        self.rank == self.coefficients.nrows()
    }
}

/// Solve `X B ≈ Y` in the least-squares sense using SVD.
///
/// Returns `None` if the shapes disagree or the decomposition produced
/// non-finite coefficients.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<LeastSquares> {
    if x.nrows() != y.nrows() || x.ncols() == 0 || x.nrows() == 0 {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    if !sigma_max.is_finite() {
        return None;
    }

    let dim = x.nrows().max(x.ncols()) as f64;
    let tol = sigma_max * dim * f64::EPSILON;
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();

    let coefficients = svd.solve(y, tol).ok()?;
    if !coefficients.iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(LeastSquares { coefficients, rank })
}
