//! Polynomial regression estimator.
//!
//! For a given spectrum kind and total degree `D`:
//!
//! 1. expand every training point into the `F = C(D+2, 2)` monomials of `(s, τ)`
//!    (design matrix `X`, `N × F`)
//! 2. solve one least-squares problem per multipole column (all columns share
//!    `X`, so this is a single multi right-hand side solve)
//! 3. expand the query the same way and evaluate every fitted polynomial
//! 4. weight by `Z(ℓ) = 2π / (ℓ(ℓ+1))`
//!
//! Fits are cached per `(kind, degree)`. The store is immutable, so a cached fit
//! never goes stale and produces the same bits as a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nalgebra::DMatrix;

use crate::data::TrainingStore;
use crate::domain::{Estimate, EstimateOptions, ParamPoint, SpectrumKind};
use crate::error::EmulatorError;
use crate::estimator::Estimator;
use crate::math::{AxisScaler, apply_cl_weight, feature_count, fill_feature_row, solve_least_squares};

/// Fitted polynomial coefficients for every multipole of one spectrum kind.
#[derive(Debug, Clone)]
pub struct PolynomialFit {
    pub kind: SpectrumKind,
    pub degree: usize,
    /// Numerical rank of the design matrix (`== feature_count()` when well posed).
    pub rank: usize,
    /// Root-mean-square residual of the raw (unweighted) fit over all training cells.
    pub training_rmse: f64,
    ell: Vec<u32>,
    s_axis: AxisScaler,
    tau_axis: AxisScaler,
    /// `F × C`: column `c` holds the coefficients for `ell[c]`.
    coefficients: DMatrix<f64>,
}

impl PolynomialFit {
    pub fn feature_count(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn multipoles(&self) -> &[u32] {
        &self.ell
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.feature_count()
    }

    /// Monomial expansion of a point in the fit's scaled coordinates.
    pub fn features(&self, p: ParamPoint) -> Vec<f64> {
        let mut row = vec![0.0; self.feature_count()];
        fill_feature_row(self.s_axis.apply(p.s), self.tau_axis.apply(p.tau), self.degree, &mut row);
        row
    }

    /// Unweighted predictions, one per multipole.
    pub fn predict_raw(&self, p: ParamPoint) -> Vec<f64> {
        let row = self.features(p);
        (0..self.coefficients.ncols())
            .map(|c| {
                let mut acc = 0.0;
                for (j, &f) in row.iter().enumerate() {
                    acc += f * self.coefficients[(j, c)];
                }
                acc
            })
            .collect()
    }

    /// `Z(ℓ)`-weighted estimate at `p`.
    pub fn predict(&self, p: ParamPoint) -> Estimate {
        let mut cl = self.predict_raw(p);
        apply_cl_weight(&self.ell, &mut cl);
        Estimate {
            ell: self.ell.clone(),
            cl,
        }
    }
}

/// Fit every multipole column of `kind` with a total-degree-`degree` polynomial.
pub fn fit_polynomial(
    store: &TrainingStore,
    kind: SpectrumKind,
    degree: usize,
) -> Result<PolynomialFit, EmulatorError> {
    let n = store.point_count();
    let f = feature_count(degree);
    if f > n {
        return Err(EmulatorError::UnderdeterminedFit {
            degree,
            features: f,
            samples: n,
        });
    }

    let bounds = store.param_bounds();
    let s_axis = AxisScaler::from_range(bounds.s_min, bounds.s_max);
    let tau_axis = AxisScaler::from_range(bounds.tau_min, bounds.tau_max);

    let mut x = DMatrix::<f64>::zeros(n, f);
    let mut row = vec![0.0; f];
    for (i, p) in store.points().iter().enumerate() {
        fill_feature_row(s_axis.apply(p.s), tau_axis.apply(p.tau), degree, &mut row);
        for (j, &v) in row.iter().enumerate() {
            x[(i, j)] = v;
        }
    }
    let y = store.spectrum_columns(kind);

    let solution = solve_least_squares(&x, &y).ok_or(EmulatorError::SolveFailed { kind, degree })?;
    if !solution.is_full_rank() {
        log::warn!(
            "{kind} degree {degree}: design matrix has rank {} < {f} features; using minimum-norm solution",
            solution.rank
        );
    }

    let residual = &x * &solution.coefficients - &y;
    let cells = (residual.nrows() * residual.ncols()).max(1) as f64;
    let training_rmse = (residual.norm_squared() / cells).sqrt();

    log::debug!(
        "fitted {kind} polynomial: degree={degree} features={f} samples={n} multipoles={} rmse={training_rmse:.3e}",
        y.ncols()
    );

    Ok(PolynomialFit {
        kind,
        degree,
        rank: solution.rank,
        training_rmse,
        ell: store.multipoles(),
        s_axis,
        tau_axis,
        coefficients: solution.coefficients,
    })
}

/// Polynomial regression over a shared training store, with per-`(kind, degree)` caching.
#[derive(Debug)]
pub struct PolynomialEstimator<'a> {
    store: &'a TrainingStore,
    cache: Mutex<HashMap<(SpectrumKind, usize), Arc<PolynomialFit>>>,
}

impl<'a> PolynomialEstimator<'a> {
    pub fn new(store: &'a TrainingStore) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &'a TrainingStore {
        self.store
    }

    /// Cached fit for `(kind, degree)`, computing it on first use.
    pub fn fit(&self, kind: SpectrumKind, degree: usize) -> Result<Arc<PolynomialFit>, EmulatorError> {
        if let Some(fit) = self.lock_cache().get(&(kind, degree)) {
            return Ok(Arc::clone(fit));
        }

        // Fit outside the lock; concurrent misses compute identical fits.
        let fit = Arc::new(fit_polynomial(self.store, kind, degree)?);
        let mut cache = self.lock_cache();
        let entry = cache.entry((kind, degree)).or_insert(fit);
        Ok(Arc::clone(entry))
    }

    /// Estimate at `query` with an explicit degree.
    pub fn estimate_with_degree(
        &self,
        query: ParamPoint,
        kind: SpectrumKind,
        degree: usize,
    ) -> Result<Estimate, EmulatorError> {
        query.ensure_finite()?;
        Ok(self.fit(kind, degree)?.predict(query))
    }

    /// Number of cached fits.
    pub fn cached_fits(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<(SpectrumKind, usize), Arc<PolynomialFit>>> {
        // Entries are immutable once inserted, so a poisoned lock still holds valid data.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Estimator for PolynomialEstimator<'_> {
    fn name(&self) -> &'static str {
        "poly"
    }

    fn estimate(
        &self,
        query: ParamPoint,
        kind: SpectrumKind,
        opts: &EstimateOptions,
    ) -> Result<Estimate, EmulatorError> {
        self.estimate_with_degree(query, kind, opts.degree)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::math::cl_weight;

    fn grid_store(nx: usize, ny: usize, f: impl Fn(f64, f64, usize) -> f64, n_ell: usize) -> TrainingStore {
        let mut points = Vec::new();
        let mut ee = Vec::new();
        let mut bb = Vec::new();
        for i in 0..nx {
            for j in 0..ny {
                let s = 0.8 + 0.4 * i as f64 / (nx - 1) as f64;
                let tau = 0.05 + 0.15 * j as f64 / (ny - 1) as f64;
                points.push(ParamPoint::new(s, tau));
                let mut row = vec![(i * ny + j) as f64, 0.0];
                row.extend((0..n_ell).map(|c| f(s, tau, c)));
                ee.push(row.clone());
                bb.push(row.iter().map(|v| 0.5 * v).collect());
            }
        }
        TrainingStore::from_parts(points, ee, bb).unwrap()
    }

    #[test]
    fn three_point_linear_fit_reproduces_training_value() {
        let points = vec![
            ParamPoint::new(0.8, 0.05),
            ParamPoint::new(1.0, 0.1),
            ParamPoint::new(1.2, 0.2),
        ];
        let ee = vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 2.0], vec![2.0, 0.0, 3.0]];
        let store = TrainingStore::from_parts(points, ee.clone(), ee).unwrap();

        let est = PolynomialEstimator::new(&store);
        let out = est
            .estimate_with_degree(ParamPoint::new(1.0, 0.1), SpectrumKind::Ee, 1)
            .unwrap();
        assert_eq!(out.ell, vec![2]);
        let expected = 2.0 * PI / (2.0 * 3.0) * 2.0;
        assert!((out.cl[0] - expected).abs() < 1e-10, "got {}", out.cl[0]);
    }

    #[test]
    fn degree_zero_returns_column_mean() {
        let store = grid_store(3, 3, |s, tau, c| s + tau + c as f64, 2);
        let fit = fit_polynomial(&store, SpectrumKind::Ee, 0).unwrap();
        let raw = fit.predict_raw(ParamPoint::new(5.0, 5.0));
        // Mean of s over the grid is 1.0, mean of tau is 0.125.
        assert!((raw[0] - 1.125).abs() < 1e-12);
        assert!((raw[1] - 2.125).abs() < 1e-12);
    }

    #[test]
    fn exact_for_polynomials_up_to_degree() {
        let truth = |s: f64, tau: f64, c: usize| 1.0 + s * s * tau - 3.0 * tau.powi(3) + c as f64 * s;
        let store = grid_store(6, 6, truth, 3);
        let fit = fit_polynomial(&store, SpectrumKind::Ee, 3).unwrap();
        assert!(fit.is_full_rank());
        assert!(fit.training_rmse < 1e-10);

        let q = ParamPoint::new(0.93, 0.137);
        let raw = fit.predict_raw(q);
        for (c, v) in raw.iter().enumerate() {
            assert!((v - truth(q.s, q.tau, c)).abs() < 1e-9);
        }
    }

    #[test]
    fn too_many_features_is_underdetermined() {
        let store = grid_store(3, 3, |s, _, _| s, 1);
        // N = 9: degree 2 has 6 features, degree 3 has 10.
        assert!(fit_polynomial(&store, SpectrumKind::Ee, 2).is_ok());
        let err = fit_polynomial(&store, SpectrumKind::Ee, 3).unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::UnderdeterminedFit {
                degree: 3,
                features: 10,
                samples: 9
            }
        ));
    }

    #[test]
    fn output_is_weighted_by_multipole() {
        let store = grid_store(4, 4, |_, _, _| 7.0, 5);
        let out = PolynomialEstimator::new(&store)
            .estimate_with_degree(ParamPoint::new(1.0, 0.1), SpectrumKind::Ee, 1)
            .unwrap();
        assert_eq!(out.ell, vec![2, 3, 4, 5, 6]);
        for (l, v) in out.iter() {
            assert!((v - 7.0 * cl_weight(l)).abs() < 1e-12);
        }
    }

    #[test]
    fn bb_uses_its_own_table() {
        let store = grid_store(3, 3, |_, _, _| 4.0, 1);
        let est = PolynomialEstimator::new(&store);
        let q = ParamPoint::new(1.0, 0.1);
        let ee = est.estimate_with_degree(q, SpectrumKind::Ee, 1).unwrap();
        let bb = est.estimate_with_degree(q, SpectrumKind::Bb, 1).unwrap();
        assert!((bb.cl[0] - 0.5 * ee.cl[0]).abs() < 1e-12);
    }

    #[test]
    fn cached_fit_matches_fresh_fit_bitwise() {
        let store = grid_store(5, 5, |s, tau, c| (s * 3.0).sin() + tau.exp() * c as f64, 4);
        let est = PolynomialEstimator::new(&store);
        let q = ParamPoint::new(1.07, 0.09);

        let first = est.estimate_with_degree(q, SpectrumKind::Ee, 3).unwrap();
        let second = est.estimate_with_degree(q, SpectrumKind::Ee, 3).unwrap();
        assert_eq!(est.cached_fits(), 1);
        let fresh = fit_polynomial(&store, SpectrumKind::Ee, 3).unwrap().predict(q);

        for ((a, b), c) in first.cl.iter().zip(&second.cl).zip(&fresh.cl) {
            assert_eq!(a.to_bits(), b.to_bits());
            assert_eq!(a.to_bits(), c.to_bits());
        }
    }

    #[test]
    fn duplicated_points_still_fit() {
        let points = vec![
            ParamPoint::new(0.8, 0.05),
            ParamPoint::new(0.8, 0.05),
            ParamPoint::new(1.2, 0.05),
            ParamPoint::new(1.0, 0.2),
        ];
        let ee = vec![
            vec![0.0, 0.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 0.0, 2.0],
            vec![3.0, 0.0, 3.0],
        ];
        let store = TrainingStore::from_parts(points, ee.clone(), ee).unwrap();
        let fit = fit_polynomial(&store, SpectrumKind::Ee, 1).unwrap();
        assert!(fit.is_full_rank());
        assert!(fit.training_rmse < 1e-12);
    }

    #[test]
    fn non_finite_query_is_rejected() {
        let store = grid_store(3, 3, |s, _, _| s, 1);
        let err = PolynomialEstimator::new(&store)
            .estimate_with_degree(ParamPoint::new(f64::NAN, 0.1), SpectrumKind::Ee, 1)
            .unwrap_err();
        assert!(matches!(err, EmulatorError::InvalidQuery { .. }));
    }

    #[test]
    fn overflowing_solve_reports_solve_failure() {
        let points = vec![
            ParamPoint::new(0.8, 0.05),
            ParamPoint::new(1.2, 0.05),
            ParamPoint::new(1.0, 0.2),
        ];
        let rows = vec![vec![0.0, 0.0, 1.7e308]; 3];
        let store = TrainingStore::from_parts(points, rows.clone(), rows).unwrap();

        let err = fit_polynomial(&store, SpectrumKind::Bb, 0).unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::SolveFailed {
                kind: SpectrumKind::Bb,
                degree: 0
            }
        ));
        assert!(!err.to_string().contains("samples"));
        assert_eq!(err.exit_code(), 3);
    }
}
