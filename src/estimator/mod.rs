//! Spectrum estimators.
//!
//! Both strategies read the same `TrainingStore` and return the same
//! `Estimate` shape (`ℓ = 2, 3, …` with `Z(ℓ)`-weighted values):
//!
//! - `PolynomialEstimator`: global least-squares polynomial in `(s, τ)`
//! - `GridEstimator`: linear interpolation on a Delaunay triangulation
//!
//! Callers can hold either behind `dyn Estimator` and swap strategies without
//! branching on type.

use rayon::prelude::*;

use crate::domain::{Estimate, EstimateOptions, ParamPoint, SpectrumKind};
use crate::error::EmulatorError;

pub mod grid;
pub mod polynomial;

pub use grid::*;
pub use polynomial::*;

/// A strategy that maps a parameter point to a weighted spectrum.
///
/// Estimators only read the shared store, so they are `Sync` and may be called
/// from many threads at once.
pub trait Estimator: Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Estimate the `kind` spectrum at `query`.
    fn estimate(
        &self,
        query: ParamPoint,
        kind: SpectrumKind,
        opts: &EstimateOptions,
    ) -> Result<Estimate, EmulatorError>;

    /// Estimate many queries in parallel.
    ///
    /// Output order matches `queries`. If any query fails, one of the errors is
    /// returned.
    fn estimate_many(
        &self,
        queries: &[ParamPoint],
        kind: SpectrumKind,
        opts: &EstimateOptions,
    ) -> Result<Vec<Estimate>, EmulatorError> {
        queries
            .par_iter()
            .map(|q| self.estimate(*q, kind, opts))
            .collect()
    }
}
