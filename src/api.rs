//! Caller-facing estimation API.
//!
//! `Emulator` bundles both estimators over one store so repeated queries reuse
//! cached polynomial fits and a single triangulation. The free functions
//! `estimate_polynomial` / `estimate_grid` are one-shot conveniences that
//! return the `(ell, cl)` pair directly.
//!
//! Spectrum kinds are accepted as strings here (`"EE"` / `"BB"`); anything else
//! fails with `EmulatorError::InvalidSpectrumKind`.

use std::sync::OnceLock;

use crate::data::TrainingStore;
use crate::domain::{Estimate, ParamPoint, SpectrumKind};
use crate::error::EmulatorError;
use crate::estimator::{GridEstimator, PolynomialEstimator};

/// Both estimators over a shared training store.
#[derive(Debug)]
pub struct Emulator<'a> {
    store: &'a TrainingStore,
    poly: PolynomialEstimator<'a>,
    grid: OnceLock<Result<GridEstimator<'a>, EmulatorError>>,
}

impl<'a> Emulator<'a> {
    pub fn new(store: &'a TrainingStore) -> Self {
        Self {
            store,
            poly: PolynomialEstimator::new(store),
            grid: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &'a TrainingStore {
        self.store
    }

    pub fn polynomial(&self) -> &PolynomialEstimator<'a> {
        &self.poly
    }

    /// The grid estimator, triangulating the store on first use.
    pub fn grid(&self) -> Result<&GridEstimator<'a>, EmulatorError> {
        self.grid
            .get_or_init(|| GridEstimator::new(self.store))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Polynomial estimate at `(s, tau)`.
    pub fn estimate_polynomial(&self, tau: f64, s: f64, kind: &str, degree: usize) -> Result<Estimate, EmulatorError> {
        let kind: SpectrumKind = kind.parse()?;
        self.poly.estimate_with_degree(ParamPoint::new(s, tau), kind, degree)
    }

    /// Grid estimate at `(s, tau)`; `NaN` values outside the training hull.
    pub fn estimate_grid(&self, tau: f64, s: f64, kind: &str) -> Result<Estimate, EmulatorError> {
        let kind: SpectrumKind = kind.parse()?;
        self.grid()?.estimate_at(ParamPoint::new(s, tau), kind)
    }
}

/// One-shot polynomial estimate: `(ell_sequence, cl_sequence)`.
pub fn estimate_polynomial(
    store: &TrainingStore,
    tau: f64,
    s: f64,
    kind: &str,
    degree: usize,
) -> Result<(Vec<u32>, Vec<f64>), EmulatorError> {
    Emulator::new(store)
        .estimate_polynomial(tau, s, kind, degree)
        .map(Estimate::into_parts)
}

/// One-shot grid estimate: `(ell_sequence, cl_sequence)`.
pub fn estimate_grid(
    store: &TrainingStore,
    tau: f64,
    s: f64,
    kind: &str,
) -> Result<(Vec<u32>, Vec<f64>), EmulatorError> {
    Emulator::new(store)
        .estimate_grid(tau, s, kind)
        .map(Estimate::into_parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticConfig, generate_synthetic};

    fn store() -> TrainingStore {
        let cfg = SyntheticConfig {
            n_s: 6,
            n_tau: 6,
            lmax: 30,
            ..SyntheticConfig::default()
        };
        generate_synthetic(&cfg).unwrap().into_store().unwrap()
    }

    #[test]
    fn invalid_kind_fails_for_both_estimators() {
        let store = store();
        for result in [
            estimate_polynomial(&store, 0.1, 1.0, "XX", 2).map(|_| ()),
            estimate_grid(&store, 0.1, 1.0, "XX").map(|_| ()),
        ] {
            assert!(matches!(result, Err(EmulatorError::InvalidSpectrumKind(_))));
        }
    }

    #[test]
    fn sequences_are_aligned_and_start_at_two() {
        let store = store();
        let (ell_p, cl_p) = estimate_polynomial(&store, 0.1, 1.0, "EE", 3).unwrap();
        let (ell_g, cl_g) = estimate_grid(&store, 0.1, 1.0, "BB").unwrap();
        assert_eq!(ell_p.len(), cl_p.len());
        assert_eq!(ell_g.len(), cl_g.len());
        assert_eq!(ell_p, ell_g);
        assert_eq!(ell_p[0], 2);
        assert!(ell_p.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn emulator_reuses_fits_and_triangulation() {
        let store = store();
        let emu = Emulator::new(&store);
        emu.estimate_polynomial(0.1, 1.0, "EE", 2).unwrap();
        emu.estimate_polynomial(0.12, 0.9, "ee", 2).unwrap();
        assert_eq!(emu.polynomial().cached_fits(), 1);

        assert!(std::ptr::eq(emu.grid().unwrap(), emu.grid().unwrap()));
    }
}
