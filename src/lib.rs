//! `cl-emulator` library crate.
//!
//! Fast estimates of CMB EE/BB angular power spectra as functions of the
//! scalar amplitude scale `s` and optical depth `τ`, from a precomputed training
//! table instead of a Boltzmann solver run per query.
//!
//! - `data::TrainingStore`: validated, read-only training tables
//! - `estimator`: polynomial regression and grid interpolation strategies
//! - `api`: `(ell, cl)` convenience functions and the `Emulator` bundle
//!
//! The binary (`clemu`) is a thin wrapper around this library so that core
//! logic is testable without spawning processes.

pub mod api;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod io;
pub mod math;
pub mod report;

pub use api::{Emulator, estimate_grid, estimate_polynomial};
pub use data::TrainingStore;
pub use domain::{Estimate, EstimateOptions, ParamPoint, SpectrumKind};
pub use error::EmulatorError;
pub use estimator::{Estimator, GridEstimator, PolynomialEstimator};
