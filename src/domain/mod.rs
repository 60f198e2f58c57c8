//! Domain types used throughout the emulator.
//!
//! This module defines:
//!
//! - spectrum selection and query points (`SpectrumKind`, `ParamPoint`)
//! - estimator options and outputs (`EstimateOptions`, `Estimate`)
//! - export records (`EstimateRecord`)

pub mod types;

pub use types::*;
