//! Mathematical utilities: monomial basis, least squares, triangulation and
//! multipole weighting.

pub mod basis;
pub mod normalization;
pub mod ols;
pub mod triangulation;

pub use basis::*;
pub use normalization::*;
pub use ols::*;
pub use triangulation::*;
