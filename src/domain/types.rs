//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the store and the estimators
//! - exported to JSON/CSV
//! - parsed from CLI flags

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EmulatorError;

/// Polarization mode of the spectrum being estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SpectrumKind {
    #[value(name = "EE", alias = "ee")]
    #[serde(rename = "EE")]
    Ee,
    #[value(name = "BB", alias = "bb")]
    #[serde(rename = "BB")]
    Bb,
}

impl SpectrumKind {
    pub fn display_name(self) -> &'static str {
        match self {
            SpectrumKind::Ee => "EE",
            SpectrumKind::Bb => "BB",
        }
    }
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SpectrumKind {
    type Err = EmulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EE" => Ok(SpectrumKind::Ee),
            "BB" => Ok(SpectrumKind::Bb),
            _ => Err(EmulatorError::InvalidSpectrumKind(s.to_string())),
        }
    }
}

/// A point in parameter space: amplitude scale `s` and optical depth `tau`.
///
/// Training tables store points as `[s, tau]` rows, so `s` is the first axis
/// everywhere (feature expansion, triangulation, bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamPoint {
    pub s: f64,
    pub tau: f64,
}

impl ParamPoint {
    pub fn new(s: f64, tau: f64) -> Self {
        Self { s, tau }
    }

    pub fn is_finite(&self) -> bool {
        self.s.is_finite() && self.tau.is_finite()
    }

    pub(crate) fn ensure_finite(&self) -> Result<(), EmulatorError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(EmulatorError::InvalidQuery {
                s: self.s,
                tau: self.tau,
            })
        }
    }
}

/// Axis-aligned bounding box of a set of parameter points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBounds {
    pub s_min: f64,
    pub s_max: f64,
    pub tau_min: f64,
    pub tau_max: f64,
}

impl ParamBounds {
    /// Bounds of `points`, or `None` when empty.
    pub fn of(points: &[ParamPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut b = Self {
            s_min: first.s,
            s_max: first.s,
            tau_min: first.tau,
            tau_max: first.tau,
        };
        for p in &points[1..] {
            b.s_min = b.s_min.min(p.s);
            b.s_max = b.s_max.max(p.s);
            b.tau_min = b.tau_min.min(p.tau);
            b.tau_max = b.tau_max.max(p.tau);
        }
        Some(b)
    }

    pub fn contains(&self, p: ParamPoint) -> bool {
        p.s >= self.s_min && p.s <= self.s_max && p.tau >= self.tau_min && p.tau <= self.tau_max
    }
}

/// Per-call estimator options.
///
/// `degree` only matters to the polynomial estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateOptions {
    pub degree: usize,
}

impl EstimateOptions {
    pub const DEFAULT_DEGREE: usize = 5;

    pub fn with_degree(degree: usize) -> Self {
        Self { degree }
    }
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            degree: Self::DEFAULT_DEGREE,
        }
    }
}

/// Which estimator produced (or should produce) an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Global polynomial least-squares regression.
    Poly,
    /// Linear interpolation on a Delaunay triangulation.
    Grid,
}

/// A weighted spectrum estimate: `cl[i]` is the value at multipole `ell[i]`.
///
/// Values are `NaN` when the query could not be estimated (grid estimator
/// outside the convex hull of the training points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub ell: Vec<u32>,
    pub cl: Vec<f64>,
}

impl Estimate {
    pub fn len(&self) -> usize {
        self.ell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ell.is_empty()
    }

    /// `false` when the estimator returned the undefined marker.
    pub fn is_defined(&self) -> bool {
        self.cl.iter().all(|v| !v.is_nan())
    }

    /// `(ell, C_ell)` pairs in increasing `ell`.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.ell.iter().copied().zip(self.cl.iter().copied())
    }

    /// Split into the `(ell_sequence, cl_sequence)` pair returned by the free-function API.
    pub fn into_parts(self) -> (Vec<u32>, Vec<f64>) {
        (self.ell, self.cl)
    }
}

/// An estimate together with what produced it (used for exports and reports).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub method: Method,
    pub kind: SpectrumKind,
    pub query: ParamPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<usize>,
    pub defined: bool,
    pub ell: Vec<u32>,
    pub cl: Vec<f64>,
}

impl EstimateRecord {
    pub fn new(method: Method, kind: SpectrumKind, query: ParamPoint, degree: Option<usize>, estimate: Estimate) -> Self {
        Self {
            method,
            kind,
            query,
            degree,
            defined: estimate.is_defined(),
            ell: estimate.ell,
            cl: estimate.cl,
        }
    }
}
