//! Error types.
//!
//! - `EmulatorError` is what the library returns from loading and estimation.
//! - `AppError` is the binary boundary: a message plus a process exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::SpectrumKind;

/// Errors raised by the training store and the estimators.
#[derive(Debug, Clone, Error)]
pub enum EmulatorError {
    /// A training table is missing, unreadable, malformed or inconsistent with the others.
    #[error("failed to load training data from '{}'{}: {message}", path.display(), fmt_line(*line))]
    DataLoad {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// The caller asked for a spectrum other than `EE` or `BB`.
    #[error("invalid spectrum kind '{0}' (expected EE or BB)")]
    InvalidSpectrumKind(String),

    /// More polynomial features than training samples.
    #[error(
        "degree {degree} needs {features} polynomial features but only {samples} training samples are available"
    )]
    UnderdeterminedFit {
        degree: usize,
        features: usize,
        samples: usize,
    },

    /// The least-squares solve produced non-finite coefficients.
    #[error("{kind} degree {degree} least-squares solve did not produce finite coefficients")]
    SolveFailed { kind: SpectrumKind, degree: usize },

    /// The training points do not span a 2-D region.
    #[error("cannot triangulate training points: {0}")]
    DegenerateTriangulation(String),

    /// Query coordinates must be finite.
    #[error("invalid query (s={s}, tau={tau}): coordinates must be finite")]
    InvalidQuery { s: f64, tau: f64 },
}

impl EmulatorError {
    pub(crate) fn data_load(path: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Exit code used when this error reaches the `clemu` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DataLoad { .. } => 2,
            Self::InvalidSpectrumKind(_)
            | Self::UnderdeterminedFit { .. }
            | Self::SolveFailed { .. }
            | Self::DegenerateTriangulation(_)
            | Self::InvalidQuery { .. } => 3,
        }
    }
}

fn fmt_line(line: Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EmulatorError> for AppError {
    fn from(err: EmulatorError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
