//! Command-line parsing for the spectrum emulator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{EstimateOptions, Method, SpectrumKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "clemu", version, about = "CMB EE/BB spectrum emulator over precomputed (s, tau) training tables")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate a spectrum with global polynomial regression.
    Poly(PolyArgs),
    /// Estimate a spectrum by interpolating on the triangulated training points.
    Grid(GridArgs),
    /// Estimate spectra along a linear sweep of tau or s and report timing.
    Sweep(SweepArgs),
    /// Write synthetic training tables (toy model) for demos and tests.
    Generate(GenerateArgs),
}

/// Where to find the training tables.
///
/// Explicit file flags win over `--data-dir`, which wins over `CLEMU_DATA_DIR`
/// (environment or `.env`), which wins over `./data`.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Directory holding the default-named training tables.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// EE training table.
    #[arg(long, value_name = "FILE")]
    pub ee: Option<PathBuf>,

    /// BB training table.
    #[arg(long, value_name = "FILE")]
    pub bb: Option<PathBuf>,

    /// Parameter table (columns: s, tau).
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,
}

/// Output options shared by the estimating subcommands.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Only print multipoles up to this value.
    #[arg(long)]
    pub lmax: Option<u32>,

    /// Export results (`.json` for JSON, anything else for CSV).
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// A single query point.
#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    /// Optical depth.
    #[arg(long, allow_negative_numbers = true)]
    pub tau: f64,

    /// Scalar amplitude scale.
    #[arg(long, allow_negative_numbers = true)]
    pub s: f64,

    /// Spectrum to estimate.
    #[arg(long, value_enum, default_value_t = SpectrumKind::Ee)]
    pub kind: SpectrumKind,
}

#[derive(Debug, Args, Clone)]
pub struct PolyArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Total degree of the polynomial in (s, tau).
    #[arg(long, default_value_t = EstimateOptions::DEFAULT_DEGREE)]
    pub degree: usize,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Which parameter a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepParam {
    Tau,
    S,
}

#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    /// Parameter to sweep.
    #[arg(long, value_enum, default_value_t = SweepParam::Tau)]
    pub param: SweepParam,

    /// First value of the swept parameter.
    #[arg(long, default_value_t = 0.05, allow_negative_numbers = true)]
    pub from: f64,

    /// Last value of the swept parameter.
    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub to: f64,

    /// Number of sweep points (inclusive of both ends).
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Value of the parameter held fixed.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub fixed: f64,

    /// Estimator to use.
    #[arg(long, value_enum, default_value_t = Method::Grid)]
    pub method: Method,

    /// Spectrum to estimate.
    #[arg(long, value_enum, default_value_t = SpectrumKind::Ee)]
    pub kind: SpectrumKind,

    /// Polynomial degree (ignored by the grid method).
    #[arg(long, default_value_t = EstimateOptions::DEFAULT_DEGREE)]
    pub degree: usize,

    /// Multipoles shown in the sweep table.
    #[arg(long, value_delimiter = ',', default_values_t = [2u32, 10, 100])]
    pub show_ell: Vec<u32>,

    #[command(flatten)]
    pub data: DataArgs,

    /// Export results (`.json` for JSON, anything else for CSV).
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Output directory for the three tables.
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub out: PathBuf,

    /// Grid points along s.
    #[arg(long, default_value_t = 10)]
    pub n_s: usize,

    /// Grid points along tau.
    #[arg(long, default_value_t = 10)]
    pub n_tau: usize,

    #[arg(long, default_value_t = 0.8)]
    pub s_min: f64,

    #[arg(long, default_value_t = 1.2)]
    pub s_max: f64,

    #[arg(long, default_value_t = 0.05)]
    pub tau_min: f64,

    #[arg(long, default_value_t = 0.2)]
    pub tau_max: f64,

    /// Highest multipole written.
    #[arg(long, default_value_t = 200)]
    pub lmax: u32,

    /// Relative Gaussian noise on every value.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
