//! Synthetic training tables for demos and tests.
//!
//! The spectra are a smooth toy model, not physics: a low-ℓ "reionization
//! bump" whose height scales with `s · τ²`, on top of a slowly rising tail
//! scaled by `s · exp(-2τ)`. It is only meant to have the right qualitative
//! dependence on `(s, τ)` so both estimators have something realistic to chew
//! on without a Boltzmann code.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::store::{DataPaths, TrainingStore};
use crate::domain::ParamPoint;
use crate::error::{AppError, EmulatorError};

/// Peak height of the reionization bump per unit `s · τ²`.
const REION_AMPLITUDE: f64 = 40.0;
/// Multipole of the bump peak and its width.
const REION_PEAK: f64 = 4.0;
const REION_WIDTH: f64 = 3.0;
/// Tail amplitude at `ℓ = 10` and its power-law slope.
const TAIL_AMPLITUDE: f64 = 0.02;
const TAIL_SLOPE: f64 = 1.5;
/// BB is a suppressed copy of EE in this toy model.
const BB_SUPPRESSION: f64 = 0.05;

/// Settings for `generate_synthetic`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub n_s: usize,
    pub n_tau: usize,
    pub s_min: f64,
    pub s_max: f64,
    pub tau_min: f64,
    pub tau_max: f64,
    /// Highest multipole written (tables hold `ℓ = 2 … lmax`).
    pub lmax: u32,
    /// Relative Gaussian noise applied to every value (0 disables it).
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_s: 10,
            n_tau: 10,
            s_min: 0.8,
            s_max: 1.2,
            tau_min: 0.05,
            tau_max: 0.2,
            lmax: 200,
            noise: 0.0,
            seed: 42,
        }
    }
}

/// Generated tables in the on-disk row layout (two id columns, then `ℓ = 2…`).
#[derive(Debug, Clone)]
pub struct SyntheticTables {
    pub points: Vec<ParamPoint>,
    pub ee: Vec<Vec<f64>>,
    pub bb: Vec<Vec<f64>>,
}

impl SyntheticTables {
    pub fn into_store(self) -> Result<TrainingStore, EmulatorError> {
        TrainingStore::from_parts(self.points, self.ee, self.bb)
    }

    /// Write the three tables into `dir` using the default file names.
    pub fn write_tables(&self, dir: &Path) -> Result<DataPaths, AppError> {
        create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
        let paths = DataPaths::in_dir(dir);

        write_rows(&paths.ee, &self.ee)?;
        write_rows(&paths.bb, &self.bb)?;
        let params: Vec<Vec<f64>> = self.points.iter().map(|p| vec![p.s, p.tau]).collect();
        write_rows(&paths.params, &params)?;

        log::info!("wrote {} synthetic training rows to '{}'", self.points.len(), dir.display());
        Ok(paths)
    }
}

/// Toy EE value (before any `Z(ℓ)` weighting).
pub fn toy_ee(ell: u32, s: f64, tau: f64) -> f64 {
    let l = ell as f64;
    let bump = REION_AMPLITUDE * tau * tau * (-((l - REION_PEAK) / REION_WIDTH).powi(2)).exp();
    let tail = TAIL_AMPLITUDE * (l / 10.0).powf(TAIL_SLOPE) * (-2.0 * tau).exp();
    s * (bump + tail)
}

/// Toy BB value (before any `Z(ℓ)` weighting).
pub fn toy_bb(ell: u32, s: f64, tau: f64) -> f64 {
    BB_SUPPRESSION * toy_ee(ell, s, tau)
}

/// Build a regular `n_s × n_tau` grid of training samples.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticTables, AppError> {
    if config.n_s < 2 || config.n_tau < 2 {
        return Err(AppError::new(2, "Synthetic grid needs at least 2 points per axis."));
    }
    if !(config.s_min.is_finite() && config.s_max.is_finite() && config.s_max > config.s_min) {
        return Err(AppError::new(2, "Invalid s range for synthetic tables."));
    }
    if !(config.tau_min.is_finite() && config.tau_max.is_finite() && config.tau_max > config.tau_min) {
        return Err(AppError::new(2, "Invalid tau range for synthetic tables."));
    }
    if config.lmax < 2 {
        return Err(AppError::new(2, "lmax must be >= 2."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let mut jitter = |v: f64| {
        if config.noise > 0.0 {
            v * (1.0 + config.noise * normal.sample(&mut rng))
        } else {
            v
        }
    };

    let n = config.n_s * config.n_tau;
    let mut points = Vec::with_capacity(n);
    let mut ee = Vec::with_capacity(n);
    let mut bb = Vec::with_capacity(n);

    for i in 0..config.n_s {
        let s = lerp(config.s_min, config.s_max, i, config.n_s);
        for j in 0..config.n_tau {
            let tau = lerp(config.tau_min, config.tau_max, j, config.n_tau);
            points.push(ParamPoint::new(s, tau));

            let mut ee_row = vec![i as f64, j as f64];
            let mut bb_row = vec![i as f64, j as f64];
            for ell in 2..=config.lmax {
                ee_row.push(jitter(toy_ee(ell, s, tau)));
                bb_row.push(jitter(toy_bb(ell, s, tau)));
            }
            ee.push(ee_row);
            bb.push(bb_row);
        }
    }

    Ok(SyntheticTables { points, ee, bb })
}

fn lerp(min: f64, max: f64, i: usize, n: usize) -> f64 {
    min + (max - min) * i as f64 / (n - 1) as f64
}

fn write_rows(path: &Path, rows: &[Vec<f64>]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| format!("{v:.10e}")).collect();
        writeln!(out, "{}", line.join(" "))
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}
