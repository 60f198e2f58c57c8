//! Shared estimation pipeline used by the `clemu` subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve paths -> load store -> build estimator -> estimate -> records
//!
//! The subcommand handlers can then focus on presentation (printing vs export).

use std::time::{Duration, Instant};

use crate::api::Emulator;
use crate::cli::{DataArgs, SweepArgs, SweepParam};
use crate::data::{DataPaths, TrainingStore};
use crate::domain::{EstimateOptions, EstimateRecord, Method, ParamPoint, SpectrumKind};
use crate::error::AppError;
use crate::estimator::Estimator;

/// Resolve the training table paths from flags and environment.
pub fn resolve_paths(args: &DataArgs) -> DataPaths {
    let base = match &args.data_dir {
        Some(dir) => DataPaths::in_dir(dir),
        None => DataPaths::from_env(),
    };
    DataPaths {
        ee: args.ee.clone().unwrap_or(base.ee),
        bb: args.bb.clone().unwrap_or(base.bb),
        params: args.params.clone().unwrap_or(base.params),
    }
}

/// Load the training store named by `args`.
pub fn load_store(args: &DataArgs) -> Result<TrainingStore, AppError> {
    let paths = resolve_paths(args);
    Ok(TrainingStore::load_paths(&paths)?)
}

/// Run one estimate and wrap it with its provenance.
pub fn run_estimate(
    emulator: &Emulator<'_>,
    method: Method,
    kind: SpectrumKind,
    query: ParamPoint,
    degree: usize,
) -> Result<EstimateRecord, AppError> {
    let opts = EstimateOptions::with_degree(degree);
    let estimator = select(emulator, method)?;
    let estimate = estimator.estimate(query, kind, &opts)?;

    if !emulator.store().param_bounds().contains(query) {
        log::warn!(
            "query (s={}, tau={}) lies outside the training parameter box",
            query.s,
            query.tau
        );
    }
    match method {
        Method::Poly => {
            let fit = emulator.polynomial().fit(kind, degree)?;
            log::info!(
                "{kind} polynomial fit: degree={degree} features={} rank={} training rmse={:.3e}",
                fit.feature_count(),
                fit.rank,
                fit.training_rmse
            );
        }
        Method::Grid => {
            let triangulation = emulator.grid()?.triangulation();
            log::info!(
                "grid interpolation over {} distinct points in {} triangles",
                triangulation.vertex_count(),
                triangulation.triangle_count()
            );
        }
    }

    let degree = (method == Method::Poly).then_some(degree);
    Ok(EstimateRecord::new(method, kind, query, degree, estimate))
}

/// Output of a sweep: one record per point plus per-estimate timings.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub records: Vec<EstimateRecord>,
    pub elapsed: Vec<Duration>,
}

/// Query points of a sweep (`steps` values from `from` to `to` inclusive).
pub fn sweep_points(args: &SweepArgs) -> Result<Vec<ParamPoint>, AppError> {
    if args.steps == 0 {
        return Err(AppError::new(2, "Sweep steps must be >= 1."));
    }
    if !(args.from.is_finite() && args.to.is_finite() && args.fixed.is_finite()) {
        return Err(AppError::new(2, "Sweep bounds and fixed value must be finite."));
    }

    let step = if args.steps > 1 {
        (args.to - args.from) / (args.steps as f64 - 1.0)
    } else {
        0.0
    };
    Ok((0..args.steps)
        .map(|i| {
            let v = args.from + step * i as f64;
            match args.param {
                SweepParam::Tau => ParamPoint::new(args.fixed, v),
                SweepParam::S => ParamPoint::new(v, args.fixed),
            }
        })
        .collect())
}

/// Estimate every sweep point sequentially, timing each call.
///
/// Timings include the one-off cost (fit or triangulation) on the first call,
/// which is what a caller issuing queries one at a time would observe.
pub fn run_sweep(emulator: &Emulator<'_>, args: &SweepArgs) -> Result<SweepOutput, AppError> {
    let points = sweep_points(args)?;
    let opts = EstimateOptions::with_degree(args.degree);
    let estimator = select(emulator, args.method)?;
    let degree = (args.method == Method::Poly).then_some(args.degree);

    let mut records = Vec::with_capacity(points.len());
    let mut elapsed = Vec::with_capacity(points.len());
    for q in points {
        let t0 = Instant::now();
        let estimate = estimator.estimate(q, args.kind, &opts)?;
        elapsed.push(t0.elapsed());
        records.push(EstimateRecord::new(args.method, args.kind, q, degree, estimate));
    }

    Ok(SweepOutput { records, elapsed })
}

fn select<'e>(emulator: &'e Emulator<'_>, method: Method) -> Result<&'e dyn Estimator, AppError> {
    let estimator: &dyn Estimator = match method {
        Method::Poly => emulator.polynomial(),
        Method::Grid => emulator.grid()?,
    };
    Ok(estimator)
}
