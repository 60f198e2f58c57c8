//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the training store
//! - runs the requested estimator(s)
//! - prints reports
//! - writes optional exports

use std::path::Path;

use clap::Parser;

use crate::api::Emulator;
use crate::cli::{Command, GenerateArgs, GridArgs, PolyArgs, SweepArgs};
use crate::data::{SyntheticConfig, generate_synthetic};
use crate::domain::{EstimateRecord, Method, ParamPoint};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `clemu` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Poly(args) => handle_poly(args),
        Command::Grid(args) => handle_grid(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Generate(args) => handle_generate(args),
    }
}

fn handle_poly(args: PolyArgs) -> Result<(), AppError> {
    let store = pipeline::load_store(&args.data)?;
    let emulator = Emulator::new(&store);
    let query = ParamPoint::new(args.query.s, args.query.tau);

    let record = pipeline::run_estimate(&emulator, Method::Poly, args.query.kind, query, args.degree)?;

    println!("{}", crate::report::format_store_summary(&store));
    println!("{}", crate::report::format_estimate(&record, args.output.lmax));
    export(args.output.export.as_deref(), &[record])
}

fn handle_grid(args: GridArgs) -> Result<(), AppError> {
    let store = pipeline::load_store(&args.data)?;
    let emulator = Emulator::new(&store);
    let query = ParamPoint::new(args.query.s, args.query.tau);

    let record = pipeline::run_estimate(&emulator, Method::Grid, args.query.kind, query, 0)?;

    println!("{}", crate::report::format_store_summary(&store));
    println!("{}", crate::report::format_estimate(&record, args.output.lmax));
    export(args.output.export.as_deref(), &[record])
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let store = pipeline::load_store(&args.data)?;
    let emulator = Emulator::new(&store);

    let out = pipeline::run_sweep(&emulator, &args)?;

    println!("{}", crate::report::format_store_summary(&store));
    println!("{}", crate::report::format_sweep_table(&out.records, &args.show_ell));
    println!("{}", crate::report::format_sweep_summary(&out.records, &out.elapsed));
    export(args.export.as_deref(), &out.records)
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        n_s: args.n_s,
        n_tau: args.n_tau,
        s_min: args.s_min,
        s_max: args.s_max,
        tau_min: args.tau_min,
        tau_max: args.tau_max,
        lmax: args.lmax,
        noise: args.noise,
        seed: args.seed,
    };
    let tables = generate_synthetic(&config)?;
    let paths = tables.write_tables(&args.out)?;

    println!("Wrote {} training rows:", tables.points.len());
    println!("  EE:     {}", paths.ee.display());
    println!("  BB:     {}", paths.bb.display());
    println!("  params: {}", paths.params.display());
    Ok(())
}

fn export(path: Option<&Path>, records: &[EstimateRecord]) -> Result<(), AppError> {
    if let Some(path) = path {
        crate::io::export::write_records(path, records)?;
        log::info!("exported {} estimate(s) to '{}'", records.len(), path.display());
    }
    Ok(())
}
