//! Formatted terminal output for estimates and sweeps.
//!
//! We keep formatting code in one place so:
//! - the math/estimation code stays clean and testable
//! - output changes are localized

use std::time::Duration;

use crate::data::TrainingStore;
use crate::domain::EstimateRecord;

/// One-line description of a loaded store.
pub fn format_store_summary(store: &TrainingStore) -> String {
    let b = store.param_bounds();
    format!(
        "Training: n={} | s=[{:.4}, {:.4}] | tau=[{:.4}, {:.4}] | ell=2..{}",
        store.point_count(),
        b.s_min,
        b.s_max,
        b.tau_min,
        b.tau_max,
        store.multipole_count() + 1
    )
}

/// Header plus an `ell / C_ell` table, optionally truncated at `lmax`.
pub fn format_estimate(record: &EstimateRecord, lmax: Option<u32>) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== {} estimate ({}) at s={:.4}, tau={:.4}",
        record.kind,
        method_label(record),
        record.query.s,
        record.query.tau
    ));
    if let Some(d) = record.degree {
        out.push_str(&format!(", degree={d}"));
    }
    out.push_str(" ===\n");

    if !record.defined {
        out.push_str("Query is outside the training hull: values are undefined (NaN).\n");
    }

    out.push_str(&format!("{:>6}  {:>16}\n", "ell", "C_ell"));
    for (ell, cl) in record.ell.iter().zip(&record.cl) {
        if lmax.is_some_and(|l| *ell > l) {
            break;
        }
        out.push_str(&format!("{ell:>6}  {cl:>16.6e}\n"));
    }

    out
}

/// Summary line for a sweep: count, undefined count, mean time per estimate.
pub fn format_sweep_summary(records: &[EstimateRecord], elapsed: &[Duration]) -> String {
    let undefined = records.iter().filter(|r| !r.defined).count();
    let mean = if elapsed.is_empty() {
        0.0
    } else {
        elapsed.iter().map(|d| d.as_secs_f64()).sum::<f64>() / elapsed.len() as f64
    };
    format!(
        "Sweep: {} estimates ({} undefined) | mean time per estimate: {:.3} ms",
        records.len(),
        undefined,
        mean * 1e3
    )
}

/// Compact sweep table: one row per query with `C_ell` at a few multipoles.
pub fn format_sweep_table(records: &[EstimateRecord], ells: &[u32]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10}  {:>10}", "s", "tau"));
    for l in ells {
        out.push_str(&format!("  {:>14}", format!("ell={l}")));
    }
    out.push('\n');

    for r in records {
        out.push_str(&format!("{:>10.4}  {:>10.4}", r.query.s, r.query.tau));
        for l in ells {
            let v = r
                .ell
                .iter()
                .position(|e| e == l)
                .map(|i| r.cl[i])
                .unwrap_or(f64::NAN);
            out.push_str(&format!("  {v:>14.6e}"));
        }
        out.push('\n');
    }
    out
}

fn method_label(record: &EstimateRecord) -> &'static str {
    match record.method {
        crate::domain::Method::Poly => "polynomial regression",
        crate::domain::Method::Grid => "grid interpolation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Estimate, Method, ParamPoint, SpectrumKind};

    fn record(defined: bool) -> EstimateRecord {
        let v = if defined { 1.5e-3 } else { f64::NAN };
        EstimateRecord::new(
            Method::Poly,
            SpectrumKind::Bb,
            ParamPoint::new(1.0, 0.08),
            Some(5),
            Estimate {
                ell: vec![2, 3, 4, 5],
                cl: vec![v; 4],
            },
        )
    }

    #[test]
    fn estimate_table_respects_lmax() {
        let text = format_estimate(&record(true), Some(3));
        assert!(text.contains("BB estimate (polynomial regression)"));
        assert!(text.contains("degree=5"));
        // header line + title + 2 rows
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn undefined_estimates_are_flagged() {
        let text = format_estimate(&record(false), None);
        assert!(text.contains("outside the training hull"));
        assert!(text.contains("NaN"));
    }

    #[test]
    fn sweep_summary_reports_mean_time() {
        let recs = vec![record(true), record(false)];
        let text = format_sweep_summary(&recs, &[Duration::from_millis(2), Duration::from_millis(4)]);
        assert!(text.contains("2 estimates (1 undefined)"));
        assert!(text.contains("3.000 ms"));

        let table = format_sweep_table(&recs, &[2, 100]);
        assert_eq!(table.lines().count(), 3);
    }
}
