//! Export estimates to CSV or JSON.
//!
//! The export is meant to be easy to consume in spreadsheets, notebooks or
//! plotting scripts. Both formats carry the query, the method and the spectrum
//! kind next to the `(ell, cl)` values.
//!
//! Undefined values (grid queries outside the training hull) are written as
//! `NaN` in CSV and `null` in JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::EstimateRecord;
use crate::error::AppError;

/// Write records, choosing the format from the file extension (`.json` → JSON,
/// anything else → CSV).
pub fn write_records(path: &Path, records: &[EstimateRecord]) -> Result<(), AppError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        write_records_json(path, records)
    } else {
        write_records_csv(path, records)
    }
}

/// Write records as long-format CSV: one line per `(query, ell)`.
pub fn write_records_csv(path: &Path, records: &[EstimateRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "method,kind,s,tau,degree,ell,cl")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        let method = format!("{:?}", r.method).to_lowercase();
        let degree = r.degree.map(|d| d.to_string()).unwrap_or_default();
        for (ell, cl) in r.ell.iter().zip(&r.cl) {
            writeln!(
                out,
                "{},{},{:.10},{:.10},{},{},{:.10e}",
                method, r.kind, r.query.s, r.query.tau, degree, ell, cl
            )
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// Write records as a pretty-printed JSON array.
pub fn write_records_json(path: &Path, records: &[EstimateRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Estimate, Method, ParamPoint, SpectrumKind};

    fn record(cl: Vec<f64>) -> EstimateRecord {
        let ell = (2..2 + cl.len() as u32).collect();
        EstimateRecord::new(
            Method::Grid,
            SpectrumKind::Ee,
            ParamPoint::new(1.0, 0.1),
            None,
            Estimate { ell, cl },
        )
    }

    #[test]
    fn csv_has_one_line_per_multipole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records(&path, &[record(vec![1.0, 2.0, 3.0])]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "method,kind,s,tau,degree,ell,cl");
        assert!(lines[1].starts_with("grid,EE,1.0000000000,0.1000000000,,2,"));
    }

    #[test]
    fn json_round_trips_and_nulls_undefined_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.JSON");
        write_records(&path, &[record(vec![f64::NAN, f64::NAN])]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["kind"], "EE");
        assert_eq!(value[0]["method"], "grid");
        assert_eq!(value[0]["defined"], false);
        assert!(value[0]["cl"][0].is_null());
        assert!(value[0].get("degree").is_none());
    }
}
