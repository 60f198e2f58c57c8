use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use cl_emulator::data::{DataPaths, SyntheticConfig, generate_synthetic};
use cl_emulator::estimator::{Estimator, GridEstimator, PolynomialEstimator};
use cl_emulator::{
    Emulator, EmulatorError, EstimateOptions, ParamPoint, SpectrumKind, TrainingStore, estimate_grid,
    estimate_polynomial,
};

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn synthetic_on_disk(dir: &Path) -> TrainingStore {
    let cfg = SyntheticConfig {
        n_s: 7,
        n_tau: 6,
        lmax: 120,
        ..SyntheticConfig::default()
    };
    let paths = generate_synthetic(&cfg).unwrap().write_tables(dir).unwrap();
    TrainingStore::load_paths(&paths).unwrap()
}

#[test]
fn three_point_linear_fit_matches_weighted_value() {
    let dir = tempfile::tempdir().unwrap();
    let ee = write(dir.path(), "ee.txt", "0 0 1.0\n1 0 2.0\n2 0 3.0\n");
    let bb = write(dir.path(), "bb.txt", "0 0 1.0\n1 0 2.0\n2 0 3.0\n");
    let params = write(dir.path(), "params.txt", "0.8 0.05\n1.0 0.1\n1.2 0.2\n");

    let store = TrainingStore::load(&ee, &bb, &params).unwrap();
    let (ell, cl) = estimate_polynomial(&store, 0.1, 1.0, "EE", 1).unwrap();

    assert_eq!(ell, vec![2]);
    assert_relative_eq!(cl[0], 2.0 * PI / 6.0 * 2.0, max_relative = 1e-10);
}

#[test]
fn loader_reports_malformed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.txt", "0 0 1.0 2.0\n1 0 1.5 2.5\n");
    let params = write(dir.path(), "params.txt", "1.0 0.1\n1.1 0.1\n");

    let ragged = write(dir.path(), "ragged.txt", "0 0 1.0 2.0\n1 0 1.5\n");
    let err = TrainingStore::load(&ragged, &good, &params).unwrap_err();
    assert!(matches!(err, EmulatorError::DataLoad { line: Some(2), .. }));

    let text = write(dir.path(), "text.txt", "0 0 1.0 abc\n1 0 1.5 2.5\n");
    assert!(matches!(
        TrainingStore::load(&good, &text, &params),
        Err(EmulatorError::DataLoad { .. })
    ));

    let short = write(dir.path(), "short.txt", "0 0 1.0 2.0\n");
    assert!(matches!(
        TrainingStore::load(&short, &good, &params),
        Err(EmulatorError::DataLoad { .. })
    ));

    let narrow = write(dir.path(), "narrow.txt", "0 0 1.0\n1 0 1.5\n");
    assert!(matches!(
        TrainingStore::load(&good, &narrow, &params),
        Err(EmulatorError::DataLoad { .. })
    ));

    let wide_params = write(dir.path(), "wide.txt", "1.0 0.1 3\n1.1 0.1 3\n");
    assert!(matches!(
        TrainingStore::load(&good, &good, &wide_params),
        Err(EmulatorError::DataLoad { .. })
    ));

    let missing = dir.path().join("missing.txt");
    assert!(TrainingStore::load(&missing, &good, &params).is_err());
}

#[test]
fn both_estimators_return_aligned_sequences_from_two() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    let q = ParamPoint::new(1.03, 0.11);

    for kind in ["EE", "BB"] {
        for (ell, cl) in [
            estimate_polynomial(&store, q.tau, q.s, kind, 4).unwrap(),
            estimate_grid(&store, q.tau, q.s, kind).unwrap(),
        ] {
            assert_eq!(ell.len(), cl.len());
            assert_eq!(ell.len(), store.multipole_count());
            assert_eq!(ell[0], 2);
            assert!(ell.windows(2).all(|w| w[1] == w[0] + 1));
            assert!(cl.iter().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn grid_estimate_is_exact_at_training_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    let grid = GridEstimator::new(&store).unwrap();

    for i in [0, 5, store.point_count() - 1] {
        let p = store.params_at(i);
        let est = grid.estimate_at(p, SpectrumKind::Bb).unwrap();
        let row = &store.spectrum_row(SpectrumKind::Bb, i)[2..];
        for ((ell, got), raw) in est.iter().zip(row) {
            let expected = raw * 2.0 * PI / (ell as f64 * (ell as f64 + 1.0));
            assert_relative_eq!(got, expected, max_relative = 1e-12);
        }
    }
}

#[test]
fn repeated_queries_are_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());

    let a = estimate_polynomial(&store, 0.09, 0.95, "EE", 5).unwrap();
    let b = estimate_polynomial(&store, 0.09, 0.95, "EE", 5).unwrap();
    assert_eq!(a.1.iter().map(|v| v.to_bits()).collect::<Vec<_>>(), b.1.iter().map(|v| v.to_bits()).collect::<Vec<_>>());

    let emu = Emulator::new(&store);
    let c = emu.estimate_grid(0.09, 0.95, "BB").unwrap();
    let d = estimate_grid(&store, 0.09, 0.95, "BB").unwrap();
    assert_eq!(c.ell, d.0);
    assert!(c.cl.iter().zip(&d.1).all(|(x, y)| x.to_bits() == y.to_bits()));
}

#[test]
fn underdetermined_once_features_exceed_points() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    let n = store.point_count();

    let mut last_ok = None;
    for degree in 0..20 {
        let features = (degree + 1) * (degree + 2) / 2;
        let result = estimate_polynomial(&store, 0.1, 1.0, "EE", degree);
        if features > n {
            assert!(matches!(
                result,
                Err(EmulatorError::UnderdeterminedFit { degree: d, .. }) if d == degree
            ));
        } else {
            assert!(result.is_ok(), "degree {degree} should fit {n} points");
            last_ok = Some(degree);
        }
    }
    assert!(last_ok.is_some());
}

#[test]
fn normalization_divides_by_ell_ell_plus_one() {
    let dir = tempfile::tempdir().unwrap();
    let rows = 3;
    let cols = 99;
    let mut body = String::new();
    for i in 0..rows {
        body.push_str(&format!("{i} 0"));
        for _ in 0..cols {
            body.push_str(" 1.0");
        }
        body.push('\n');
    }
    let ee = write(dir.path(), "ee.txt", &body);
    let bb = write(dir.path(), "bb.txt", &body);
    let params = write(dir.path(), "params.txt", "0.8 0.05\n1.0 0.2\n1.2 0.05\n");
    let store = TrainingStore::load(&ee, &bb, &params).unwrap();

    let (ell, cl) = estimate_polynomial(&store, 0.1, 1.0, "BB", 0).unwrap();
    for target in [2u32, 10, 100] {
        let idx = ell.iter().position(|&l| l == target).unwrap();
        let expected = 2.0 * PI / (target as f64 * (target as f64 + 1.0));
        assert_relative_eq!(cl[idx], expected, max_relative = 1e-12);
    }
    assert_relative_eq!(cl[0], PI / 3.0, max_relative = 1e-12);
}

#[test]
fn far_outside_hull_is_nan() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    let (ell, cl) = estimate_grid(&store, 1e6, 1e6, "EE").unwrap();
    assert_eq!(ell.len(), store.multipole_count());
    assert!(cl.iter().all(|v| v.is_nan()));
}

#[test]
fn unknown_kind_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    assert!(matches!(
        estimate_polynomial(&store, 0.1, 1.0, "XX", 2),
        Err(EmulatorError::InvalidSpectrumKind(k)) if k == "XX"
    ));
    assert!(matches!(
        estimate_grid(&store, 0.1, 1.0, "XX"),
        Err(EmulatorError::InvalidSpectrumKind(_))
    ));
}

#[test]
fn estimate_many_matches_single_calls_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = synthetic_on_disk(dir.path());
    let poly = PolynomialEstimator::new(&store);
    let grid = GridEstimator::new(&store).unwrap();
    let opts = EstimateOptions::with_degree(3);

    let queries: Vec<ParamPoint> = (0..12)
        .map(|i| ParamPoint::new(0.82 + 0.03 * i as f64, 0.06 + 0.01 * i as f64))
        .collect();

    let estimators: [&dyn Estimator; 2] = [&poly, &grid];
    for estimator in estimators {
        let many = estimator.estimate_many(&queries, SpectrumKind::Ee, &opts).unwrap();
        assert_eq!(many.len(), queries.len());
        for (q, got) in queries.iter().zip(&many) {
            let single = estimator.estimate(*q, SpectrumKind::Ee, &opts).unwrap();
            assert_eq!(&single, got, "{} disagrees at {q:?}", estimator.name());
        }
    }
}

#[test]
fn default_paths_use_standard_file_names() {
    let paths = DataPaths::in_dir("data");
    assert!(paths.ee.ends_with("training_data_EE_ts.txt"));
    assert!(paths.bb.ends_with("training_data_BB_ts.txt"));
    assert!(paths.params.ends_with("training_params_ts.txt"));
}
