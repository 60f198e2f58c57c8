//! Training data store: parameter points plus EE/BB spectrum tables.
//!
//! Row `i` of every table describes the same training sample:
//!
//! - `points[i] = [s_i, τ_i]`
//! - `values_EE[i] = [id, id, v(ℓ=2), v(ℓ=3), …]` (same for BB)
//!
//! The store is validated once at construction and is read-only afterwards,
//! so it can be shared by reference across estimators and threads.

use std::path::{Path, PathBuf};

use nalgebra::DMatrix;

use crate::domain::{ParamBounds, ParamPoint, SpectrumKind};
use crate::error::EmulatorError;
use crate::io::ingest::{NumericTable, read_table};
use crate::math::normalization::multipoles;

/// Leading columns of each spectrum table that are identifiers, not spectrum values.
pub const ID_COLUMNS: usize = 2;

pub const DEFAULT_EE_FILE: &str = "training_data_EE_ts.txt";
pub const DEFAULT_BB_FILE: &str = "training_data_BB_ts.txt";
pub const DEFAULT_PARAMS_FILE: &str = "training_params_ts.txt";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DATA_DIR_ENV: &str = "CLEMU_DATA_DIR";

/// Paths of the three training tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub ee: PathBuf,
    pub bb: PathBuf,
    pub params: PathBuf,
}

impl DataPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            ee: dir.join(DEFAULT_EE_FILE),
            bb: dir.join(DEFAULT_BB_FILE),
            params: dir.join(DEFAULT_PARAMS_FILE),
        }
    }

    /// Resolve the data directory from `CLEMU_DATA_DIR` (a `.env` file is
    /// honored), falling back to `./data`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        Self::in_dir(dir)
    }
}

/// Validated, immutable training data.
#[derive(Debug, Clone)]
pub struct TrainingStore {
    points: Vec<ParamPoint>,
    ee: NumericTable,
    bb: NumericTable,
}

impl TrainingStore {
    /// Load and validate the three training tables.
    pub fn load(path_ee: &Path, path_bb: &Path, path_points: &Path) -> Result<Self, EmulatorError> {
        let ee = read_table(path_ee)?;
        let bb = read_table(path_bb)?;
        let params = read_table(path_points)?;

        if params.cols() != 2 {
            return Err(EmulatorError::data_load(
                path_points,
                None,
                format!("parameter table must have 2 columns (s, tau), found {}", params.cols()),
            ));
        }
        for (path, table) in [(path_ee, &ee), (path_bb, &bb)] {
            if table.rows() != params.rows() {
                return Err(EmulatorError::data_load(
                    path,
                    None,
                    format!(
                        "{} rows but the parameter table '{}' has {}",
                        table.rows(),
                        path_points.display(),
                        params.rows()
                    ),
                ));
            }
        }

        let points = (0..params.rows())
            .map(|i| ParamPoint::new(params.get(i, 0), params.get(i, 1)))
            .collect();

        let store = Self::validated(points, ee, bb).map_err(|(culprit, message)| {
            let path = match culprit {
                Some(SpectrumKind::Ee) => path_ee,
                Some(SpectrumKind::Bb) => path_bb,
                None => path_points,
            };
            EmulatorError::data_load(path, None, message)
        })?;
        log::info!(
            "loaded training store: {} points, {} multipoles (EE '{}', BB '{}', params '{}')",
            store.point_count(),
            store.multipole_count(),
            path_ee.display(),
            path_bb.display(),
            path_points.display()
        );
        Ok(store)
    }

    /// Load using resolved `DataPaths`.
    pub fn load_paths(paths: &DataPaths) -> Result<Self, EmulatorError> {
        Self::load(&paths.ee, &paths.bb, &paths.params)
    }

    /// Build a store from in-memory rows with the same validation as `load`.
    pub fn from_parts(
        points: Vec<ParamPoint>,
        values_ee: Vec<Vec<f64>>,
        values_bb: Vec<Vec<f64>>,
    ) -> Result<Self, EmulatorError> {
        let ee = NumericTable::from_rows(&values_ee)
            .ok_or_else(|| EmulatorError::data_load("<memory:EE>", None, "ragged EE rows"))?;
        let bb = NumericTable::from_rows(&values_bb)
            .ok_or_else(|| EmulatorError::data_load("<memory:BB>", None, "ragged BB rows"))?;
        if points.iter().any(|p| !p.is_finite()) {
            return Err(EmulatorError::data_load("<memory:params>", None, "non-finite parameter point"));
        }
        Self::validated(points, ee, bb).map_err(|(culprit, message)| {
            let source = match culprit {
                Some(SpectrumKind::Ee) => "<memory:EE>",
                Some(SpectrumKind::Bb) => "<memory:BB>",
                None => "<memory:params>",
            };
            EmulatorError::data_load(source, None, message)
        })
    }

    /// Shape and value checks shared by `load` and `from_parts`.
    ///
    /// Errors name the table at fault: `Some(kind)` for a spectrum table,
    /// `None` for the parameter table.
    fn validated(
        points: Vec<ParamPoint>,
        ee: NumericTable,
        bb: NumericTable,
    ) -> Result<Self, (Option<SpectrumKind>, String)> {
        let n = points.len();
        if n == 0 {
            return Err((None, "no training points".to_string()));
        }
        for (kind, table) in [(SpectrumKind::Ee, &ee), (SpectrumKind::Bb, &bb)] {
            if table.rows() != n {
                return Err((
                    Some(kind),
                    format!("{kind} table has {} rows but there are {n} parameter points", table.rows()),
                ));
            }
        }
        if ee.cols() <= ID_COLUMNS {
            return Err((
                Some(SpectrumKind::Ee),
                format!("spectrum tables need more than {ID_COLUMNS} columns, found {}", ee.cols()),
            ));
        }
        if ee.cols() != bb.cols() {
            return Err((
                Some(SpectrumKind::Bb),
                format!("BB table has {} columns but EE table has {}", bb.cols(), ee.cols()),
            ));
        }
        for (kind, table) in [(SpectrumKind::Ee, &ee), (SpectrumKind::Bb, &bb)] {
            if !table.is_all_finite() {
                return Err((Some(kind), format!("{kind} table contains non-finite values")));
            }
        }
        Ok(Self { points, ee, bb })
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn params_at(&self, i: usize) -> ParamPoint {
        self.points[i]
    }

    pub fn points(&self) -> &[ParamPoint] {
        &self.points
    }

    /// Full row `i` of the selected table, identifier columns included.
    pub fn spectrum_row(&self, kind: SpectrumKind, i: usize) -> &[f64] {
        self.table(kind).row(i)
    }

    /// Total column count `M` of the selected table (identical for EE and BB).
    pub fn column_count(&self, kind: SpectrumKind) -> usize {
        self.table(kind).cols()
    }

    /// Number of retained spectrum columns (`M - 2`).
    pub fn multipole_count(&self) -> usize {
        self.ee.cols() - ID_COLUMNS
    }

    /// `ℓ = 2 … M-1`.
    pub fn multipoles(&self) -> Vec<u32> {
        multipoles(self.multipole_count())
    }

    /// Retained spectrum columns as an `N × (M - 2)` matrix.
    pub fn spectrum_columns(&self, kind: SpectrumKind) -> DMatrix<f64> {
        let table = self.table(kind);
        DMatrix::from_fn(table.rows(), table.cols() - ID_COLUMNS, |i, j| {
            table.get(i, j + ID_COLUMNS)
        })
    }

    pub fn param_bounds(&self) -> ParamBounds {
        // `validated` guarantees at least one point.
        ParamBounds::of(&self.points).unwrap_or(ParamBounds {
            s_min: f64::NAN,
            s_max: f64::NAN,
            tau_min: f64::NAN,
            tau_max: f64::NAN,
        })
    }

    fn table(&self, kind: SpectrumKind) -> &NumericTable {
        match kind {
            SpectrumKind::Ee => &self.ee,
            SpectrumKind::Bb => &self.bb,
        }
    }
}
