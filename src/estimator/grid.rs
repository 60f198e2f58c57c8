//! Grid (scattered-data) interpolation estimator.
//!
//! The training points are triangulated once (Delaunay); an estimate is the
//! barycentric blend of the three training rows at the corners of the triangle
//! containing the query. One location pass serves every multipole column.
//!
//! Outside the convex hull of the training points there is no triangle to
//! blend, and every returned value is `NaN`. Values are never extrapolated or
//! clamped; `Estimate::is_defined` tells the two cases apart.

use crate::data::{ID_COLUMNS, TrainingStore};
use crate::domain::{Estimate, EstimateOptions, ParamPoint, SpectrumKind};
use crate::error::EmulatorError;
use crate::estimator::Estimator;
use crate::math::{Triangulation, apply_cl_weight};

/// Piecewise-linear interpolation over a triangulated training store.
#[derive(Debug, Clone)]
pub struct GridEstimator<'a> {
    store: &'a TrainingStore,
    triangulation: Triangulation,
}

impl<'a> GridEstimator<'a> {
    /// Triangulate the store's parameter points.
    pub fn new(store: &'a TrainingStore) -> Result<Self, EmulatorError> {
        let triangulation = Triangulation::new(store.points())?;
        log::debug!(
            "triangulated {} training points ({} distinct) into {} triangles",
            store.point_count(),
            triangulation.vertex_count(),
            triangulation.triangle_count()
        );
        Ok(Self { store, triangulation })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Interpolate the `kind` spectrum at `query`.
    pub fn estimate_at(&self, query: ParamPoint, kind: SpectrumKind) -> Result<Estimate, EmulatorError> {
        query.ensure_finite()?;

        let ell = self.store.multipoles();
        let mut cl = match self.triangulation.locate(query) {
            Some(loc) => {
                let rows = loc.vertices.map(|i| self.store.spectrum_row(kind, i));
                (0..ell.len())
                    .map(|c| {
                        let col = c + ID_COLUMNS;
                        loc.weights[0] * rows[0][col] + loc.weights[1] * rows[1][col] + loc.weights[2] * rows[2][col]
                    })
                    .collect()
            }
            None => {
                log::debug!(
                    "query (s={}, tau={}) is outside the training hull; returning NaN",
                    query.s,
                    query.tau
                );
                vec![f64::NAN; ell.len()]
            }
        };

        apply_cl_weight(&ell, &mut cl);
        Ok(Estimate { ell, cl })
    }
}

impl Estimator for GridEstimator<'_> {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn estimate(
        &self,
        query: ParamPoint,
        kind: SpectrumKind,
        _opts: &EstimateOptions,
    ) -> Result<Estimate, EmulatorError> {
        self.estimate_at(query, kind)
    }
}
