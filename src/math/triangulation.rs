//! Delaunay triangulation and barycentric point location.
//!
//! Used by the grid estimator for piecewise-linear interpolation of scattered
//! training points.
//!
//! Construction is Bowyer-Watson incremental insertion around a symbolic
//! vertex at infinity:
//!
//! - points are translated/scaled uniformly into a unit box (a similarity
//!   transform, so the Delaunay triangulation is unchanged)
//! - every convex hull edge carries a ghost triangle closing it off at
//!   infinity; a ghost conflicts with any new point on the outer side of its
//!   edge, so the real triangles always tile the convex hull exactly
//! - each new point is found by walking the mesh from the last insertion, and
//!   its conflict cavity is grown from there and kept star-shaped around it
//!
//! Queries go through a uniform bucket grid over triangle bounding boxes. A
//! small tolerance on the barycentric coordinates makes points on the hull
//! boundary count as inside.

use std::collections::{BTreeSet, HashMap};

use crate::domain::ParamPoint;
use crate::error::EmulatorError;

/// Symbolic vertex at infinity. Ghost triangles are stored as `[u, v, GHOST]`.
const GHOST: usize = usize::MAX;
/// Tolerance on barycentric coordinates during point location.
const BARY_EPS: f64 = 1e-9;
/// Padding (in unit-box coordinates) of triangle boxes in the bucket index.
const BUCKET_PAD: f64 = 2.0 * BARY_EPS;

/// Location of a query inside one triangle.
///
/// `vertices` are indices into the point slice the triangulation was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barycentric {
    pub vertices: [usize; 3],
    pub weights: [f64; 3],
}

/// A Delaunay triangulation of 2-D parameter points.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Normalized coordinates of the distinct input points.
    coords: Vec<[f64; 2]>,
    /// `coords[k]` came from input point `source[k]`.
    source: Vec<usize>,
    /// Counter-clockwise triangles over `coords`.
    triangles: Vec<[usize; 3]>,
    origin: [f64; 2],
    scale: f64,
    index: BucketIndex,
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Exact duplicates are collapsed (the first occurrence wins). Fails when
    /// fewer than three distinct points remain or all of them are collinear.
    pub fn new(points: &[ParamPoint]) -> Result<Self, EmulatorError> {
        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(EmulatorError::DegenerateTriangulation(format!(
                "non-finite point (s={}, tau={})",
                p.s, p.tau
            )));
        }

        let source = distinct_indices(points);
        if source.len() < 3 {
            return Err(EmulatorError::DegenerateTriangulation(format!(
                "need at least 3 distinct points, found {}",
                source.len()
            )));
        }

        let (origin, scale) = normalization(points, &source);
        let coords: Vec<[f64; 2]> = source
            .iter()
            .map(|&i| to_unit(points[i], origin, scale))
            .collect();

        if all_collinear(&coords) {
            return Err(EmulatorError::DegenerateTriangulation(
                "all training points are collinear".to_string(),
            ));
        }

        let triangles = bowyer_watson(&coords);
        if triangles.is_empty() {
            return Err(EmulatorError::DegenerateTriangulation(
                "triangulation produced no triangles".to_string(),
            ));
        }
        let index = BucketIndex::new(&coords, &triangles);

        Ok(Self {
            coords,
            source,
            triangles,
            origin,
            scale,
            index,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of distinct points used as vertices.
    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }

    /// Triangles as indices into the input point slice.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| [self.source[t[0]], self.source[t[1]], self.source[t[2]]])
    }

    /// Find the triangle containing `p` and its barycentric weights.
    ///
    /// Returns `None` when `p` lies outside the convex hull.
    pub fn locate(&self, p: ParamPoint) -> Option<Barycentric> {
        if !p.is_finite() {
            return None;
        }
        let q = to_unit(p, self.origin, self.scale);
        self.index
            .candidates(q)
            .iter()
            .find_map(|&t| self.barycentric(t, q))
    }

    fn barycentric(&self, t: usize, q: [f64; 2]) -> Option<Barycentric> {
        let tri = self.triangles[t];
        let [a, b, c] = tri.map(|k| self.coords[k]);
        // Each weight is divided by the area computed from its own vertex,
        // so a query sitting exactly on a vertex gets weights (1, 0, 0).
        let la = cross(sub(b, q), sub(c, q)) / cross(sub(b, a), sub(c, a));
        let lb = cross(sub(c, q), sub(a, q)) / cross(sub(c, b), sub(a, b));
        let lc = cross(sub(a, q), sub(b, q)) / cross(sub(a, c), sub(b, c));
        (la >= -BARY_EPS && lb >= -BARY_EPS && lc >= -BARY_EPS).then(|| Barycentric {
            vertices: tri.map(|k| self.source[k]),
            weights: [la, lb, lc],
        })
    }
}

/// Uniform grid of buckets, each listing the triangles whose padded bounding
/// box overlaps it.
#[derive(Debug, Clone)]
struct BucketIndex {
    lo: [f64; 2],
    hi: [f64; 2],
    cell: [f64; 2],
    side: usize,
    buckets: Vec<Vec<usize>>,
}

impl BucketIndex {
    fn new(coords: &[[f64; 2]], triangles: &[[usize; 3]]) -> Self {
        let (lo, hi) = bounding_box(coords.iter().copied());
        let side = ((triangles.len() as f64).sqrt().ceil() as usize).max(1);
        let cell = [0, 1].map(|k| ((hi[k] - lo[k]) / side as f64).max(f64::MIN_POSITIVE));

        let mut index = Self {
            lo,
            hi,
            cell,
            side,
            buckets: vec![Vec::new(); side * side],
        };
        for (t, tri) in triangles.iter().enumerate() {
            let (tlo, thi) = bounding_box(tri.iter().map(|&k| coords[k]));
            let [i0, j0] = index.cell_of([tlo[0] - BUCKET_PAD, tlo[1] - BUCKET_PAD]);
            let [i1, j1] = index.cell_of([thi[0] + BUCKET_PAD, thi[1] + BUCKET_PAD]);
            for i in i0..=i1 {
                for j in j0..=j1 {
                    index.buckets[i * side + j].push(t);
                }
            }
        }
        index
    }

    fn cell_of(&self, q: [f64; 2]) -> [usize; 2] {
        [0, 1].map(|k| {
            let f = ((q[k] - self.lo[k]) / self.cell[k]).floor();
            f.clamp(0.0, (self.side - 1) as f64) as usize
        })
    }

    fn candidates(&self, q: [f64; 2]) -> &[usize] {
        let outside = (0..2).any(|k| q[k] < self.lo[k] - BUCKET_PAD || q[k] > self.hi[k] + BUCKET_PAD);
        if outside {
            return &[];
        }
        let [i, j] = self.cell_of(q);
        &self.buckets[i * self.side + j]
    }
}

fn bounding_box(points: impl Iterator<Item = [f64; 2]>) -> ([f64; 2], [f64; 2]) {
    let mut lo = [f64::INFINITY; 2];
    let mut hi = [f64::NEG_INFINITY; 2];
    for p in points {
        for k in 0..2 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    (lo, hi)
}

fn distinct_indices(points: &[ParamPoint]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        points[i]
            .s
            .total_cmp(&points[j].s)
            .then(points[i].tau.total_cmp(&points[j].tau))
            .then(i.cmp(&j))
    });

    let mut keep = Vec::with_capacity(points.len());
    let mut prev: Option<usize> = None;
    for i in order {
        if let Some(k) = prev {
            if points[k].s == points[i].s && points[k].tau == points[i].tau {
                continue;
            }
        }
        keep.push(i);
        prev = Some(i);
    }
    keep.sort_unstable();
    keep
}

fn normalization(points: &[ParamPoint], idx: &[usize]) -> ([f64; 2], f64) {
    let (lo, hi) = bounding_box(idx.iter().map(|&i| [points[i].s, points[i].tau]));
    let scale = (hi[0] - lo[0]).max(hi[1] - lo[1]);
    let scale = if scale > 0.0 { scale } else { 1.0 };
    ([0.5 * (lo[0] + hi[0]), 0.5 * (lo[1] + hi[1])], scale)
}

fn to_unit(p: ParamPoint, origin: [f64; 2], scale: f64) -> [f64; 2] {
    [(p.s - origin[0]) / scale, (p.tau - origin[1]) / scale]
}

fn sub(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn cross(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Twice the signed area of `abc` (positive when counter-clockwise).
///
/// Evaluated from the lexicographically smaller of `a` and `b`, so
/// `orient(a, b, c) == -orient(b, a, c)` holds exactly and both sides of a
/// shared edge agree on where a point lies.
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    if a[0] < b[0] || (a[0] == b[0] && a[1] <= b[1]) {
        cross(sub(b, a), sub(c, a))
    } else {
        -cross(sub(a, b), sub(c, b))
    }
}

/// Positive when `d` is strictly inside the circumcircle of counter-clockwise `abc`.
fn incircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let [adx, ady] = sub(a, d);
    let [bdx, bdy] = sub(b, d);
    let [cdx, cdy] = sub(c, d);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;
    alift * (bdx * cdy - bdy * cdx) - blift * (adx * cdy - ady * cdx) + clift * (adx * bdy - ady * bdx)
}

fn farthest_from(coords: &[[f64; 2]], a: [f64; 2]) -> usize {
    (0..coords.len())
        .max_by(|&i, &j| {
            let di = sub(coords[i], a);
            let dj = sub(coords[j], a);
            dot(di, di).total_cmp(&dot(dj, dj))
        })
        .unwrap_or(0)
}

fn all_collinear(coords: &[[f64; 2]]) -> bool {
    let a = coords[0];
    // Farthest point from `a` gives the best-conditioned reference direction.
    let b = coords[farthest_from(coords, a)];
    let len = dot(sub(b, a), sub(b, a)).sqrt();
    if len == 0.0 {
        return true;
    }
    coords.iter().all(|&c| (orient(a, b, c) / len).abs() < 1e-12)
}

/// First triangle: point 0, the point farthest from it, and the point farthest
/// from that line, in counter-clockwise order.
fn seed_triangle(coords: &[[f64; 2]]) -> [usize; 3] {
    let a = 0;
    let b = farthest_from(coords, coords[a]);
    let c = (0..coords.len())
        .max_by(|&i, &j| {
            let oi = orient(coords[a], coords[b], coords[i]).abs();
            let oj = orient(coords[a], coords[b], coords[j]).abs();
            oi.total_cmp(&oj)
        })
        .unwrap_or(0);
    if orient(coords[a], coords[b], coords[c]) > 0.0 {
        [a, b, c]
    } else {
        [a, c, b]
    }
}

fn edges(t: [usize; 3]) -> [(usize, usize); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

fn bowyer_watson(coords: &[[f64; 2]]) -> Vec<[usize; 3]> {
    let seed = seed_triangle(coords);
    let mut mesh = Mesh::seeded(coords, seed);
    for p in 0..coords.len() {
        if !seed.contains(&p) {
            mesh.insert(p);
        }
    }
    mesh.tris
        .iter()
        .zip(&mesh.alive)
        .filter(|(t, alive)| **alive && t[2] != GHOST)
        .map(|(t, _)| *t)
        .collect()
}

/// Mutable triangle mesh used during construction.
///
/// Removed triangles stay in `tris` with `alive == false`; `owner` maps each
/// directed edge of a live triangle to that triangle.
struct Mesh<'a> {
    pts: &'a [[f64; 2]],
    tris: Vec<[usize; 3]>,
    alive: Vec<bool>,
    owner: HashMap<(usize, usize), usize>,
    /// A live real triangle near the most recent insertion.
    last: usize,
}

impl<'a> Mesh<'a> {
    fn seeded(pts: &'a [[f64; 2]], [a, b, c]: [usize; 3]) -> Self {
        let mut mesh = Self {
            pts,
            tris: Vec::new(),
            alive: Vec::new(),
            owner: HashMap::new(),
            last: 0,
        };
        for t in [[a, b, c], [b, a, GHOST], [c, b, GHOST], [a, c, GHOST]] {
            mesh.add(t);
        }
        mesh
    }

    fn add(&mut self, t: [usize; 3]) -> usize {
        let k = self.tris.len();
        for e in edges(t) {
            self.owner.insert(e, k);
        }
        self.tris.push(t);
        self.alive.push(true);
        k
    }

    fn remove(&mut self, k: usize) {
        self.alive[k] = false;
        for e in edges(self.tris[k]) {
            if self.owner.get(&e) == Some(&k) {
                self.owner.remove(&e);
            }
        }
    }

    /// The triangle on the other side of directed edge `(u, v)`.
    fn across(&self, u: usize, v: usize) -> Option<usize> {
        self.owner.get(&(v, u)).copied()
    }

    fn is_ghost(&self, k: usize) -> bool {
        self.tris[k][2] == GHOST
    }

    /// Whether triangle `k` must be removed when `d` is inserted.
    fn in_conflict(&self, k: usize, d: [f64; 2]) -> bool {
        let [a, b, c] = self.tris[k];
        if c == GHOST {
            let (u, v) = (self.pts[a], self.pts[b]);
            let o = orient(u, v, d);
            o > 0.0 || (o == 0.0 && dot(sub(d, u), sub(v, u)) > 0.0 && dot(sub(d, v), sub(u, v)) > 0.0)
        } else {
            incircle(self.pts[a], self.pts[b], self.pts[c], d) > 0.0
        }
    }

    /// Smallest edge orientation of real triangle `k` seen from `d` (>= 0 inside).
    fn min_orient(&self, k: usize, d: [f64; 2]) -> f64 {
        edges(self.tris[k])
            .into_iter()
            .map(|(u, v)| orient(self.pts[u], self.pts[v], d))
            .fold(f64::INFINITY, f64::min)
    }

    /// A triangle holding `d` (real) or seeing it from outside (ghost).
    fn walk_to(&self, d: [f64; 2]) -> usize {
        let mut k = self.last;
        for _ in 0..self.tris.len() {
            if self.is_ghost(k) {
                return k;
            }
            let exit = edges(self.tris[k])
                .into_iter()
                .find(|&(u, v)| orient(self.pts[u], self.pts[v], d) < 0.0);
            match exit {
                None => return k,
                Some((u, v)) => match self.across(u, v) {
                    Some(n) => k = n,
                    None => break,
                },
            }
        }
        self.scan_for(d)
    }

    fn scan_for(&self, d: [f64; 2]) -> usize {
        let alive = &self.alive;
        let count = self.tris.len();
        let live = move || (0..count).filter(move |&k| alive[k]);
        if let Some(k) = live().find(|&k| !self.is_ghost(k) && self.min_orient(k, d) >= 0.0) {
            return k;
        }
        if let Some(k) = live().find(|&k| self.is_ghost(k) && self.in_conflict(k, d)) {
            return k;
        }
        // Rounding left `d` in no triangle; take the nearest miss.
        live()
            .filter(|&k| !self.is_ghost(k))
            .max_by(|&i, &j| self.min_orient(i, d).total_cmp(&self.min_orient(j, d)))
            .unwrap_or(self.last)
    }

    /// Conflicting triangles connected to `seed`, skipping `excluded`.
    fn grow_cavity(&self, seed: usize, d: [f64; 2], excluded: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut cavity = BTreeSet::from([seed]);
        let mut stack = vec![seed];
        while let Some(k) = stack.pop() {
            for (u, v) in edges(self.tris[k]) {
                let Some(n) = self.across(u, v) else {
                    continue;
                };
                if cavity.contains(&n) || excluded.contains(&n) {
                    continue;
                }
                // `d` on an edge of the seed also belongs to the triangle across it.
                let on_seed_edge =
                    k == seed && u != GHOST && v != GHOST && orient(self.pts[u], self.pts[v], d) <= 0.0;
                if on_seed_edge || self.in_conflict(n, d) {
                    cavity.insert(n);
                    stack.push(n);
                }
            }
        }
        cavity
    }

    /// Whether re-fanning triangle `k`'s outer edges to `d` would give a flat or
    /// inverted triangle.
    fn blocks(&self, k: usize, d: [f64; 2], cavity: &BTreeSet<usize>) -> bool {
        edges(self.tris[k]).into_iter().any(|(u, v)| {
            u != GHOST
                && v != GHOST
                && !self.across(u, v).is_some_and(|n| cavity.contains(&n))
                && orient(self.pts[u], self.pts[v], d) <= 0.0
        })
    }

    fn insert(&mut self, p: usize) {
        let d = self.pts[p];
        let seed = self.walk_to(d);

        let mut excluded = BTreeSet::new();
        let cavity = loop {
            let cavity = self.grow_cavity(seed, d, &excluded);
            let blocked: Vec<usize> = cavity
                .iter()
                .copied()
                .filter(|&k| k != seed && self.blocks(k, d, &cavity))
                .collect();
            if blocked.is_empty() {
                break cavity;
            }
            excluded.extend(blocked);
        };

        let mut boundary = Vec::new();
        for &k in &cavity {
            for (u, v) in edges(self.tris[k]) {
                if !self.across(u, v).is_some_and(|n| cavity.contains(&n)) {
                    boundary.push((u, v));
                }
            }
        }
        for &k in &cavity {
            self.remove(k);
        }
        for (u, v) in boundary {
            let t = if v == GHOST {
                [p, u, GHOST]
            } else if u == GHOST {
                [v, p, GHOST]
            } else {
                [u, v, p]
            };
            let k = self.add(t);
            if t[2] != GHOST {
                self.last = k;
            }
        }
    }
}
