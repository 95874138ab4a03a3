//! Periodic nearest-point search.
//!
//! The index is built over one point set (the solvent atoms of a frame) and
//! answers minimum-image queries for arbitrary query points within a fixed
//! cutoff. Building is O(n); a query touches the 27 cells around the query
//! point.

use crate::error::{MddfError, MddfResult};
use crate::geom::Vec3;
use crate::pbc::{wrap_unit, UnitCell};

const EMPTY: usize = usize::MAX;
const MAX_CELLS_PER_AXIS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nearest {
    pub index: usize,
    pub distance: f64,
    pub within_cutoff: bool,
}

pub trait PeriodicIndex {
    /// Replaces the indexed points. Point `j` keeps index `j` in query results.
    fn rebuild(&mut self, points: &[Vec3], cell: &UnitCell, cutoff: f64) -> MddfResult<()>;

    fn cutoff(&self) -> f64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `f(j, d)` for every indexed point `j` with minimum-image distance
    /// `d < cutoff` from `query`.
    fn for_each_within<F: FnMut(usize, f64)>(&self, query: Vec3, f: F);

    /// Closest indexed point, searched beyond the cutoff when necessary.
    fn nearest(&self, query: Vec3) -> Option<Nearest>;
}

fn check_cutoff(cell: &UnitCell, cutoff: f64) -> MddfResult<()> {
    if !(cutoff > 0.0) {
        return Err(MddfError::Invalid("search cutoff must be > 0".into()));
    }
    let max_cutoff = cell.max_cutoff();
    if cutoff > max_cutoff {
        return Err(MddfError::Invalid(format!(
            "cutoff {cutoff:.3} exceeds half of the smallest box width ({max_cutoff:.3})"
        )));
    }
    Ok(())
}

fn scan_nearest(points: &[Vec3], cell: &UnitCell, query: Vec3, cutoff: f64) -> Option<Nearest> {
    let mut best: Option<Nearest> = None;
    for (index, &p) in points.iter().enumerate() {
        let distance = cell.distance(query, p);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Nearest {
                index,
                distance,
                within_cutoff: distance < cutoff,
            });
        }
    }
    best
}

/// Linked-list cell grid laid out in fractional coordinates, so orthorhombic
/// and triclinic cells share one code path.
#[derive(Debug, Default)]
pub struct CellList {
    cell: Option<UnitCell>,
    cutoff: f64,
    n_cells: [usize; 3],
    head: Vec<usize>,
    next: Vec<usize>,
    points: Vec<Vec3>,
}

impl CellList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    fn cell_coords(&self, f: [f64; 3]) -> [usize; 3] {
        let mut out = [0usize; 3];
        for axis in 0..3 {
            let n = self.n_cells[axis];
            out[axis] = ((f[axis] * n as f64) as usize).min(n - 1);
        }
        out
    }

    fn linear(&self, c: [usize; 3]) -> usize {
        c[0] + self.n_cells[0] * (c[1] + self.n_cells[1] * c[2])
    }

    /// Cells to visit along one axis: the neighbors of `c`, or the whole axis
    /// when it holds fewer than three cells.
    fn axis_cells(&self, axis: usize, c: usize) -> ([usize; 3], usize) {
        let n = self.n_cells[axis];
        if n < 3 {
            let mut cells = [0usize; 3];
            for (slot, value) in cells.iter_mut().zip(0..n) {
                *slot = value;
            }
            return (cells, n);
        }
        ([(c + n - 1) % n, c, (c + 1) % n], 3)
    }
}

impl PeriodicIndex for CellList {
    fn rebuild(&mut self, points: &[Vec3], cell: &UnitCell, cutoff: f64) -> MddfResult<()> {
        check_cutoff(cell, cutoff)?;
        let widths = cell.perpendicular_widths();
        for axis in 0..3 {
            self.n_cells[axis] =
                ((widths[axis] / cutoff).floor() as usize).clamp(1, MAX_CELLS_PER_AXIS);
        }
        self.cell = Some(*cell);
        self.cutoff = cutoff;

        let total = self.n_cells[0] * self.n_cells[1] * self.n_cells[2];
        self.head.clear();
        self.head.resize(total, EMPTY);
        self.next.clear();
        self.next.resize(points.len(), EMPTY);
        self.points.clear();
        self.points.reserve(points.len());

        for (idx, &p) in points.iter().enumerate() {
            let f = cell.fractional(p);
            let fw = [wrap_unit(f[0]), wrap_unit(f[1]), wrap_unit(f[2])];
            self.points.push(cell.cartesian(fw));
            let key = self.linear(self.cell_coords(fw));
            self.next[idx] = self.head[key];
            self.head[key] = idx;
        }
        Ok(())
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn for_each_within<F: FnMut(usize, f64)>(&self, query: Vec3, mut f: F) {
        let Some(cell) = self.cell.as_ref() else {
            return;
        };
        let fq = cell.fractional(query);
        let cq = self.cell_coords([wrap_unit(fq[0]), wrap_unit(fq[1]), wrap_unit(fq[2])]);
        let (xs, nx) = self.axis_cells(0, cq[0]);
        let (ys, ny) = self.axis_cells(1, cq[1]);
        let (zs, nz) = self.axis_cells(2, cq[2]);
        let cutoff2 = self.cutoff * self.cutoff;
        for &cz in &zs[..nz] {
            for &cy in &ys[..ny] {
                for &cx in &xs[..nx] {
                    let mut idx = self.head[self.linear([cx, cy, cz])];
                    while idx != EMPTY {
                        let d = cell.minimum_image(query.sub(self.points[idx]));
                        let d2 = d.norm2();
                        if d2 < cutoff2 {
                            f(idx, d2.sqrt());
                        }
                        idx = self.next[idx];
                    }
                }
            }
        }
    }

    fn nearest(&self, query: Vec3) -> Option<Nearest> {
        let cell = self.cell.as_ref()?;
        let mut best: Option<Nearest> = None;
        self.for_each_within(query, |index, distance| {
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Nearest {
                    index,
                    distance,
                    within_cutoff: true,
                });
            }
        });
        if best.is_some() {
            return best;
        }
        scan_nearest(&self.points, cell, query, self.cutoff)
    }
}

/// Reference index that checks every point. Same contract as [`CellList`].
#[derive(Debug, Default)]
pub struct BruteForce {
    cell: Option<UnitCell>,
    cutoff: f64,
    points: Vec<Vec3>,
}

impl BruteForce {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeriodicIndex for BruteForce {
    fn rebuild(&mut self, points: &[Vec3], cell: &UnitCell, cutoff: f64) -> MddfResult<()> {
        check_cutoff(cell, cutoff)?;
        self.cell = Some(*cell);
        self.cutoff = cutoff;
        self.points.clear();
        self.points.extend_from_slice(points);
        Ok(())
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn for_each_within<F: FnMut(usize, f64)>(&self, query: Vec3, mut f: F) {
        let Some(cell) = self.cell.as_ref() else {
            return;
        };
        for (idx, &p) in self.points.iter().enumerate() {
            let d = cell.distance(query, p);
            if d < self.cutoff {
                f(idx, d);
            }
        }
    }

    fn nearest(&self, query: Vec3) -> Option<Nearest> {
        let cell = self.cell.as_ref()?;
        scan_nearest(&self.points, cell, query, self.cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_points(cell: &UnitCell, n: usize, seed: u64) -> Vec<Vec3> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                // include points outside the primary cell
                let shift = Vec3::new(
                    rng.gen_range(-2..=2) as f64,
                    rng.gen_range(-2..=2) as f64,
                    rng.gen_range(-2..=2) as f64,
                );
                let [a, b, c] = cell.vectors();
                cell.random_point(&mut rng)
                    .add(a.scale(shift.x))
                    .add(b.scale(shift.y))
                    .add(c.scale(shift.z))
            })
            .collect()
    }

    fn within_sorted<I: PeriodicIndex>(index: &I, query: Vec3) -> Vec<(usize, f64)> {
        let mut hits = Vec::new();
        index.for_each_within(query, |j, d| hits.push((j, d)));
        hits.sort_by_key(|(j, _)| *j);
        hits
    }

    fn assert_same_hits(cell: UnitCell, cutoff: f64, seed: u64) {
        let points = random_points(&cell, 300, seed);
        let queries = random_points(&cell, 40, seed.wrapping_add(1));
        let mut cl = CellList::new();
        let mut bf = BruteForce::new();
        cl.rebuild(&points, &cell, cutoff).unwrap();
        bf.rebuild(&points, &cell, cutoff).unwrap();
        for q in queries {
            let a = within_sorted(&cl, q);
            let b = within_sorted(&bf, q);
            assert_eq!(a.len(), b.len());
            for ((ja, da), (jb, db)) in a.iter().zip(b.iter()) {
                assert_eq!(ja, jb);
                assert!((da - db).abs() < 1e-9);
            }
            let na = cl.nearest(q).unwrap();
            let nb = bf.nearest(q).unwrap();
            assert!((na.distance - nb.distance).abs() < 1e-9);
            assert_eq!(na.within_cutoff, nb.within_cutoff);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn cell_list_matches_brute_force_orthorhombic(
            seed in any::<u64>(),
            lx in 12.0..40.0f64,
            ly in 12.0..40.0f64,
            lz in 12.0..40.0f64,
            cutoff in 1.0..6.0f64,
        ) {
            let cell = UnitCell::orthorhombic(lx, ly, lz).unwrap();
            assert_same_hits(cell, cutoff, seed);
        }

        #[test]
        fn cell_list_matches_brute_force_triclinic(
            seed in any::<u64>(),
            xy in -4.0..4.0f64,
            xz in -3.0..3.0f64,
            yz in -3.0..3.0f64,
            cutoff in 1.0..5.0f64,
        ) {
            let cell = UnitCell::triclinic([[20.0, 0.0, 0.0], [xy, 18.0, 0.0], [xz, yz, 22.0]])
                .unwrap();
            assert_same_hits(cell, cutoff, seed);
        }
    }

    #[test]
    fn small_boxes_visit_each_cell_once() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0).unwrap();
        let mut cl = CellList::new();
        cl.rebuild(&[Vec3::new(1.0, 1.0, 1.0), Vec3::new(9.5, 1.0, 1.0)], &cell, 4.9)
            .unwrap();
        assert_eq!(cl.n_cells(), [2, 2, 2]);
        let hits = within_sorted(&cl, Vec3::new(0.5, 1.0, 1.0));
        assert_eq!(hits.len(), 2);
        assert!((hits[0].1 - 0.5).abs() < 1e-12);
        assert!((hits[1].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nearest_falls_back_beyond_cutoff() {
        let cell = UnitCell::orthorhombic(30.0, 30.0, 30.0).unwrap();
        let mut cl = CellList::new();
        cl.rebuild(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)], &cell, 2.0)
            .unwrap();
        let near = cl.nearest(Vec3::new(4.0, 0.0, 0.0)).unwrap();
        assert_eq!(near.index, 0);
        assert!((near.distance - 4.0).abs() < 1e-12);
        assert!(!near.within_cutoff);
        let near = cl.nearest(Vec3::new(11.0, 0.0, 0.0)).unwrap();
        assert_eq!(near.index, 1);
        assert!(near.within_cutoff);
    }

    #[test]
    fn rebuild_rejects_cutoff_larger_than_half_box() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 30.0).unwrap();
        let mut cl = CellList::new();
        assert!(matches!(
            cl.rebuild(&[], &cell, 5.5),
            Err(MddfError::Invalid(_))
        ));
        assert!(cl.rebuild(&[], &cell, 5.0).is_ok());
        assert!(cl.is_empty());
        assert!(cl.nearest(Vec3::default()).is_none());
    }
}
