use nalgebra::Matrix3;
use rand::Rng;

use crate::error::{MddfError, MddfResult};
use crate::frame::Box3;
use crate::geom::Vec3;

/// `cell` rows are the lattice vectors; a cartesian point is
/// `f[0] * cell[0] + f[1] * cell[1] + f[2] * cell[2]` for fractional `f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitCell {
    cell: [[f64; 3]; 3],
    inv: [[f64; 3]; 3],
    orthorhombic: bool,
}

impl UnitCell {
    pub fn orthorhombic(lx: f64, ly: f64, lz: f64) -> MddfResult<Self> {
        if !(lx > 0.0 && ly > 0.0 && lz > 0.0) {
            return Err(MddfError::Invalid(format!(
                "box lengths must be positive, got [{lx}, {ly}, {lz}]"
            )));
        }
        Ok(Self {
            cell: [[lx, 0.0, 0.0], [0.0, ly, 0.0], [0.0, 0.0, lz]],
            inv: [[1.0 / lx, 0.0, 0.0], [0.0, 1.0 / ly, 0.0], [0.0, 0.0, 1.0 / lz]],
            orthorhombic: true,
        })
    }

    pub fn triclinic(cell: [[f64; 3]; 3]) -> MddfResult<Self> {
        let off_diagonal = cell[0][1] != 0.0
            || cell[0][2] != 0.0
            || cell[1][0] != 0.0
            || cell[1][2] != 0.0
            || cell[2][0] != 0.0
            || cell[2][1] != 0.0;
        if !off_diagonal {
            return Self::orthorhombic(cell[0][0], cell[1][1], cell[2][2]);
        }
        let m = Matrix3::new(
            cell[0][0], cell[0][1], cell[0][2], cell[1][0], cell[1][1], cell[1][2], cell[2][0],
            cell[2][1], cell[2][2],
        );
        if m.determinant().abs() < 1e-12 {
            return Err(MddfError::Invalid("box matrix not invertible".into()));
        }
        let inv_m = m
            .try_inverse()
            .ok_or_else(|| MddfError::Invalid("box matrix not invertible".into()))?;
        let mut inv = [[0.0; 3]; 3];
        for (i, row) in inv.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                *slot = inv_m[(i, j)];
            }
        }
        Ok(Self {
            cell,
            inv,
            orthorhombic: false,
        })
    }

    pub fn from_box(box_: Box3) -> MddfResult<Self> {
        match box_ {
            Box3::Orthorhombic { lx, ly, lz } => {
                Self::orthorhombic(lx as f64, ly as f64, lz as f64)
            }
            Box3::Triclinic { m } => Self::triclinic([
                [m[0] as f64, m[1] as f64, m[2] as f64],
                [m[3] as f64, m[4] as f64, m[5] as f64],
                [m[6] as f64, m[7] as f64, m[8] as f64],
            ]),
            Box3::None => Err(MddfError::Mismatch(
                "periodic box required for every frame".into(),
            )),
        }
    }

    pub fn is_orthorhombic(&self) -> bool {
        self.orthorhombic
    }

    pub fn vectors(&self) -> [Vec3; 3] {
        [
            Vec3::from_array(self.cell[0]),
            Vec3::from_array(self.cell[1]),
            Vec3::from_array(self.cell[2]),
        ]
    }

    pub fn volume(&self) -> f64 {
        if self.orthorhombic {
            return self.cell[0][0] * self.cell[1][1] * self.cell[2][2];
        }
        let [a, b, c] = self.vectors();
        a.dot(b.cross(c)).abs()
    }

    pub fn perpendicular_widths(&self) -> [f64; 3] {
        if self.orthorhombic {
            return [self.cell[0][0], self.cell[1][1], self.cell[2][2]];
        }
        let [a, b, c] = self.vectors();
        let volume = self.volume();
        [
            volume / b.cross(c).norm(),
            volume / c.cross(a).norm(),
            volume / a.cross(b).norm(),
        ]
    }

    /// Largest cutoff for which the minimum image of every pair is unique.
    pub fn max_cutoff(&self) -> f64 {
        let w = self.perpendicular_widths();
        0.5 * w[0].min(w[1]).min(w[2])
    }

    pub fn fractional(&self, p: Vec3) -> [f64; 3] {
        let inv = &self.inv;
        [
            inv[0][0] * p.x + inv[1][0] * p.y + inv[2][0] * p.z,
            inv[0][1] * p.x + inv[1][1] * p.y + inv[2][1] * p.z,
            inv[0][2] * p.x + inv[1][2] * p.y + inv[2][2] * p.z,
        ]
    }

    pub fn cartesian(&self, f: [f64; 3]) -> Vec3 {
        let cell = &self.cell;
        Vec3::new(
            f[0] * cell[0][0] + f[1] * cell[1][0] + f[2] * cell[2][0],
            f[0] * cell[0][1] + f[1] * cell[1][1] + f[2] * cell[2][1],
            f[0] * cell[0][2] + f[1] * cell[1][2] + f[2] * cell[2][2],
        )
    }

    pub fn wrap(&self, p: Vec3) -> Vec3 {
        let f = self.fractional(p);
        self.cartesian([wrap_unit(f[0]), wrap_unit(f[1]), wrap_unit(f[2])])
    }

    pub fn minimum_image(&self, d: Vec3) -> Vec3 {
        if self.orthorhombic {
            let lx = self.cell[0][0];
            let ly = self.cell[1][1];
            let lz = self.cell[2][2];
            return Vec3::new(
                d.x - (d.x / lx).round() * lx,
                d.y - (d.y / ly).round() * ly,
                d.z - (d.z / lz).round() * lz,
            );
        }
        let f = self.fractional(d);
        self.cartesian([f[0] - f[0].round(), f[1] - f[1].round(), f[2] - f[2].round()])
    }

    pub fn distance(&self, a: Vec3, b: Vec3) -> f64 {
        self.minimum_image(a.sub(b)).norm()
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.cartesian([rng.gen(), rng.gen(), rng.gen()])
    }
}

pub(crate) fn wrap_unit(f: f64) -> f64 {
    let w = f.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}
