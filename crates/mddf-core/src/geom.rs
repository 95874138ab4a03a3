use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    /// Trajectory readers store single precision `[x, y, z, w]` slots.
    pub fn from_coord(c: [f32; 4]) -> Self {
        Self::new(c[0] as f64, c[1] as f64, c[2] as f64)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn norm2(self) -> f64 {
        self.dot(self)
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Uniformly distributed rotation (Shoemake's subgroup algorithm).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let u1: f64 = rng.gen();
        let u2: f64 = rng.gen();
        let u3: f64 = rng.gen();
        let s1 = (1.0 - u1).sqrt();
        let s2 = u1.sqrt();
        let t1 = std::f64::consts::TAU * u2;
        let t2 = std::f64::consts::TAU * u3;
        Self {
            x: s1 * t1.sin(),
            y: s1 * t1.cos(),
            z: s2 * t2.sin(),
            w: s2 * t2.cos(),
        }
    }

    pub fn rotate_vec(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let s = self.w;
        let term1 = u.scale(2.0 * u.dot(v));
        let term2 = v.scale(s * s - u.dot(u));
        let term3 = u.cross(v).scale(2.0 * s);
        term1.add(term2).add(term3)
    }
}
