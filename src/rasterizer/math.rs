//! Vector and matrix math for the transform and raster stages
//!
//! Matrices are row-major and act on column vectors, so `a * b` applies `b`
//! first. Conventions match OpenGL: right-handed view space, clip-space z in
//! [-1, 1].

use std::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

/// Smallest barycentric denominator (twice the signed screen area) a triangle
/// may have before it is treated as degenerate.
pub const DEGENERATE_EPSILON: f32 = 0.0001;

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

/// Homogeneous 4D vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Promote a position to homogeneous coordinates (w = 1)
    pub fn from_point(p: Vec3) -> Self {
        Self::new(p.x, p.y, p.z, 1.0)
    }

    /// Perspective divide. w == 0 yields non-finite components; callers
    /// filter those out rather than clip.
    pub fn to_point(self) -> Vec3 {
        Vec3::new(self.x / self.w, self.y / self.w, self.z / self.w)
    }
}

/// 4x4 matrix, row-major (`m[row][col]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn from_rows(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn translate(t: Vec3) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, t.x],
            [0.0, 1.0, 0.0, t.y],
            [0.0, 0.0, 1.0, t.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn scale(s: Vec3) -> Self {
        Self::from_rows([
            [s.x, 0.0, 0.0, 0.0],
            [0.0, s.y, 0.0, 0.0],
            [0.0, 0.0, s.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation of `angle` radians around `axis` (normalized here)
    pub fn rotate(angle: f32, axis: Vec3) -> Self {
        let a = axis.normalize();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Self::from_rows([
            [c + t * a.x * a.x, t * a.x * a.y - s * a.z, t * a.x * a.z + s * a.y, 0.0],
            [t * a.x * a.y + s * a.z, c + t * a.y * a.y, t * a.y * a.z - s * a.x, 0.0],
            [t * a.x * a.z - s * a.y, t * a.y * a.z + s * a.x, c + t * a.z * a.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Right-handed view matrix looking from `eye` towards `center`
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Self {
        let f = (center - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        Self::from_rows([
            [s.x, s.y, s.z, -s.dot(eye)],
            [u.x, u.y, u.z, -u.dot(eye)],
            [-f.x, -f.y, -f.z, f.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// OpenGL-style perspective projection, `fov_y` in radians
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();
        let depth = far - near;
        Self::from_rows([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, -(far + near) / depth, -2.0 * far * near / depth],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// NDC to pixel mapping: `scale(w/2, h/2, 0.5) * translate(1, 1, 0.5)`.
    ///
    /// x and y land in [0, width] x [0, height]; NDC z in [-1, 1] lands in
    /// [-0.25, 0.75].
    pub fn viewport(width: f32, height: f32) -> Self {
        Self::scale(Vec3::new(width / 2.0, height / 2.0, 0.5))
            * Self::translate(Vec3::new(1.0, 1.0, 0.5))
    }

    pub fn transform(&self, v: Vec4) -> Vec4 {
        let row = |r: &[f32; 4]| r[0] * v.x + r[1] * v.y + r[2] * v.z + r[3] * v.w;
        Vec4::new(row(&self.m[0]), row(&self.m[1]), row(&self.m[2]), row(&self.m[3]))
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, other: Mat4) -> Mat4 {
        let mut m = [[0.0; 4]; 4];
        for (row, out) in m.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[row][k] * other.m[k][col]).sum();
            }
        }
        Mat4 { m }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        self.transform(v)
    }
}

/// Twice the signed screen-space area of (a, b, c), ignoring z.
/// This is the shared denominator of [`barycentric`].
pub fn barycentric_denominator(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y)
}

/// Barycentric coordinates of `p` in triangle (a, b, c), ignoring z.
///
/// Returns `(w, v, u)` packed as `Vec3 { x: w, y: v, z: u }`, the weights of
/// a, b and c respectively. `None` for degenerate triangles.
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let d = barycentric_denominator(a, b, c);
    if d.abs() < DEGENERATE_EPSILON {
        return None;
    }

    let w = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / d;
    let v = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / d;
    let u = 1.0 - w - v;

    Some(Vec3::new(w, v, u))
}
