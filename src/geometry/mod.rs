use crate::{Float, Point3f, Vec3f};
use crate::math::INFINITY;
use cgmath::InnerSpace;
use std::ops::{Deref, Neg};

pub mod bounds;

pub use bounds::*;

pub fn min_point(a: Point3f, b: Point3f) -> Point3f {
    Point3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

pub fn max_point(a: Point3f, b: Point3f) -> Point3f {
    Point3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

/// A ray segment `origin + t * dir` for `t` in `[t_min, t_max]`.
///
/// `t_max` is shrunk by closest-hit queries every time a nearer hit is recorded, which is what
/// lets the accelerators skip any node whose box starts beyond the current closest hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3f,
    dir: Vec3f,
    inv_dir: Vec3f,
    pub t_min: Float,
    pub t_max: Float,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self::with_bounds(origin, dir, 0.0, INFINITY)
    }

    pub fn with_bounds(origin: Point3f, dir: Vec3f, t_min: Float, t_max: Float) -> Self {
        let inv_dir = vec3f!(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        Self { origin, dir, inv_dir, t_min, t_max }
    }

    pub fn dir(&self) -> Vec3f {
        self.dir
    }

    /// Componentwise reciprocal of the direction. Zero components map to signed infinities.
    pub fn inv_dir(&self) -> Vec3f {
        self.inv_dir
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + (self.dir * t)
    }

    /// Whether `t` lies in the ray's current parametric range.
    pub fn in_range(&self, t: Float) -> bool {
        t >= self.t_min && t <= self.t_max
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }

    /// Flip the normal if needed so that it lies in the same hemisphere as `v`.
    pub fn faceforward(self, v: Vec3f) -> Self {
        if self.dot(v) < 0.0 {
            -self
        } else {
            self
        }
    }

    pub fn normalize(self) -> Self {
        Self(self.0.normalize())
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Neg for Normal3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl From<Vec3f> for Normal3 {
    fn from(v: Vec3f) -> Self {
        Self(v)
    }
}

impl From<Normal3> for Vec3f {
    fn from(n: Normal3) -> Self {
        n.0
    }
}
