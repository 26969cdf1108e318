use crate::geometry::{max_point, min_point, Ray};
use crate::math::{gamma, INFINITY, NEG_INFINITY};
use crate::{Float, Point3f, Vec3f};

/// Axis-aligned bounding box.
///
/// The empty box has `min = +inf` and `max = -inf` so that it is the identity for `join`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    pub min: Point3f,
    pub max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds3f {
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(INFINITY, INFINITY, INFINITY),
            max: Point3f::new(NEG_INFINITY, NEG_INFINITY, NEG_INFINITY),
        }
    }

    /// Bounds spanning two arbitrary corner points.
    pub fn with_bounds(p1: Point3f, p2: Point3f) -> Self {
        Self {
            min: min_point(p1, p2),
            max: max_point(p1, p2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn join(&self, other: &Self) -> Self {
        Self {
            min: min_point(self.min, other.min),
            max: max_point(self.max, other.max),
        }
    }

    pub fn join_point(&self, p: Point3f) -> Self {
        Self {
            min: min_point(self.min, p),
            max: max_point(self.max, p),
        }
    }

    pub fn expand(&mut self, other: &Self) {
        *self = self.join(other);
    }

    pub fn expand_point(&mut self, p: Point3f) {
        *self = self.join_point(p);
    }

    /// The overlap of both boxes, which is empty if they are disjoint.
    pub fn intersection(&self, other: &Self) -> Self {
        let b = Self {
            min: max_point(self.min, other.min),
            max: min_point(self.max, other.max),
        };
        if b.is_empty() { Self::empty() } else { b }
    }

    pub fn diagonal(&self) -> Vec3f {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point3f {
        self.min + (self.diagonal() * 0.5)
    }

    pub fn surface_area(&self) -> Float {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Index of the axis with the largest extent.
    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Inclusive containment test.
    pub fn inside(&self, p: Point3f) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Strict containment test; points on the boundary are outside.
    pub fn inside_exclusive(&self, p: Point3f) -> bool {
        (0..3).all(|i| p[i] > self.min[i] && p[i] < self.max[i])
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty() || (self.inside(other.min) && self.inside(other.max))
    }

    /// Ray-slab test over the ray's own `[t_min, t_max]`.
    pub fn intersect_p(&self, ray: &Ray) -> Option<(Float, Float)> {
        self.intersect_range(ray, ray.t_min, ray.t_max)
    }

    /// Ray-slab test over `[t0, t1]`, returning the parametric entry and exit times of the ray
    /// inside the box.
    pub fn intersect_range(&self, ray: &Ray, mut t0: Float, mut t1: Float) -> Option<(Float, Float)> {
        if self.is_empty() || t0 > t1 {
            return None;
        }

        let inv_dir = ray.inv_dir();
        for i in 0..3 {
            let mut t_near = (self.min[i] - ray.origin[i]) * inv_dir[i];
            let mut t_far = (self.max[i] - ray.origin[i]) * inv_dir[i];
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            t_far *= 1.0 + 2.0 * gamma(3);

            // NaN slab times fail both comparisons and leave the interval untouched
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }

        Some((t0, t1))
    }
}
