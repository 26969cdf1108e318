use crate::{Float, Point2f, Point3f};
use crate::geometry::{Normal3, Ray};
use crate::geometry::bounds::Bounds3f;
use crate::interaction::Intersection;
use crate::math::quadratic;
use crate::primitive::{MaterialId, Primitive};
use cgmath::InnerSpace;
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point3f,
    pub radius: Float,
    pub material: Option<MaterialId>,
}

impl Sphere {
    pub fn new(center: Point3f, radius: Float, material: Option<MaterialId>) -> Self {
        Self { center, radius, material }
    }

    /// Parametric distance of the nearest valid hit along the ray, if any.
    pub fn hit_t(&self, ray: &Ray) -> Option<Float> {
        if !(self.radius > 0.0) {
            return None;
        }

        let oc = ray.origin - self.center;
        let dir = ray.dir();
        let a = dir.magnitude2();
        let b = 2.0 * oc.dot(dir);
        let c = oc.magnitude2() - self.radius * self.radius;

        let (t0, t1) = quadratic(a, b, c)?;

        if ray.in_range(t0) {
            Some(t0)
        } else if ray.in_range(t1) {
            Some(t1)
        } else {
            None
        }
    }

    fn surface_uv(&self, p: Point3f) -> Point2f {
        let d = (p - self.center) / self.radius;
        let mut phi = Float::atan2(d.y, d.x);
        if phi < 0.0 { phi += 2.0 * PI }
        let theta = Float::acos(d.z.clamp(-1.0, 1.0));

        Point2f::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Primitive for Sphere {
    fn world_bound(&self) -> Bounds3f {
        let r = vec3f!(self.radius, self.radius, self.radius);
        Bounds3f::with_bounds(self.center - r, self.center + r)
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        let t = match self.hit_t(ray) {
            Some(t) if t < isect.t => t,
            _ => return false,
        };

        let p = ray.at(t);
        isect.t = t;
        isect.p = p;
        isect.n = Normal3((p - self.center) / self.radius);
        isect.uv = self.surface_uv(p);
        isect.primitive = Some(self);
        isect.material = self.material;
        ray.t_max = t;

        true
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.hit_t(ray).is_some()
    }

    fn material(&self) -> Option<MaterialId> {
        self.material
    }
}
