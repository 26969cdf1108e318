use crate::{Point2f, Point3f, Float};
use crate::geometry::Normal3;
use crate::math::INFINITY;
use crate::primitive::{MaterialId, Primitive};
use std::fmt::{Debug, Formatter};

/// Closest-hit record filled in by `Primitive::intersect`.
///
/// A record starts at `t = +inf` and is only ever overwritten by a strictly closer hit, so the
/// same record can be threaded through any number of primitives.
#[derive(Clone, Copy)]
pub struct Intersection<'p> {
    pub t: Float,

    pub p: Point3f,

    /// Surface normal. Triangles face it toward the incoming ray, spheres point it outward.
    pub n: Normal3,

    /// (u, v) coordinates from the parametrization of the surface
    pub uv: Point2f,

    /// The leaf primitive that was hit, never an aggregate.
    pub primitive: Option<&'p dyn Primitive>,

    pub material: Option<MaterialId>,
}

impl<'p> Intersection<'p> {
    pub fn new() -> Self {
        Self {
            t: INFINITY,
            p: point3f!(0, 0, 0),
            n: Normal3::new(0.0, 0.0, 0.0),
            uv: Point2f::new(0.0, 0.0),
            primitive: None,
            material: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.primitive.is_some()
    }
}

impl<'p> Default for Intersection<'p> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> Debug for Intersection<'p> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intersection")
            .field("t", &self.t)
            .field("p", &self.p)
            .field("n", &self.n)
            .field("uv", &self.uv)
            .field("primitive", &self.primitive.map(|p| p.world_bound()))
            .field("material", &self.material)
            .finish()
    }
}
