use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::interaction::Intersection;
use std::ops::Deref;

/// Opaque handle to a material owned by whoever assembled the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Anything that can be bounded and intersected: shapes and whole accelerators alike.
pub trait Primitive: Sync + Send {
    fn world_bound(&self) -> Bounds3f;

    /// Closest-hit query. Returns true and overwrites `isect` only when a hit strictly closer than
    /// `isect.t` is found inside the ray's range, in which case `ray.t_max` is shrunk to it.
    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool;

    /// Any-hit query.
    fn intersect_test(&self, ray: &Ray) -> bool;

    fn material(&self) -> Option<MaterialId> {
        None
    }
}

impl<'p, P: Primitive + ?Sized> Primitive for &'p P {
    fn world_bound(&self) -> Bounds3f {
        (**self).world_bound()
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        (**self).intersect(ray, isect)
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        (**self).intersect_test(ray)
    }

    fn material(&self) -> Option<MaterialId> {
        (**self).material()
    }
}

/// Linear scan over every primitive. Used as the ground truth the accelerators are checked
/// against, and fine on its own for a handful of objects.
pub struct PrimitiveList<'p> {
    prims: Vec<&'p dyn Primitive>,
}

impl<'p> PrimitiveList<'p> {
    pub fn new(prims: Vec<&'p dyn Primitive>) -> Self {
        Self { prims }
    }
}

impl<'p> Deref for PrimitiveList<'p> {
    type Target = [&'p dyn Primitive];

    fn deref(&self) -> &Self::Target {
        &self.prims
    }
}

impl<'p> Primitive for PrimitiveList<'p> {
    fn world_bound(&self) -> Bounds3f {
        self.prims.iter()
            .fold(Bounds3f::empty(), |b, p| b.join(&p.world_bound()))
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        let mut hit = false;
        for prim in &self.prims {
            hit |= prim.intersect(ray, isect);
        }
        hit
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.prims.iter().any(|p| p.intersect_test(ray))
    }
}
