use crate::accelerator::Accelerator;
use crate::aggregate::TraversalStats;
use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::interaction::Intersection;
use crate::primitive::Primitive;
use rayon::prelude::*;

/// The built accelerator for a set of primitives, answering ray queries against it.
pub struct Scene<'p> {
    pub primitives_aggregate: Accelerator<'p>,
}

impl<'p> Scene<'p> {
    pub fn new(primitives: Accelerator<'p>) -> Self {
        Self {
            primitives_aggregate: primitives,
        }
    }

    /// Closest hit along the ray. On a hit `ray.t_max` is left at the hit distance.
    pub fn intersect(&self, ray: &mut Ray) -> Option<Intersection<'_>> {
        let mut isect = Intersection::new();
        if self.primitives_aggregate.intersect(ray, &mut isect) {
            Some(isect)
        } else {
            None
        }
    }

    pub fn intersect_test(&self, ray: &Ray) -> bool {
        self.primitives_aggregate.intersect_test(ray)
    }

    pub fn intersect_with_stats(&self, ray: &mut Ray) -> (Option<Intersection<'_>>, TraversalStats) {
        let mut isect = Intersection::new();
        let (hit, stats) = self.primitives_aggregate.intersect_with_stats(ray, &mut isect);
        (if hit { Some(isect) } else { None }, stats)
    }

    /// Traces every ray on the rayon thread pool. Results are in the same order as `rays`.
    pub fn intersect_batch(&self, rays: &mut [Ray]) -> Vec<Option<Intersection<'_>>> {
        rays.par_iter_mut()
            .map(|ray| self.intersect(ray))
            .collect()
    }

    pub fn intersect_test_batch(&self, rays: &[Ray]) -> Vec<bool> {
        rays.par_iter()
            .map(|ray| self.intersect_test(ray))
            .collect()
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.primitives_aggregate.world_bound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdtree::KdTree;
    use crate::shapes::sphere::Sphere;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scene_queries() {
        let spheres = vec![
            Sphere::new(point3f!(0, 0, 0), 1.0, None),
            Sphere::new(point3f!(0, 0, -4), 1.0, None),
        ];
        let prims: Vec<&dyn Primitive> = spheres.iter().map(|s| s as &dyn Primitive).collect();
        let scene = Scene::new(KdTree::build(prims).into());

        let mut ray = Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, -1));
        let isect = scene.intersect(&mut ray).expect("Did not intersect");
        assert_abs_diff_eq!(isect.t, 4.0);
        assert_eq!(ray.t_max, isect.t);

        let mut miss = Ray::new(point3f!(0, 5, 5), vec3f!(0, 0, -1));
        assert!(scene.intersect(&mut miss).is_none());
        assert!(!scene.intersect_test(&miss));
        assert_eq!(scene.world_bound(), bounds3f!((-1, -1, -5), (1, 1, 1)));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let spheres: Vec<_> = (0..16)
            .map(|i| Sphere::new(point3f!(i % 4, i / 4, 0), 0.4, None))
            .collect();
        let prims: Vec<&dyn Primitive> = spheres.iter().map(|s| s as &dyn Primitive).collect();
        let scene = Scene::new(crate::bvh::BVH::build(prims).into());

        let rays: Vec<Ray> = (0..64)
            .map(|i| Ray::new(point3f!(0.25 * (i % 8) as f32, 0.5 * (i / 8) as f32, 3), vec3f!(0, 0, -1)))
            .collect();

        let mut batch_rays = rays.clone();
        let batch = scene.intersect_batch(&mut batch_rays);
        let tests = scene.intersect_test_batch(&rays);

        for (i, ray) in rays.iter().enumerate() {
            let mut ray = *ray;
            let seq = scene.intersect(&mut ray);
            assert_eq!(seq.map(|h| h.t), batch[i].map(|h| h.t));
            assert_eq!(seq.is_some(), tests[i]);
            assert_eq!(ray, batch_rays[i]);
        }
    }
}
