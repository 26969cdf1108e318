/*!
Checks every accelerator configuration against a brute-force scan over random scenes of spheres
and triangles
*/

use raytracer_accel::bvh::{BvhOptions, SplitMethod, BVH};
use raytracer_accel::kdtree::{KdTree, KdTreeOptions};
use raytracer_accel::params::ParamSet;
use raytracer_accel::shapes::sphere::Sphere;
use raytracer_accel::shapes::triangle::{Triangle, TriangleMesh};
use raytracer_accel::{
    make_accelerator, Accelerator, Float, Intersection, MaterialId, Point3f, Primitive, PrimitiveList, Ray,
};
use approx::assert_abs_diff_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn rand_point(rng: &mut impl Rng, lo: Float, hi: Float) -> Point3f {
    Point3f::new(rng.gen_range(lo..hi), rng.gen_range(lo..hi), rng.gen_range(lo..hi))
}

struct RandomScene {
    spheres: Vec<Sphere>,
    meshes: Vec<TriangleMesh>,
}

impl RandomScene {
    /// Every primitive gets its own material so hits can be told apart.
    fn new(seed: u64, n_spheres: u32, n_tris: u32) -> Self {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);

        let spheres = (0..n_spheres)
            .map(|i| {
                let center = rand_point(&mut rng, -10.0, 10.0);
                Sphere::new(center, rng.gen_range(0.1..1.5), Some(MaterialId(i)))
            })
            .collect();

        let meshes = (0..n_tris)
            .map(|i| {
                let p0 = rand_point(&mut rng, -10.0, 10.0);
                let positions = vec![
                    p0,
                    p0 + (rand_point(&mut rng, -2.0, 2.0) - Point3f::new(0.0, 0.0, 0.0)),
                    p0 + (rand_point(&mut rng, -2.0, 2.0) - Point3f::new(0.0, 0.0, 0.0)),
                ];
                TriangleMesh::new(positions, None, vec![0, 1, 2], Some(MaterialId(n_spheres + i)))
            })
            .collect();

        Self { spheres, meshes }
    }

    fn triangles(&self) -> Vec<Triangle<'_>> {
        self.meshes.iter().flat_map(|m| m.iter_triangles()).collect()
    }
}

fn as_prims<'a>(spheres: &'a [Sphere], tris: &'a [Triangle<'a>]) -> Vec<&'a dyn Primitive> {
    spheres.iter().map(|s| s as &dyn Primitive)
        .chain(tris.iter().map(|t| t as &dyn Primitive))
        .collect()
}

fn random_rays(seed: u64, n: usize) -> Vec<Ray> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let origin = rand_point(&mut rng, -15.0, 15.0);
            let target = rand_point(&mut rng, -10.0, 10.0);
            Ray::new(origin, target - origin)
        })
        .collect()
}

fn assert_matches_reference(accel: &dyn Primitive, reference: &PrimitiveList, rays: &[Ray], label: &str) {
    let mut n_hits = 0;
    for (i, ray) in rays.iter().enumerate() {
        let mut accel_ray = *ray;
        let mut ref_ray = *ray;
        let mut accel_isect = Intersection::new();
        let mut ref_isect = Intersection::new();

        let accel_hit = accel.intersect(&mut accel_ray, &mut accel_isect);
        let ref_hit = reference.intersect(&mut ref_ray, &mut ref_isect);

        assert_eq!(accel_hit, ref_hit, "{}: ray {} hit mismatch", label, i);
        assert_eq!(accel.intersect_test(ray), ref_hit, "{}: ray {} any-hit mismatch", label, i);

        if ref_hit {
            n_hits += 1;
            assert_abs_diff_eq!(accel_isect.t, ref_isect.t, epsilon = 1.0e-5);
            assert_eq!(accel_isect.material, ref_isect.material, "{}: ray {} hit a different primitive", label, i);
            assert_eq!(accel_ray.t_max, accel_isect.t);
        }
    }

    // make sure the scene actually exercises something
    assert!(n_hits > rays.len() / 10, "{}: only {} hits", label, n_hits);
}

fn configurations<'p>(prims: &[&'p dyn Primitive]) -> Vec<(String, Accelerator<'p>)> {
    let mut accels = Vec::new();
    for &split_method in &[SplitMethod::SAH, SplitMethod::Middle, SplitMethod::EqualCounts] {
        for &max_leaf_size in &[1, 4] {
            let bvh = BVH::build_with(prims.to_vec(), BvhOptions { max_leaf_size, split_method });
            accels.push((format!("bvh {:?} leaf {}", split_method, max_leaf_size), bvh.into()));
        }
    }
    for &max_leaf_size in &[1, 4] {
        let kd = KdTree::build_with(prims.to_vec(), KdTreeOptions { max_leaf_size, max_depth: None });
        accels.push((format!("kdtree leaf {}", max_leaf_size), kd.into()));
    }
    accels
}

#[test]
fn test_accelerators_match_brute_force() {
    init_tracing();

    let scene = RandomScene::new(1, 150, 150);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);
    let reference = PrimitiveList::new(prims.clone());
    let rays = random_rays(2, 1000);

    for (label, accel) in configurations(&prims) {
        assert_matches_reference(&accel, &reference, &rays, &label);
    }
}

#[test]
fn test_world_bound_contains_every_primitive() {
    let scene = RandomScene::new(3, 60, 60);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);

    for (label, accel) in configurations(&prims) {
        let world = accel.world_bound();
        for p in &prims {
            assert!(world.contains(&p.world_bound()), "{}: primitive outside world bound", label);
        }
    }
}

#[test]
fn test_repeated_queries_are_identical() {
    let scene = RandomScene::new(4, 80, 80);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);
    let rays = random_rays(5, 200);

    for (label, accel) in configurations(&prims) {
        for ray in &rays {
            let mut r1 = *ray;
            let mut r2 = *ray;
            let mut i1 = Intersection::new();
            let mut i2 = Intersection::new();
            let h1 = accel.intersect_with_stats(&mut r1, &mut i1);
            let h2 = accel.intersect_with_stats(&mut r2, &mut i2);

            assert_eq!(h1, h2, "{}", label);
            assert_eq!(i1.t, i2.t);
            assert_eq!(i1.p, i2.p);
            assert_eq!(i1.n, i2.n);
            assert_eq!(i1.material, i2.material);
            assert_eq!(r1, r2);
        }
    }
}

#[test]
fn test_inverted_ray_range_never_hits() {
    let scene = RandomScene::new(6, 50, 50);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);

    for (label, accel) in configurations(&prims) {
        for ray in random_rays(7, 100) {
            let mut ray = Ray::with_bounds(ray.origin, ray.dir(), 10.0, 1.0);
            let mut isect = Intersection::new();
            assert!(!accel.intersect_test(&ray), "{}", label);
            assert!(!accel.intersect(&mut ray, &mut isect), "{}", label);
            assert!(!isect.is_hit());
        }
    }
}

#[test]
fn test_empty_accelerators() {
    let rays = random_rays(8, 20);
    for (label, accel) in configurations(&[]) {
        assert!(accel.world_bound().is_empty());
        for ray in &rays {
            let mut ray = *ray;
            let mut isect = Intersection::new();
            assert!(!accel.intersect(&mut ray, &mut isect), "{}", label);
            assert!(!accel.intersect_test(&ray), "{}", label);
        }
    }
}

#[test]
fn test_nested_aggregates() {
    init_tracing();

    let scene = RandomScene::new(9, 100, 100);
    let tris = scene.triangles();
    let sphere_prims: Vec<&dyn Primitive> = scene.spheres.iter().map(|s| s as &dyn Primitive).collect();
    let tri_prims: Vec<&dyn Primitive> = tris.iter().map(|t| t as &dyn Primitive).collect();

    let sphere_bvh = BVH::build(sphere_prims);
    let tri_kd = KdTree::build(tri_prims);
    assert_eq!(sphere_bvh.material(), None);

    let top = BVH::build(vec![&sphere_bvh as &dyn Primitive, &tri_kd]);

    let reference = PrimitiveList::new(as_prims(&scene.spheres, &tris));
    assert_matches_reference(&top, &reference, &random_rays(10, 500), "nested");

    // the record points at the leaf primitive, not at an aggregate
    let mut ray = random_rays(10, 500).into_iter()
        .find(|r| reference.intersect_test(r))
        .expect("no ray hit the scene");
    let mut isect = Intersection::new();
    assert!(top.intersect(&mut ray, &mut isect));
    let prim = isect.primitive.expect("hit without a primitive");
    assert!(prim.material().is_some());
    assert_eq!(prim.material(), isect.material);
}

#[test]
fn test_accelerator_from_params() -> anyhow::Result<()> {
    let scene = RandomScene::new(11, 100, 100);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);
    let reference = PrimitiveList::new(prims.clone());
    let rays = random_rays(12, 300);

    let mut params = ParamSet::default();
    params.with("maxnodeprims", 2).with("splitmethod", "equal");
    let bvh = make_accelerator("bvh", prims.clone(), &mut params)?;
    assert_matches_reference(&bvh, &reference, &rays, "bvh from params");

    let mut params = ParamSet::default();
    params.with("maxprims", 1).with("maxdepth", 6);
    let kd = make_accelerator("kdtree", prims, &mut params)?;
    assert!(kd.build_stats().max_depth <= 7);
    assert_matches_reference(&kd, &reference, &rays, "kdtree from params");

    Ok(())
}

#[test]
fn test_kdtree_prunes_work() {
    let scene = RandomScene::new(13, 200, 200);
    let tris = scene.triangles();
    let prims = as_prims(&scene.spheres, &tris);
    let kd = KdTree::build(prims.clone());
    let bvh = BVH::build(prims.clone());

    let mut kd_tests = 0;
    let mut bvh_tests = 0;
    for ray in random_rays(14, 200) {
        let (mut r1, mut r2) = (ray, ray);
        kd_tests += kd.intersect_with_stats(&mut r1, &mut Intersection::new()).1.prim_tests;
        bvh_tests += bvh.intersect_with_stats(&mut r2, &mut Intersection::new()).1.prim_tests;
    }

    let brute_force = 200 * prims.len();
    assert!(kd_tests * 2 < brute_force, "kd-tree did {} tests", kd_tests);
    assert!(bvh_tests * 2 < brute_force, "bvh did {} tests", bvh_tests);
}
