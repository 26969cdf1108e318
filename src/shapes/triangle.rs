use crate::{Float, Point2f, Point3f};
use crate::geometry::{Normal3, Ray};
use crate::geometry::bounds::Bounds3f;
use crate::interaction::Intersection;
use crate::primitive::{MaterialId, Primitive};
use cgmath::{EuclideanSpace, InnerSpace};

pub struct TriangleMesh {
    positions: Vec<Point3f>,

    normals: Option<Vec<Normal3>>,

    vertex_indices: Vec<u32>,

    pub material: Option<MaterialId>,
}

impl TriangleMesh {
    pub fn new(
        positions: Vec<Point3f>,
        normals: Option<Vec<Normal3>>,
        vertex_indices: Vec<u32>,
        material: Option<MaterialId>,
    ) -> Self {
        assert_eq!(vertex_indices.len() % 3, 0);
        assert!(vertex_indices.iter().all(|&i| (i as usize) < positions.len()));

        if let Some(ref normals) = normals {
            assert_eq!(normals.len(), positions.len());
        }

        Self {
            positions,
            normals,
            vertex_indices,
            material,
        }
    }

    pub fn n_triangles(&self) -> u32 {
        self.vertex_indices.len() as u32 / 3
    }

    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle<'_>> {
        (0..self.n_triangles()).map(move |i| Triangle::new(self, i))
    }
}

/// Result of the raw ray-triangle solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: Float,
    /// Barycentric weights of the three vertices.
    pub b: [Float; 3],
}

pub struct Triangle<'m> {
    mesh: &'m TriangleMesh,
    v: [u32; 3],
}

impl<'m> Triangle<'m> {
    pub fn new(mesh: &'m TriangleMesh, tri_id: u32) -> Self {
        let i = 3 * tri_id as usize;
        let idx = &mesh.vertex_indices;

        Self {
            mesh,
            v: [idx[i], idx[i + 1], idx[i + 2]],
        }
    }

    pub fn vertices(&self) -> [Point3f; 3] {
        let p = &self.mesh.positions;
        [p[self.v[0] as usize], p[self.v[1] as usize], p[self.v[2] as usize]]
    }

    pub fn centroid(&self) -> Point3f {
        let [p0, p1, p2] = self.vertices();
        Point3f::centroid(&[p0, p1, p2])
    }

    /// Möller-Trumbore ray-triangle test.
    ///
    /// Parallel rays, degenerate triangles and hits outside `[t_min, t_max]` give `None`.
    pub fn intersect_barycentric(&self, ray: &Ray) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.vertices();
        let e1 = p1 - p0;
        let e2 = p2 - p0;

        // zero area, or close enough that the solve below is meaningless
        if e1.cross(e2).magnitude2() <= 1.0e-10 * e1.magnitude2() * e2.magnitude2() {
            return None;
        }

        let dir = ray.dir();
        let pvec = dir.cross(e2);
        let det = e1.dot(pvec);
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - p0;
        let u = tvec.dot(pvec) * inv_det;
        if !(u >= 0.0 && u <= 1.0) {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = dir.dot(qvec) * inv_det;
        if !(v >= 0.0 && u + v <= 1.0) {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;
        if !ray.in_range(t) {
            return None;
        }

        Some(TriangleHit { t, b: [1.0 - u - v, u, v] })
    }

    fn shading_normal(&self, b: [Float; 3], ray: &Ray) -> Normal3 {
        let [p0, p1, p2] = self.vertices();
        let geom_n = (p1 - p0).cross(p2 - p0);

        let n = match self.mesh.normals {
            Some(ref ns) => {
                let ns = b[0] * ns[self.v[0] as usize].0
                    + b[1] * ns[self.v[1] as usize].0
                    + b[2] * ns[self.v[2] as usize].0;
                if ns.magnitude2() > 0.0 { ns } else { geom_n }
            }
            None => geom_n,
        };

        Normal3(n).normalize().faceforward(-ray.dir())
    }
}

impl<'m> Primitive for Triangle<'m> {
    fn world_bound(&self) -> Bounds3f {
        let [p0, p1, p2] = self.vertices();
        Bounds3f::with_bounds(p0, p1).join_point(p2)
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        let hit = match self.intersect_barycentric(ray) {
            Some(hit) if hit.t < isect.t => hit,
            _ => return false,
        };

        let [p0, p1, p2] = self.vertices();
        let b = hit.b;
        let p_hit = Point3f::from_vec(b[0] * p0.to_vec() + b[1] * p1.to_vec() + b[2] * p2.to_vec());

        isect.t = hit.t;
        isect.p = p_hit;
        isect.n = self.shading_normal(b, ray);
        isect.uv = Point2f::new(b[1], b[2]);
        isect.primitive = Some(self);
        isect.material = self.mesh.material;
        ray.t_max = hit.t;

        true
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.intersect_barycentric(ray).is_some()
    }

    fn material(&self) -> Option<MaterialId> {
        self.mesh.material
    }
}
