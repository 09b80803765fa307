//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection. Triangles
//! are thin handles into a shared [`TriangleMesh`], so a large mesh costs one
//! copy of its vertex data no matter how many faces the BVH holds.

use std::sync::Arc;

use crate::medium::MediumInterface;
use crate::sampling::sample_uniform_triangle;
use crate::surface::{HitRecord, Surface};
use crate::{Material, Ray};
use umbra_core::Mesh;
use umbra_math::{Aabb, Vec2, Vec3};

/// Determinant threshold below which a ray counts as parallel.
const PARALLEL_EPSILON: f32 = 1e-8;

/// World-space mesh data shared by all of its triangles.
pub struct TriangleMesh {
    mesh: Mesh,
    material: Option<Arc<dyn Material>>,
    medium_interface: MediumInterface,
}

impl TriangleMesh {
    /// `mesh` must already be in world space (see [`Mesh::transformed`]).
    pub fn new(mesh: Mesh, material: Option<Arc<dyn Material>>) -> Self {
        Self {
            mesh,
            material,
            medium_interface: MediumInterface::default(),
        }
    }

    pub fn with_medium_interface(mut self, medium_interface: MediumInterface) -> Self {
        self.medium_interface = medium_interface;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Split into one surface per face.
    pub fn into_triangles(self) -> Vec<Arc<dyn Surface>> {
        let data = Arc::new(self);
        (0..data.mesh.triangle_count())
            .map(|face| Arc::new(Triangle::new(data.clone(), face)) as Arc<dyn Surface>)
            .collect()
    }
}

/// One face of a [`TriangleMesh`].
pub struct Triangle {
    data: Arc<TriangleMesh>,
    face: usize,
    bbox: Aabb,
}

impl Triangle {
    pub fn new(data: Arc<TriangleMesh>, face: usize) -> Self {
        // face_bounds pads flat axes so axis-aligned triangles still have volume
        let bbox = data.mesh.face_bounds(face);
        Self { data, face, bbox }
    }

    fn vertices(&self) -> [Vec3; 3] {
        self.data.mesh.face_positions(self.face)
    }

    pub fn area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices();
        0.5 * (v1 - v0).cross(v2 - v0).length()
    }
}

impl Surface for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let [v0, v1, v2] = self.vertices();
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if t < ray.mint || t > ray.maxt {
            return None;
        }

        let w = 1.0 - u - v;
        let gn = edge1.cross(edge2).normalize();
        let mesh = &self.data.mesh;
        let [i0, i1, i2] = mesh.face(self.face);

        let sn = match &mesh.normals {
            Some(normals) => (w * normals[i0] + u * normals[i1] + v * normals[i2])
                .try_normalize()
                .unwrap_or(gn),
            None => gn,
        };
        let uv = match &mesh.uvs {
            Some(uvs) => w * uvs[i0] + u * uvs[i1] + v * uvs[i2],
            None => Vec2::new(u, v),
        };

        Some(HitRecord {
            t,
            p: w * v0 + u * v1 + v * v2,
            gn,
            sn,
            uv,
            material: self.data.material.as_deref(),
            medium_interface: Some(&self.data.medium_interface),
            surface: self,
        })
    }

    fn world_bbox(&self) -> Aabb {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.data.material.as_ref().is_some_and(|m| m.is_emissive())
    }

    fn sample(&self, origin: Vec3, u: Vec2) -> Option<Vec3> {
        let [v0, v1, v2] = self.vertices();
        let (b0, b1) = sample_uniform_triangle(u);
        let target = b0 * v0 + b1 * v1 + (1.0 - b0 - b1) * v2;
        Some(target - origin)
    }

    fn pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        let Some(hit) = self.intersect(&Ray::new(origin, direction)) else {
            return 0.0;
        };

        let len = direction.length();
        let distance = hit.t * len;
        let cosine = (direction.dot(hit.gn) / len).abs();
        let area = self.area();
        if cosine <= 0.0 || area <= 0.0 {
            return 0.0;
        }
        distance * distance / (cosine * area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn single_triangle(mesh: Mesh) -> Arc<dyn Surface> {
        let mut triangles = TriangleMesh::new(mesh, None).into_triangles();
        assert_eq!(triangles.len(), 1);
        triangles.remove(0)
    }

    fn unit_mesh() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn test_triangle_hit() {
        let tri = single_triangle(unit_mesh());
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tri.intersect(&ray).unwrap();

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!((hit.p - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-5);
        assert!((hit.gn - Vec3::Z).length() < 1e-5);
        // Without mesh UVs the barycentrics are reported
        assert!((hit.uv - Vec2::new(0.25, 0.25)).length() < 1e-5);
    }

    #[test]
    fn test_triangle_is_double_sided() {
        let tri = single_triangle(unit_mesh());
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
        let hit = tri.intersect(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(!hit.front_face(Vec3::Z));
    }

    #[test]
    fn test_triangle_miss() {
        let tri = single_triangle(unit_mesh());
        let ray = Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&ray).is_none());

        let parallel = Ray::new(Vec3::new(0.1, 0.1, 0.0), Vec3::X);
        assert!(tri.intersect(&parallel).is_none());
    }

    #[test]
    fn test_interpolated_attributes() {
        let mesh = unit_mesh()
            .with_normals(vec![Vec3::Z, Vec3::Z, Vec3::new(0.0, 1.0, 1.0)])
            .unwrap()
            .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::Y])
            .unwrap();
        let tri = single_triangle(mesh);

        let hit = tri
            .intersect(&Ray::new(Vec3::new(0.0, 1.0, 1.0), -Vec3::Z).with_range(0.0, 2.0))
            .unwrap();
        // At vertex 2 the shading normal is its vertex normal
        assert!((hit.sn - Vec3::new(0.0, 1.0, 1.0).normalize()).length() < 1e-4);
        assert!((hit.gn - Vec3::Z).length() < 1e-5);
        assert!((hit.uv - Vec2::Y).length() < 1e-4);
    }

    #[test]
    fn test_triangle_sampling_pdf() {
        let tri = single_triangle(unit_mesh());
        let origin = Vec3::new(0.2, 0.2, 2.0);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let dir = tri.sample(origin, Vec2::new(rng.gen(), rng.gen())).unwrap();
            let d = dir.length();
            let cos = (dir.z / d).abs();
            let expected = d * d / (cos * 0.5);
            let pdf = tri.pdf(origin, dir);
            assert!((pdf - expected).abs() / expected < 1e-3);
        }
    }
}
