//! Rectangle primitive, mostly used for area lights and walls.

use std::sync::Arc;

use crate::medium::MediumInterface;
use crate::surface::{HitRecord, Surface};
use crate::{Material, Ray};
use umbra_math::{Aabb, Transform, Vec2, Vec3};

/// A `width × height` rectangle centered on the origin of the local XY plane,
/// facing +Z before placement.
pub struct Quad {
    half_size: Vec2,
    xform: Transform,
    material: Option<Arc<dyn Material>>,
    medium_interface: MediumInterface,
    bbox: Aabb,
}

impl Quad {
    pub fn new(size: Vec2, xform: Transform, material: Option<Arc<dyn Material>>) -> Self {
        let half_size = 0.5 * size.abs();
        let local = Aabb::from_points(half_size.extend(0.0), (-half_size).extend(0.0));
        Self {
            half_size,
            xform,
            material,
            medium_interface: MediumInterface::default(),
            bbox: xform.aabb(&local),
        }
    }

    pub fn with_medium_interface(mut self, medium_interface: MediumInterface) -> Self {
        self.medium_interface = medium_interface;
        self
    }

    /// World-space area, exact for any affine placement.
    pub fn area(&self) -> f32 {
        let u = self.xform.vector(Vec3::X * self.half_size.x);
        let v = self.xform.vector(Vec3::Y * self.half_size.y);
        4.0 * u.cross(v).length()
    }
}

impl Surface for Quad {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let local = ray.transformed(&self.xform.inverse());

        // Parallel to the plane
        if local.direction.z.abs() < 1e-8 {
            return None;
        }

        let t = -local.origin.z / local.direction.z;
        if t < ray.mint || t > ray.maxt {
            return None;
        }

        let p = local.at(t);
        if p.x.abs() > self.half_size.x || p.y.abs() > self.half_size.y {
            return None;
        }

        let gn = self.xform.normal(Vec3::Z);
        let uv = Vec2::new(p.x, p.y) / (2.0 * self.half_size) + Vec2::splat(0.5);
        Some(HitRecord {
            t,
            p: self.xform.point(Vec3::new(p.x, p.y, 0.0)),
            gn,
            sn: gn,
            uv,
            material: self.material.as_deref(),
            medium_interface: Some(&self.medium_interface),
            surface: self,
        })
    }

    fn local_bbox(&self) -> Aabb {
        Aabb::from_points(self.half_size.extend(0.0), (-self.half_size).extend(0.0))
    }

    fn world_bbox(&self) -> Aabb {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.material.as_ref().is_some_and(|m| m.is_emissive())
    }

    /// Uniform point on the rectangle; returns the unnormalized direction to it.
    fn sample(&self, origin: Vec3, u: Vec2) -> Option<Vec3> {
        let local = (2.0 * u - Vec2::ONE) * self.half_size;
        let target = self.xform.point(local.extend(0.0));
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
