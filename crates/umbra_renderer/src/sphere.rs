//! Sphere primitive for ray tracing.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::medium::MediumInterface;
use crate::sampling::{
    sample_uniform_cone, sample_uniform_sphere, uniform_cone_pdf, uniform_sphere_pdf,
};
use crate::surface::{HitRecord, Surface};
use crate::{Material, Ray};
use umbra_math::{Aabb, DVec3, Frame, Transform, Vec2, Vec3};

/// A sphere of `radius` centered at the origin of its placement transform.
pub struct Sphere {
    radius: f32,
    xform: Transform,
    material: Option<Arc<dyn Material>>,
    medium_interface: MediumInterface,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(radius: f32, xform: Transform, material: Option<Arc<dyn Material>>) -> Self {
        let radius = radius.max(0.0);
        let local = Aabb::from_points(Vec3::splat(-radius), Vec3::splat(radius));
        Self {
            radius,
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

    pub fn center(&self) -> Vec3 {
        self.xform.point(Vec3::ZERO)
    }

    /// Radius after placement. Emitter sampling assumes a uniform scale.
    fn world_radius(&self) -> f32 {
        self.xform.vector(Vec3::X * self.radius).length()
    }

    /// Spherical UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Surface for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let inv = self.xform.inverse();
        let o = inv.point(ray.origin).as_dvec3();
        let d = inv.vector(ray.direction).as_dvec3();
        let r = self.radius as f64;

        // |o + t d|² = r², solved with the half-b form
        let a = d.length_squared();
        let half_b = o.dot(d);
        let c = o.length_squared() - r * r;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        let (mint, maxt) = (ray.mint as f64, ray.maxt as f64);
        let mut root = (-half_b - sqrtd) / a;
        if root < mint || root > maxt {
            root = (-half_b + sqrtd) / a;
            if root < mint || root > maxt {
                return None;
            }
        }

        // Reproject onto the surface to remove drift
        let mut local_p: DVec3 = o + root * d;
        local_p *= r / local_p.length();
        let local_p = local_p.as_vec3();
        let local_n = local_p / self.radius;

        let gn = self.xform.normal(local_n);
        Some(HitRecord {
            t: root as f32,
            p: self.xform.point(local_p),
            gn,
            sn: gn,
            uv: Self::sphere_uv(local_n),
            material: self.material.as_deref(),
            medium_interface: Some(&self.medium_interface),
            surface: self,
        })
    }

    fn local_bbox(&self) -> Aabb {
        Aabb::from_points(Vec3::splat(-self.radius), Vec3::splat(self.radius))
    }

    fn world_bbox(&self) -> Aabb {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.material.as_ref().is_some_and(|m| m.is_emissive())
    }

    /// Uniform over the cone of directions subtended by the sphere.
    fn sample(&self, origin: Vec3, u: Vec2) -> Option<Vec3> {
        let to_center = self.center() - origin;
        let dist2 = to_center.length_squared();
        let r = self.world_radius();

        if dist2 <= r * r {
            // Inside: every direction reaches the surface
            return Some(sample_uniform_sphere(u));
        }

        let sin2_max = r * r / dist2;
        let cos_max = (1.0 - sin2_max).max(0.0).sqrt();
        let local = sample_uniform_cone(u, cos_max);
        Some(Frame::from_z(to_center).to_world(local))
    }

    fn pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        if self.intersect(&Ray::new(origin, direction)).is_none() {
            return 0.0;
        }

        let dist2 = (self.center() - origin).length_squared();
        let r = self.world_radius();
        if dist2 <= r * r {
            return uniform_sphere_pdf();
        }

        let sin2_max = r * r / dist2;
        let cos_max = (1.0 - sin2_max).max(0.0).sqrt();
        // 1 - cosθmax without cancellation
        uniform_cone_pdf(sin2_max / (1.0 + cos_max))
    }
}
