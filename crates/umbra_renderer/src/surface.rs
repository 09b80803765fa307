//! Surface trait, hit records, and the linear surface group.

use std::sync::Arc;

use crate::medium::MediumInterface;
use crate::{Material, Ray};
use umbra_math::{Aabb, Vec2, Vec3};

/// Record of a ray-surface intersection.
///
/// Normals are stored as the surface defines them (outward), not flipped
/// towards the ray; materials orient them with [`HitRecord::facing_normal`].
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Geometric (face) normal
    pub gn: Vec3,
    /// Shading normal, possibly interpolated
    pub sn: Vec3,
    /// Surface parameterization
    pub uv: Vec2,
    /// `None` marks a pure medium boundary
    pub material: Option<&'a dyn Material>,
    pub medium_interface: Option<&'a MediumInterface>,
    pub surface: &'a dyn Surface,
}

impl<'a> HitRecord<'a> {
    /// Whether a ray travelling along `direction` arrives from the side the
    /// geometric normal points to.
    #[inline]
    pub fn front_face(&self, direction: Vec3) -> bool {
        direction.dot(self.gn) < 0.0
    }

    /// Shading normal flipped to face against `direction`.
    #[inline]
    pub fn facing_normal(&self, direction: Vec3) -> Vec3 {
        if direction.dot(self.sn) > 0.0 {
            -self.sn
        } else {
            self.sn
        }
    }
}

/// Geometry that rays can hit and, if emissive, that lights can be sampled on.
pub trait Surface: Send + Sync {
    /// Nearest hit with `t` inside `[ray.mint, ray.maxt]`.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>>;

    /// World-space bounds.
    fn world_bbox(&self) -> Aabb;

    /// Bounds in the primitive's own placement space.
    fn local_bbox(&self) -> Aabb {
        self.world_bbox()
    }

    fn is_emissive(&self) -> bool {
        false
    }

    /// Sample a direction from `origin` towards this surface.
    ///
    /// The returned direction is not normalized.
    fn sample(&self, _origin: Vec3, _u: Vec2) -> Option<Vec3> {
        None
    }

    /// Solid-angle density with which `sample` produces `direction`.
    fn pdf(&self, _origin: Vec3, _direction: Vec3) -> f32 {
        0.0
    }
}

/// A flat list of surfaces tested one after another.
///
/// Serves as the naive accelerator and as the emitter set for light
/// sampling.
#[derive(Clone, Default)]
pub struct SurfaceGroup {
    surfaces: Vec<Arc<dyn Surface>>,
    bbox: Aabb,
}

impl SurfaceGroup {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            bbox: Aabb::EMPTY,
        }
    }

    pub fn from_surfaces(surfaces: Vec<Arc<dyn Surface>>) -> Self {
        let mut group = Self::new();
        for surface in surfaces {
            group.add(surface);
        }
        group
    }

    pub fn add(&mut self, surface: Arc<dyn Surface>) {
        self.bbox.enclose(&surface.world_bbox());
        self.surfaces.push(surface);
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn surfaces(&self) -> &[Arc<dyn Surface>] {
        &self.surfaces
    }
}

impl Surface for SurfaceGroup {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let mut ray = ray.clone();
        let mut closest = None;

        for surface in &self.surfaces {
            if let Some(hit) = surface.intersect(&ray) {
                ray.maxt = hit.t;
                closest = Some(hit);
            }
        }

        closest
    }

    fn world_bbox(&self) -> Aabb {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.surfaces.iter().any(|s| s.is_emissive())
    }

    /// Pick one member uniformly, reusing `u.x` rescaled to `[0,1)`.
    fn sample(&self, origin: Vec3, u: Vec2) -> Option<Vec3> {
        if self.surfaces.is_empty() {
            return None;
        }
        let n = self.surfaces.len();
        let scaled = u.x * n as f32;
        let index = (scaled as usize).min(n - 1);
        let remapped = Vec2::new((scaled - index as f32).min(1.0), u.y);
        self.surfaces[index].sample(origin, remapped)
    }

    /// Average of the members' densities, matching the uniform choice in `sample`.
    fn pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        if self.surfaces.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.surfaces.iter().map(|s| s.pdf(origin, direction)).sum();
        sum / self.surfaces.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiffuseLight, Lambertian, Sphere};
    use umbra_math::Transform;

    fn sphere_at(center: Vec3, radius: f32) -> Arc<dyn Surface> {
        Arc::new(Sphere::new(
            radius,
            Transform::from_translation(center),
            Some(Arc::new(Lambertian::new(Vec3::splat(0.5)))),
        ))
    }

    #[test]
    fn test_empty_group_never_hits() {
        let group = SurfaceGroup::new();
        assert!(group.intersect(&Ray::new(Vec3::ZERO, Vec3::Z)).is_none());
        assert!(group.sample(Vec3::ZERO, Vec2::splat(0.5)).is_none());
        assert_eq!(group.pdf(Vec3::ZERO, Vec3::Z), 0.0);
    }

    #[test]
    fn test_group_returns_nearest_hit() {
        let mut group = SurfaceGroup::new();
        group.add(sphere_at(Vec3::new(0.0, 0.0, -10.0), 1.0));
        group.add(sphere_at(Vec3::new(0.0, 0.0, -5.0), 1.0));
        group.add(sphere_at(Vec3::new(0.0, 0.0, -20.0), 1.0));

        let hit = group.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z)).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_group_respects_maxt() {
        let mut group = SurfaceGroup::new();
        group.add(sphere_at(Vec3::new(0.0, 0.0, -5.0), 1.0));
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z).with_range(0.001, 3.0);
        assert!(group.intersect(&ray).is_none());
    }

    #[test]
    fn test_group_pdf_averages_members() {
        let light: Arc<dyn Surface> = Arc::new(Sphere::new(
            1.0,
            Transform::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            Some(Arc::new(DiffuseLight::new(Vec3::ONE))),
        ));
        let single = SurfaceGroup::from_surfaces(vec![light.clone()]);
        let double = SurfaceGroup::from_surfaces(vec![
            light,
            sphere_at(Vec3::new(0.0, 50.0, 0.0), 1.0),
        ]);

        let p1 = single.pdf(Vec3::ZERO, -Vec3::Z);
        let p2 = double.pdf(Vec3::ZERO, -Vec3::Z);
        assert!(p1 > 0.0);
        assert!((p2 - 0.5 * p1).abs() < 1e-4);
        assert!(single.is_emissive());
    }
}
