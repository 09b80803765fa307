//! Diagnostic integrators.

use super::{pass_through, spawn, Integrator};
use crate::material::Color;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::Ray;

/// Shading normals as colors.
#[derive(Debug, Default, Clone, Copy)]
pub struct Normals;

impl Integrator for Normals {
    fn li(&self, scene: &Scene, _sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        match scene.intersect(ray) {
            Some(hit) => hit.sn.abs(),
            None => Color::ZERO,
        }
    }
}

/// One material-sampled occlusion ray per camera sample.
///
/// Unoccluded directions return the sample's attenuation, so a white
/// Lambertian scene shows plain ambient occlusion.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmbientOcclusion;

impl Integrator for AmbientOcclusion {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        loop {
            let Some(hit) = scene.intersect(&ray) else {
                return scene.background();
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            let dir_in = ray.direction.normalize();
            let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                return Color::ZERO;
            };
            let occlusion = spawn(&ray, &hit, rec.direction);
            return match scene.intersect(&occlusion) {
                Some(_) => Color::ZERO,
                None => rec.attenuation,
            };
        }
    }
}
