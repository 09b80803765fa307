//! Monte Carlo radiance estimators.
//!
//! Every integrator is an explicit loop over path vertices:
//! trace → collect emission → stop at the bounce limit → sample the next
//! direction → Russian roulette. Hits on surfaces without a material are
//! pure medium boundaries: the ray switches medium and continues without
//! counting a bounce.

use std::sync::Arc;

use serde::Deserialize;
use umbra_math::{luminance, Vec3};

use crate::material::Color;
use crate::medium::Medium;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectral::Channel;
use crate::surface::{HitRecord, Surface};
use crate::Ray;

mod debug;
mod path;
mod volpath;

pub use debug::{AmbientOcclusion, Normals};
pub use path::{PathTracerMats, PathTracerMis, PathTracerMixture, PathTracerNee, PathTracerSimple};
pub use volpath::{VolpathTracerHero, VolpathTracerNee, VolpathTracerUni, DEFAULT_VOLPATH_BETA};

/// Hard limit on scattering events per path.
pub const DEFAULT_MAX_BOUNCES: u32 = 64;

/// Shadow connections stop once every channel's transmittance is below this.
pub const TRANSMITTANCE_EPSILON: f32 = 1e-4;

/// Estimates the radiance arriving along a camera ray.
pub trait Integrator: Send + Sync {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color;
}

/// Russian roulette configuration.
///
/// Survival probability is `max(min_survival, luminance(throughput))`,
/// capped at one; survivors are reweighted by its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RussianRoulette {
    pub enabled: bool,
    pub min_survival: f32,
}

impl Default for RussianRoulette {
    fn default() -> Self {
        Self {
            enabled: true,
            min_survival: 0.05,
        }
    }
}

impl RussianRoulette {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Survival probability for a path carrying `throughput`.
    pub fn survival_probability(&self, throughput: Color) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        let lum = luminance(throughput);
        if !lum.is_finite() {
            return 1.0;
        }
        lum.max(self.min_survival).min(1.0)
    }

    /// Roll for survival. Returns the probability the path survived with,
    /// or `None` if it was terminated.
    pub fn survive(&self, throughput: Color, sampler: &mut dyn Sampler) -> Option<f32> {
        let q = self.survival_probability(throughput);
        if q >= 1.0 {
            return Some(1.0);
        }
        if sampler.next_1d() < q {
            Some(q)
        } else {
            None
        }
    }
}

/// Power heuristic weight of strategy `a` against `b` with exponent `beta`.
pub fn power_heuristic(beta: f32, a: f32, b: f32) -> f32 {
    if a.is_infinite() {
        return 1.0;
    }
    let a = a.powf(beta);
    let b = b.powf(beta);
    if a + b <= 0.0 {
        0.0
    } else {
        a / (a + b)
    }
}

/// Medium on the far side of `hit` for a ray leaving along `direction`.
pub(crate) fn next_medium(ray: &Ray, hit: &HitRecord, direction: Vec3) -> Option<Arc<dyn Medium>> {
    match hit.medium_interface {
        Some(interface) if interface.is_transition() => interface.medium_for(direction, hit.gn),
        _ => ray.medium.clone(),
    }
}

/// Continue `ray` straight through a materialless boundary.
pub(crate) fn pass_through(ray: &Ray, hit: &HitRecord) -> Ray {
    Ray::new(hit.p, ray.direction).with_medium(next_medium(ray, hit, ray.direction))
}

/// Ray leaving `hit` along `direction`, in the medium on that side.
pub(crate) fn spawn(ray: &Ray, hit: &HitRecord, direction: Vec3) -> Ray {
    Ray::new(hit.p, direction).with_medium(next_medium(ray, hit, direction))
}

/// Emission seen along `ray`, ignoring media but passing through
/// materialless boundaries. Used for shadow connections by the surface-only
/// path tracers.
pub(crate) fn emitted_along(scene: &Scene, ray: &Ray) -> Color {
    let mut ray = ray.clone();
    loop {
        let Some(hit) = scene.intersect(&ray) else {
            return Color::ZERO;
        };
        match hit.material {
            Some(material) => return material.emitted(&ray, &hit),
            None => ray = pass_through(&ray, &hit),
        }
    }
}

/// Transmittance-weighted emission reaching the origin of `ray`.
///
/// Walks through media and materialless boundaries accumulating per-channel
/// transmittance. An emitter ends the walk with its emission, any other
/// surface occludes, and escaping contributes nothing.
pub fn transmittance_to_light(scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
    let mut ray = ray.clone();
    let mut tr = Color::ONE;

    loop {
        let hit = scene.intersect(&ray);

        if let Some(medium) = ray.medium.clone() {
            let maxt = hit.as_ref().map_or(ray.maxt, |h| h.t);
            let segment = ray.clone().with_range(ray.mint, maxt);
            for channel in Channel::ALL {
                let i = channel.index();
                if tr[i] > 0.0 {
                    tr[i] *= medium.transmittance(&segment, sampler, channel);
                }
            }
            if tr.max_element() < TRANSMITTANCE_EPSILON {
                return Color::ZERO;
            }
        }

        let Some(hit) = hit else {
            return Color::ZERO;
        };

        match hit.material {
            None => ray = pass_through(&ray, &hit),
            Some(material) if material.is_emissive() => return tr * material.emitted(&ray, &hit),
            Some(_) => return Color::ZERO,
        }
    }
}

/// Light sample taken from a shading point.
pub(crate) struct LightSample {
    /// Unit direction towards the light
    pub direction: Vec3,
    /// Solid-angle density of the emitter group
    pub pdf: f32,
}

/// Sample a direction towards the scene's emitters.
pub(crate) fn sample_light(scene: &Scene, p: Vec3, sampler: &mut dyn Sampler) -> Option<LightSample> {
    let u = sampler.next_2d();
    let emitters = scene.emitters();
    if emitters.is_empty() {
        return None;
    }
    let direction = emitters.sample(p, u)?.try_normalize()?;
    let pdf = emitters.pdf(p, direction);
    if pdf > 0.0 && pdf.is_finite() {
        Some(LightSample { direction, pdf })
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small scenes with known radiance for estimator tests.

    use std::f32::consts::FRAC_PI_2;
    use std::sync::Arc;

    use super::Integrator;
    use crate::material::Color;
    use crate::sampler::{IndependentSampler, Sampler};
    use crate::scene::{Scene, SceneBuilder};
    use crate::{Camera, DiffuseLight, Lambertian, Quad, Ray};
    use umbra_math::{Transform, Vec2, Vec3};

    /// Quad facing +Y centered at height `y`.
    pub fn up_facing(y: f32) -> Transform {
        Transform::from_translation(Vec3::new(0.0, y, 0.0)) * Transform::from_axis_angle(Vec3::X, -FRAC_PI_2)
    }

    /// Quad facing -Y centered at height `y`.
    pub fn down_facing(y: f32) -> Transform {
        Transform::from_translation(Vec3::new(0.0, y, 0.0)) * Transform::from_axis_angle(Vec3::X, FRAC_PI_2)
    }

    fn builder(background: Color) -> SceneBuilder {
        let mut builder = SceneBuilder::new();
        builder
            .set_camera(Camera::new().with_resolution(4, 4))
            .set_background(background);
        builder
    }

    /// Huge grey floor at `y = 0` under a uniform sky.
    pub fn ground_scene(albedo: f32, background: Color) -> Scene {
        let mut builder = builder(background);
        let floor = builder.add_material("floor", Arc::new(Lambertian::new(Color::splat(albedo))));
        builder.add_surface(Arc::new(Quad::new(Vec2::splat(1.0e4), up_facing(0.0), Some(floor))));
        builder.build().expect("scene has a camera")
    }

    /// Floor of albedo 0.5 under a 0.5×0.5 light of radiance 10 at height 2,
    /// black background, and a ray aimed at the floor below the light.
    pub fn lit_box_scene() -> (Scene, Ray) {
        let mut builder = builder(Color::ZERO);
        let floor = builder.add_material("floor", Arc::new(Lambertian::new(Color::splat(0.5))));
        let light = builder.add_material("light", Arc::new(DiffuseLight::new(Color::splat(10.0))));
        builder.add_surface(Arc::new(Quad::new(Vec2::splat(20.0), up_facing(0.0), Some(floor))));
        builder.add_surface(Arc::new(Quad::new(Vec2::splat(0.5), down_facing(2.0), Some(light))));
        let scene = builder.build().expect("scene has a camera");
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.5), Vec3::new(0.0, -1.0, -0.5).normalize());
        (scene, ray)
    }

    /// Mean of `n` radiance estimates along `ray`.
    pub fn estimate(integrator: &dyn Integrator, scene: &Scene, ray: &Ray, n: usize, seed: u64) -> Color {
        let mut sampler = IndependentSampler::new(n, seed);
        sampler.start_pixel(0, 0);
        let mut sum = Color::ZERO;
        while sampler.start_next_pixel_sample() {
            sum += integrator.li(scene, &mut sampler, ray);
        }
        sum / n as f32
    }
}
