//! Volumetric path tracers.
//!
//! Free-flight distances are sampled with a hero channel picked once per
//! path. [`VolpathTracerNee`] and [`VolpathTracerUni`] carry the
//! [`SpectralWeights`] of all three possible heroes and reduce every
//! contribution with one-sample MIS; [`VolpathTracerHero`] tracks only the
//! hero and reconciles the channels when the path ends.

use std::sync::Arc;

use super::{
    pass_through, power_heuristic, sample_light, spawn, transmittance_to_light, Integrator, RussianRoulette,
    DEFAULT_MAX_BOUNCES,
};
use crate::material::Color;
use crate::medium::Medium;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectral::{ratio, Channel, SpectralWeights};
use crate::surface::Surface;
use crate::Ray;
use umbra_math::Vec3;

/// Scattering point inside a medium, detached from the medium borrow.
struct MediumEvent {
    p: Vec3,
    wo: Vec3,
    medium: Arc<dyn Medium>,
}

/// Sample the ray's medium up to the next surface (or `maxt` on a miss).
fn sample_medium(
    ray: &Ray,
    maxt: f32,
    sampler: &mut dyn Sampler,
    channel: Channel,
) -> (Option<MediumEvent>, SpectralWeights) {
    let Some(medium) = ray.medium.clone() else {
        return (None, SpectralWeights::ONE);
    };
    let segment = ray.clone().with_range(ray.mint, maxt);
    let (interaction, weights) = medium.sample(&segment, sampler, channel);
    let event = interaction.map(|mi| (mi.p, mi.wo));
    (
        event.map(|(p, wo)| MediumEvent { p, wo, medium }),
        weights,
    )
}

/// Ray leaving a medium scattering point.
fn medium_ray(event: &MediumEvent, direction: Vec3) -> Ray {
    Ray::new(event.p, direction)
        .with_range(0.0, f32::INFINITY)
        .with_medium(Some(event.medium.clone()))
}

/// Hero channel for a new path.
fn pick_channel(sampler: &mut dyn Sampler) -> Channel {
    Channel::from_sample(sampler.next_1d())
}

/// Default MIS exponent for [`VolpathTracerNee`].
///
/// The power heuristic (β = 2), not the balance heuristic (β = 1) that
/// [`PathTracerMis`](super::PathTracerMis) defaults to.
pub const DEFAULT_VOLPATH_BETA: f32 = 2.0;

/// Surfaces and media with next-event estimation and MIS.
#[derive(Debug, Clone, Copy)]
pub struct VolpathTracerNee {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
    /// Power heuristic exponent, [`DEFAULT_VOLPATH_BETA`] unless configured
    pub beta: f32,
}

impl VolpathTracerNee {
    pub fn new(max_bounces: u32, roulette: RussianRoulette, beta: f32) -> Self {
        Self {
            max_bounces,
            roulette,
            beta,
        }
    }
}

impl Default for VolpathTracerNee {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default(), DEFAULT_VOLPATH_BETA)
    }
}

impl Integrator for VolpathTracerNee {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let channel = pick_channel(sampler);
        let mut ray = ray.clone();
        let mut weights = SpectralWeights::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        let mut prev_point = ray.origin;
        let mut prev_pdf = 0.0;
        let mut prev_specular = true;

        loop {
            let hit = scene.intersect(&ray);
            let maxt = hit.as_ref().map_or(ray.maxt, |h| h.t);
            let (event, w) = sample_medium(&ray, maxt, sampler, channel);
            weights *= w;
            if weights.throughput() == Color::ZERO {
                break;
            }

            if let Some(event) = event {
                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;

                let phase = event.medium.phase();
                if let Some(light) = sample_light(scene, event.p, sampler) {
                    let ph = phase.p(event.wo, light.direction);
                    if ph > 0.0 {
                        let le = transmittance_to_light(scene, sampler, &medium_ray(&event, light.direction));
                        if le != Color::ZERO {
                            let mis = power_heuristic(self.beta, light.pdf, ph);
                            radiance += weights.reduce(le * (ph * mis / light.pdf));
                        }
                    }
                }

                // Phase sampling is exact, so the throughput is unchanged
                let (wi, pdf) = phase.sample(event.wo, sampler.next_2d());
                prev_point = event.p;
                prev_pdf = pdf;
                prev_specular = false;
                ray = medium_ray(&event, wi);
            } else {
                let Some(hit) = hit else {
                    radiance += weights.reduce(scene.background());
                    break;
                };
                let Some(material) = hit.material else {
                    ray = pass_through(&ray, &hit);
                    continue;
                };

                let emitted = material.emitted(&ray, &hit);
                if emitted != Color::ZERO {
                    let mis = if prev_specular {
                        1.0
                    } else {
                        let light_pdf = scene.emitters().pdf(prev_point, ray.direction.normalize());
                        power_heuristic(self.beta, prev_pdf, light_pdf)
                    };
                    radiance += weights.reduce(emitted * mis);
                }

                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;

                let dir_in = ray.direction.normalize();
                if let Some(light) = sample_light(scene, hit.p, sampler) {
                    let f = material.eval(dir_in, light.direction, &hit);
                    if f != Color::ZERO {
                        let le = transmittance_to_light(scene, sampler, &spawn(&ray, &hit, light.direction));
                        if le != Color::ZERO {
                            let bsdf_pdf = material.pdf(dir_in, light.direction, &hit);
                            let mis = power_heuristic(self.beta, light.pdf, bsdf_pdf);
                            radiance += weights.reduce(f * le * (mis / light.pdf));
                        }
                    }
                }

                let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                    break;
                };
                let throughput = if rec.is_specular {
                    prev_pdf = 0.0;
                    rec.attenuation
                } else {
                    let pdf = material.pdf(dir_in, rec.direction, &hit);
                    if !(pdf > 0.0 && pdf.is_finite()) {
                        break;
                    }
                    prev_pdf = pdf;
                    material.eval(dir_in, rec.direction, &hit) / pdf
                };
                weights.apply_throughput(throughput);
                prev_point = hit.p;
                prev_specular = rec.is_specular;
                ray = spawn(&ray, &hit, rec.direction);
            }

            match self.roulette.survive(weights.throughput(), sampler) {
                Some(q) => weights *= q,
                None => break,
            }
        }

        radiance
    }
}

/// Surfaces and media with BSDF and phase sampling only.
#[derive(Debug, Clone, Copy)]
pub struct VolpathTracerUni {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl VolpathTracerUni {
    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for VolpathTracerUni {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for VolpathTracerUni {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let channel = pick_channel(sampler);
        let mut ray = ray.clone();
        let mut weights = SpectralWeights::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        loop {
            let hit = scene.intersect(&ray);
            let maxt = hit.as_ref().map_or(ray.maxt, |h| h.t);
            let (event, w) = sample_medium(&ray, maxt, sampler, channel);
            weights *= w;
            if weights.throughput() == Color::ZERO {
                break;
            }

            if let Some(event) = event {
                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;
                let (wi, _) = event.medium.phase().sample(event.wo, sampler.next_2d());
                ray = medium_ray(&event, wi);
            } else {
                let Some(hit) = hit else {
                    radiance += weights.reduce(scene.background());
                    break;
                };
                let Some(material) = hit.material else {
                    ray = pass_through(&ray, &hit);
                    continue;
                };

                radiance += weights.reduce(material.emitted(&ray, &hit));

                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;

                let dir_in = ray.direction.normalize();
                let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                    break;
                };
                let throughput = if rec.is_specular {
                    rec.attenuation
                } else {
                    let pdf = material.pdf(dir_in, rec.direction, &hit);
                    if !(pdf > 0.0 && pdf.is_finite()) {
                        break;
                    }
                    material.eval(dir_in, rec.direction, &hit) / pdf
                };
                weights.apply_throughput(throughput);
                ray = spawn(&ray, &hit, rec.direction);
            }

            match self.roulette.survive(weights.throughput(), sampler) {
                Some(q) => weights *= q,
                None => break,
            }
        }

        radiance
    }
}

/// Single-channel volumetric tracer.
///
/// The path carries a scalar throughput for its hero channel only. Medium
/// weights contribute their diagonal `f_c / p_c`; the estimate is returned
/// in the hero channel scaled by three, zero elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct VolpathTracerHero {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl VolpathTracerHero {
    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for VolpathTracerHero {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for VolpathTracerHero {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let channel = pick_channel(sampler);
        let c = channel.index();
        let mut ray = ray.clone();
        let mut throughput = 1.0f32;
        let mut radiance = 0.0f32;
        let mut bounces = 0;

        loop {
            let hit = scene.intersect(&ray);
            let maxt = hit.as_ref().map_or(ray.maxt, |h| h.t);
            let (event, w) = sample_medium(&ray, maxt, sampler, channel);
            throughput *= ratio(1.0, w.get(c, c));
            if !throughput.is_finite() || throughput == 0.0 {
                break;
            }

            if let Some(event) = event {
                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;
                let (wi, _) = event.medium.phase().sample(event.wo, sampler.next_2d());
                ray = medium_ray(&event, wi);
            } else {
                let Some(hit) = hit else {
                    radiance += throughput * channel.of(scene.background());
                    break;
                };
                let Some(material) = hit.material else {
                    ray = pass_through(&ray, &hit);
                    continue;
                };

                radiance += throughput * channel.of(material.emitted(&ray, &hit));

                if bounces >= self.max_bounces {
                    break;
                }
                bounces += 1;

                let dir_in = ray.direction.normalize();
                let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                    break;
                };
                let factor = if rec.is_specular {
                    rec.attenuation
                } else {
                    let pdf = material.pdf(dir_in, rec.direction, &hit);
                    if !(pdf > 0.0 && pdf.is_finite()) {
                        break;
                    }
                    material.eval(dir_in, rec.direction, &hit) / pdf
                };
                throughput *= channel.of(factor);
                ray = spawn(&ray, &hit, rec.direction);
            }

            match self.roulette.survive(Color::splat(throughput), sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        channel.isolate(3.0 * radiance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::testing::{down_facing, estimate, ground_scene, lit_box_scene};
    use crate::integrator::{PathTracerMats, PathTracerMis};
    use crate::medium::{HomogeneousMedium, MediumInterface, NoiseMedium};
    use crate::phase::HenyeyGreenstein;
    use crate::scene::SceneBuilder;
    use crate::{Camera, DiffuseLight, Quad, Sphere};
    use umbra_math::{Transform, Vec2};

    fn fog(sigma_a: Color, sigma_s: Color) -> Arc<dyn Medium> {
        Arc::new(HomogeneousMedium::new(
            sigma_a,
            sigma_s,
            Arc::new(HenyeyGreenstein::isotropic()),
        ))
    }

    /// Heterogeneous fog whose density differs per channel in both
    /// magnitude and spatial frequency.
    fn chromatic_noise(sigma_a: Color) -> Arc<dyn Medium> {
        Arc::new(
            NoiseMedium::new(
                sigma_a,
                Color::new(0.3, 0.8, 1.4),
                0.8,
                0.4,
                Color::new(1.5, 2.5, 4.0),
                11,
                Arc::new(HenyeyGreenstein::new(0.3)),
            )
            .unwrap(),
        )
    }

    fn fog_ball_builder(medium: Arc<dyn Medium>, background: Color) -> SceneBuilder {
        let mut builder = SceneBuilder::new();
        builder
            .set_camera(Camera::new().with_resolution(4, 4))
            .set_background(background);
        builder.add_surface(Arc::new(
            Sphere::new(1.0, Transform::IDENTITY, None)
                .with_medium_interface(MediumInterface::new(Some(medium), None)),
        ));
        builder
    }

    /// Materialless unit sphere at the origin filled with `medium`, under a
    /// uniform white sky.
    fn fog_ball(medium: Arc<dyn Medium>) -> Scene {
        fog_ball_builder(medium, Color::ONE).build().expect("scene has a camera")
    }

    fn through_center() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z)
    }

    #[test]
    fn test_vacuum_matches_surface_tracer() {
        let scene = ground_scene(0.5, Color::ONE);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.2, -1.0, 0.0).normalize());
        let expected = Color::splat(0.5);
        let integrators: [(&str, Box<dyn Integrator>); 3] = [
            ("nee", Box::new(VolpathTracerNee::default())),
            ("uni", Box::new(VolpathTracerUni::default())),
            ("hero", Box::new(VolpathTracerHero::default())),
        ];
        for (name, integrator) in integrators {
            let l = estimate(integrator.as_ref(), &scene, &ray, 30_000, 17);
            assert!((l - expected).abs().max_element() < 0.05, "{}: {:?}", name, l);
        }
    }

    #[test]
    fn test_absorbing_ball_transmits_beer_lambert() {
        // Pure absorption: the only light is the sky seen through 2 units of fog
        let sigma_a = Color::new(0.2, 0.5, 1.0);
        let scene = fog_ball(fog(sigma_a, Color::ZERO));
        let expected = (-2.0 * sigma_a).exp();
        let integrators: [(&str, Box<dyn Integrator>); 3] = [
            ("nee", Box::new(VolpathTracerNee::default())),
            ("uni", Box::new(VolpathTracerUni::default())),
            ("hero", Box::new(VolpathTracerHero::default())),
        ];
        for (name, integrator) in integrators {
            let l = estimate(integrator.as_ref(), &scene, &through_center(), 30_000, 23);
            assert!((l - expected).abs().max_element() < 0.03, "{}: {:?} vs {:?}", name, l, expected);
        }
    }

    #[test]
    fn test_conservative_fog_under_white_sky_is_white() {
        // No absorption and a uniform sky: every path ends in the sky with
        // unit throughput, whatever the scattering does.
        let sigma_s = Color::new(0.5, 1.0, 2.0);
        let scene = fog_ball(fog(Color::ZERO, sigma_s));
        let integrators: [(&str, Box<dyn Integrator>); 2] = [
            ("uni", Box::new(VolpathTracerUni::new(DEFAULT_MAX_BOUNCES, RussianRoulette::disabled()))),
            ("hero", Box::new(VolpathTracerHero::new(DEFAULT_MAX_BOUNCES, RussianRoulette::disabled()))),
        ];
        for (name, integrator) in integrators {
            let l = estimate(integrator.as_ref(), &scene, &through_center(), 20_000, 29);
            assert!((l - Color::ONE).abs().max_element() < 0.05, "{}: {:?}", name, l);
        }
    }

    #[test]
    fn test_nee_and_unidirectional_agree_in_grey_fog() {
        let scene = fog_ball(fog(Color::splat(0.3), Color::splat(0.7)));
        let ray = through_center();
        let nee = estimate(&VolpathTracerNee::default(), &scene, &ray, 20_000, 31);
        let uni = estimate(&VolpathTracerUni::default(), &scene, &ray, 20_000, 37);
        assert!((nee - uni).abs().max_element() < 0.04, "{:?} vs {:?}", nee, uni);
        assert!(nee.min_element() > 0.0 && nee.max_element() < 1.0);
    }

    #[test]
    fn test_conservative_chromatic_noise_under_white_sky_is_white() {
        // Cross-channel weights of a non-absorbing medium reduce to exactly
        // one per channel, however differently the channels are tracked.
        let scene = fog_ball(chromatic_noise(Color::ZERO));
        let integrators: [(&str, Box<dyn Integrator>); 3] = [
            (
                "nee",
                Box::new(VolpathTracerNee::new(DEFAULT_MAX_BOUNCES, RussianRoulette::disabled(), 2.0)),
            ),
            ("uni", Box::new(VolpathTracerUni::new(DEFAULT_MAX_BOUNCES, RussianRoulette::disabled()))),
            ("hero", Box::new(VolpathTracerHero::new(DEFAULT_MAX_BOUNCES, RussianRoulette::disabled()))),
        ];
        for (name, integrator) in integrators {
            let l = estimate(integrator.as_ref(), &scene, &through_center(), 20_000, 53);
            assert!((l - Color::ONE).abs().max_element() < 0.05, "{}: {:?}", name, l);
        }
    }

    #[test]
    fn test_nee_and_unidirectional_agree_in_chromatic_noise() {
        // Black sky, wide light above the ball: only in-scattered light
        // reaches a ray that passes straight through the center.
        let mut builder = fog_ball_builder(chromatic_noise(Color::new(0.05, 0.2, 0.4)), Color::ZERO);
        let light = builder.add_material("light", Arc::new(DiffuseLight::new(Color::splat(2.0))));
        builder.add_surface(Arc::new(Quad::new(Vec2::splat(4.0), down_facing(1.5), Some(light))));
        let scene = builder.build().expect("scene has a camera");

        let ray = through_center();
        let nee = estimate(&VolpathTracerNee::default(), &scene, &ray, 40_000, 59);
        let uni = estimate(&VolpathTracerUni::default(), &scene, &ray, 60_000, 61);
        assert!(nee.min_element() > 0.01, "{:?}", nee);
        assert!(
            (nee - uni).abs().max_element() < 0.08 * nee.max_element() + 0.01,
            "{:?} vs {:?}",
            nee,
            uni
        );
    }

    #[test]
    fn test_surface_lighting_matches_path_tracer() {
        let (scene, ray) = lit_box_scene();
        let n = 20_000;
        let reference = estimate(&PathTracerMis::new(1, RussianRoulette::disabled(), 2.0), &scene, &ray, n, 41);
        let nee = estimate(&VolpathTracerNee::new(1, RussianRoulette::disabled(), 2.0), &scene, &ray, n, 43);
        let mats = estimate(&PathTracerMats::new(1, RussianRoulette::disabled()), &scene, &ray, 4 * n, 47);
        assert!((nee - reference).abs().max_element() < 0.05 * reference.x + 0.002);
        assert!((mats - reference).abs().max_element() < 0.15 * reference.x + 0.005);
    }
}
