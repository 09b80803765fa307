//! Surface-only path tracers.
//!
//! These ignore participating media entirely: rays still switch media at
//! boundaries, but nothing is attenuated or scattered along the way.

use super::{
    emitted_along, pass_through, power_heuristic, sample_light, spawn, Integrator, RussianRoulette,
    DEFAULT_MAX_BOUNCES,
};
use crate::material::{Color, Material, ScatterRecord};
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::surface::{HitRecord, Surface};
use crate::Ray;
use umbra_math::Vec3;

/// Throughput factor of a BSDF sample, or `None` if the sample has no density.
fn bsdf_weight(material: &dyn Material, dir_in: Vec3, rec: &ScatterRecord, hit: &HitRecord) -> Option<(Color, f32)> {
    if rec.is_specular {
        return Some((rec.attenuation, 0.0));
    }
    let pdf = material.pdf(dir_in, rec.direction, hit);
    if !(pdf > 0.0 && pdf.is_finite()) {
        return None;
    }
    Some((material.eval(dir_in, rec.direction, hit) / pdf, pdf))
}

/// Radiance from explicitly sampling the emitters at a surface vertex,
/// weighted by the power heuristic against BSDF sampling when `beta` is set.
fn direct_light(
    scene: &Scene,
    sampler: &mut dyn Sampler,
    ray: &Ray,
    hit: &HitRecord,
    material: &dyn Material,
    beta: Option<f32>,
) -> Color {
    let Some(light) = sample_light(scene, hit.p, sampler) else {
        return Color::ZERO;
    };
    let dir_in = ray.direction.normalize();
    let f = material.eval(dir_in, light.direction, hit);
    if f == Color::ZERO {
        return Color::ZERO;
    }
    let le = emitted_along(scene, &spawn(ray, hit, light.direction));
    if le == Color::ZERO {
        return Color::ZERO;
    }
    let weight = match beta {
        Some(beta) => power_heuristic(beta, light.pdf, material.pdf(dir_in, light.direction, hit)),
        None => 1.0,
    };
    f * le * weight / light.pdf
}

/// Plain scatter-and-continue tracer built on [`Material::scatter`]; emitters are only found by chance.
#[derive(Debug, Clone, Copy)]
pub struct PathTracerSimple {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl PathTracerSimple {
    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for PathTracerSimple {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for PathTracerSimple {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        let mut throughput = Color::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            radiance += throughput * material.emitted(&ray, &hit);

            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;

            let Some((attenuation, scattered)) = material.scatter(&ray, &hit, sampler.next_2d()) else {
                break;
            };
            throughput *= attenuation;
            ray = spawn(&ray, &hit, scattered.direction);

            match self.roulette.survive(throughput, sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        radiance
    }
}

/// BSDF sampling with `eval / pdf` weights.
#[derive(Debug, Clone, Copy)]
pub struct PathTracerMats {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl PathTracerMats {
    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for PathTracerMats {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for PathTracerMats {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        let mut throughput = Color::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            radiance += throughput * material.emitted(&ray, &hit);

            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;

            let dir_in = ray.direction.normalize();
            let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                break;
            };
            let Some((weight, _)) = bsdf_weight(material, dir_in, &rec, &hit) else {
                break;
            };
            throughput *= weight;
            ray = spawn(&ray, &hit, rec.direction);

            match self.roulette.survive(throughput, sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        radiance
    }
}

/// Next-event estimation: one light sample per bounce, and emission found by
/// BSDF sampling counts only after specular bounces.
#[derive(Debug, Clone, Copy)]
pub struct PathTracerNee {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl PathTracerNee {
    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for PathTracerNee {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for PathTracerNee {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        let mut throughput = Color::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;
        // Camera rays count as specular: nothing was light sampled yet
        let mut specular_bounce = true;

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            if specular_bounce {
                radiance += throughput * material.emitted(&ray, &hit);
            }

            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;

            // Specular lobes evaluate to zero, so they never take light samples
            radiance += throughput * direct_light(scene, sampler, &ray, &hit, material, None);

            let dir_in = ray.direction.normalize();
            let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                break;
            };
            let Some((weight, _)) = bsdf_weight(material, dir_in, &rec, &hit) else {
                break;
            };
            specular_bounce = rec.is_specular;
            throughput *= weight;
            ray = spawn(&ray, &hit, rec.direction);

            match self.roulette.survive(throughput, sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        radiance
    }
}

/// Light and BSDF sampling combined with the power heuristic.
#[derive(Debug, Clone, Copy)]
pub struct PathTracerMis {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
    /// Heuristic exponent; 1 is the balance heuristic
    pub beta: f32,
}

impl PathTracerMis {
    pub fn new(max_bounces: u32, roulette: RussianRoulette, beta: f32) -> Self {
        Self {
            max_bounces,
            roulette,
            beta,
        }
    }
}

impl Default for PathTracerMis {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default(), 1.0)
    }
}

impl Integrator for PathTracerMis {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        let mut throughput = Color::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        let mut prev_point = ray.origin;
        let mut prev_pdf = 0.0;
        let mut prev_specular = true;

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            let emitted = material.emitted(&ray, &hit);
            if emitted != Color::ZERO {
                let weight = if prev_specular {
                    1.0
                } else {
                    let light_pdf = scene.emitters().pdf(prev_point, ray.direction.normalize());
                    power_heuristic(self.beta, prev_pdf, light_pdf)
                };
                radiance += throughput * emitted * weight;
            }

            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;

            radiance += throughput * direct_light(scene, sampler, &ray, &hit, material, Some(self.beta));

            let dir_in = ray.direction.normalize();
            let Some(rec) = material.sample(dir_in, &hit, sampler.next_2d()) else {
                break;
            };
            let Some((weight, pdf)) = bsdf_weight(material, dir_in, &rec, &hit) else {
                break;
            };
            prev_point = hit.p;
            prev_pdf = pdf;
            prev_specular = rec.is_specular;
            throughput *= weight;
            ray = spawn(&ray, &hit, rec.direction);

            match self.roulette.survive(throughput, sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        radiance
    }
}

/// One-sample mixture of light and BSDF sampling.
///
/// Each bounce picks the light strategy with probability one half (never
/// when the scene has no emitters) and weights the direction by the mixture
/// density `eval / (0.5·(bsdf_pdf + light_pdf))`. Specular lobes can only
/// come from the BSDF strategy and are divided by its selection probability.
/// When the light strategy is picked but yields nothing usable the path ends;
/// the BSDF half of the mixture is not retried for that bounce.
#[derive(Debug, Clone, Copy)]
pub struct PathTracerMixture {
    pub max_bounces: u32,
    pub roulette: RussianRoulette,
}

impl PathTracerMixture {
    const LIGHT_PROBABILITY: f32 = 0.5;

    pub fn new(max_bounces: u32, roulette: RussianRoulette) -> Self {
        Self { max_bounces, roulette }
    }
}

impl Default for PathTracerMixture {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUNCES, RussianRoulette::default())
    }
}

impl Integrator for PathTracerMixture {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut ray = ray.clone();
        let mut throughput = Color::ONE;
        let mut radiance = Color::ZERO;
        let mut bounces = 0;

        let light_probability = if scene.emitters().is_empty() {
            0.0
        } else {
            Self::LIGHT_PROBABILITY
        };

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                ray = pass_through(&ray, &hit);
                continue;
            };

            radiance += throughput * material.emitted(&ray, &hit);

            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;

            let dir_in = ray.direction.normalize();
            let choose_light = sampler.next_1d() < light_probability;
            let u = sampler.next_2d();

            let direction = if choose_light {
                // A failed light sample is a zero-valued sample of the mixture.
                // Falling back to the BSDF here would oversample it.
                let Some(direction) = scene.emitters().sample(hit.p, u).and_then(|d| d.try_normalize()) else {
                    break;
                };
                direction
            } else {
                let Some(rec) = material.sample(dir_in, &hit, u) else {
                    break;
                };
                if rec.is_specular {
                    throughput *= rec.attenuation / (1.0 - light_probability);
                    ray = spawn(&ray, &hit, rec.direction);
                    match self.roulette.survive(throughput, sampler) {
                        Some(q) => throughput /= q,
                        None => break,
                    }
                    continue;
                }
                rec.direction
            };

            let bsdf_pdf = material.pdf(dir_in, direction, &hit);
            let light_pdf = if light_probability > 0.0 {
                scene.emitters().pdf(hit.p, direction)
            } else {
                0.0
            };
            let pdf = (1.0 - light_probability) * bsdf_pdf + light_probability * light_pdf;
            if !(pdf > 0.0 && pdf.is_finite()) {
                break;
            }
            throughput *= material.eval(dir_in, direction, &hit) / pdf;
            ray = spawn(&ray, &hit, direction);

            match self.roulette.survive(throughput, sampler) {
                Some(q) => throughput /= q,
                None => break,
            }
        }

        radiance
    }
}
