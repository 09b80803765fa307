//! Participating media.
//!
//! Media are queried along a ray segment `[mint, maxt]`; all distances are
//! measured along the normalized ray. Sampling returns the spectral ratios
//! the path picks up over the segment so integrators can combine the three
//! possible hero channels (see [`crate::spectral`]).

use std::sync::Arc;

use umbra_core::Perlin;
use umbra_math::Vec3;

use crate::error::SceneError;
use crate::material::Color;
use crate::phase::PhaseFunction;
use crate::sampler::Sampler;
use crate::spectral::{ratio, transmittance_ratio, Channel, SpectralWeights};
use crate::Ray;

/// Tracking gives up on unbounded rays after this distance.
pub const MAX_TRACKING_DISTANCE: f32 = 1e4;

/// Ratio tracking starts playing roulette below this transmittance.
const RATIO_TRACKING_ROULETTE: f32 = 0.1;

/// A scattering event inside a medium.
#[derive(Clone, Copy)]
pub struct MediumInteraction<'a> {
    pub p: Vec3,
    /// Points back along the incoming ray
    pub wo: Vec3,
    pub medium: &'a dyn Medium,
}

pub trait Medium: Send + Sync {
    /// Fraction of `channel` light surviving the ray segment.
    fn transmittance(&self, ray: &Ray, sampler: &mut dyn Sampler, channel: Channel) -> f32;

    /// Sample a free-flight distance with the statistics of `channel`.
    ///
    /// Returns the scattering event (or `None` if the ray leaves the segment)
    /// together with the density ratios accumulated on the way.
    fn sample(
        &self,
        ray: &Ray,
        sampler: &mut dyn Sampler,
        channel: Channel,
    ) -> (Option<MediumInteraction<'_>>, SpectralWeights);

    /// Extinction coefficient at `p`.
    fn density(&self, p: Vec3, channel: Channel) -> f32;

    fn phase(&self) -> &dyn PhaseFunction;
}

/// Which media lie on either side of a surface.
#[derive(Clone, Default)]
pub struct MediumInterface {
    /// Medium on the side opposite the geometric normal
    pub inside: Option<Arc<dyn Medium>>,
    pub outside: Option<Arc<dyn Medium>>,
}

impl MediumInterface {
    pub fn new(inside: Option<Arc<dyn Medium>>, outside: Option<Arc<dyn Medium>>) -> Self {
        Self { inside, outside }
    }

    /// Same medium on both sides.
    pub fn uniform(medium: Option<Arc<dyn Medium>>) -> Self {
        Self {
            inside: medium.clone(),
            outside: medium,
        }
    }

    /// Whether crossing the surface changes the medium.
    pub fn is_transition(&self) -> bool {
        match (&self.inside, &self.outside) {
            (None, None) => false,
            (Some(a), Some(b)) => {
                !std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => true,
        }
    }

    /// Medium a ray travelling along `direction` ends up in after crossing a
    /// surface with geometric normal `gn`.
    pub fn medium_for(&self, direction: Vec3, gn: Vec3) -> Option<Arc<dyn Medium>> {
        if direction.dot(gn) < 0.0 {
            self.inside.clone()
        } else {
            self.outside.clone()
        }
    }
}

/// Unit-direction view of a ray segment: `(ray, start, end)`.
fn segment(ray: &Ray) -> (Ray, f32, f32) {
    let ray = ray.normalized();
    let (mint, maxt) = (ray.mint, ray.maxt);
    (ray, mint, maxt)
}

/// Exponential free-flight distance for extinction `sigma`.
#[inline]
fn free_flight(u: f32, sigma: f32) -> f32 {
    -(1.0 - u).ln() / sigma
}

/// Medium with constant coefficients.
pub struct HomogeneousMedium {
    sigma_s: Color,
    sigma_t: Color,
    phase: Arc<dyn PhaseFunction>,
}

impl HomogeneousMedium {
    pub fn new(sigma_a: Color, sigma_s: Color, phase: Arc<dyn PhaseFunction>) -> Self {
        let sigma_a = sigma_a.max(Color::ZERO);
        let sigma_s = sigma_s.max(Color::ZERO);
        Self {
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            phase,
        }
    }

    pub fn sigma_t(&self) -> Color {
        self.sigma_t
    }
}

impl Medium for HomogeneousMedium {
    fn transmittance(&self, ray: &Ray, _sampler: &mut dyn Sampler, channel: Channel) -> f32 {
        let (_, mint, maxt) = segment(ray);
        let sigma = channel.of(self.sigma_t);
        if sigma == 0.0 {
            return 1.0;
        }
        (-sigma * (maxt - mint)).exp()
    }

    fn sample(
        &self,
        ray: &Ray,
        sampler: &mut dyn Sampler,
        channel: Channel,
    ) -> (Option<MediumInteraction<'_>>, SpectralWeights) {
        let (ray, mint, maxt) = segment(ray);
        let length = maxt - mint;
        let st = self.sigma_t;

        let sigma = channel.of(st);
        let distance = if sigma > 0.0 {
            free_flight(sampler.next_1d(), sigma)
        } else {
            f32::INFINITY
        };

        if distance < length {
            let weights = SpectralWeights::from_fn(|j, k| {
                ratio(st[j], self.sigma_s[k]) * transmittance_ratio(st[j], st[k], distance)
            });
            let interaction = MediumInteraction {
                p: ray.at(mint + distance),
                wo: -ray.direction,
                medium: self,
            };
            (Some(interaction), weights)
        } else {
            let weights = SpectralWeights::from_fn(|j, k| transmittance_ratio(st[j], st[k], length));
            (None, weights)
        }
    }

    fn density(&self, _p: Vec3, channel: Channel) -> f32 {
        channel.of(self.sigma_t)
    }

    fn phase(&self) -> &dyn PhaseFunction {
        self.phase.as_ref()
    }
}

/// Heterogeneous medium driven by Perlin noise.
///
/// `density = σt·clamp(scale·noise(p·spatial) + offset, 0, scale + offset)`,
/// tracked against the majorant `σt·(scale + offset)`.
pub struct NoiseMedium {
    sigma_s: Color,
    sigma_t: Color,
    scale: f32,
    offset: f32,
    spatial_scale: Color,
    noise: Perlin,
    phase: Arc<dyn PhaseFunction>,
}

impl NoiseMedium {
    pub fn new(
        sigma_a: Color,
        sigma_s: Color,
        scale: f32,
        offset: f32,
        spatial_scale: Color,
        seed: u64,
        phase: Arc<dyn PhaseFunction>,
    ) -> Result<Self, SceneError> {
        if !(scale + offset > 0.0) {
            return Err(SceneError::InvalidParameter {
                element: "noise medium".to_string(),
                message: format!(
                    "density scale + offset must be positive (got {} + {})",
                    scale, offset
                ),
            });
        }
        let sigma_a = sigma_a.max(Color::ZERO);
        let sigma_s = sigma_s.max(Color::ZERO);
        Ok(Self {
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            scale,
            offset,
            spatial_scale,
            noise: Perlin::new(seed),
            phase,
        })
    }

    fn majorant(&self) -> Color {
        self.sigma_t * (self.scale + self.offset)
    }

    fn densities(&self, p: Vec3) -> Color {
        Color::new(
            self.density(p, Channel::Red),
            self.density(p, Channel::Green),
            self.density(p, Channel::Blue),
        )
    }

    /// Scattering albedo `σs/σt` per channel.
    fn albedo(&self) -> Color {
        Color::from_array(std::array::from_fn(|k| {
            if self.sigma_t[k] > 0.0 {
                self.sigma_s[k] / self.sigma_t[k]
            } else {
                0.0
            }
        }))
    }

    /// End of the tracked segment, capping unbounded rays.
    fn tracking_end(mint: f32, maxt: f32) -> f32 {
        maxt.min(mint + MAX_TRACKING_DISTANCE)
    }
}

impl Medium for NoiseMedium {
    /// Ratio tracking with roulette once the estimate gets small.
    fn transmittance(&self, ray: &Ray, sampler: &mut dyn Sampler, channel: Channel) -> f32 {
        let (ray, mint, maxt) = segment(ray);
        let mu = channel.of(self.majorant());
        if mu <= 0.0 {
            return 1.0;
        }
        let end = Self::tracking_end(mint, maxt);

        let mut tr = 1.0;
        let mut t = mint;
        loop {
            t += free_flight(sampler.next_1d(), mu);
            if t >= end {
                return tr;
            }
            tr *= 1.0 - self.density(ray.at(t), channel) / mu;

            if tr < RATIO_TRACKING_ROULETTE {
                let survival = 0.25;
                if sampler.next_1d() >= survival {
                    return 0.0;
                }
                tr /= survival;
            }
        }
    }

    /// Delta tracking under the hero channel's majorant.
    fn sample(
        &self,
        ray: &Ray,
        sampler: &mut dyn Sampler,
        channel: Channel,
    ) -> (Option<MediumInteraction<'_>>, SpectralWeights) {
        let (ray, mint, maxt) = segment(ray);
        let mu = self.majorant();
        let mu_c = channel.of(mu);
        let end = Self::tracking_end(mint, maxt);
        let albedo = self.albedo();

        let mut weights = SpectralWeights::ONE;
        if mu_c <= 0.0 {
            weights *= SpectralWeights::from_fn(|j, k| transmittance_ratio(mu[j], mu[k], end - mint));
            return (None, weights);
        }

        let mut t = mint;
        loop {
            let step = free_flight(sampler.next_1d(), mu_c);
            if t + step >= end {
                let rest = end - t;
                weights *= SpectralWeights::from_fn(|j, k| transmittance_ratio(mu[j], mu[k], rest));
                return (None, weights);
            }
            t += step;

            let p = ray.at(t);
            let rho = self.densities(p);
            weights *= SpectralWeights::from_fn(|j, k| transmittance_ratio(mu[j], mu[k], step));

            if sampler.next_1d() * mu_c < channel.of(rho) {
                // Real collision
                weights *= SpectralWeights::from_fn(|j, k| ratio(rho[j], rho[k] * albedo[k]));
                let interaction = MediumInteraction {
                    p,
                    wo: -ray.direction,
                    medium: self,
                };
                return (Some(interaction), weights);
            }

            // Null collision
            weights *= SpectralWeights::from_fn(|j, k| ratio(mu[j] - rho[j], mu[k] - rho[k]));
        }
    }

    fn density(&self, p: Vec3, channel: Channel) -> f32 {
        let sigma = channel.of(self.sigma_t);
        let n = self.noise.noise(p * channel.of(self.spatial_scale));
        let max = self.scale + self.offset;
        sigma * (self.scale * n + self.offset).clamp(0.0, max)
    }

    fn phase(&self) -> &dyn PhaseFunction {
        self.phase.as_ref()
    }
}
