//! Phase functions for participating media.

use std::f32::consts::PI;

use crate::sampling::INV_FOUR_PI;
use umbra_math::{Frame, Vec2, Vec3};

/// Angular distribution of light scattered inside a medium.
///
/// `wo` points back along the incoming ray; `wi` is the direction the path
/// continues in. Both are unit vectors.
pub trait PhaseFunction: Send + Sync {
    /// Density of scattering from `wo` into `wi` (normalized over the sphere).
    fn p(&self, wo: Vec3, wi: Vec3) -> f32;

    /// Sample `wi` proportionally to `p(wo, ·)`, returning it with its density.
    fn sample(&self, wo: Vec3, u: Vec2) -> (Vec3, f32);
}

/// Henyey-Greenstein phase function with asymmetry `g` in `(-1, 1)`.
///
/// `g > 0` scatters forward, `g < 0` backward, `g = 0` is isotropic.
#[derive(Debug, Clone, Copy)]
pub struct HenyeyGreenstein {
    g: f32,
}

impl HenyeyGreenstein {
    pub fn new(g: f32) -> Self {
        Self {
            g: g.clamp(-0.999, 0.999),
        }
    }

    pub fn isotropic() -> Self {
        Self { g: 0.0 }
    }

    pub fn g(&self) -> f32 {
        self.g
    }
}

/// Henyey-Greenstein density for the cosine between `wo` and `wi`.
#[inline]
pub fn phase_hg(cos_theta: f32, g: f32) -> f32 {
    let denom = 1.0 + g * g + 2.0 * g * cos_theta;
    INV_FOUR_PI * (1.0 - g * g) / (denom * denom.max(0.0).sqrt())
}

impl PhaseFunction for HenyeyGreenstein {
    fn p(&self, wo: Vec3, wi: Vec3) -> f32 {
        phase_hg(wo.dot(wi), self.g)
    }

    fn sample(&self, wo: Vec3, u: Vec2) -> (Vec3, f32) {
        let g = self.g;
        // Cosine of the angle between wo and wi
        let cos_theta = if g.abs() < 1e-3 {
            1.0 - 2.0 * u.x
        } else {
            let sqr = (1.0 - g * g) / (1.0 + g - 2.0 * g * u.x);
            -(1.0 + g * g - sqr * sqr) / (2.0 * g)
        };
        let cos_theta = cos_theta.clamp(-1.0, 1.0);

        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * u.y;
        let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
        let wi = Frame::from_z(wo).to_world(local);

        (wi, phase_hg(cos_theta, g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_hg_integrates_to_one() {
        for g in [-0.7, 0.0, 0.3, 0.9] {
            let n = 20_000;
            let mut sum = 0.0f64;
            for i in 0..n {
                let cos = -1.0 + 2.0 * (i as f32 + 0.5) / n as f32;
                sum += phase_hg(cos, g) as f64;
            }
            // ∫ p dω = 2π ∫ p d(cosθ)
            let integral = sum * 2.0 / n as f64 * 2.0 * PI as f64;
            assert!((integral - 1.0).abs() < 1e-3, "g = {}: {}", g, integral);
        }
    }

    #[test]
    fn test_hg_mean_cosine_is_g() {
        let mut rng = StdRng::seed_from_u64(42);
        let wo = Vec3::new(0.3, -0.5, 0.8).normalize();
        for g in [-0.5f32, 0.0, 0.6] {
            let hg = HenyeyGreenstein::new(g);
            let n = 100_000;
            let mut mean = 0.0f64;
            for _ in 0..n {
                let (wi, pdf) = hg.sample(wo, Vec2::new(rng.gen(), rng.gen()));
                assert!((wi.length() - 1.0).abs() < 1e-3);
                assert!((pdf - hg.p(wo, wi)).abs() < 1e-3 * (1.0 + pdf));
                mean += (-wo).dot(wi) as f64;
            }
            mean /= n as f64;
            assert!((mean - g as f64).abs() < 0.01, "g = {}: mean {}", g, mean);
        }
    }

    #[test]
    fn test_isotropic_density() {
        let hg = HenyeyGreenstein::isotropic();
        assert!((hg.p(Vec3::X, Vec3::Y) - INV_FOUR_PI).abs() < 1e-6);
    }
}
