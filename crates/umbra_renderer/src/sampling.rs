//! Warps from the unit square to directions and points.
//!
//! Every warp takes an explicit `[0,1)²` sample so that the caller's
//! `Sampler` decides where randomness comes from. Directions are produced in
//! a canonical z-up frame; callers rotate them with `umbra_math::Frame`.

use std::f32::consts::{FRAC_1_PI, PI};

use umbra_math::{Vec2, Vec3};

pub const INV_TWO_PI: f32 = 0.5 * FRAC_1_PI;
pub const INV_FOUR_PI: f32 = 0.25 * FRAC_1_PI;

/// Largest float strictly below one.
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON * 0.5;

pub fn sample_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> f32 {
    INV_FOUR_PI
}

/// Shirley–Chiu concentric mapping onto the unit disk.
pub fn sample_concentric_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }
    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, 0.25 * PI * (offset.y / offset.x))
    } else {
        (offset.y, 0.5 * PI - 0.25 * PI * (offset.x / offset.y))
    };
    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine-weighted hemisphere around +Z (Malley's method).
pub fn sample_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = sample_concentric_disk(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) * FRAC_1_PI
}

/// Directions distributed as `cosⁿθ` around +Z.
pub fn sample_cosine_power(u: Vec2, exponent: f32) -> Vec3 {
    let cos_theta = u.x.powf(1.0 / (exponent + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

pub fn cosine_power_pdf(cos_theta: f32, exponent: f32) -> f32 {
    if cos_theta <= 0.0 {
        return 0.0;
    }
    (exponent + 1.0) * INV_TWO_PI * cos_theta.powf(exponent)
}

/// Uniform directions inside the cone `cosθ ≥ cos_theta_max` around +Z.
pub fn sample_uniform_cone(u: Vec2, cos_theta_max: f32) -> Vec3 {
    let cos_theta = 1.0 - u.x * (1.0 - cos_theta_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Solid-angle density of `sample_uniform_cone`, given `1 - cosθmax`
/// (passed directly to keep precision for tiny cones).
pub fn uniform_cone_pdf(one_minus_cos_max: f32) -> f32 {
    1.0 / (2.0 * PI * one_minus_cos_max)
}

/// Beckmann distribution `D(h)` for a half vector with the given cosine.
pub fn beckmann_d(cos_theta: f32, alpha: f32) -> f32 {
    if cos_theta <= 0.0 {
        return 0.0;
    }
    let cos2 = cos_theta * cos_theta;
    let tan2 = (1.0 - cos2) / cos2;
    let alpha2 = alpha * alpha;
    (-tan2 / alpha2).exp() / (PI * alpha2 * cos2 * cos2)
}

/// Half vectors around +Z with density `D(h)·cosθh`.
pub fn sample_beckmann(u: Vec2, alpha: f32) -> Vec3 {
    let tan2 = -alpha * alpha * (1.0 - u.x).ln();
    let cos_theta = 1.0 / (1.0 + tan2).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Uniform barycentrics `(b0, b1)`; the third is `1 - b0 - b1`.
pub fn sample_uniform_triangle(u: Vec2) -> (f32, f32) {
    let su0 = u.x.sqrt();
    (1.0 - su0, u.y * su0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Midpoint-rule integral of a density over the sphere in (cosθ, φ).
    fn integrate_sphere(f: impl Fn(Vec3) -> f32) -> f32 {
        let (n_theta, n_phi) = (400, 400);
        let mut sum = 0.0f64;
        for i in 0..n_theta {
            let z = -1.0 + 2.0 * (i as f32 + 0.5) / n_theta as f32;
            let r = (1.0 - z * z).sqrt();
            for j in 0..n_phi {
                let phi = 2.0 * PI * (j as f32 + 0.5) / n_phi as f32;
                sum += f(Vec3::new(r * phi.cos(), r * phi.sin(), z)) as f64;
            }
        }
        (sum * 4.0 * PI as f64 / (n_theta * n_phi) as f64) as f32
    }

    #[test]
    fn test_uniform_sphere_is_unit_length() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let v = sample_uniform_sphere(Vec2::new(rng.gen(), rng.gen()));
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_concentric_disk_inside_unit_circle() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let p = sample_concentric_disk(Vec2::new(rng.gen(), rng.gen()));
            assert!(p.length() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_cosine_hemisphere_pdf_integrates_to_one() {
        let integral = integrate_sphere(|w| cosine_hemisphere_pdf(w.z));
        assert!((integral - 1.0).abs() < 0.01, "integral = {}", integral);
    }

    #[test]
    fn test_cosine_power_pdf_integrates_to_one() {
        let integral = integrate_sphere(|w| cosine_power_pdf(w.z, 12.0));
        assert!((integral - 1.0).abs() < 0.01, "integral = {}", integral);
    }

    #[test]
    fn test_beckmann_projected_area_integrates_to_one() {
        let integral = integrate_sphere(|w| beckmann_d(w.z, 0.4) * w.z.max(0.0));
        assert!((integral - 1.0).abs() < 0.02, "integral = {}", integral);
    }

    #[test]
    fn test_cone_samples_stay_inside_cone() {
        let mut rng = StdRng::seed_from_u64(42);
        let cos_max = 0.9;
        for _ in 0..1000 {
            let v = sample_uniform_cone(Vec2::new(rng.gen(), rng.gen()), cos_max);
            assert!(v.z >= cos_max - 1e-5);
        }
        let integral = integrate_sphere(|w| {
            if w.z >= cos_max {
                uniform_cone_pdf(1.0 - cos_max)
            } else {
                0.0
            }
        });
        assert!((integral - 1.0).abs() < 0.02, "integral = {}", integral);
    }

    #[test]
    fn test_triangle_barycentrics_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let (b0, b1) = sample_uniform_triangle(Vec2::new(rng.gen(), rng.gen()));
            assert!(b0 >= 0.0 && b1 >= 0.0 && b0 + b1 <= 1.0 + 1e-6);
        }
    }
}
