//! Classic analytic reflectance lobes: Phong, Blinn-Phong, Beckmann
//! microfacets and Oren-Nayar rough diffuse.
//!
//! All of them are reflective only; `eval` and `pdf` are zero below the
//! surface and `sample` declines directions that would end up there.

use std::f32::consts::FRAC_1_PI;

use crate::material::{reflect, Color, Material, ScatterRecord};
use crate::sampling::{
    beckmann_d, cosine_hemisphere_pdf, cosine_power_pdf, sample_beckmann,
    sample_cosine_hemisphere, sample_cosine_power,
};
use crate::surface::HitRecord;
use umbra_core::Texture;
use umbra_math::{Frame, Vec2, Vec3};

/// Conductor index of refraction used when none is given.
pub const DEFAULT_CONDUCTOR_IOR: f32 = 0.5;
/// Conductor absorption coefficient used when none is given.
pub const DEFAULT_CONDUCTOR_EXTINCTION: f32 = 3.9;

/// Wrap an `eval` value and its density into a scatter record.
fn weighted(direction: Vec3, eval: Color, pdf: f32) -> Option<ScatterRecord> {
    if pdf <= 0.0 || !pdf.is_finite() {
        return None;
    }
    Some(ScatterRecord {
        direction,
        attenuation: eval / pdf,
        is_specular: false,
    })
}

/// Cosine-power lobe around the mirror direction.
pub struct Phong {
    albedo: Texture,
    exponent: f32,
}

impl Phong {
    pub fn new(albedo: Texture, exponent: f32) -> Self {
        Self {
            albedo,
            exponent: exponent.max(0.0),
        }
    }
}

impl Material for Phong {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let normal = hit.facing_normal(dir_in);
        let mirror = reflect(dir_in, normal);
        let direction = Frame::from_z(mirror).to_world(sample_cosine_power(u, self.exponent));
        if direction.dot(normal) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            direction,
            attenuation: self.albedo.value(hit.uv, hit.p),
            is_specular: false,
        })
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        self.albedo.value(hit.uv, hit.p) * self.pdf(dir_in, dir_out, hit)
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        let normal = hit.facing_normal(dir_in);
        if dir_out.dot(normal) <= 0.0 {
            return 0.0;
        }
        let mirror = reflect(dir_in, normal);
        cosine_power_pdf(dir_out.dot(mirror), self.exponent)
    }
}

/// Cosine-power distribution of half vectors around the normal.
pub struct BlinnPhong {
    albedo: Texture,
    exponent: f32,
}

impl BlinnPhong {
    pub fn new(albedo: Texture, exponent: f32) -> Self {
        Self {
            albedo,
            exponent: exponent.max(0.0),
        }
    }
}

impl Material for BlinnPhong {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let normal = hit.facing_normal(dir_in);
        let half = Frame::from_z(normal).to_world(sample_cosine_power(u, self.exponent));
        if (-dir_in).dot(half) <= 0.0 {
            return None;
        }
        let direction = reflect(dir_in, half);
        if direction.dot(normal) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            direction,
            attenuation: self.albedo.value(hit.uv, hit.p),
            is_specular: false,
        })
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        self.albedo.value(hit.uv, hit.p) * self.pdf(dir_in, dir_out, hit)
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        let normal = hit.facing_normal(dir_in);
        if dir_out.dot(normal) <= 0.0 {
            return 0.0;
        }
        let Some(half) = (dir_out - dir_in).try_normalize() else {
            return 0.0;
        };
        let cos_oh = dir_out.dot(half);
        if cos_oh <= 0.0 {
            return 0.0;
        }
        cosine_power_pdf(half.dot(normal), self.exponent) / (4.0 * cos_oh)
    }
}

/// Beckmann microfacet conductor.
pub struct Beckmann {
    albedo: Texture,
    alpha: f32,
    eta: f32,
    k: f32,
}

impl Beckmann {
    pub fn new(albedo: Texture, alpha: f32) -> Self {
        Self::with_conductor(
            albedo,
            alpha,
            DEFAULT_CONDUCTOR_IOR,
            DEFAULT_CONDUCTOR_EXTINCTION,
        )
    }

    pub fn with_conductor(albedo: Texture, alpha: f32, eta: f32, k: f32) -> Self {
        Self {
            albedo,
            alpha: alpha.max(1e-4),
            eta,
            k,
        }
    }

    /// Walter et al.'s rational approximation of the Smith shadowing term.
    fn g1(&self, v: Vec3, half: Vec3, normal: Vec3) -> f32 {
        let cos_v = v.dot(normal);
        if v.dot(half) / cos_v <= 0.0 {
            return 0.0;
        }
        let tan_v = (1.0 - cos_v * cos_v).max(0.0).sqrt() / cos_v;
        if tan_v == 0.0 {
            return 1.0;
        }
        let a = 1.0 / (self.alpha * tan_v.abs());
        if a >= 1.6 {
            return 1.0;
        }
        let a2 = a * a;
        (3.535 * a + 2.181 * a2) / (1.0 + 2.276 * a + 2.577 * a2)
    }
}

impl Material for Beckmann {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let normal = hit.facing_normal(dir_in);
        let half = Frame::from_z(normal).to_world(sample_beckmann(u, self.alpha));
        if (-dir_in).dot(half) <= 0.0 {
            return None;
        }
        let direction = reflect(dir_in, half);
        if direction.dot(normal) <= 0.0 {
            return None;
        }
        weighted(
            direction,
            self.eval(dir_in, direction, hit),
            self.pdf(dir_in, direction, hit),
        )
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        let normal = hit.facing_normal(dir_in);
        let wi = -dir_in;
        let cos_i = wi.dot(normal);
        if cos_i <= 0.0 || dir_out.dot(normal) <= 0.0 {
            return Color::ZERO;
        }
        let Some(half) = (wi + dir_out).try_normalize() else {
            return Color::ZERO;
        };

        let d = beckmann_d(half.dot(normal), self.alpha);
        let g = self.g1(wi, half, normal) * self.g1(dir_out, half, normal);
        let f = fresnel_conductor(wi.dot(half), self.eta, self.k);
        self.albedo.value(hit.uv, hit.p) * (f * d * g / (4.0 * cos_i))
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        let normal = hit.facing_normal(dir_in);
        if dir_out.dot(normal) <= 0.0 {
            return 0.0;
        }
        let Some(half) = (dir_out - dir_in).try_normalize() else {
            return 0.0;
        };
        let cos_h = half.dot(normal);
        let cos_oh = dir_out.dot(half).abs();
        if cos_oh <= 0.0 {
            return 0.0;
        }
        beckmann_d(cos_h, self.alpha) * cos_h / (4.0 * cos_oh)
    }
}

/// Rough diffuse reflection (qualitative Oren-Nayar model).
pub struct OrenNayar {
    albedo: Texture,
    a: f32,
    b: f32,
}

impl OrenNayar {
    /// `sigma` is the standard deviation of facet slopes, in radians.
    pub fn new(albedo: Texture, sigma: f32) -> Self {
        let sigma2 = sigma * sigma;
        Self {
            albedo,
            a: 1.0 - 0.5 * sigma2 / (sigma2 + 0.33),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }
}

impl Material for OrenNayar {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let local = sample_cosine_hemisphere(u);
        if local.z <= 0.0 {
            return None;
        }
        let direction = Frame::from_z(hit.facing_normal(dir_in)).to_world(local);
        weighted(
            direction,
            self.eval(dir_in, direction, hit),
            self.pdf(dir_in, direction, hit),
        )
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        let frame = Frame::from_z(hit.facing_normal(dir_in));
        let wi = frame.to_local(-dir_in);
        let wo = frame.to_local(dir_out);
        if wi.z <= 0.0 || wo.z <= 0.0 {
            return Color::ZERO;
        }

        let sin_i = (1.0 - wi.z * wi.z).max(0.0).sqrt();
        let sin_o = (1.0 - wo.z * wo.z).max(0.0).sqrt();

        // cos(φi - φo) from the tangent-plane projections
        let max_cos = if sin_i > 1e-4 && sin_o > 1e-4 {
            ((wi.x * wo.x + wi.y * wo.y) / (sin_i * sin_o)).max(0.0)
        } else {
            0.0
        };

        // α is the larger polar angle, β the smaller one
        let (sin_alpha, tan_beta) = if wi.z > wo.z {
            (sin_o, sin_i / wi.z)
        } else {
            (sin_i, sin_o / wo.z)
        };

        let value = self.a + self.b * max_cos * sin_alpha * tan_beta;
        self.albedo.value(hit.uv, hit.p) * (FRAC_1_PI * value * wo.z)
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        cosine_hemisphere_pdf(dir_out.dot(hit.facing_normal(dir_in)))
    }
}

/// Fresnel reflectance of a conductor with complex index `eta + i·k`.
pub fn fresnel_conductor(cos_i: f32, eta: f32, k: f32) -> f32 {
    let cos_i = cos_i.clamp(-1.0, 1.0);
    let cos2 = cos_i * cos_i;
    let sin2 = 1.0 - cos2;
    let eta2 = eta * eta;
    let k2 = k * k;

    let t0 = eta2 - k2 - sin2;
    let a2_plus_b2 = (t0 * t0 + 4.0 * eta2 * k2).sqrt();
    let t1 = a2_plus_b2 + cos2;
    let a = (0.5 * (a2_plus_b2 + t0)).max(0.0).sqrt();
    let t2 = 2.0 * cos_i * a;
    let rs = (t1 - t2) / (t1 + t2);

    let t3 = cos2 * a2_plus_b2 + sin2 * sin2;
    let t4 = t2 * sin2;
    let rp = rs * (t3 - t4) / (t3 + t4);

    0.5 * (rp + rs)
}
