//! Material trait for surface scattering.
//!
//! Directions follow one convention throughout: `dir_in` is the unit
//! direction the ray travels *towards* the surface, `dir_out` the unit
//! direction leaving it. Hit normals are outward-facing; each material orients
//! them with [`HitRecord::facing_normal`].

use std::sync::Arc;

use crate::sampling::{cosine_hemisphere_pdf, sample_cosine_hemisphere, sample_uniform_sphere};
use crate::surface::HitRecord;
use crate::Ray;
use umbra_core::Texture;
use umbra_math::{luminance, Frame, Vec2, Vec3};

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Result of sampling a material.
#[derive(Debug, Clone, Copy)]
pub struct ScatterRecord {
    /// Outgoing unit direction
    pub direction: Vec3,
    /// Sampling weight `eval / pdf`, or the raw attenuation for specular lobes
    pub attenuation: Color,
    /// True when the direction has no density (mirror, refraction)
    pub is_specular: bool,
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Legacy scattering interface used by the simple path tracer.
    ///
    /// Returns `(attenuation, scattered_ray)` or `None` if the ray is absorbed.
    /// Defaults to [`Material::sample`].
    fn scatter(&self, ray_in: &Ray, hit: &HitRecord, u: Vec2) -> Option<(Color, Ray)> {
        let rec = self.sample(ray_in.direction.normalize(), hit, u)?;
        Some((rec.attenuation, Ray::new(hit.p, rec.direction)))
    }

    /// Sample an outgoing direction.
    fn sample(&self, _dir_in: Vec3, _hit: &HitRecord, _u: Vec2) -> Option<ScatterRecord> {
        None
    }

    /// BSDF times the outgoing cosine, excluding specular lobes.
    fn eval(&self, _dir_in: Vec3, _dir_out: Vec3, _hit: &HitRecord) -> Color {
        Color::ZERO
    }

    /// Solid-angle density with which [`Material::sample`] picks `dir_out`.
    fn pdf(&self, _dir_in: Vec3, _dir_out: Vec3, _hit: &HitRecord) -> f32 {
        0.0
    }

    /// Get emitted light for a ray arriving at `hit`.
    fn emitted(&self, _ray_in: &Ray, _hit: &HitRecord) -> Color {
        Color::ZERO
    }

    fn is_emissive(&self) -> bool {
        false
    }
}

/// Lambertian (diffuse) material.
#[derive(Clone)]
pub struct Lambertian {
    albedo: Texture,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self {
            albedo: Texture::constant(albedo),
        }
    }

    pub fn with_texture(albedo: Texture) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter(&self, ray_in: &Ray, hit: &HitRecord, u: Vec2) -> Option<(Color, Ray)> {
        // Normal plus a point on the unit sphere is cosine distributed
        let normal = hit.facing_normal(ray_in.direction);
        let mut scatter_direction = normal + sample_uniform_sphere(u);

        // Catch degenerate scatter direction
        if scatter_direction.length_squared() < 1e-8 {
            scatter_direction = normal;
        }

        let albedo = self.albedo.value(hit.uv, hit.p);
        Some((albedo, Ray::new(hit.p, scatter_direction)))
    }

    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let local = sample_cosine_hemisphere(u);
        if local.z <= 0.0 {
            return None;
        }
        let normal = hit.facing_normal(dir_in);
        Some(ScatterRecord {
            direction: Frame::from_z(normal).to_world(local),
            attenuation: self.albedo.value(hit.uv, hit.p),
            is_specular: false,
        })
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        let cosine = dir_out.dot(hit.facing_normal(dir_in));
        if cosine <= 0.0 {
            return Color::ZERO;
        }
        self.albedo.value(hit.uv, hit.p) * cosine_hemisphere_pdf(cosine)
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        cosine_hemisphere_pdf(dir_out.dot(hit.facing_normal(dir_in)))
    }
}

/// Metal (specular) material.
pub struct Metal {
    albedo: Texture,
    roughness: Texture,
}

impl Metal {
    /// Create a new Metal material.
    ///
    /// - `albedo`: The color of the metal
    /// - `roughness`: 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo: Texture::constant(albedo),
            roughness: Texture::constant(Vec3::splat(roughness.clamp(0.0, 1.0))),
        }
    }

    pub fn with_textures(albedo: Texture, roughness: Texture) -> Self {
        Self { albedo, roughness }
    }
}

impl Material for Metal {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let normal = hit.facing_normal(dir_in);
        let roughness = luminance(self.roughness.value(hit.uv, hit.p));
        let direction = reflect(dir_in, normal) + roughness * sample_uniform_sphere(u);

        // Only scatter if the reflected ray is in the same hemisphere as the normal
        if direction.dot(normal) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            direction: direction.normalize(),
            attenuation: self.albedo.value(hit.uv, hit.p),
            is_specular: true,
        })
    }
}

/// Dielectric (glass) material.
pub struct Dielectric {
    /// Index of refraction
    ior: f32,
}

impl Dielectric {
    /// Create a new Dielectric material.
    ///
    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn new(ior: f32) -> Self {
        Self { ior }
    }
}

impl Material for Dielectric {
    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let normal = hit.facing_normal(dir_in);
        let eta = if hit.front_face(dir_in) {
            1.0 / self.ior
        } else {
            self.ior
        };

        let cos_i = (-dir_in).dot(normal).min(1.0);
        let reflectance = fresnel_dielectric(cos_i, eta);

        let direction = match refract(dir_in, normal, eta) {
            Some(refracted) if u.x >= reflectance => refracted,
            // Total internal reflection or the reflection branch
            _ => reflect(dir_in, normal),
        };

        Some(ScatterRecord {
            direction: direction.normalize(),
            attenuation: Color::ONE,
            is_specular: true,
        })
    }
}

/// Diffuse light emitter.
pub struct DiffuseLight {
    emit: Color,
}

impl DiffuseLight {
    /// Create a new diffuse light with the given emission color.
    pub fn new(emit: Color) -> Self {
        Self { emit }
    }
}

impl Material for DiffuseLight {
    fn scatter(&self, _ray_in: &Ray, _hit: &HitRecord, _u: Vec2) -> Option<(Color, Ray)> {
        // Lights don't scatter rays
        None
    }

    /// One-sided: only the side the shading normal points to emits.
    fn emitted(&self, ray_in: &Ray, hit: &HitRecord) -> Color {
        if ray_in.direction.dot(hit.sn) <= 0.0 {
            self.emit
        } else {
            Color::ZERO
        }
    }

    fn is_emissive(&self) -> bool {
        true
    }
}

/// Stochastic mix of two materials.
///
/// `sample`/`scatter` route to `b` with probability `luminance(amount)` and
/// to `a` otherwise; `eval`/`pdf` return the weighted average.
pub struct Blend {
    a: Arc<dyn Material>,
    b: Arc<dyn Material>,
    amount: Texture,
}

impl Blend {
    pub fn new(a: Arc<dyn Material>, b: Arc<dyn Material>, amount: Texture) -> Self {
        Self { a, b, amount }
    }

    fn amount(&self, hit: &HitRecord) -> f32 {
        luminance(self.amount.value(hit.uv, hit.p)).clamp(0.0, 1.0)
    }

    /// Choose a sub-material and rescale `u.x` back to `[0,1)`.
    fn choose(&self, hit: &HitRecord, u: Vec2) -> (&dyn Material, Vec2) {
        let t = self.amount(hit);
        if u.x < t {
            (self.b.as_ref(), Vec2::new(u.x / t, u.y))
        } else {
            let rescaled = ((u.x - t) / (1.0 - t)).min(1.0);
            (self.a.as_ref(), Vec2::new(rescaled, u.y))
        }
    }
}

impl Material for Blend {
    fn scatter(&self, ray_in: &Ray, hit: &HitRecord, u: Vec2) -> Option<(Color, Ray)> {
        let (material, u) = self.choose(hit, u);
        material.scatter(ray_in, hit, u)
    }

    fn sample(&self, dir_in: Vec3, hit: &HitRecord, u: Vec2) -> Option<ScatterRecord> {
        let (material, u) = self.choose(hit, u);
        material.sample(dir_in, hit, u)
    }

    fn eval(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> Color {
        let t = self.amount(hit);
        self.a
            .eval(dir_in, dir_out, hit)
            .lerp(self.b.eval(dir_in, dir_out, hit), t)
    }

    fn pdf(&self, dir_in: Vec3, dir_out: Vec3, hit: &HitRecord) -> f32 {
        let t = self.amount(hit);
        (1.0 - t) * self.a.pdf(dir_in, dir_out, hit) + t * self.b.pdf(dir_in, dir_out, hit)
    }

    fn emitted(&self, ray_in: &Ray, hit: &HitRecord) -> Color {
        let t = self.amount(hit);
        self.a
            .emitted(ray_in, hit)
            .lerp(self.b.emitted(ray_in, hit), t)
    }

    fn is_emissive(&self) -> bool {
        self.a.is_emissive() || self.b.is_emissive()
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract `v` through a surface with normal `n` facing against it.
///
/// `eta` is the ratio of the incident over the transmitted index. Returns
/// `None` on total internal reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-v).dot(n).min(1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(eta * v + (eta * cos_i - cos_t) * n)
}

/// Unpolarized Fresnel reflectance of a dielectric interface.
pub fn fresnel_dielectric(cos_i: f32, eta: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin2_t).sqrt();

    let rs = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let rp = (cos_i - eta * cos_t) / (cos_i + eta * cos_t);
    0.5 * (rs * rs + rp * rp)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared statistical checks for material sampling routines.

    use super::*;
    use crate::surface::Surface;
    use crate::Quad;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::PI;
    use umbra_math::Transform;

    /// A flat unit-normal (+Z) surface at the origin.
    pub fn flat_surface() -> Quad {
        Quad::new(Vec2::splat(4.0), Transform::IDENTITY, None)
    }

    pub fn hit_at_origin(quad: &Quad) -> HitRecord<'_> {
        quad.intersect(&Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z))
            .expect("ray aimed at the quad")
    }

    /// Sample `count` directions and compare a (cosθ, φ) histogram against
    /// `pdf` integrated over each bin. Also checks that every sample's weight
    /// equals `eval / pdf`.
    pub fn check_sampling_matches_pdf(material: &dyn Material, dir_in: Vec3, count: usize) {
        const COS_BINS: usize = 20;
        const PHI_BINS: usize = 24;
        const SUB: usize = 8;

        let quad = flat_surface();
        let hit = hit_at_origin(&quad);
        let mut rng = StdRng::seed_from_u64(42);
        let mut histogram = vec![0usize; COS_BINS * PHI_BINS];

        let bin_of = |w: Vec3| {
            let c = (((w.z + 1.0) * 0.5) * COS_BINS as f32) as usize;
            let phi = w.y.atan2(w.x).rem_euclid(2.0 * PI);
            let p = (phi / (2.0 * PI) * PHI_BINS as f32) as usize;
            c.min(COS_BINS - 1) * PHI_BINS + p.min(PHI_BINS - 1)
        };

        for _ in 0..count {
            let u = Vec2::new(rng.gen(), rng.gen());
            let Some(rec) = material.sample(dir_in, &hit, u) else {
                continue;
            };
            assert!(!rec.is_specular);
            assert!((rec.direction.length() - 1.0).abs() < 1e-3);
            assert!(
                rec.direction.z >= -1e-4,
                "sampled below the surface: {:?}",
                rec.direction
            );

            let pdf = material.pdf(dir_in, rec.direction, &hit);
            if pdf > 1e-3 {
                let weight = material.eval(dir_in, rec.direction, &hit) / pdf;
                assert!(
                    (weight - rec.attenuation).length() < 1e-2 * (1.0 + weight.length()),
                    "weight {:?} vs attenuation {:?}",
                    weight,
                    rec.attenuation
                );
            }
            histogram[bin_of(rec.direction)] += 1;
        }

        let bin_area = (2.0 / COS_BINS as f32) * (2.0 * PI / PHI_BINS as f32);
        let mut total_expected = 0.0;
        for c in 0..COS_BINS {
            for p in 0..PHI_BINS {
                let mut integral = 0.0;
                for i in 0..SUB {
                    for j in 0..SUB {
                        let z = -1.0 + (c as f32 + (i as f32 + 0.5) / SUB as f32) * 2.0
                            / COS_BINS as f32;
                        let phi = (p as f32 + (j as f32 + 0.5) / SUB as f32) * 2.0 * PI
                            / PHI_BINS as f32;
                        let r = (1.0 - z * z).max(0.0).sqrt();
                        let w = Vec3::new(r * phi.cos(), r * phi.sin(), z);
                        integral += material.pdf(dir_in, w, &hit);
                    }
                }
                let expected = integral / (SUB * SUB) as f32 * bin_area;
                total_expected += expected;

                let observed = histogram[c * PHI_BINS + p] as f32 / count as f32;
                let sigma = (expected.max(1e-6) / count as f32).sqrt();
                assert!(
                    (observed - expected).abs() < 5.0 * sigma + 2e-3,
                    "bin ({}, {}): observed {} expected {}",
                    c,
                    p,
                    observed,
                    expected
                );
            }
        }

        let accepted = histogram.iter().sum::<usize>() as f32 / count as f32;
        assert!(
            (total_expected - accepted).abs() < 0.02,
            "pdf mass {} vs accepted fraction {}",
            total_expected,
            accepted
        );
    }
}
