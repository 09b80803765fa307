//! Built-in scenes for smoke tests and demos.
//!
//! Each function returns a populated [`SceneBuilder`] so callers can still
//! override the sampler, integrator or resolution before building.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use umbra_core::Texture;
use umbra_math::{Transform, Vec2, Vec3};

use crate::error::SceneError;
use crate::integrator::{PathTracerMis, VolpathTracerNee};
use crate::material::{Color, Dielectric, DiffuseLight, Lambertian, Material, Metal};
use crate::medium::{MediumInterface, NoiseMedium};
use crate::phase::HenyeyGreenstein;
use crate::sampler::IndependentSampler;
use crate::scene::SceneBuilder;
use crate::{Camera, Quad, Sphere};

/// Names accepted by [`test_scene`], in index order.
pub const TEST_SCENES: [&str; 6] = ["sphere", "sphere_plane", "steinbach", "shirley", "cornell_box", "foggy"];

/// Look up a built-in scene by index.
pub fn test_scene(index: usize) -> Result<SceneBuilder, SceneError> {
    match index {
        0 => Ok(sphere_scene()),
        1 => Ok(sphere_plane_scene()),
        2 => Ok(steinbach_scene()),
        3 => Ok(shirley_scene()),
        4 => Ok(cornell_box()),
        5 => foggy_scene(),
        _ => Err(SceneError::InvalidParameter {
            element: "test scene".to_string(),
            message: format!("index {} is out of range 0..{}", index, TEST_SCENES.len()),
        }),
    }
}

fn lambertian(albedo: Color) -> Arc<dyn Material> {
    Arc::new(Lambertian::new(albedo))
}

/// Quad of the given full size in the plane spanned by `x` and `y`, facing
/// `x × y`.
fn quad(size: Vec2, origin: Vec3, x: Vec3, y: Vec3, material: Arc<dyn Material>) -> Arc<Quad> {
    Arc::new(Quad::new(size, Transform::from_axes(x, y, x.cross(y), origin), Some(material)))
}

fn ground(size: f32, height: f32, material: Arc<dyn Material>) -> Arc<Quad> {
    quad(Vec2::splat(size), Vec3::new(0.0, height, 0.0), Vec3::X, -Vec3::Z, material)
}

fn sphere_at(center: Vec3, radius: f32, material: Arc<dyn Material>) -> Arc<Sphere> {
    Arc::new(Sphere::new(radius, Transform::from_translation(center), Some(material)))
}

/// One grey diffuse sphere against a dark background.
pub fn sphere_scene() -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let grey = builder.add_material("grey", lambertian(Color::splat(0.6)));
    builder
        .add_surface(Arc::new(Sphere::new(1.0, Transform::IDENTITY, Some(grey))))
        .set_camera(
            Camera::new()
                .with_resolution(512, 512)
                .with_position(Vec3::new(0.0, 0.0, 2.5), Vec3::ZERO, Vec3::Y)
                .with_lens(90.0, 0.0, 1.0),
        )
        .set_background(Color::splat(0.1))
        .set_sampler(Box::new(IndependentSampler::new(10, 0)));
    builder
}

/// A reddish sphere resting on a white plane under a white sky.
pub fn sphere_plane_scene() -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let red = builder.add_material("red", lambertian(Color::new(0.6, 0.4, 0.4)));
    let white = builder.add_material("white", lambertian(Color::ONE));
    builder
        .add_surface(Arc::new(Sphere::new(1.0, Transform::IDENTITY, Some(red))))
        .add_surface(ground(100.0, -1.0, white))
        .set_camera(
            Camera::new()
                .with_resolution(512, 512)
                .with_position(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y)
                .with_lens(90.0, 0.0, 1.0),
        )
        .set_background(Color::ONE)
        .set_sampler(Box::new(IndependentSampler::new(100, 0)));
    builder
}

/// 1600 small spheres on a twisted sheet, a stress test for the BVH.
pub fn steinbach_scene() -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let (count_i, count_j) = (40, 40);
    let lerp = |a: Color, b: Color, t: f32| a + (b - a) * t;

    for i in 0..count_i {
        for j in 0..count_j {
            let s = (i as f32 + 0.5) / count_i as f32;
            let t = (j as f32 + 0.5) / count_j as f32;
            let u = s * 8.0 - 4.0;
            let v = t * 6.25;
            let center = Vec3::new(-u * v.cos(), v * u.cos() * 0.75, u * v.sin());
            let kd = 0.35
                * lerp(
                    lerp(Color::new(0.9, 0.0, 0.0), Color::new(0.0, 0.9, 0.0), t),
                    lerp(Color::new(0.0, 0.0, 0.9), Color::ZERO, t),
                    s,
                );
            builder.add_surface(sphere_at(center, 0.5, lambertian(kd)));
        }
    }

    let floor = builder.add_material("floor", lambertian(Color::splat(0.9)));
    builder
        .add_surface(ground(100.0, -5.0, floor))
        .set_camera(
            Camera::new()
                .with_resolution(512, 512)
                .with_position(Vec3::new(5.0, 15.0, -25.0), Vec3::ZERO, Vec3::Y)
                .with_lens(22.0, 0.0, 1.0),
        )
        .set_background(Color::ONE)
        .set_sampler(Box::new(IndependentSampler::new(100, 0)));
    builder
}

/// The random sphere field from "Ray Tracing in One Weekend".
pub fn shirley_scene() -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let mut rng = SmallRng::seed_from_u64(0x5811_e7);

    let ground_material = builder.add_material("ground", lambertian(Color::splat(0.5)));
    builder.add_surface(ground(100.0, 0.0, ground_material));
    let glass = builder.add_material("glass", Arc::new(Dielectric::new(1.5)));

    for a in -11..11 {
        for b in -11..11 {
            let choose_mat: f32 = rng.gen();
            let center = Vec3::new(a as f32 + 0.9 * rng.gen::<f32>(), 0.2, b as f32 + 0.9 * rng.gen::<f32>());
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let material: Arc<dyn Material> = if choose_mat < 0.8 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                lambertian(albedo)
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    0.5 * (1.0 + rng.gen::<f32>()),
                    0.5 * (1.0 + rng.gen::<f32>()),
                    0.5 * (1.0 + rng.gen::<f32>()),
                );
                Arc::new(Metal::new(albedo, 0.5 * rng.gen::<f32>()))
            } else {
                glass.clone()
            };
            builder.add_surface(sphere_at(center, 0.2, material));
        }
    }

    builder
        .add_surface(sphere_at(Vec3::new(0.0, 1.0, 0.0), 1.0, glass))
        .add_surface(sphere_at(Vec3::new(-4.0, 1.0, 0.0), 1.0, lambertian(Color::new(0.4, 0.2, 0.1))))
        .add_surface(sphere_at(
            Vec3::new(4.0, 1.0, 0.0),
            1.0,
            Arc::new(Metal::new(Color::new(0.7, 0.6, 0.5), 0.0)),
        ))
        .set_camera(
            Camera::new()
                .with_resolution(600, 400)
                .with_position(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
                .with_lens(20.0, 0.6, 10.0),
        )
        .set_background(Color::ONE)
        .set_sampler(Box::new(IndependentSampler::new(100, 0)));
    builder
}

/// Cornell box with a glass and a metal sphere, lit by a small ceiling quad.
pub fn cornell_box() -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let white = builder.add_material("white", lambertian(Color::splat(0.73)));
    let red = builder.add_material("red", lambertian(Color::new(0.65, 0.05, 0.05)));
    let green = builder.add_material("green", lambertian(Color::new(0.12, 0.45, 0.15)));
    let light = builder.add_material("light", Arc::new(DiffuseLight::new(Color::splat(15.0))));
    let glass = builder.add_material("glass", Arc::new(Dielectric::new(1.5)));
    let steel = builder.add_material("steel", Arc::new(Metal::new(Color::splat(0.8), 0.05)));

    let wall = Vec2::splat(2.0);
    builder
        // floor, ceiling, back
        .add_surface(quad(wall, -Vec3::Y, Vec3::X, -Vec3::Z, white.clone()))
        .add_surface(quad(wall, Vec3::Y, Vec3::X, Vec3::Z, white.clone()))
        .add_surface(quad(wall, -Vec3::Z, Vec3::X, Vec3::Y, white))
        // left and right
        .add_surface(quad(wall, -Vec3::X, -Vec3::Z, Vec3::Y, red))
        .add_surface(quad(wall, Vec3::X, Vec3::Z, Vec3::Y, green))
        .add_surface(quad(Vec2::splat(0.5), Vec3::new(0.0, 0.999, 0.0), Vec3::X, Vec3::Z, light))
        .add_surface(sphere_at(Vec3::new(-0.45, -0.6, -0.3), 0.4, glass))
        .add_surface(sphere_at(Vec3::new(0.45, -0.6, 0.3), 0.4, steel))
        .set_camera(
            Camera::new()
                .with_resolution(400, 400)
                .with_position(Vec3::new(0.0, 0.0, 3.8), Vec3::ZERO, Vec3::Y)
                .with_lens(40.0, 0.0, 1.0),
        )
        .set_background(Color::ZERO)
        .set_integrator(Box::new(PathTracerMis::default()))
        .set_sampler(Box::new(IndependentSampler::new(64, 0)));
    builder
}

/// A ball of Perlin-noise smoke over a checkered floor, lit by a small
/// spherical light.
pub fn foggy_scene() -> Result<SceneBuilder, SceneError> {
    let mut builder = SceneBuilder::new();
    let smoke = builder.add_medium(
        "smoke",
        Arc::new(NoiseMedium::new(
            Color::new(0.05, 0.05, 0.1),
            Color::new(2.0, 1.6, 1.2),
            1.0,
            0.4,
            Color::splat(2.5),
            17,
            Arc::new(HenyeyGreenstein::new(0.3)),
        )?),
    );

    let checker = Texture::checker(
        4.0,
        Texture::constant(Color::splat(0.8)),
        Texture::constant(Color::splat(0.2)),
    );
    let floor = builder.add_material("floor", Arc::new(Lambertian::with_texture(checker)));
    let light = builder.add_material("light", Arc::new(DiffuseLight::new(Color::new(40.0, 36.0, 30.0))));

    builder
        .add_surface(Arc::new(Quad::new(
            Vec2::splat(20.0),
            Transform::from_axis_angle(Vec3::X, -FRAC_PI_2),
            Some(floor),
        )))
        .add_surface(Arc::new(
            Sphere::new(1.2, Transform::from_translation(Vec3::new(0.0, 1.2, 0.0)), None)
                .with_medium_interface(MediumInterface::new(Some(smoke), None)),
        ))
        .add_surface(sphere_at(Vec3::new(2.0, 4.0, 1.5), 0.3, light))
        .set_camera(
            Camera::new()
                .with_resolution(480, 320)
                .with_position(Vec3::new(0.0, 2.0, 6.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
                .with_lens(45.0, 0.0, 1.0),
        )
        .set_background(Color::splat(0.05))
        .set_integrator(Box::new(VolpathTracerNee::default()))
        .set_sampler(Box::new(IndependentSampler::new(64, 0)));
    Ok(builder)
}
