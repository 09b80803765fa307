//! Umbra renderer - CPU Monte Carlo light transport.
//!
//! Scenes are assembled with a [`SceneBuilder`] from surfaces, materials and
//! participating media, then rendered bucket by bucket in parallel by one of
//! the [`integrator`]s: debug views, surface path tracers with next-event
//! estimation and multiple importance sampling, and spectral volumetric
//! path tracers.
//!
//! ```no_run
//! use umbra_renderer::test_scenes::cornell_box;
//!
//! let scene = cornell_box().build()?;
//! let image = scene.render();
//! assert_eq!(image.pixels.len(), (image.width * image.height) as usize);
//! # Ok::<(), umbra_renderer::SceneError>(())
//! ```

mod bucket;
mod bvh;
mod camera;
mod error;
mod glossy;
mod material;
mod quad;
mod ray;
mod renderer;
mod sphere;
mod surface;
mod triangle;

pub mod integrator;
pub mod medium;
pub mod phase;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod settings;
pub mod spectral;
pub mod test_scenes;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhNode};
pub use camera::Camera;
pub use error::SceneError;
pub use glossy::{fresnel_conductor, Beckmann, BlinnPhong, OrenNayar, Phong};
pub use material::{
    fresnel_dielectric, reflect, refract, Blend, Color, Dielectric, DiffuseLight, Lambertian, Material, Metal,
    ScatterRecord,
};
pub use quad::Quad;
pub use ray::Ray;
pub use renderer::{color_to_rgba, render, render_pixel, ImageBuffer};
pub use scene::{Accelerator, Scene, SceneBuilder};
pub use settings::RenderSettings;
pub use sphere::Sphere;
pub use surface::{HitRecord, Surface, SurfaceGroup};
pub use triangle::{Triangle, TriangleMesh};

/// Re-export Vec3 and common math types from umbra_math
pub use umbra_math::{Aabb, Transform, Vec2, Vec3};
