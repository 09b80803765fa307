//! Scene composition root.
//!
//! A [`SceneBuilder`] collects named materials and media, surfaces, the
//! camera and render settings; [`SceneBuilder::build`] validates them and
//! freezes everything into an immutable [`Scene`] that worker threads share.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::Deserialize;

use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::error::SceneError;
use crate::integrator::{Integrator, VolpathTracerNee};
use crate::material::{Color, Material};
use crate::medium::Medium;
use crate::renderer::{render, ImageBuffer};
use crate::sampler::{IndependentSampler, Sampler};
use crate::settings::RenderSettings;
use crate::surface::{HitRecord, Surface, SurfaceGroup};
use crate::triangle::TriangleMesh;
use crate::Ray;
use umbra_core::Mesh;
use umbra_math::{Transform, Vec3};

/// Default background radiance.
pub const DEFAULT_BACKGROUND: f32 = 0.2;

/// Spatial index used for the scene geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    #[default]
    Bvh,
    /// Test every surface in turn
    Linear,
}

/// An immutable scene ready to render.
pub struct Scene {
    geometry: Box<dyn Surface>,
    emitters: SurfaceGroup,
    camera: Camera,
    background: Color,
    integrator: Box<dyn Integrator>,
    sampler: Box<dyn Sampler>,
}

impl Scene {
    /// Nearest surface hit along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        self.geometry.intersect(ray)
    }

    /// Emissive surfaces, for light sampling.
    pub fn emitters(&self) -> &SurfaceGroup {
        &self.emitters
    }

    /// Radiance of rays that leave the scene.
    pub fn background(&self) -> Color {
        self.background
    }

    /// The initialized camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Light transport algorithm used by [`Scene::render`].
    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    /// Prototype sampler; the render loop forks one per bucket.
    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    /// Render the camera view with the scene's integrator and sampler.
    pub fn render(&self) -> ImageBuffer {
        render(self)
    }
}

/// Incrementally assembles a [`Scene`].
pub struct SceneBuilder {
    materials: HashMap<String, Arc<dyn Material>>,
    media: HashMap<String, Arc<dyn Medium>>,
    surfaces: Vec<Arc<dyn Surface>>,
    emitters: SurfaceGroup,
    camera: Option<Camera>,
    background: Color,
    accelerator: Accelerator,
    integrator: Option<Box<dyn Integrator>>,
    sampler: Option<Box<dyn Sampler>>,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    /// Empty scene with the default background, BVH accelerator and no camera.
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            media: HashMap::new(),
            surfaces: Vec::new(),
            emitters: SurfaceGroup::new(),
            camera: None,
            background: Color::splat(DEFAULT_BACKGROUND),
            accelerator: Accelerator::default(),
            integrator: None,
            sampler: None,
        }
    }

    /// Register a material under `name`, replacing any previous one.
    /// Returns the material for immediate use.
    pub fn add_material(&mut self, name: impl Into<String>, material: Arc<dyn Material>) -> Arc<dyn Material> {
        self.materials.insert(name.into(), material.clone());
        material
    }

    /// Look up a registered material.
    pub fn material(&self, name: &str) -> Result<Arc<dyn Material>, SceneError> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownMaterial(name.to_string()))
    }

    /// Register a medium under `name`, replacing any previous one.
    pub fn add_medium(&mut self, name: impl Into<String>, medium: Arc<dyn Medium>) -> Arc<dyn Medium> {
        self.media.insert(name.into(), medium.clone());
        medium
    }

    /// Look up a registered medium.
    pub fn medium(&self, name: &str) -> Result<Arc<dyn Medium>, SceneError> {
        self.media
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownMedium(name.to_string()))
    }

    /// Add geometry. Emissive surfaces are also added to the emitter group.
    pub fn add_surface(&mut self, surface: Arc<dyn Surface>) -> &mut Self {
        if surface.is_emissive() {
            self.emitters.add(surface.clone());
        }
        self.surfaces.push(surface);
        self
    }

    /// [`SceneBuilder::add_surface`] for each item.
    pub fn add_surfaces(&mut self, surfaces: impl IntoIterator<Item = Arc<dyn Surface>>) -> &mut Self {
        for surface in surfaces {
            self.add_surface(surface);
        }
        self
    }

    /// Required; [`SceneBuilder::build`] fails without one.
    pub fn set_camera(&mut self, camera: Camera) -> &mut Self {
        self.camera = Some(camera);
        self
    }

    /// Constant radiance seen by escaping rays.
    pub fn set_background(&mut self, background: Color) -> &mut Self {
        self.background = background;
        self
    }

    /// Spatial index built over the surfaces.
    pub fn set_accelerator(&mut self, accelerator: Accelerator) -> &mut Self {
        self.accelerator = accelerator;
        self
    }

    /// Defaults to [`VolpathTracerNee`] when unset.
    pub fn set_integrator(&mut self, integrator: Box<dyn Integrator>) -> &mut Self {
        self.integrator = Some(integrator);
        self
    }

    /// Defaults to an [`IndependentSampler`] when unset.
    pub fn set_sampler(&mut self, sampler: Box<dyn Sampler>) -> &mut Self {
        self.sampler = Some(sampler);
        self
    }

    /// Build a triangle mesh from raw vertex and index buffers, place it
    /// with `xform` and add one surface per face.
    ///
    /// Malformed buffers are reported as [`SceneError::Mesh`].
    pub fn add_mesh(
        &mut self,
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        xform: &Transform,
        material: Option<Arc<dyn Material>>,
    ) -> Result<&mut Self, SceneError> {
        let mesh = Mesh::new(positions, indices)?.transformed(xform);
        Ok(self.add_surfaces(TriangleMesh::new(mesh, material).into_triangles()))
    }

    /// Take integrator, sampler, background and accelerator from `settings`.
    pub fn apply_settings(&mut self, settings: &RenderSettings) -> &mut Self {
        self.integrator = Some(settings.build_integrator());
        self.sampler = Some(settings.sampler.build());
        self.background = Color::from_array(settings.background);
        self.accelerator = settings.accelerator;
        self
    }

    /// Validate, build the accelerator and freeze the scene.
    pub fn build(self) -> Result<Scene, SceneError> {
        let mut camera = self.camera.ok_or(SceneError::MissingCamera)?;
        camera.initialize();

        let surface_count = self.surfaces.len();
        let geometry: Box<dyn Surface> = match self.accelerator {
            Accelerator::Bvh => Box::new(Bvh::new(self.surfaces)),
            Accelerator::Linear => Box::new(SurfaceGroup::from_surfaces(self.surfaces)),
        };

        info!(
            "Built scene: {} surfaces ({} emitters), {} materials, {} media, {:?} accelerator",
            surface_count,
            self.emitters.len(),
            self.materials.len(),
            self.media.len(),
            self.accelerator
        );

        Ok(Scene {
            geometry,
            emitters: self.emitters,
            camera,
            background: self.background,
            integrator: self
                .integrator
                .unwrap_or_else(|| Box::new(VolpathTracerNee::default())),
            sampler: self
                .sampler
                .unwrap_or_else(|| Box::new(IndependentSampler::new(16, 0))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::HomogeneousMedium;
    use crate::phase::HenyeyGreenstein;
    use crate::{DiffuseLight, Lambertian, Sphere};
    use umbra_core::MeshError;

    fn sphere(z: f32, material: Arc<dyn Material>) -> Arc<dyn Surface> {
        Arc::new(Sphere::new(
            0.5,
            Transform::from_translation(Vec3::new(0.0, 0.0, z)),
            Some(material),
        ))
    }

    #[test]
    fn test_missing_camera_is_fatal() {
        let result = SceneBuilder::new().build();
        assert!(matches!(result, Err(SceneError::MissingCamera)));
    }

    #[test]
    fn test_named_tables() {
        let mut builder = SceneBuilder::new();
        builder.add_material("grey", Arc::new(Lambertian::new(Vec3::splat(0.5))));
        builder.add_medium(
            "fog",
            Arc::new(HomogeneousMedium::new(
                Vec3::ONE,
                Vec3::ONE,
                Arc::new(HenyeyGreenstein::isotropic()),
            )),
        );

        assert!(builder.material("grey").is_ok());
        assert!(builder.medium("fog").is_ok());
        match builder.material("gold") {
            Err(SceneError::UnknownMaterial(name)) => assert_eq!(name, "gold"),
            _ => panic!("expected an unknown material error"),
        }
        assert!(matches!(builder.medium("smoke"), Err(SceneError::UnknownMedium(_))));
    }

    #[test]
    fn test_emissive_surfaces_are_mirrored() {
        let mut builder = SceneBuilder::new();
        let grey = builder.add_material("grey", Arc::new(Lambertian::new(Vec3::splat(0.5))));
        let light = builder.add_material("light", Arc::new(DiffuseLight::new(Vec3::splat(4.0))));
        builder
            .add_surface(sphere(-2.0, grey.clone()))
            .add_surface(sphere(-4.0, light))
            .add_surface(sphere(-6.0, grey))
            .set_camera(Camera::new());
        let scene = builder.build().unwrap();

        assert_eq!(scene.emitters().len(), 1);
        assert_eq!(scene.background(), Vec3::splat(DEFAULT_BACKGROUND));
        let hit = scene.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z)).unwrap();
        assert!((hit.t - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_accelerators_agree() {
        let build = |accelerator| {
            let mut builder = SceneBuilder::new();
            let grey = builder.add_material("grey", Arc::new(Lambertian::new(Vec3::splat(0.5))));
            for i in 0..20 {
                builder.add_surface(sphere(-1.5 * i as f32, grey.clone()));
            }
            builder.set_camera(Camera::new()).set_accelerator(accelerator);
            builder.build().unwrap()
        };
        let bvh = build(Accelerator::Bvh);
        let linear = build(Accelerator::Linear);

        for i in 0..50 {
            let origin = Vec3::new(0.3 * (i as f32 * 0.7).sin(), 0.2, 5.0);
            let ray = Ray::new(origin, Vec3::new(0.0, -0.01 * i as f32, -1.0));
            let a = bvh.intersect(&ray).map(|h| h.t);
            let b = linear.intersect(&ray).map(|h| h.t);
            match (a, b) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-5),
                (None, None) => {}
                _ => panic!("accelerators disagree on ray {}", i),
            }
        }
    }

    #[test]
    fn test_add_mesh() {
        let mut builder = SceneBuilder::new();
        let light = builder.add_material("light", Arc::new(DiffuseLight::new(Vec3::splat(4.0))));
        let square = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        builder
            .add_mesh(
                square,
                vec![0, 1, 2, 0, 2, 3],
                &Transform::from_translation(Vec3::new(0.0, 0.0, -3.0)),
                Some(light),
            )
            .unwrap()
            .set_camera(Camera::new());
        let scene = builder.build().unwrap();

        assert_eq!(scene.emitters().len(), 2);
        let hit = scene.intersect(&Ray::new(Vec3::new(0.2, 0.3, 0.0), -Vec3::Z)).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_add_mesh_rejects_bad_index() {
        let mut builder = SceneBuilder::new();
        let triangle = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        match builder.add_mesh(triangle, vec![0, 1, 5], &Transform::IDENTITY, None) {
            Err(SceneError::Mesh(MeshError::IndexOutOfRange { index, .. })) => assert_eq!(index, 5),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("out of range index was accepted"),
        }
        let err = builder
            .add_mesh(vec![Vec3::ZERO; 3], vec![0, 1], &Transform::IDENTITY, None)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("invalid mesh"));
    }

    #[test]
    fn test_apply_settings() {
        let settings = RenderSettings::from_json_str(
            r#"{ "sampler": { "type": "stratified", "samples": 10 }, "background": [1, 0, 0] }"#,
        )
        .unwrap();
        let mut builder = SceneBuilder::new();
        builder.set_camera(Camera::new()).apply_settings(&settings);
        let scene = builder.build().unwrap();

        assert_eq!(scene.background(), Vec3::X);
        // Stratified rounds up to a perfect square
        assert_eq!(scene.sampler().samples_per_pixel(), 16);
    }
}
