//! Thin-lens camera.
//!
//! Rays are built in camera space, where the camera sits at the origin
//! looking down -Z with the film on the plane of focus, and then mapped to
//! world space with a look-at placement.

use std::sync::Arc;

use crate::medium::Medium;
use crate::sampling::sample_concentric_disk;
use crate::Ray;
use umbra_math::{Transform, Vec2, Vec3};

#[derive(Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    eye: Vec3,
    target: Vec3,
    up: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,
    /// Cone angle (degrees) subtended by the aperture at the focus plane
    defocus_angle: f32,
    focus_dist: f32,

    medium: Option<Arc<dyn Medium>>,

    // Derived by initialize()
    camera_to_world: Transform,
    film_half_extent: Vec2,
    lens_radius: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            eye: Vec3::ZERO,
            target: -Vec3::Z,
            up: Vec3::Y,
            vfov: 90.0,
            defocus_angle: 0.0,
            focus_dist: 1.0,
            medium: None,
            camera_to_world: Transform::IDENTITY,
            film_half_extent: Vec2::ONE,
            lens_radius: 0.0,
        }
    }

    /// Image size in pixels; zero is raised to one.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.eye = look_from;
        self.target = look_at;
        self.up = vup;
        self
    }

    /// Field of view, aperture and focus distance.
    ///
    /// A `defocus_angle` of zero gives a pinhole.
    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    /// Embed the camera in a participating medium.
    pub fn with_medium(mut self, medium: Option<Arc<dyn Medium>>) -> Self {
        self.medium = medium;
        self
    }

    /// Derive the placement and film size. Must run before [`Camera::get_ray`];
    /// [`SceneBuilder::build`](crate::SceneBuilder::build) does it.
    pub fn initialize(&mut self) {
        self.camera_to_world = Transform::look_at(self.eye, self.target, self.up);

        let aspect = self.image_width as f32 / self.image_height as f32;
        let half_height = self.focus_dist * (0.5 * self.vfov.to_radians()).tan();
        self.film_half_extent = Vec2::new(aspect * half_height, half_height);

        self.lens_radius = if self.defocus_angle > 0.0 {
            self.focus_dist * (0.5 * self.defocus_angle.to_radians()).tan()
        } else {
            0.0
        };
    }

    /// Ray through continuous raster position `(px, py)`.
    ///
    /// `(0, 0)` is the upper left corner of the image; pixel `(i, j)` spans
    /// `[i, i+1) × [j, j+1)`. `lens_u` picks the point on the aperture.
    pub fn get_ray(&self, px: f32, py: f32, lens_u: Vec2) -> Ray {
        let s = 2.0 * px / self.image_width as f32 - 1.0;
        let t = 1.0 - 2.0 * py / self.image_height as f32;
        let on_film = Vec3::new(s * self.film_half_extent.x, t * self.film_half_extent.y, -self.focus_dist);

        let on_lens = if self.lens_radius > 0.0 {
            (self.lens_radius * sample_concentric_disk(lens_u)).extend(0.0)
        } else {
            Vec3::ZERO
        };

        let origin = self.camera_to_world.point(on_lens);
        let direction = self.camera_to_world.vector(on_film - on_lens).normalize();
        Ray::new(origin, direction)
            .with_range(0.0, f32::INFINITY)
            .with_medium(self.medium.clone())
    }

    pub fn medium(&self) -> Option<&Arc<dyn Medium>> {
        self.medium.as_ref()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::HomogeneousMedium;
    use crate::phase::HenyeyGreenstein;

    fn pinhole(eye: Vec3, target: Vec3) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(100, 100)
            .with_position(eye, target, Vec3::Y)
            .with_lens(90.0, 0.0, 1.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_center_ray_looks_at_target() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec3::new(-2.0, 0.0, 1.0);
        let camera = pinhole(eye, target);

        let ray = camera.get_ray(50.0, 50.0, Vec2::splat(0.5));
        assert!((ray.origin - eye).length() < 1e-5);
        assert!((ray.direction - (target - eye).normalize()).length() < 1e-5);
        assert!(ray.medium.is_none());
    }

    #[test]
    fn test_corners_span_fov() {
        let camera = pinhole(Vec3::ZERO, -Vec3::Z);

        // Upper left corner at 45 degrees on both axes
        let ray = camera.get_ray(0.0, 0.0, Vec2::ZERO);
        let expected = Vec3::new(-1.0, 1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);

        let ray = camera.get_ray(100.0, 100.0, Vec2::ZERO);
        let expected = Vec3::new(1.0, -1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_aspect_ratio_widens_horizontal_fov() {
        let mut camera = Camera::new()
            .with_resolution(200, 100)
            .with_lens(90.0, 0.0, 1.0);
        camera.initialize();

        // Right edge, vertically centered: x = aspect · tan(45°)
        let ray = camera.get_ray(200.0, 50.0, Vec2::ZERO);
        let expected = Vec3::new(2.0, 0.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_defocus_keeps_focus_plane_sharp() {
        let mut camera = Camera::new()
            .with_resolution(64, 64)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(40.0, 10.0, 5.0);
        camera.initialize();

        // Rays through the same raster point meet on the focus plane
        let a = camera.get_ray(20.0, 30.0, Vec2::new(0.1, 0.9));
        let b = camera.get_ray(20.0, 30.0, Vec2::new(0.8, 0.3));
        assert!((a.origin - b.origin).length() > 1e-3);
        let pa = a.at(-5.0 / a.direction.z);
        let pb = b.at(-5.0 / b.direction.z);
        assert!((pa - pb).length() < 1e-3);
    }

    #[test]
    fn test_rays_carry_camera_medium() {
        let fog: Arc<dyn Medium> = Arc::new(HomogeneousMedium::new(
            Vec3::splat(0.1),
            Vec3::splat(0.1),
            Arc::new(HenyeyGreenstein::isotropic()),
        ));
        let mut camera = Camera::new().with_resolution(8, 8).with_medium(Some(fog));
        camera.initialize();

        assert!(camera.medium().is_some());
        assert!(camera.get_ray(4.0, 4.0, Vec2::ZERO).medium.is_some());
    }
}
