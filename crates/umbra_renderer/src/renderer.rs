//! Parallel render loop and output buffer.
//!
//! The image is split into buckets rendered in parallel with rayon. Each
//! bucket gets its own fork of the scene's sampler; samplers reseed per
//! pixel, so the result does not depend on thread scheduling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::material::Color;
use crate::sampler::Sampler;
use crate::scene::Scene;

/// sRGB transfer curve for a linear value in `[0, 1]`.
#[inline]
pub fn encode_srgb(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Quantize a linear radiance value to an 8-bit sRGB channel.
/// Values outside `[0, 1]` (and NaN) are clipped first.
#[inline]
fn quantize(linear: f32) -> u8 {
    let clipped = if linear > 0.0 { linear.min(1.0) } else { 0.0 };
    (255.0 * encode_srgb(clipped) + 0.5) as u8
}

/// Linear radiance to opaque 8-bit sRGB.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    [quantize(color.x), quantize(color.y), quantize(color.z), u8::MAX]
}

/// Row-major linear RGB radiance, row 0 at the top.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Black image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; len],
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }

    /// Radiance at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.pixels[self.offset(x, y)]
    }

    /// Mutable access to the radiance at column `x`, row `y`.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut Color {
        let offset = self.offset(x, y);
        &mut self.pixels[offset]
    }

    /// Copy a rendered bucket into its region of the image.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (row, span) in result.pixels.chunks(bucket.width as usize).enumerate() {
            let start = self.offset(bucket.x, bucket.y + row as u32);
            self.pixels[start..start + span.len()].copy_from_slice(span);
        }
    }

    /// Packed 8-bit sRGBA, suitable for `image::RgbaImage::from_raw`.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&c| color_to_rgba(c)).collect()
    }
}

/// Estimate one pixel's radiance.
///
/// Returns the mean over finite samples and the number of samples dropped
/// because the integrator returned NaN or infinity.
pub fn render_pixel(scene: &Scene, sampler: &mut dyn Sampler, x: u32, y: u32) -> (Color, usize) {
    let camera = scene.camera();
    let integrator = scene.integrator();

    sampler.start_pixel(x, y);
    let mut sum = Color::ZERO;
    let mut kept = 0usize;
    let mut dropped = 0usize;

    while sampler.start_next_pixel_sample() {
        let jitter = sampler.next_2d();
        let lens = sampler.next_2d();
        let ray = camera.get_ray(x as f32 + jitter.x, y as f32 + jitter.y, lens);
        let radiance = integrator.li(scene, sampler, &ray);
        if radiance.is_finite() {
            sum += radiance;
            kept += 1;
        } else {
            dropped += 1;
        }
    }

    let color = if kept > 0 { sum / kept as f32 } else { Color::ZERO };
    (color, dropped)
}

/// Render the scene's camera view.
pub fn render(scene: &Scene) -> ImageBuffer {
    let camera = scene.camera();
    let (width, height) = (camera.image_width, camera.image_height);
    let buckets = generate_buckets(width, height, DEFAULT_BUCKET_SIZE);
    let total = buckets.len();

    info!(
        "Rendering {}x{} at {} spp in {} buckets",
        width,
        height,
        scene.sampler().samples_per_pixel(),
        total
    );
    let start = Instant::now();
    let completed = AtomicUsize::new(0);

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let mut sampler = scene.sampler().fork(bucket.index as u64);
            let result = render_bucket(bucket, scene, sampler.as_mut());
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Bucket {}/{} done", done, total);
            result
        })
        .collect();

    let mut image = ImageBuffer::new(width, height);
    let mut dropped = 0;
    for result in &results {
        image.write_bucket(result);
        dropped += result.dropped_samples;
    }

    if dropped > 0 {
        warn!("Dropped {} non-finite samples", dropped);
    }
    info!("Render finished in {:.2?}", start.elapsed());

    image
}
