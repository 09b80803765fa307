//! Image tiling for the parallel render loop.

use crate::material::Color;
use crate::renderer::render_pixel;
use crate::sampler::Sampler;
use crate::scene::Scene;

/// Default bucket edge length in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// A tile of the image, rendered as one unit of parallel work.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    /// Upper left pixel
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in the render order; also seeds the bucket's sampler
    pub index: usize,
}

impl Bucket {
    /// Region at `(x, y)` of the given size; `index` is its render order.
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Squared distance from the bucket's center to `(cx, cy)`.
    fn distance_squared(&self, cx: f32, cy: f32) -> f32 {
        let dx = self.x as f32 + 0.5 * self.width as f32 - cx;
        let dy = self.y as f32 + 0.5 * self.height as f32 - cy;
        dx * dx + dy * dy
    }

    /// Pixel coordinates in row-major order.
    fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Tile a `width × height` image with square buckets (clipped at the right
/// and bottom edges), ordered from the image center outward.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width)
                .step_by(size as usize)
                .map(move |x| Bucket::new(x, y, size.min(width - x), size.min(height - y), 0))
        })
        .collect();

    let (cx, cy) = (0.5 * width as f32, 0.5 * height as f32);
    buckets.sort_by(|a, b| a.distance_squared(cx, cy).total_cmp(&b.distance_squared(cx, cy)));
    for (index, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = index;
    }
    buckets
}

/// Render every pixel of `bucket` with `sampler`.
pub fn render_bucket(bucket: &Bucket, scene: &Scene, sampler: &mut dyn Sampler) -> BucketResult {
    let mut dropped_samples = 0;
    let pixels = bucket
        .pixels()
        .map(|(x, y)| {
            let (color, dropped) = render_pixel(scene, sampler, x, y);
            dropped_samples += dropped;
            color
        })
        .collect();

    BucketResult {
        bucket: *bucket,
        pixels,
        dropped_samples,
    }
}

/// Output of [`render_bucket`].
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Pixel colors in row-major order
    pub pixels: Vec<Color>,
    /// Samples discarded for non-finite radiance
    pub dropped_samples: usize,
}
