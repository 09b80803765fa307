//! Sample generators.
//!
//! A sampler is owned by one worker at a time. Calling
//! [`Sampler::start_pixel`] reseeds it from `(seed, x, y)`, so a pixel gets
//! the same numbers no matter which thread or bucket renders it.
//!
//! ```text
//! sampler.start_pixel(x, y);
//! while sampler.start_next_pixel_sample() {
//!     let u = sampler.next_2d();
//!     ...
//! }
//! ```

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::sampling::ONE_MINUS_EPSILON;
use umbra_math::Vec2;

/// Default number of precomputed dimensions for stratified and Halton samplers.
pub const DEFAULT_DIMENSIONS: usize = 16;

pub trait Sampler: Send + Sync {
    fn samples_per_pixel(&self) -> usize;

    /// Begin a new pixel; the next call to `start_next_pixel_sample` starts
    /// its first sample.
    fn start_pixel(&mut self, x: u32, y: u32);

    /// Advance to the next sample of the current pixel. Returns `false` once
    /// all samples have been produced.
    fn start_next_pixel_sample(&mut self) -> bool;

    /// Uniform number in `[0,1)`.
    fn next_1d(&mut self) -> f32;

    /// Uniform point in `[0,1)²`.
    fn next_2d(&mut self) -> Vec2;

    /// A sampler with the same configuration and an independent stream.
    fn fork(&self, seed: u64) -> Box<dyn Sampler>;
}

/// SplitMix64 finalizer, used to derive well-spread seeds.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn pixel_seed(seed: u64, x: u32, y: u32) -> u64 {
    mix(seed ^ mix(((y as u64) << 32) | x as u64))
}

/// Shared per-pixel sample counting.
#[derive(Debug, Clone)]
struct PixelState {
    spp: usize,
    /// Index of the current sample
    current: usize,
    /// Index the next `start_next_pixel_sample` will move to
    next: usize,
}

impl PixelState {
    fn new(spp: usize) -> Self {
        Self {
            spp: spp.max(1),
            current: 0,
            next: 0,
        }
    }

    fn reset(&mut self) {
        self.current = 0;
        self.next = 0;
    }

    fn advance(&mut self) -> bool {
        if self.next >= self.spp {
            return false;
        }
        self.current = self.next;
        self.next += 1;
        true
    }
}

/// Uniform random numbers with no stratification.
#[derive(Debug, Clone)]
pub struct IndependentSampler {
    seed: u64,
    state: PixelState,
    rng: SmallRng,
}

impl IndependentSampler {
    /// `seed` is mixed with the pixel coordinates in `start_pixel`.
    pub fn new(samples_per_pixel: usize, seed: u64) -> Self {
        Self {
            seed,
            state: PixelState::new(samples_per_pixel),
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for IndependentSampler {
    fn samples_per_pixel(&self) -> usize {
        self.state.spp
    }

    fn start_pixel(&mut self, x: u32, y: u32) {
        self.state.reset();
        self.rng = SmallRng::seed_from_u64(pixel_seed(self.seed, x, y));
    }

    fn start_next_pixel_sample(&mut self) -> bool {
        self.state.advance()
    }

    fn next_1d(&mut self) -> f32 {
        self.rng.gen::<f32>().min(ONE_MINUS_EPSILON)
    }

    fn next_2d(&mut self) -> Vec2 {
        Vec2::new(self.next_1d(), self.next_1d())
    }

    fn fork(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new(self.state.spp, mix(self.seed ^ mix(seed))))
    }
}

/// Jittered strata, shuffled independently per dimension.
///
/// The sample count is rounded up to a perfect square so 2-D strata form a
/// grid. Dimensions past `dimensions` fall back to independent numbers.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    seed: u64,
    state: PixelState,
    rng: SmallRng,
    strata: usize,
    dimensions: usize,
    samples_1d: Vec<Vec<f32>>,
    samples_2d: Vec<Vec<Vec2>>,
    dim_1d: usize,
    dim_2d: usize,
}

impl StratifiedSampler {
    /// Rounds `samples_per_pixel` up to a perfect square. `dimensions` is the
    /// number of stratified 1D and 2D dimensions precomputed per pixel.
    pub fn new(samples_per_pixel: usize, dimensions: usize, seed: u64) -> Self {
        let strata = (samples_per_pixel.max(1) as f64).sqrt().ceil() as usize;
        let spp = strata * strata;
        Self {
            seed,
            state: PixelState::new(spp),
            rng: SmallRng::seed_from_u64(seed),
            strata,
            dimensions,
            samples_1d: vec![vec![0.0; spp]; dimensions],
            samples_2d: vec![vec![Vec2::ZERO; spp]; dimensions],
            dim_1d: 0,
            dim_2d: 0,
        }
    }

    fn jitter(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    fn generate(&mut self) {
        let spp = self.state.spp;
        let n = self.strata;
        for d in 0..self.dimensions {
            for i in 0..spp {
                let v = (i as f32 + self.jitter()) / spp as f32;
                self.samples_1d[d][i] = v.min(ONE_MINUS_EPSILON);
            }
            for y in 0..n {
                for x in 0..n {
                    let u = (x as f32 + self.jitter()) / n as f32;
                    let v = (y as f32 + self.jitter()) / n as f32;
                    self.samples_2d[d][y * n + x] =
                        Vec2::new(u.min(ONE_MINUS_EPSILON), v.min(ONE_MINUS_EPSILON));
                }
            }
            self.samples_1d[d].shuffle(&mut self.rng);
            self.samples_2d[d].shuffle(&mut self.rng);
        }
    }
}

impl Sampler for StratifiedSampler {
    fn samples_per_pixel(&self) -> usize {
        self.state.spp
    }

    fn start_pixel(&mut self, x: u32, y: u32) {
        self.state.reset();
        self.rng = SmallRng::seed_from_u64(pixel_seed(self.seed, x, y));
        self.generate();
    }

    fn start_next_pixel_sample(&mut self) -> bool {
        self.dim_1d = 0;
        self.dim_2d = 0;
        self.state.advance()
    }

    fn next_1d(&mut self) -> f32 {
        if self.dim_1d < self.dimensions {
            let v = self.samples_1d[self.dim_1d][self.state.current];
            self.dim_1d += 1;
            v
        } else {
            self.rng.gen::<f32>().min(ONE_MINUS_EPSILON)
        }
    }

    fn next_2d(&mut self) -> Vec2 {
        if self.dim_2d < self.dimensions {
            let v = self.samples_2d[self.dim_2d][self.state.current];
            self.dim_2d += 1;
            v
        } else {
            Vec2::new(
                self.rng.gen::<f32>().min(ONE_MINUS_EPSILON),
                self.rng.gen::<f32>().min(ONE_MINUS_EPSILON),
            )
        }
    }

    fn fork(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new(
            self.state.spp,
            self.dimensions,
            mix(self.seed ^ mix(seed)),
        ))
    }
}

/// Halton sequence with random digit permutations per dimension.
#[derive(Debug, Clone)]
pub struct HaltonSampler {
    seed: u64,
    state: PixelState,
    rng: SmallRng,
    primes: Vec<u64>,
    permutations: Vec<Vec<u16>>,
    pixel_index: u64,
    dimension: usize,
}

impl HaltonSampler {
    /// Uses the first `dimensions` primes as bases, each with a digit
    /// permutation drawn from `seed`.
    pub fn new(samples_per_pixel: usize, dimensions: usize, seed: u64) -> Self {
        let primes = first_primes(dimensions);
        let mut rng = SmallRng::seed_from_u64(seed);
        let permutations = primes
            .iter()
            .map(|&base| {
                let mut perm: Vec<u16> = (0..base as u16).collect();
                perm.shuffle(&mut rng);
                perm
            })
            .collect();

        Self {
            seed,
            state: PixelState::new(samples_per_pixel),
            rng,
            primes,
            permutations,
            pixel_index: 0,
            dimension: 0,
        }
    }

    fn sample_index(&self) -> u64 {
        self.pixel_index * self.state.spp as u64 + self.state.current as u64
    }

    fn next_dimension(&mut self) -> f32 {
        if self.dimension < self.primes.len() {
            let d = self.dimension;
            self.dimension += 1;
            scrambled_radical_inverse(self.primes[d], self.sample_index(), &self.permutations[d])
        } else {
            self.rng.gen::<f32>().min(ONE_MINUS_EPSILON)
        }
    }
}

impl Sampler for HaltonSampler {
    fn samples_per_pixel(&self) -> usize {
        self.state.spp
    }

    fn start_pixel(&mut self, x: u32, y: u32) {
        self.state.reset();
        self.pixel_index = ((y as u64) << 20) | x as u64;
        self.rng = SmallRng::seed_from_u64(pixel_seed(self.seed, x, y));
    }

    fn start_next_pixel_sample(&mut self) -> bool {
        self.dimension = 0;
        self.state.advance()
    }

    fn next_1d(&mut self) -> f32 {
        self.next_dimension()
    }

    fn next_2d(&mut self) -> Vec2 {
        let u = self.next_dimension();
        let v = self.next_dimension();
        Vec2::new(u, v)
    }

    /// Forks keep the digit permutations so every bucket samples the same
    /// sequence; only the fallback stream changes.
    fn fork(&self, seed: u64) -> Box<dyn Sampler> {
        let mut forked = self.clone();
        forked.seed = mix(self.seed ^ mix(seed));
        forked.rng = SmallRng::seed_from_u64(forked.seed);
        Box::new(forked)
    }
}

/// The first `count` primes.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Radical inverse of `a` in `base` with every digit, including the infinite
/// tail of zeros, passed through `perm`.
fn scrambled_radical_inverse(base: u64, mut a: u64, perm: &[u16]) -> f32 {
    let inv_base = 1.0 / base as f64;
    let mut reversed = 0u64;
    let mut inv_base_n = 1.0f64;
    while a > 0 {
        let next = a / base;
        let digit = a - next * base;
        reversed = reversed * base + perm[digit as usize] as u64;
        inv_base_n *= inv_base;
        a = next;
    }
    // Permuted zeros past the last digit form a geometric series
    let tail = inv_base * perm[0] as f64 / (1.0 - inv_base);
    ((inv_base_n * (reversed as f64 + tail)) as f32).min(ONE_MINUS_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(sampler: &mut dyn Sampler, x: u32, y: u32) -> Vec<Vec2> {
        sampler.start_pixel(x, y);
        let mut out = Vec::new();
        while sampler.start_next_pixel_sample() {
            out.push(sampler.next_2d());
        }
        out
    }

    #[test]
    fn test_independent_is_reproducible_per_pixel() {
        let mut a = IndependentSampler::new(8, 42);
        let mut b = IndependentSampler::new(8, 42);
        collect(&mut b, 5, 5);
        assert_eq!(collect(&mut a, 3, 4), collect(&mut b, 3, 4));
        assert_ne!(collect(&mut a, 3, 4), collect(&mut a, 4, 3));
        assert_eq!(collect(&mut a, 0, 0).len(), 8);
    }

    #[test]
    fn test_stratified_rounds_to_square() {
        let sampler = StratifiedSampler::new(10, 4, 1);
        assert_eq!(sampler.samples_per_pixel(), 16);
    }

    #[test]
    fn test_stratified_covers_every_stratum() {
        let mut sampler = StratifiedSampler::new(16, 4, 7);
        let samples = collect(&mut sampler, 2, 9);
        let mut seen = [false; 16];
        for s in &samples {
            let cell = (s.y * 4.0) as usize * 4 + (s.x * 4.0) as usize;
            seen[cell] = true;
        }
        assert!(seen.iter().all(|&s| s));

        // 1-D strata as well
        sampler.start_pixel(2, 9);
        let mut seen = [false; 16];
        while sampler.start_next_pixel_sample() {
            seen[(sampler.next_1d() * 16.0) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_stratified_falls_back_past_dimensions() {
        let mut sampler = StratifiedSampler::new(4, 1, 3);
        sampler.start_pixel(0, 0);
        assert!(sampler.start_next_pixel_sample());
        let _ = sampler.next_1d();
        let v = sampler.next_1d();
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn test_first_primes() {
        assert_eq!(first_primes(6), vec![2, 3, 5, 7, 11, 13]);
    }

    #[test]
    fn test_radical_inverse_identity_permutation() {
        let perm: Vec<u16> = vec![0, 1];
        // 6 = 110b -> 0.011b
        assert!((scrambled_radical_inverse(2, 6, &perm) - 0.375).abs() < 1e-6);
        let perm: Vec<u16> = vec![0, 1, 2];
        // 5 = 12 in base 3 -> 0.21 = 2/3 + 1/9
        assert!((scrambled_radical_inverse(3, 5, &perm) - 7.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_halton_values_in_range_and_well_spread() {
        let mut sampler = HaltonSampler::new(64, DEFAULT_DIMENSIONS, 11);
        let samples = collect(&mut sampler, 10, 20);
        assert_eq!(samples.len(), 64);
        let mean = samples.iter().fold(Vec2::ZERO, |acc, s| acc + *s) / 64.0;
        for s in &samples {
            assert!((0.0..1.0).contains(&s.x) && (0.0..1.0).contains(&s.y));
        }
        assert!((mean.x - 0.5).abs() < 0.05 && (mean.y - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_fork_changes_stream() {
        let base = IndependentSampler::new(4, 42);
        let mut a = base.fork(1);
        let mut b = base.fork(2);
        assert_ne!(collect(a.as_mut(), 0, 0), collect(b.as_mut(), 0, 0));
        assert_eq!(a.samples_per_pixel(), 4);
    }
}
