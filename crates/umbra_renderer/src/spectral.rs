//! Hero-channel bookkeeping for chromatic media.
//!
//! Free-flight distances in a medium whose coefficients differ per color
//! channel are sampled with the statistics of a single channel (the hero).
//! To combine the three possible heroes with one-sample MIS, a path carries
//! the ratios `p_j / f_k` between the density the path would have had under
//! hero `j` and the contribution evaluated for channel `k`.

use std::ops::{Mul, MulAssign};

use umbra_math::Vec3;

use crate::material::Color;

/// One of the three RGB channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Pick a channel uniformly from a sample in `[0,1)`.
    pub fn from_sample(u: f32) -> Self {
        match (u * 3.0) as usize {
            0 => Channel::Red,
            1 => Channel::Green,
            _ => Channel::Blue,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    /// Component of a color for this channel.
    #[inline]
    pub fn of(self, c: Color) -> f32 {
        c[self.index()]
    }

    /// Color with `value` in this channel and zero elsewhere.
    pub fn isolate(self, value: f32) -> Color {
        let mut c = Color::ZERO;
        c[self.index()] = value;
        c
    }
}

/// `p / f` with the conventions `p = 0 ⇒ 0` and `f = 0 ⇒ ∞`.
#[inline]
pub fn ratio(p: f32, f: f32) -> f32 {
    if p == 0.0 {
        0.0
    } else if f == 0.0 {
        f32::INFINITY
    } else {
        p / f
    }
}

/// `exp(-(σ_j - σ_k)·distance)`, exactly one when the coefficients agree.
#[inline]
pub fn transmittance_ratio(sigma_j: f32, sigma_k: f32, distance: f32) -> f32 {
    if sigma_j == sigma_k {
        1.0
    } else {
        (-(sigma_j - sigma_k) * distance).exp()
    }
}

/// The 3×3 matrix of density ratios `ratios[j][k] = p_j / f_k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralWeights {
    ratios: [[f32; 3]; 3],
}

impl SpectralWeights {
    pub const ONE: SpectralWeights = SpectralWeights {
        ratios: [[1.0; 3]; 3],
    };

    /// Build from a function of `(j, k)`.
    pub fn from_fn(f: impl Fn(usize, usize) -> f32) -> Self {
        let mut ratios = [[0.0; 3]; 3];
        for (j, row) in ratios.iter_mut().enumerate() {
            for (k, value) in row.iter_mut().enumerate() {
                *value = f(j, k);
            }
        }
        Self { ratios }
    }

    #[inline]
    pub fn get(&self, j: usize, k: usize) -> f32 {
        self.ratios[j][k]
    }

    /// Account for a color throughput factor `f / p` picked up along the path.
    ///
    /// Channel-independent sampling densities cancel in the ratio, so only the
    /// evaluated column `k` changes: it is divided by `f_over_p[k]`.
    pub fn apply_throughput(&mut self, f_over_p: Color) {
        for k in 0..3 {
            let scale = ratio(1.0, f_over_p[k]);
            for row in &mut self.ratios {
                row[k] *= scale;
            }
        }
    }

    /// One-sample MIS reduction of radiance found at the end of the path.
    ///
    /// The path throughput lives in the ratios, so `color` is only the
    /// emitted radiance (or background) being collected.
    /// Returns `color_k / ((1/3)·Σ_j ratios[j][k])` per channel, zero where
    /// that denominator is not a positive finite number.
    pub fn reduce(&self, color: Color) -> Color {
        let mut out = Color::ZERO;
        for k in 0..3 {
            let denom = (self.ratios[0][k] + self.ratios[1][k] + self.ratios[2][k]) / 3.0;
            out[k] = if denom.is_finite() && denom > 0.0 {
                color[k] / denom
            } else {
                0.0
            };
        }
        out
    }

    /// MIS-reduced path throughput (`reduce(1)`), handy for roulette.
    pub fn throughput(&self) -> Color {
        self.reduce(Vec3::ONE)
    }
}

impl Default for SpectralWeights {
    fn default() -> Self {
        Self::ONE
    }
}

impl MulAssign for SpectralWeights {
    fn mul_assign(&mut self, rhs: SpectralWeights) {
        for j in 0..3 {
            for k in 0..3 {
                self.ratios[j][k] *= rhs.ratios[j][k];
            }
        }
    }
}

impl MulAssign<f32> for SpectralWeights {
    fn mul_assign(&mut self, rhs: f32) {
        for row in &mut self.ratios {
            for value in row {
                *value *= rhs;
            }
        }
    }
}

impl Mul for SpectralWeights {
    type Output = SpectralWeights;

    fn mul(mut self, rhs: SpectralWeights) -> SpectralWeights {
        self *= rhs;
        self
    }
}
