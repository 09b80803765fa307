//! Spatially varying colors for material parameters.
//!
//! A texture maps a surface location (UV coordinates plus the world-space
//! hit point) to a linear RGB color.

use std::sync::Arc;

use thiserror::Error;
use umbra_math::{Vec2, Vec3};

use crate::Perlin;

/// Errors that can occur when building an image texture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureError {
    #[error("texture size {width}x{height} is empty")]
    Empty { width: u32, height: u32 },

    #[error("texture is {width}x{height} but {len} values were supplied")]
    DimensionMismatch { width: u32, height: u32, len: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A grid of linear RGB texels.
#[derive(Clone, Debug)]
pub struct ImageTexture {
    pub width: u32,
    pub height: u32,
    /// Row-major linear RGB, top row first
    pixels: Vec<Vec3>,
}

impl ImageTexture {
    pub fn new(width: u32, height: u32, pixels: Vec<Vec3>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if pixels.len() != (width * height) as usize {
            return Err(TextureError::DimensionMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from tightly packed 8-bit sRGB triples.
    pub fn from_srgb8(width: u32, height: u32, bytes: &[u8]) -> TextureResult<Self> {
        if bytes.len() % 3 != 0 {
            return Err(TextureError::DimensionMismatch {
                width,
                height,
                len: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| Vec3::from_array([c[0], c[1], c[2]].map(|b| decode_srgb(f32::from(b) / 255.0))))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Nearest-texel lookup with (0, 0) at the bottom-left.
    pub fn lookup(&self, uv: Vec2) -> Vec3 {
        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let i = ((uv.x * max_x as f32).round() as i64).clamp(0, max_x);
        let j = (((1.0 - uv.y) * max_y as f32).round() as i64).clamp(0, max_y);
        self.pixels[(j * self.width as i64 + i) as usize]
    }
}

/// Inverse of the sRGB transfer curve.
#[inline]
fn decode_srgb(encoded: f32) -> f32 {
    if encoded > 0.040_45 {
        ((encoded + 0.055) / 1.055).powf(2.4)
    } else {
        encoded / 12.92
    }
}

/// Color source for material parameters.
#[derive(Clone, Debug)]
pub enum Texture {
    Constant(Vec3),
    /// 3-D checkerboard from the sign of `sin(sx)·sin(sy)·sin(sz)`.
    Checker {
        scale: f32,
        even: Arc<Texture>,
        odd: Arc<Texture>,
    },
    /// Turbulent bands along z.
    Marble {
        scale: f32,
        base: Arc<Texture>,
        veins: Arc<Texture>,
        noise: Arc<Perlin>,
    },
    Image(Arc<ImageTexture>),
}

impl Texture {
    pub fn constant(color: Vec3) -> Self {
        Texture::Constant(color)
    }

    pub fn checker(scale: f32, even: Texture, odd: Texture) -> Self {
        Texture::Checker {
            scale,
            even: Arc::new(even),
            odd: Arc::new(odd),
        }
    }

    pub fn marble(scale: f32, base: Texture, veins: Texture, seed: u64) -> Self {
        Texture::Marble {
            scale,
            base: Arc::new(base),
            veins: Arc::new(veins),
            noise: Arc::new(Perlin::new(seed)),
        }
    }

    pub fn image(image: ImageTexture) -> Self {
        Texture::Image(Arc::new(image))
    }

    /// Evaluate the texture at a surface location.
    pub fn value(&self, uv: Vec2, p: Vec3) -> Vec3 {
        match self {
            Texture::Constant(color) => *color,
            Texture::Checker { scale, even, odd } => {
                let s = *scale * p;
                let sines = s.x.sin() * s.y.sin() * s.z.sin();
                if sines < 0.0 {
                    odd.value(uv, p)
                } else {
                    even.value(uv, p)
                }
            }
            Texture::Marble {
                scale,
                base,
                veins,
                noise,
            } => {
                let turb = noise.turb(p, Perlin::DEFAULT_DEPTH);
                let factor = 0.5 * (1.0 + (scale * p.z + 10.0 * turb).sin());
                base.value(uv, p).lerp(veins.value(uv, p), factor)
            }
            Texture::Image(image) => image.lookup(uv),
        }
    }
}

impl From<Vec3> for Texture {
    fn from(color: Vec3) -> Self {
        Texture::Constant(color)
    }
}

impl Default for Texture {
    /// Magenta, so missing textures stand out.
    fn default() -> Self {
        Texture::Constant(Vec3::new(0.9, 0.1, 0.9))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_texture() {
        let tex = Texture::from(Vec3::new(1.0, 0.5, 0.0));
        let sample = tex.value(Vec2::new(0.3, 0.7), Vec3::new(4.0, 5.0, 6.0));
        assert!((sample - Vec3::new(1.0, 0.5, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_checker_alternates() {
        let tex = Texture::checker(
            1.0,
            Texture::constant(Vec3::ONE),
            Texture::constant(Vec3::ZERO),
        );
        // All sines positive
        let p_even = Vec3::splat(1.0);
        // One sine negative
        let p_odd = Vec3::new(-1.0, 1.0, 1.0);

        assert_eq!(tex.value(Vec2::ZERO, p_even), Vec3::ONE);
        assert_eq!(tex.value(Vec2::ZERO, p_odd), Vec3::ZERO);
    }

    #[test]
    fn test_marble_stays_between_base_and_veins() {
        let tex = Texture::marble(
            4.0,
            Texture::constant(Vec3::ZERO),
            Texture::constant(Vec3::ONE),
            3,
        );
        for i in 0..100 {
            let p = Vec3::new(i as f32 * 0.1, 0.5, i as f32 * 0.05);
            let c = tex.value(Vec2::ZERO, p);
            assert!(c.min_element() >= -1e-5 && c.max_element() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_image_lookup_corners() {
        // 2x2: top row red, green; bottom row blue, white
        let image = ImageTexture::new(
            2,
            2,
            vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE],
        )
        .unwrap();

        assert_eq!(image.lookup(Vec2::new(0.0, 1.0)), Vec3::X);
        assert_eq!(image.lookup(Vec2::new(1.0, 1.0)), Vec3::Y);
        assert_eq!(image.lookup(Vec2::new(0.0, 0.0)), Vec3::Z);
        // Out of range UVs clamp
        assert_eq!(image.lookup(Vec2::new(3.0, -2.0)), Vec3::ONE);
    }

    #[test]
    fn test_image_rejects_bad_dimensions() {
        let err = ImageTexture::new(2, 2, vec![Vec3::ZERO; 3]).unwrap_err();
        assert!(matches!(err, TextureError::DimensionMismatch { len: 3, .. }));
        assert!(ImageTexture::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn test_decode_srgb() {
        assert_eq!(decode_srgb(0.0), 0.0);
        assert!((decode_srgb(1.0) - 1.0).abs() < 1e-5);
        assert!((decode_srgb(0.02) - 0.02 / 12.92).abs() < 1e-7);
        // sRGB 0.5 is about 21% linear
        assert!((decode_srgb(0.5) - 0.214).abs() < 1e-3);
    }

    #[test]
    fn test_from_srgb8() {
        let image = ImageTexture::from_srgb8(1, 1, &[255, 0, 255]).unwrap();
        let c = image.lookup(Vec2::splat(0.5));
        assert!((c - Vec3::new(1.0, 0.0, 1.0)).length() < 0.001);
    }
}
