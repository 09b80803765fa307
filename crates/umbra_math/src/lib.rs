//! Umbra math foundation.
//!
//! Thin layer over `glam` with the few geometric helpers the renderer needs:
//! axis-aligned boxes, affine transforms with cached inverses, and
//! orthonormal frames.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod transform;

pub use aabb::Aabb;
pub use frame::Frame;
pub use transform::Transform;

/// Rec. 709 luminance of a linear RGB triple.
#[inline]
pub fn luminance(c: Vec3) -> f32 {
    0.212671 * c.x + 0.715160 * c.y + 0.072169 * c.z
}
