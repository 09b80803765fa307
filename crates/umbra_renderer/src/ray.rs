//! Ray type for light transport.
//!
//! A ray carries its valid parametric range `[mint, maxt]` and the medium it
//! is currently travelling through, so that intersection and volumetric code
//! share one description of "the segment still to be explored".

use std::fmt;
use std::sync::Arc;

use crate::medium::Medium;
use umbra_math::{Transform, Vec3};

/// Offset applied to spawned rays to avoid re-hitting the surface they leave.
pub const RAY_EPSILON: f32 = 1e-3;

/// A ray with origin, direction, parametric range and optional medium.
#[derive(Clone)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction vector (not necessarily normalized)
    pub direction: Vec3,
    pub mint: f32,
    /// Shrinks as nearer hits are found.
    pub maxt: f32,
    pub medium: Option<Arc<dyn Medium>>,
}

impl Ray {
    /// Create a ray spanning `[RAY_EPSILON, ∞)` outside of any medium.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            mint: RAY_EPSILON,
            maxt: f32::INFINITY,
            medium: None,
        }
    }

    pub fn with_range(mut self, mint: f32, maxt: f32) -> Self {
        self.mint = mint;
        self.maxt = maxt;
        self
    }

    pub fn with_medium(mut self, medium: Option<Arc<dyn Medium>>) -> Self {
        self.medium = medium;
        self
    }

    /// Compute a point along the ray at parameter t.
    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }

    /// The same ray expressed in another space. Parametric distances are
    /// preserved because the direction is transformed without normalizing.
    pub fn transformed(&self, xform: &Transform) -> Ray {
        Ray {
            origin: xform.point(self.origin),
            direction: xform.vector(self.direction),
            mint: self.mint,
            maxt: self.maxt,
            medium: self.medium.clone(),
        }
    }

    /// Unit-direction copy with `mint`/`maxt` rescaled to metric distances.
    pub fn normalized(&self) -> Ray {
        let len = self.direction.length();
        Ray {
            origin: self.origin,
            direction: self.direction / len,
            mint: self.mint * len,
            maxt: self.maxt * len,
            medium: self.medium.clone(),
        }
    }
}

impl fmt::Debug for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ray")
            .field("origin", &self.origin)
            .field("direction", &self.direction)
            .field("mint", &self.mint)
            .field("maxt", &self.maxt)
            .field("in_medium", &self.medium.is_some())
            .finish()
    }
}
