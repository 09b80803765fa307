// Affine placement transform with a cached inverse.
//
// Primitives are modelled in a canonical local space and placed in the world
// with one of these; rays travel the other way through `inverse()`.

use std::ops::Mul;

use crate::Aabb;
use glam::{Mat3, Mat4, Quat, Vec3};

/// Affine transform storing both the forward matrix and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: Mat4,
    m_inv: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: Mat4::IDENTITY,
        m_inv: Mat4::IDENTITY,
    };

    /// Wrap a matrix, computing its inverse once.
    pub fn new(m: Mat4) -> Self {
        Self {
            m,
            m_inv: m.inverse(),
        }
    }

    pub fn from_translation(t: Vec3) -> Self {
        Self {
            m: Mat4::from_translation(t),
            m_inv: Mat4::from_translation(-t),
        }
    }

    pub fn from_scale(s: Vec3) -> Self {
        Self {
            m: Mat4::from_scale(s),
            m_inv: Mat4::from_scale(s.recip()),
        }
    }

    /// Rotation of `angle` radians about `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let q = Quat::from_axis_angle(axis.normalize(), angle);
        Self {
            m: Mat4::from_quat(q),
            m_inv: Mat4::from_quat(q.inverse()),
        }
    }

    /// Local frame given by three axes and an origin.
    pub fn from_axes(x: Vec3, y: Vec3, z: Vec3, origin: Vec3) -> Self {
        Self::new(Mat4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            origin.extend(1.0),
        ))
    }

    /// Object-to-world transform of a viewer at `eye` looking at `target`.
    ///
    /// The local -Z axis points towards `target`, +Y is as close to `up`
    /// as possible.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        Self {
            m: view.inverse(),
            m_inv: view,
        }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.m
    }

    pub fn inverse_matrix(&self) -> &Mat4 {
        &self.m_inv
    }

    /// The inverse transform (swaps the cached matrices).
    pub fn inverse(&self) -> Transform {
        Transform {
            m: self.m_inv,
            m_inv: self.m,
        }
    }

    /// Transform a point (w = 1).
    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.m.transform_point3(p)
    }

    /// Transform a direction (w = 0); translation is ignored.
    #[inline]
    pub fn vector(&self, v: Vec3) -> Vec3 {
        self.m.transform_vector3(v)
    }

    /// Transform a surface normal by the inverse transpose and renormalize.
    #[inline]
    pub fn normal(&self, n: Vec3) -> Vec3 {
        let inv_t = Mat3::from_mat4(self.m_inv).transpose();
        (inv_t * n).normalize()
    }

    /// World-space box enclosing the eight transformed corners.
    pub fn aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        let mut result = Aabb::EMPTY;
        for corner in aabb.corners() {
            result.enclose_point(self.point(corner));
        }
        result
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `a * b` applies `b` first, then `a`.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            m: self.m * rhs.m,
            m_inv: rhs.m_inv * self.m_inv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_point_translation() {
        let xform = Transform::from_translation(Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(xform.point(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(11.0, 22.0, 33.0));
    }

    #[test]
    fn test_vector_ignores_translation() {
        let xform = Transform::from_translation(Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(xform.vector(Vec3::X), Vec3::X);
    }

    #[test]
    fn test_rotation_vector() {
        // 90 degree rotation around Z axis
        let xform = Transform::from_axis_angle(Vec3::Z, PI / 2.0);
        let v = xform.vector(Vec3::X);
        assert!((v - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_inverse_round_trip() {
        let xform = Transform::from_translation(Vec3::new(1.0, -2.0, 3.0))
            * Transform::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7)
            * Transform::from_scale(Vec3::new(2.0, 0.5, 3.0));

        let p = Vec3::new(5.0, 3.0, 2.0);
        let back = xform.inverse().point(xform.point(p));
        assert!((back - p).length() < 0.001);
    }

    #[test]
    fn test_normal_stays_perpendicular_under_nonuniform_scale() {
        let xform = Transform::from_scale(Vec3::new(4.0, 1.0, 1.0));
        // Plane containing (1, -1, 0) with normal (1, 1, 0)
        let tangent = xform.vector(Vec3::new(1.0, -1.0, 0.0));
        let normal = xform.normal(Vec3::new(1.0, 1.0, 0.0));

        assert!(tangent.dot(normal).abs() < 1e-5);
        assert!((normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_translation() {
        let xform = Transform::from_translation(Vec3::splat(5.0));
        let moved = xform.aabb(&Aabb::from_points(Vec3::ZERO, Vec3::ONE));

        assert!((moved.min - Vec3::splat(5.0)).length() < 0.001);
        assert!((moved.max - Vec3::splat(6.0)).length() < 0.001);
    }

    #[test]
    fn test_look_at_faces_target() {
        let xform = Transform::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let forward = xform.vector(-Vec3::Z);
        assert!((forward - (-Vec3::Z)).length() < 1e-5);
        assert!((xform.point(Vec3::ZERO) - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }
}
