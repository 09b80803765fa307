use crate::Vec3;

/// Axis-aligned bounding box used by the BVH and by primitive bounds.
///
/// Stored as a pair of corners. An empty box has `min > max` on every axis
/// so that growing it by any point or box yields that point or box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// A box containing nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from explicit corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create the box spanned by two arbitrary corner points.
    ///
    /// Degenerate (flat) axes are padded slightly so the slab test never
    /// sees a zero-width box.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            min: a.min(b),
            max: a.max(b),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Smallest box containing both inputs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Grow the box to include a point.
    pub fn enclose_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box to include another box.
    pub fn enclose(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Extent along each axis.
    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The eight corners, used when transforming boxes.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Slab test against the parametric range `[t_min, t_max]` of a ray.
    ///
    /// The direction does not need to be normalized; `t` is measured in
    /// units of the direction's length.
    pub fn hit(&self, origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> bool {
        let inv_dir = direction.recip();
        let t0 = (self.min - origin) * inv_dir;
        let t1 = (self.max - origin) * inv_dir;

        let near = t0.min(t1).max_element().max(t_min);
        let far = t0.max(t1).min_element().min(t_max);
        near <= far
    }

    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        let d = self.diagonal();
        for axis in 0..3 {
            if d[axis] < delta {
                self.min[axis] -= delta * 0.5;
                self.max[axis] += delta * 0.5;
            }
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points_orders_corners() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_from_points_pads_flat_axis() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(aabb.max.y > aabb.min.y);
    }

    #[test]
    fn test_aabb_empty_grows_to_point() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.enclose_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, aabb.max);
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::splat(5.0));
        let box2 = Aabb::from_points(Vec3::splat(3.0), Vec3::splat(10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.min, Vec3::ZERO);
        assert_eq!(surrounding.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let origin = Vec3::new(0.0, 0.0, -5.0);

        // Ray pointing at center
        assert!(aabb.hit(origin, Vec3::Z, 0.0, 100.0));
        // Ray pointing away
        assert!(!aabb.hit(origin, -Vec3::Z, 0.0, 100.0));
        // Ray missing the box
        assert!(!aabb.hit(Vec3::new(10.0, 0.0, 0.0), Vec3::Z, 0.0, 100.0));
        // Interval ends before the box
        assert!(!aabb.hit(origin, Vec3::Z, 0.0, 3.0));
    }

    #[test]
    fn test_aabb_hit_unnormalized_direction() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        // Box spans t in [2, 3] for a direction of length 2
        let origin = Vec3::new(0.0, 0.0, -5.0);
        assert!(aabb.hit(origin, Vec3::new(0.0, 0.0, 2.0), 0.0, 2.5));
        assert!(!aabb.hit(origin, Vec3::new(0.0, 0.0, 2.0), 0.0, 1.9));
    }

    #[test]
    fn test_aabb_centroid() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 4.0));
        assert_eq!(aabb.centroid(), Vec3::new(5.0, 0.5, 2.0));
    }
}
