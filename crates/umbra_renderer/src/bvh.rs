//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree over `Arc<dyn Surface>` primitives. Each split picks a random
//! axis and partitions at the centroid median, which keeps the tree balanced
//! without any cost model. The RNG is seeded so a given scene always builds
//! the same tree.

use std::sync::Arc;

use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::surface::{HitRecord, Surface};
use crate::Ray;
use umbra_math::Aabb;

/// Maximum primitives per leaf node.
const LEAF_MAX_SIZE: usize = 2;

/// Seed used by [`Bvh::new`].
pub const DEFAULT_BVH_SEED: u64 = 0x5eed_b0c5;

/// BVH node - either a branch with two children or a leaf with primitives.
pub enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        primitives: Vec<Arc<dyn Surface>>,
        bbox: Aabb,
    },
}

impl BvhNode {
    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn build(mut primitives: Vec<Arc<dyn Surface>>, rng: &mut SmallRng) -> Self {
        let bbox = primitives.iter().fold(Aabb::EMPTY, |acc, p| {
            Aabb::surrounding(&acc, &p.world_bbox())
        });

        if primitives.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf { primitives, bbox };
        }

        let axis = rng.gen_range(0..3);
        let mid = primitives.len() / 2;
        primitives.select_nth_unstable_by(mid, |a, b| {
            let a = a.world_bbox().centroid()[axis];
            let b = b.world_bbox().centroid()[axis];
            a.total_cmp(&b)
        });

        let right = primitives.split_off(mid);
        let left = primitives;

        BvhNode::Branch {
            left: Box::new(Self::build(left, rng)),
            right: Box::new(Self::build(right, rng)),
            bbox,
        }
    }

    /// Nearest hit in the subtree. `ray.maxt` is tightened to every hit found.
    fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<HitRecord<'a>> {
        if !self.bbox().hit(ray.origin, ray.direction, ray.mint, ray.maxt) {
            return None;
        }

        match self {
            BvhNode::Leaf { primitives, .. } => {
                let mut closest = None;
                for primitive in primitives {
                    if let Some(hit) = primitive.intersect(ray) {
                        ray.maxt = hit.t;
                        closest = Some(hit);
                    }
                }
                closest
            }
            BvhNode::Branch { left, right, .. } => {
                let hit_left = left.intersect(ray);
                // Right subtree only searched up to the left hit
                let hit_right = right.intersect(ray);
                hit_right.or(hit_left)
            }
        }
    }
}

/// Bounding volume hierarchy over a fixed set of surfaces.
pub struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    pub fn new(primitives: Vec<Arc<dyn Surface>>) -> Self {
        Self::with_seed(primitives, DEFAULT_BVH_SEED)
    }

    pub fn with_seed(primitives: Vec<Arc<dyn Surface>>, seed: u64) -> Self {
        if primitives.is_empty() {
            info!("BVH built over 0 primitives");
            return Self { root: None };
        }

        let count = primitives.len();
        let mut rng = SmallRng::seed_from_u64(seed);
        let root = BvhNode::build(primitives, &mut rng);
        info!(
            "BVH built over {} primitives (depth {})",
            count,
            root.depth()
        );

        Self { root: Some(root) }
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::depth)
    }
}

impl Surface for Bvh {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let root = self.root.as_ref()?;
        let mut ray = ray.clone();
        root.intersect(&mut ray)
    }

    fn world_bbox(&self) -> Aabb {
        self.root.as_ref().map_or(Aabb::EMPTY, |root| *root.bbox())
    }
}
