//! Octree node layout.

use crate::core::types::Vec3;
use crate::math::Aabb;

use super::aggregate::AggregateDisk;

/// Index of a node inside [`PointOctree`](super::PointOctree); the root is 0.
pub type NodeId = u32;

/// A single node in the point octree.
///
/// Internal nodes reference their children via `child_mask`: the children of
/// one node are stored contiguously from `child_offset`, packed in octant
/// order. Leaves reference `point_count` raw records starting at record
/// `point_offset` of the tree's point storage.
#[derive(Clone, Debug)]
pub struct PointNode {
    /// Cubic spatial bound
    pub bound: Aabb,
    /// Center of `bound`
    pub center: Vec3,
    /// Half-diagonal of `bound`, used as a bounding-sphere radius
    pub bound_radius: f32,
    /// Disk summarizing every surfel below this node
    pub aggregate: AggregateDisk,
    /// Depth below the root (root = 0)
    pub depth: u8,
    /// Which of 8 children exist (bit i = child i present)
    pub child_mask: u8,
    /// Index of first child in the node array
    pub child_offset: u32,
    /// First record index in the point storage (leaves only)
    pub point_offset: u32,
    /// Number of records held (leaves only)
    pub point_count: u32,
}

impl PointNode {
    /// Childless node covering `bound`, with an empty aggregate.
    pub fn new(bound: Aabb, depth: u8) -> Self {
        Self {
            bound,
            center: bound.center(),
            bound_radius: bound.half_diagonal(),
            aggregate: AggregateDisk::default(),
            depth,
            child_mask: 0,
            child_offset: 0,
            point_offset: 0,
            point_count: 0,
        }
    }

    /// Returns true if this node stores points instead of children.
    pub fn is_leaf(&self) -> bool {
        self.child_mask == 0
    }

    /// Number of existing children.
    pub fn child_count(&self) -> u32 {
        self.child_mask.count_ones()
    }

    /// Check if a child octant exists.
    pub fn has_child(&self, octant: u8) -> bool {
        octant < 8 && self.child_mask & (1 << octant) != 0
    }

    /// Node index of the child in `octant`, if present.
    pub fn child(&self, octant: u8) -> Option<NodeId> {
        if !self.has_child(octant) {
            return None;
        }
        let rank = (self.child_mask & ((1u8 << octant) - 1)).count_ones();
        Some(self.child_offset + rank)
    }

    /// Iterate `(octant, node index)` over existing children.
    pub fn children(&self) -> impl Iterator<Item = (u8, NodeId)> + '_ {
        (0..8u8).filter_map(move |octant| self.child(octant).map(|id| (octant, id)))
    }
}
