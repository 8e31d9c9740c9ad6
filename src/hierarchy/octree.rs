//! Point octree container.
//!
//! Stores nodes and leaf records in two flat arrays. The tree is immutable
//! once built, so it can be shared across shading threads behind an `Arc`
//! and read without locks.

use crate::core::config::OctreeConfig;
use crate::core::types::Result;
use crate::math::Aabb;
use crate::surfel::{SurfelBuffer, SurfelRef};

use super::builder::{BuildStats, OctreeBuilder};
use super::node::{NodeId, PointNode};

/// Cubic octree of aggregate disks built from a surfel buffer.
#[derive(Debug, Clone)]
pub struct PointOctree {
    /// All nodes (root is at index 0)
    nodes: Vec<PointNode>,
    /// Leaf records, `stride` floats each
    points: Vec<f32>,
    /// Floats per record
    stride: usize,
    stats: BuildStats,
}

impl PointOctree {
    /// Build with the default leaf size and depth limit.
    pub fn build(surfels: &SurfelBuffer) -> Result<Self> {
        OctreeBuilder::new(OctreeConfig::default()).build(surfels)
    }

    /// Assemble from builder output.
    pub(crate) fn from_parts(
        nodes: Vec<PointNode>,
        points: Vec<f32>,
        stride: usize,
        stats: BuildStats,
    ) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes, points, stride, stats }
    }

    /// Root node index
    pub const ROOT: NodeId = 0;

    /// The root node
    pub fn root(&self) -> &PointNode {
        &self.nodes[Self::ROOT as usize]
    }

    /// Get reference to a node.
    pub fn node(&self, id: NodeId) -> &PointNode {
        &self.nodes[id as usize]
    }

    /// Slice of all nodes, root first.
    pub fn nodes(&self) -> &[PointNode] {
        &self.nodes
    }

    /// Iterate `(octant, child)` over the children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (u8, &PointNode)> + '_ {
        self.node(id)
            .children()
            .map(move |(octant, child)| (octant, self.node(child)))
    }

    /// Raw record `index` of leaf `id`.
    pub fn leaf_record(&self, id: NodeId, index: u32) -> &[f32] {
        let node = self.node(id);
        debug_assert!(index < node.point_count);
        let start = (node.point_offset + index) as usize * self.stride;
        &self.points[start..start + self.stride]
    }

    /// Records held by leaf `id`; empty for internal nodes.
    pub fn leaf_points(&self, id: NodeId) -> impl ExactSizeIterator<Item = SurfelRef<'_>> + '_ {
        let node = self.node(id);
        let start = node.point_offset as usize * self.stride;
        let end = start + node.point_count as usize * self.stride;
        self.points[start..end]
            .chunks_exact(self.stride)
            .map(SurfelRef::new)
    }

    /// Floats per record
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.stats.leaf_count
    }

    /// Number of stored records.
    pub fn point_count(&self) -> usize {
        self.points.len() / self.stride
    }

    /// Deepest leaf depth.
    pub fn depth(&self) -> u32 {
        self.stats.max_depth_reached
    }

    /// Cubic bound of the whole cloud.
    pub fn bound(&self) -> Aabb {
        self.root().bound
    }

    /// Area represented by the whole tree.
    pub fn total_area(&self) -> f32 {
        self.root().aggregate.area()
    }

    /// Construction statistics.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}
