//! Octree construction from surfel buffers.
//!
//! Top-down partitioning, bottom-up aggregation: each call splits its points
//! into eight octant buckets around the node center, recurses into the
//! non-empty ones, then folds the children's aggregate disks into its own.

use std::time::Instant;

use crate::core::config::OctreeConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::Aabb;
use crate::surfel::SurfelBuffer;

use super::aggregate::{AggregateDisk, AreaWeightedSum, Degeneracy};
use super::node::{NodeId, PointNode};
use super::octree::PointOctree;

/// Statistics gathered while building a tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildStats {
    pub point_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Deepest leaf depth
    pub max_depth_reached: u32,
    /// Leaves forced by the depth limit while holding more points than a leaf normally may
    pub depth_limited_leaves: usize,
    /// Nodes whose points have zero total area
    pub degenerate_areas: usize,
    /// Nodes whose normals cancelled out
    pub degenerate_normals: usize,
    pub build_time_ms: f32,
}

/// Builder for point octrees
pub struct OctreeBuilder {
    config: OctreeConfig,
}

/// Mutable state threaded through one build
struct BuildState<'a> {
    surfels: &'a SurfelBuffer,
    nodes: Vec<PointNode>,
    points: Vec<f32>,
    stats: BuildStats,
}

impl BuildState<'_> {
    fn record_degeneracy(&mut self, degeneracy: Degeneracy) {
        if degeneracy.zero_area {
            self.stats.degenerate_areas += 1;
        }
        if degeneracy.cancelled_normal {
            self.stats.degenerate_normals += 1;
        }
    }
}

impl Default for OctreeBuilder {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl OctreeBuilder {
    pub fn new(config: OctreeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Build an octree over every record in `surfels`.
    ///
    /// Records are copied into the tree; nothing borrows from `surfels`
    /// once this returns.
    pub fn build(&self, surfels: &SurfelBuffer) -> Result<PointOctree> {
        if surfels.is_empty() {
            return Err(Error::EmptyInput);
        }

        let start = Instant::now();
        let count = surfels.len();
        to_index(count, "point count")?;

        let bound = Aabb::from_points(surfels.iter().map(|s| s.position())).cubic();
        let indices: Vec<usize> = (0..count).collect();

        let mut state = BuildState {
            surfels,
            nodes: Vec::with_capacity((count / self.config.leaf_capacity()).max(1) * 2),
            points: Vec::with_capacity(surfels.as_slice().len()),
            stats: BuildStats { point_count: count, ..Default::default() },
        };
        state.nodes.push(PointNode::new(bound, 0));

        self.build_node(&mut state, &indices, 0, PointOctree::ROOT)?;

        let mut stats = state.stats;
        stats.node_count = state.nodes.len();
        stats.build_time_ms = start.elapsed().as_secs_f32() * 1000.0;

        log::info!(
            "Built point octree: {} points, {} nodes ({} leaves), depth {} in {:.1}ms",
            stats.point_count, stats.node_count, stats.leaf_count,
            stats.max_depth_reached, stats.build_time_ms
        );
        if stats.degenerate_areas > 0 || stats.degenerate_normals > 0 {
            log::warn!(
                "Degenerate geometry in point octree: {} zero-area nodes, {} nodes with cancelled normals",
                stats.degenerate_areas, stats.degenerate_normals
            );
        }
        if stats.depth_limited_leaves > 0 {
            log::debug!(
                "{} leaves hit the depth limit of {} (coincident points)",
                stats.depth_limited_leaves, self.config.depth_limit()
            );
        }

        Ok(PointOctree::from_parts(state.nodes, state.points, surfels.stride(), stats))
    }

    /// Recursively build the node at `node_index`, which the caller already pushed.
    /// Returns the node's aggregate disk.
    fn build_node(
        &self,
        state: &mut BuildState<'_>,
        indices: &[usize],
        depth: u32,
        node_index: NodeId,
    ) -> Result<AggregateDisk> {
        debug_assert!(!indices.is_empty());

        if indices.len() <= self.config.leaf_capacity() || depth >= self.config.depth_limit() {
            return self.build_leaf(state, indices, depth, node_index);
        }

        let bound = state.nodes[node_index as usize].bound;

        // Partition points into the eight child octants. The buckets live
        // only for this call.
        let mut buckets: [Vec<usize>; 8] = Default::default();
        for &i in indices {
            buckets[bound.octant_of(state.surfels.surfel(i).position()) as usize].push(i);
        }

        let mut child_mask = 0u8;
        for (octant, bucket) in buckets.iter().enumerate() {
            if !bucket.is_empty() {
                child_mask |= 1 << octant;
            }
        }

        // Reserve contiguous slots for the children before descending
        let child_offset = to_index(state.nodes.len(), "node index")?;
        for octant in 0..8u8 {
            if child_mask & (1 << octant) != 0 {
                state.nodes.push(PointNode::new(bound.child_octant(octant), (depth + 1) as u8));
            }
        }
        to_index(state.nodes.len() - 1, "node index")?;

        let mut sum = AreaWeightedSum::new();
        let mut rank = 0;
        for (octant, bucket) in buckets.iter().enumerate() {
            if child_mask & (1 << octant) == 0 {
                continue;
            }
            let child = self.build_node(state, bucket, depth + 1, child_offset + rank)?;
            sum.add_disk(&child);
            rank += 1;
        }

        let (aggregate, degeneracy) = sum.finish();
        state.record_degeneracy(degeneracy);

        let node = &mut state.nodes[node_index as usize];
        node.child_mask = child_mask;
        node.child_offset = child_offset;
        node.aggregate = aggregate;

        Ok(aggregate)
    }

    /// Copy the records into point storage and aggregate them directly.
    fn build_leaf(
        &self,
        state: &mut BuildState<'_>,
        indices: &[usize],
        depth: u32,
        node_index: NodeId,
    ) -> Result<AggregateDisk> {
        let stride = state.surfels.stride();
        let point_offset = to_index(state.points.len() / stride, "point offset")?;
        let point_count = to_index(indices.len(), "leaf point count")?;

        let mut sum = AreaWeightedSum::new();
        for &i in indices {
            state.points.extend_from_slice(state.surfels.record(i));
            sum.add_surfel(state.surfels.surfel(i));
        }

        let (aggregate, degeneracy) = sum.finish();
        state.record_degeneracy(degeneracy);

        state.stats.leaf_count += 1;
        state.stats.max_depth_reached = state.stats.max_depth_reached.max(depth);
        if indices.len() > self.config.leaf_capacity() {
            state.stats.depth_limited_leaves += 1;
        }

        let node = &mut state.nodes[node_index as usize];
        node.point_offset = point_offset;
        node.point_count = point_count;
        node.aggregate = aggregate;

        Ok(aggregate)
    }
}

/// Node and point positions are stored as `u32`
fn to_index(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::IndexOverflow { what, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MAX_OCTREE_DEPTH;
    use crate::core::types::Vec3;
    use crate::surfel::SurfelRecord;
    use std::f32::consts::PI;

    /// Deterministic pseudo-random floats in [0, 1)
    fn lcg(seed: &mut u64) -> f32 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((*seed >> 40) as f32) / (1u64 << 24) as f32
    }

    fn random_buffer(n: usize, seed: u64) -> SurfelBuffer {
        let mut s = seed;
        let mut buf = SurfelBuffer::default();
        for _ in 0..n {
            let p = Vec3::new(lcg(&mut s) * 10.0, lcg(&mut s) * 3.0, lcg(&mut s) * 0.5);
            let n = Vec3::new(lcg(&mut s) - 0.5, 1.0, lcg(&mut s) - 0.5).normalize();
            let r = 0.01 + lcg(&mut s) * 0.1;
            let c = Vec3::new(lcg(&mut s), lcg(&mut s), lcg(&mut s));
            buf.push(p, n, r, c);
        }
        buf
    }

    fn assert_close(a: f32, b: f32, rel: f32) {
        let scale = a.abs().max(b.abs()).max(1e-12);
        assert!((a - b).abs() / scale < rel, "{} != {} (rel {})", a, b, rel);
    }

    /// Children's areas sum to the parent's area, at every internal node.
    fn check_conservation(tree: &PointOctree) {
        for node in tree.nodes() {
            if node.is_leaf() {
                continue;
            }
            let child_sum: f32 = node.children().map(|(_, c)| tree.node(c).aggregate.area()).sum();
            assert_close(child_sum, node.aggregate.area(), 1e-4);
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = OctreeBuilder::default().build(&SurfelBuffer::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn test_single_point_is_leaf() {
        let mut buf = SurfelBuffer::default();
        buf.push(Vec3::ZERO, Vec3::Y, 1.0, Vec3::ONE);
        let tree = PointOctree::build(&buf).unwrap();

        assert_eq!(tree.node_count(), 1);
        let root = tree.root();
        assert!(root.is_leaf());
        assert_eq!(root.point_count, 1);
        assert!(root.aggregate.center.length() < 1e-6);
        assert!((root.aggregate.normal - Vec3::Y).length() < 1e-6);
        assert!((root.aggregate.color - Vec3::ONE).length() < 1e-6);
        assert_close(root.aggregate.radius, 1.0, 1e-6);
        assert_close(tree.total_area(), PI, 1e-6);
    }

    fn octant_corners(n: usize, r: f32) -> SurfelBuffer {
        let mut buf = SurfelBuffer::default();
        for i in 0..n {
            let o = (i % 8) as u8;
            let p = Vec3::new(
                if o & 1 != 0 { 1.0 } else { 0.0 },
                if o & 2 != 0 { 1.0 } else { 0.0 },
                if o & 4 != 0 { 1.0 } else { 0.0 },
            );
            let n = (p - Vec3::splat(0.5)).normalize();
            buf.push(p, n, r, Vec3::splat(0.5));
        }
        buf
    }

    #[test]
    fn test_eight_points_stay_in_one_leaf() {
        // One point per octant of a unit cube, tilted normals that do not cancel
        let mut buf = SurfelBuffer::default();
        for o in 0..8u8 {
            let p = Vec3::new((o & 1) as f32, ((o >> 1) & 1) as f32, ((o >> 2) & 1) as f32);
            let n = Vec3::new(p.x - 0.5, 1.0 + p.y, p.z - 0.5).normalize();
            buf.push(p, n, 0.1, Vec3::splat(0.5));
        }
        let tree = PointOctree::build(&buf).unwrap();

        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().point_count, 8);
        assert_close(tree.total_area(), 8.0 * PI * 0.01, 1e-5);

        let expected: Vec3 = buf.iter().map(|s| s.normal()).sum::<Vec3>().normalize();
        assert!((tree.root().aggregate.normal - expected).length() < 1e-5);
        assert!((tree.root().aggregate.color - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_nine_points_split_into_octants() {
        // Eight corners of a unit cube plus a ninth point near one corner
        let mut buf = octant_corners(8, 0.1);
        buf.push(Vec3::splat(0.9), Vec3::ONE.normalize(), 0.1, Vec3::splat(0.5));
        let tree = PointOctree::build(&buf).unwrap();

        let root = tree.root();
        assert!(!root.is_leaf());
        assert_eq!(root.child_count(), 8);
        for (octant, child) in tree.children(PointOctree::ROOT) {
            assert!(child.is_leaf());
            let expected = if octant == 7 { 2 } else { 1 };
            assert_eq!(child.point_count, expected);
        }
        assert_close(tree.total_area(), 9.0 * PI * 0.01, 1e-5);
        check_conservation(&tree);
    }

    #[test]
    fn test_symmetric_normals_use_fallback() {
        // Two points per octant with outward corner normals: the sum cancels
        let buf = octant_corners(16, 0.2);
        let tree = PointOctree::build(&buf).unwrap();
        assert!(!tree.root().is_leaf());
        assert!(tree.root().aggregate.normal.is_normalized());
        assert!(tree.stats().degenerate_normals > 0);
        assert_close(tree.total_area(), 16.0 * PI * 0.04, 1e-5);
    }

    #[test]
    fn test_aggregate_normal_is_normalized_sum() {
        // Same octant layout, upward-biased normals so the sum does not cancel
        let mut buf = SurfelBuffer::default();
        for o in 0..16u8 {
            let p = Vec3::new((o & 1) as f32, ((o >> 1) & 1) as f32, ((o >> 2) & 1) as f32);
            let n = Vec3::new(p.x - 0.5, 1.0, p.z - 0.5).normalize();
            buf.push(p, n, 0.1, Vec3::ONE);
        }
        let tree = PointOctree::build(&buf).unwrap();
        let expected: Vec3 = buf.iter().map(|s| s.normal()).sum::<Vec3>().normalize();
        assert!((tree.root().aggregate.normal - expected).length() < 1e-4);
        assert_eq!(tree.stats().degenerate_normals, 0);
    }

    #[test]
    fn test_coincident_points_terminate_at_depth_limit() {
        let mut buf = SurfelBuffer::default();
        for _ in 0..9 {
            buf.push(Vec3::splat(2.5), Vec3::Y, 0.5, Vec3::ONE);
        }
        let tree = PointOctree::build(&buf).unwrap();

        assert_eq!(tree.depth(), MAX_OCTREE_DEPTH);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.node_count(), MAX_OCTREE_DEPTH as usize + 1);
        assert_eq!(tree.stats().depth_limited_leaves, 1);
        assert_close(tree.total_area(), 9.0 * PI * 0.25, 1e-5);
        check_conservation(&tree);
    }

    #[test]
    fn test_coincident_points_with_shallow_limit() {
        let mut buf = SurfelBuffer::default();
        for _ in 0..100 {
            buf.push(Vec3::ZERO, Vec3::Y, 0.5, Vec3::ONE);
        }
        let builder = OctreeBuilder::new(OctreeConfig { max_points_per_leaf: 8, max_depth: 3 });
        let tree = builder.build(&buf).unwrap();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.root().child(0), Some(1));
    }

    #[test]
    fn test_root_area_matches_input() {
        let buf = random_buffer(5000, 7);
        let tree = PointOctree::build(&buf).unwrap();
        assert_close(tree.total_area(), buf.total_area() as f32, 1e-3);
        assert!(tree.depth() <= MAX_OCTREE_DEPTH);
        check_conservation(&tree);
    }

    #[test]
    fn test_every_point_in_exactly_one_leaf() {
        let buf = random_buffer(2000, 11);
        let tree = PointOctree::build(&buf).unwrap();

        let mut found = 0usize;
        let mut leaves = 0usize;
        for (id, node) in tree.nodes().iter().enumerate() {
            if !node.is_leaf() {
                continue;
            }
            leaves += 1;
            assert!(node.point_count as usize <= 8 || node.depth as u32 == MAX_OCTREE_DEPTH);
            for s in tree.leaf_points(id as NodeId) {
                assert!(node.bound.contains_point(s.position()));
                found += 1;
            }
        }
        assert_eq!(leaves, tree.leaf_count());
        assert_eq!(found, buf.len());

        // Each input record appears exactly once
        let bits = |raw: &[f32]| raw.iter().map(|f| f.to_bits()).collect::<Vec<u32>>();
        let mut stored = Vec::new();
        for (id, node) in tree.nodes().iter().enumerate() {
            if node.is_leaf() {
                stored.extend(tree.leaf_points(id as NodeId).map(|s| bits(s.raw())));
            }
        }
        let mut input: Vec<Vec<u32>> = buf.iter().map(|s| bits(s.raw())).collect();
        stored.sort();
        input.sort();
        assert_eq!(stored, input);
    }

    #[test]
    fn test_bounds_are_cubes_containing_points() {
        let buf = random_buffer(500, 3);
        let tree = PointOctree::build(&buf).unwrap();
        let root = tree.root();
        for s in buf.iter() {
            assert!(root.bound.contains_point(s.position()));
        }
        let d = root.bound.size();
        assert_close(d.x, d.y, 1e-5);
        assert_close(d.y, d.z, 1e-5);
        for node in tree.nodes() {
            assert_close(node.bound_radius, node.bound.half_diagonal(), 1e-6);
        }
    }

    #[test]
    fn test_zero_radius_points_do_not_produce_nan() {
        let mut buf = SurfelBuffer::default();
        for i in 0..20 {
            buf.push(Vec3::new(i as f32, 0.0, 0.0), Vec3::Y, 0.0, Vec3::ONE);
        }
        let tree = PointOctree::build(&buf).unwrap();
        assert!(tree.stats().degenerate_areas > 0);
        for node in tree.nodes() {
            let a = node.aggregate;
            assert_eq!(a.radius, 0.0);
            assert!(a.center.is_finite());
            assert!(a.color.is_finite());
            assert!(a.normal.is_finite());
        }
    }

    #[test]
    fn test_extra_fields_copied() {
        let mut data = Vec::new();
        for i in 0..20 {
            let mut rec = vec![i as f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.1, 1.0, 1.0, 1.0];
            rec.extend_from_slice(&[100.0 + i as f32, -1.0]);
            data.extend(rec);
        }
        let buf = SurfelBuffer::new(data, 12).unwrap();
        let tree = PointOctree::build(&buf).unwrap();
        assert_eq!(tree.stride(), 12);

        let mut extras: Vec<f32> = Vec::new();
        for (id, node) in tree.nodes().iter().enumerate() {
            if node.is_leaf() {
                for s in tree.leaf_points(id as NodeId) {
                    assert_eq!(s.extra()[0], 100.0 + s.position().x);
                    assert_eq!(s.extra()[1], -1.0);
                    extras.push(s.extra()[0]);
                }
            }
        }
        assert_eq!(extras.len(), 20);
    }

    #[test]
    fn test_build_from_records() {
        let records: Vec<SurfelRecord> = (0..30)
            .map(|i| SurfelRecord::new(Vec3::new(0.0, i as f32, 0.0), Vec3::X, 0.2, Vec3::ONE))
            .collect();
        let tree = PointOctree::build(&SurfelBuffer::from_records(&records)).unwrap();
        assert_eq!(tree.point_count(), 30);
        assert_eq!(tree.stats().point_count, 30);
        assert_eq!(tree.stats().node_count, tree.node_count());
    }

    #[test]
    fn test_index_range() {
        assert_eq!(to_index(7, "node index").unwrap(), 7);
        assert_eq!(to_index(u32::MAX as usize, "node index").unwrap(), u32::MAX);
        match to_index(u32::MAX as usize + 1, "point offset").unwrap_err() {
            Error::IndexOverflow { what, value } => {
                assert_eq!(what, "point offset");
                assert_eq!(value, u32::MAX as usize + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_huge_radii_keep_infinite_root_area() {
        let mut buf = SurfelBuffer::default();
        buf.push(Vec3::ZERO, Vec3::Z, 3e19, Vec3::ONE);
        buf.push(Vec3::ONE, Vec3::Z, 1.0, Vec3::ONE);
        let tree = OctreeBuilder::default().build(&buf).unwrap();

        let root = tree.root();
        assert!(root.aggregate.area().is_infinite());
        assert_eq!(root.aggregate.center, Vec3::ZERO);
        assert_eq!(tree.stats().degenerate_areas, 0);
    }
}
