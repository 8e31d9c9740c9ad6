//! Radiance gathering over a point hierarchy.

use std::f32::consts::PI;

use crate::core::types::Vec3;
use crate::hierarchy::{LodDecision, LodQuery, NodeId, PointOctree};

/// Indirect light arriving at one shading point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GatherResult {
    /// Cosine-weighted incoming radiance
    pub radiance: Vec3,
    /// Fraction of the cosine-weighted hemisphere covered by disks, in [0, 1]
    pub occlusion: f32,
}

impl GatherResult {
    /// No light, nothing in the way
    pub const NEUTRAL: Self = Self { radiance: Vec3::ZERO, occlusion: 0.0 };
}

impl Default for GatherResult {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Walks a tree for one query at a time.
///
/// Implementations keep per-worker scratch state, so one instance is used by
/// a single thread and reused across queries.
pub trait RadianceGatherer {
    fn gather(&mut self, tree: &PointOctree, query: &LodQuery) -> GatherResult;
}

/// Approximate gatherer that treats every accepted node or point as a disk.
///
/// Each disk subtends roughly `A·|cos θe| / (d² + A/π)` steradians, weighted by
/// the cosine at the receiver. Back-facing disks occlude but emit nothing.
#[derive(Debug, Default)]
pub struct DiskGatherer {
    stack: Vec<NodeId>,
    radiance: Vec3,
    coverage: f32,
}

impl DiskGatherer {
    pub fn new() -> Self {
        Self { stack: Vec::with_capacity(64), ..Default::default() }
    }

    fn add_disk(&mut self, query: &LodQuery, center: Vec3, normal: Vec3, area: f32, color: Vec3) {
        if area <= 0.0 {
            return;
        }
        let offset = center - query.position;
        let dist2 = offset.length_squared();
        let Some(dir) = offset.try_normalize() else {
            return;
        };

        let cos_receiver = query.normal.dot(dir);
        if cos_receiver <= 0.0 || !query.cone().contains_direction(dir) {
            return;
        }

        let cos_emitter = -normal.dot(dir);
        let solid_angle = area * cos_emitter.abs() / (dist2 + area / PI);
        let weight = solid_angle * cos_receiver / PI;

        self.coverage += weight;
        if cos_emitter > 0.0 {
            self.radiance += color * weight;
        }
    }
}

impl RadianceGatherer for DiskGatherer {
    fn gather(&mut self, tree: &PointOctree, query: &LodQuery) -> GatherResult {
        self.radiance = Vec3::ZERO;
        self.coverage = 0.0;
        self.stack.clear();
        self.stack.push(PointOctree::ROOT);

        while let Some(id) = self.stack.pop() {
            let node = tree.node(id);
            match query.classify(node) {
                LodDecision::Cull => {}
                LodDecision::Aggregate => {
                    let disk = node.aggregate;
                    self.add_disk(query, disk.center, disk.normal, disk.area(), disk.color);
                }
                LodDecision::Descend => {
                    self.stack.extend(node.children().map(|(_, child)| child));
                }
                LodDecision::Points => {
                    for s in tree.leaf_points(id) {
                        self.add_disk(query, s.position(), s.normal(), s.area(), s.color());
                    }
                }
            }
        }

        let (radiance, occlusion) = if self.coverage > 1.0 {
            (self.radiance / self.coverage, 1.0)
        } else {
            (self.radiance, self.coverage)
        };
        GatherResult { radiance, occlusion }
    }
}
