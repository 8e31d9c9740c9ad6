//! Level-of-detail traversal contract.
//!
//! Gatherers walk the tree themselves; this module only decides, per node,
//! whether a node is culled, shaded as its single aggregate disk, or opened up.
//! The decision compares the solid angle of the node's bounding sphere, seen
//! from the query point, against a tolerance.

use crate::core::config::GatherConfig;
use crate::core::types::Vec3;
use crate::math::{Cone, sphere_solid_angle};

use super::node::PointNode;

/// What a gatherer should do with a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodDecision {
    /// Entirely outside the gather cone
    Cull,
    /// Small enough to shade as the node's aggregate disk
    Aggregate,
    /// Too large or too close; visit the children
    Descend,
    /// Too large or too close, and a leaf; shade its raw points
    Points,
}

/// A gather query at one shading point.
#[derive(Clone, Copy, Debug)]
pub struct LodQuery {
    /// Query position (already offset by the bias)
    pub position: Vec3,
    /// Unit shading normal
    pub normal: Vec3,
    /// Half-angle of the gather cone around `normal` (radians)
    pub cone_angle: f32,
    /// Solid angle (steradians) above which nodes are descended
    pub max_solid_angle: f32,
    cone: Cone,
}

impl LodQuery {
    /// Query at `position` facing `normal`, with the position pushed
    /// `config.bias` along the normal.
    pub fn new(position: Vec3, normal: Vec3, config: &GatherConfig) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Z);
        let position = position + normal * config.bias;
        Self {
            position,
            normal,
            cone_angle: config.cone_angle,
            max_solid_angle: config.max_solid_angle,
            cone: Cone::new(position, normal, config.cone_angle),
        }
    }

    /// The gather cone
    pub fn cone(&self) -> &Cone {
        &self.cone
    }

    /// Decide how to treat `node`.
    ///
    /// # Examples
    /// ```
    /// use pointgi::core::GatherConfig;
    /// use pointgi::hierarchy::{LodDecision, LodQuery, PointOctree};
    /// use pointgi::surfel::SurfelBuffer;
    /// use glam::Vec3;
    ///
    /// let mut surfels = SurfelBuffer::default();
    /// surfels.push(Vec3::new(0.0, 0.0, 100.0), -Vec3::Z, 0.1, Vec3::ONE);
    /// let tree = PointOctree::build(&surfels).unwrap();
    ///
    /// let query = LodQuery::new(Vec3::ZERO, Vec3::Z, &GatherConfig::default());
    /// assert_eq!(query.classify(tree.root()), LodDecision::Aggregate);
    ///
    /// let behind = LodQuery::new(Vec3::ZERO, -Vec3::Z, &GatherConfig::default());
    /// assert_eq!(behind.classify(tree.root()), LodDecision::Cull);
    /// ```
    pub fn classify(&self, node: &PointNode) -> LodDecision {
        if self.cone.excludes_sphere(node.center, node.bound_radius) {
            return LodDecision::Cull;
        }

        let distance = (node.center - self.position).length();
        let inside = distance <= node.bound_radius;
        if inside || sphere_solid_angle(node.bound_radius, distance) > self.max_solid_angle {
            if node.is_leaf() {
                LodDecision::Points
            } else {
                LodDecision::Descend
            }
        } else {
            LodDecision::Aggregate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;

    fn leaf(center: Vec3, half: f32) -> PointNode {
        PointNode::new(Aabb::from_center_half_extent(center, Vec3::splat(half)), 0)
    }

    fn internal(center: Vec3, half: f32) -> PointNode {
        let mut node = leaf(center, half);
        node.child_mask = 1;
        node.child_offset = 1;
        node
    }

    fn up_query() -> LodQuery {
        LodQuery::new(Vec3::ZERO, Vec3::Z, &GatherConfig::default())
    }

    #[test]
    fn test_bias_offsets_position() {
        let config = GatherConfig { bias: 0.5, ..Default::default() };
        let query = LodQuery::new(Vec3::ONE, Vec3::new(0.0, 0.0, 2.0), &config);
        assert_eq!(query.position, Vec3::new(1.0, 1.0, 1.5));
        assert_eq!(query.normal, Vec3::Z);
        assert_eq!(query.cone().apex, query.position);
    }

    #[test]
    fn test_far_small_node_uses_aggregate() {
        let q = up_query();
        assert_eq!(q.classify(&internal(Vec3::new(0.0, 0.0, 50.0), 0.5)), LodDecision::Aggregate);
        assert_eq!(q.classify(&leaf(Vec3::new(0.0, 0.0, 50.0), 0.5)), LodDecision::Aggregate);
    }

    #[test]
    fn test_near_large_node_descends() {
        let q = up_query();
        assert_eq!(q.classify(&internal(Vec3::new(0.0, 0.0, 5.0), 2.0)), LodDecision::Descend);
        assert_eq!(q.classify(&leaf(Vec3::new(0.0, 0.0, 5.0), 2.0)), LodDecision::Points);
    }

    #[test]
    fn test_query_inside_sphere_always_descends() {
        let config = GatherConfig { max_solid_angle: 100.0, ..Default::default() };
        let q = LodQuery::new(Vec3::ZERO, Vec3::Z, &config);
        assert_eq!(q.classify(&internal(Vec3::new(0.0, 0.0, 0.5), 1.0)), LodDecision::Descend);
        // Same node seen from far away is accepted with a huge tolerance
        assert_eq!(q.classify(&internal(Vec3::new(0.0, 0.0, 3.0), 1.0)), LodDecision::Aggregate);
    }

    #[test]
    fn test_node_behind_is_culled() {
        let q = up_query();
        assert_eq!(q.classify(&internal(Vec3::new(0.0, 0.0, -10.0), 1.0)), LodDecision::Cull);
        // Straddling the horizon is kept
        assert_ne!(q.classify(&internal(Vec3::new(10.0, 0.0, -0.5), 1.0)), LodDecision::Cull);
    }

    #[test]
    fn test_narrow_cone_culls_sideways_nodes() {
        let config = GatherConfig { cone_angle: 0.2, ..Default::default() };
        let q = LodQuery::new(Vec3::ZERO, Vec3::Z, &config);
        assert_eq!(q.classify(&leaf(Vec3::new(20.0, 0.0, 5.0), 0.5)), LodDecision::Cull);
        assert_ne!(q.classify(&leaf(Vec3::new(0.0, 0.0, 20.0), 0.5)), LodDecision::Cull);
    }

    #[test]
    fn test_threshold_is_strict() {
        let node = internal(Vec3::new(0.0, 0.0, 10.0), 1.0);
        let omega = sphere_solid_angle(node.bound_radius, 10.0);
        let at = GatherConfig { max_solid_angle: omega, ..Default::default() };
        let q = LodQuery::new(Vec3::ZERO, Vec3::Z, &at);
        assert_eq!(q.classify(&node), LodDecision::Aggregate);

        let below = GatherConfig { max_solid_angle: omega * 0.5, ..Default::default() };
        let q = LodQuery::new(Vec3::ZERO, Vec3::Z, &below);
        assert_eq!(q.classify(&node), LodDecision::Descend);
    }
}
