//! Hierarchy construction and gathering configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Hard upper bound on octree depth.
///
/// An f32 significand has 24 bits, so halving a cube more than 24 times
/// cannot separate points any further.
pub const MAX_OCTREE_DEPTH: u32 = 24;

/// Default number of surfels a leaf may hold before it is split.
pub const DEFAULT_POINTS_PER_LEAF: usize = 8;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full configuration, loadable from JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointGiConfig {
    /// Octree construction parameters.
    pub octree: OctreeConfig,
    /// Gather (shading-time traversal) parameters.
    pub gather: GatherConfig,
}

impl PointGiConfig {
    /// Save to file as pretty JSON (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file (sync). Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Octree construction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// A node with at most this many points becomes a leaf.
    pub max_points_per_leaf: usize,
    /// Nodes at this depth become leaves regardless of point count.
    /// Clamped to [`MAX_OCTREE_DEPTH`].
    pub max_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_points_per_leaf: DEFAULT_POINTS_PER_LEAF,
            max_depth: MAX_OCTREE_DEPTH,
        }
    }
}

impl OctreeConfig {
    /// Leaf capacity, never zero.
    pub fn leaf_capacity(&self) -> usize {
        self.max_points_per_leaf.max(1)
    }

    /// Depth limit, never above [`MAX_OCTREE_DEPTH`].
    pub fn depth_limit(&self) -> u32 {
        self.max_depth.min(MAX_OCTREE_DEPTH)
    }
}

/// Shading-time gather parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherConfig {
    /// Half-angle of the gather cone around the shading normal (radians).
    /// The default covers the whole hemisphere.
    pub cone_angle: f32,
    /// Nodes subtending more than this solid angle (steradians) are descended.
    pub max_solid_angle: f32,
    /// Distance the query point is pushed along its normal.
    pub bias: f32,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            cone_angle: std::f32::consts::FRAC_PI_2,
            max_solid_angle: 0.03,
            bias: 0.0,
        }
    }
}
