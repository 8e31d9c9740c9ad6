//! Area-weighted aggregate disks.
//!
//! Every octree node summarizes the surfels below it as a single disk whose
//! area equals the total area of those surfels. Position and color are
//! area-weighted means; the normal is the normalized area-weighted sum.

use crate::core::types::Vec3;
use crate::surfel::{SurfelRef, disk_area};

/// Normal resultants shorter than this fraction of the total area count as cancelled.
const CANCELLED_NORMAL_EPSILON: f32 = 1e-6;

/// A disk standing in for everything below an octree node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateDisk {
    pub center: Vec3,
    /// Unit length
    pub normal: Vec3,
    pub radius: f32,
    pub color: Vec3,
}

impl Default for AggregateDisk {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            normal: Vec3::Z,
            radius: 0.0,
            color: Vec3::ZERO,
        }
    }
}

impl AggregateDisk {
    /// Disk area π·r²
    #[inline]
    pub fn area(&self) -> f32 {
        disk_area(self.radius)
    }
}

/// Degenerate situations met while finishing an aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Degeneracy {
    /// Total area was zero; radius, center and color are zero.
    pub zero_area: bool,
    /// Normals cancelled out; the normal of the largest contributor was used.
    pub cancelled_normal: bool,
}

/// Running area-weighted sums for one node.
#[derive(Clone, Copy, Debug)]
pub struct AreaWeightedSum {
    area: f32,
    position: Vec3,
    normal: Vec3,
    color: Vec3,
    dominant_area: f32,
    dominant: Option<Contribution>,
}

/// The largest single contribution seen so far
#[derive(Clone, Copy, Debug)]
struct Contribution {
    position: Vec3,
    normal: Vec3,
    color: Vec3,
}

impl Default for AreaWeightedSum {
    fn default() -> Self {
        Self {
            area: 0.0,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            color: Vec3::ZERO,
            dominant_area: 0.0,
            dominant: None,
        }
    }
}

impl AreaWeightedSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one weighted contribution.
    pub fn add(&mut self, area: f32, position: Vec3, normal: Vec3, color: Vec3) {
        self.area += area;
        self.position += area * position;
        self.normal += area * normal;
        self.color += area * color;

        if self.dominant.is_none() || area > self.dominant_area {
            self.dominant_area = area;
            self.dominant = Some(Contribution { position, normal, color });
        }
    }

    /// Add a raw surfel record (leaf aggregation).
    pub fn add_surfel(&mut self, surfel: SurfelRef<'_>) {
        self.add(surfel.area(), surfel.position(), surfel.normal(), surfel.color());
    }

    /// Add a child node's aggregate (internal aggregation).
    pub fn add_disk(&mut self, disk: &AggregateDisk) {
        self.add(disk.area(), disk.center, disk.normal, disk.color);
    }

    /// Total accumulated area
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Resolve the sums into a disk.
    ///
    /// An area sum that overflowed to infinity keeps an infinite radius; the
    /// weighted means are unusable then, so center and color come from the
    /// largest contributor.
    pub fn finish(&self) -> (AggregateDisk, Degeneracy) {
        let mut degeneracy = Degeneracy::default();

        let area = self.area;
        let dominant = self.dominant.unwrap_or(Contribution {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            color: Vec3::ZERO,
        });
        let dominant_normal = dominant.normal.try_normalize().unwrap_or(Vec3::Z);

        let (center, color, radius) = if area > 0.0 && area.is_finite() {
            let inv = 1.0 / area;
            (self.position * inv, self.color * inv, (area / std::f32::consts::PI).sqrt())
        } else if area > 0.0 {
            (dominant.position, dominant.color, f32::INFINITY)
        } else {
            // Sums are zero here, keep them rather than dividing
            degeneracy.zero_area = true;
            (self.position, self.color, 0.0)
        };

        let length = self.normal.length();
        let normal = if degeneracy.zero_area {
            dominant_normal
        } else if !area.is_finite() {
            self.normal.try_normalize().unwrap_or(dominant_normal)
        } else if length > CANCELLED_NORMAL_EPSILON * area {
            self.normal / length
        } else {
            degeneracy.cancelled_normal = true;
            dominant_normal
        };

        (AggregateDisk { center, normal, radius, color }, degeneracy)
    }
}
