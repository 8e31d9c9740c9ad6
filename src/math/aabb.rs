//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Inverted box that grows to fit the first point expanded into it
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Smallest AABB containing every point
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.expand(p);
        }
        aabb
    }

    /// True until a point has been expanded into the box
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Half the length of the diagonal; radius of the bounding sphere around the center
    pub fn half_diagonal(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// True when all three extents are equal
    pub fn is_cube(&self) -> bool {
        let d = self.size();
        d.x == d.y && d.y == d.z
    }

    /// Cube sharing this box's center, with edge length equal to its largest extent.
    ///
    /// Octrees over point clouds use this instead of a tight fit so that each
    /// octant sees a similar point density.
    pub fn cubic(&self) -> Aabb {
        let center = self.center();
        let mut half = self.size().max_element() * 0.5;
        let mut cube = Aabb::from_center_half_extent(center, Vec3::splat(half));
        // center ± half may round inward past the input corners
        for _ in 0..8 {
            if cube.contains_point(self.min) && cube.contains_point(self.max) {
                break;
            }
            half = half * (1.0 + 2.0 * f32::EPSILON) + f32::MIN_POSITIVE;
            cube = Aabb::from_center_half_extent(center, Vec3::splat(half));
        }
        cube
    }

    /// Octant of `p` relative to the box center.
    /// bit 0 = x, bit 1 = y, bit 2 = z; a coordinate equal to the center goes low.
    pub fn octant_of(&self, p: Vec3) -> u8 {
        let c = self.center();
        (if p.x > c.x { 1u8 } else { 0 })
            | (if p.y > c.y { 2 } else { 0 })
            | (if p.z > c.z { 4 } else { 0 })
    }

    /// Get child octant AABB for octree subdivision
    /// index: 0-7 representing xyz octant (bit 0=x, bit 1=y, bit 2=z)
    ///
    /// Children are split exactly at the parent center so that siblings
    /// share faces bit-for-bit.
    pub fn child_octant(&self, index: u8) -> Aabb {
        let c = self.center();
        let pick = |bit: u8, lo: f32, mid: f32, hi: f32| {
            if index & bit != 0 { (mid, hi) } else { (lo, mid) }
        };
        let (min_x, max_x) = pick(1, self.min.x, c.x, self.max.x);
        let (min_y, max_y) = pick(2, self.min.y, c.y, self.max.y);
        let (min_z, max_z) = pick(4, self.min.z, c.z, self.max.z);

        Aabb::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
    }
}
