//! Single surfel records and borrowed views over raw float records.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// Number of floats every surfel record starts with:
/// `[px, py, pz, nx, ny, nz, radius, r, g, b]`.
pub const SURFEL_FLOATS: usize = 10;

/// Offsets of the fixed fields inside a record.
pub const POSITION_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 3;
pub const RADIUS_OFFSET: usize = 6;
pub const COLOR_OFFSET: usize = 7;

/// Area of a disk of the given radius.
#[inline]
pub fn disk_area(radius: f32) -> f32 {
    PI * radius * radius
}

/// Packed 10-float surfel record (40 bytes), layout-compatible with a
/// stride-10 [`SurfelBuffer`](super::SurfelBuffer).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfelRecord {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
}

impl SurfelRecord {
    pub fn new(position: Vec3, normal: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            radius,
            color: color.to_array(),
        }
    }
}

/// Borrowed view of one raw record (at least [`SURFEL_FLOATS`] floats).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfelRef<'a> {
    raw: &'a [f32],
}

impl<'a> SurfelRef<'a> {
    /// Wrap a raw record. Callers guarantee `raw.len() >= SURFEL_FLOATS`.
    pub(crate) fn new(raw: &'a [f32]) -> Self {
        debug_assert!(raw.len() >= SURFEL_FLOATS);
        Self { raw }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_slice(&self.raw[POSITION_OFFSET..POSITION_OFFSET + 3])
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        Vec3::from_slice(&self.raw[NORMAL_OFFSET..NORMAL_OFFSET + 3])
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.raw[RADIUS_OFFSET]
    }

    #[inline]
    pub fn color(&self) -> Vec3 {
        Vec3::from_slice(&self.raw[COLOR_OFFSET..COLOR_OFFSET + 3])
    }

    /// Disk area π·r²
    #[inline]
    pub fn area(&self) -> f32 {
        disk_area(self.radius())
    }

    /// Trailing user fields beyond the fixed layout.
    pub fn extra(&self) -> &'a [f32] {
        &self.raw[SURFEL_FLOATS..]
    }

    /// The whole raw record.
    pub fn raw(&self) -> &'a [f32] {
        self.raw
    }
}
