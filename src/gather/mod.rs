//! Radiance gathering: the client side of the LOD traversal contract.
//!
//! The microbuffer rasterizer of a full renderer is not part of this crate;
//! [`DiskGatherer`] is a small approximate gatherer that drives the contract.

pub mod gatherer;
pub mod shade;

pub use gatherer::{DiskGatherer, GatherResult, RadianceGatherer};
pub use shade::{IndirectShader, ShadingPoint, shade_indirect, shade_indirect_with};
