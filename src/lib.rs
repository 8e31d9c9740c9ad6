//! Pointgi - Point-based indirect illumination: surfel octrees with
//! area-weighted aggregate disks, a solid-angle LOD traversal contract and a
//! shared build-once hierarchy cache.

pub mod core;
pub mod math;
pub mod surfel;
pub mod hierarchy;
pub mod ingest;
pub mod cache;
pub mod gather;
