//! Point hierarchy: a cubic octree of area-weighted aggregate disks.
//!
//! Built once from a [`SurfelBuffer`](crate::surfel::SurfelBuffer), immutable
//! afterwards, and read concurrently by gatherers through the LOD contract in
//! [`lod`].

pub mod aggregate;
pub mod node;
pub mod builder;
pub mod octree;
pub mod lod;

pub use aggregate::{AggregateDisk, AreaWeightedSum, Degeneracy};
pub use node::{NodeId, PointNode};
pub use builder::{BuildStats, OctreeBuilder};
pub use octree::PointOctree;
pub use lod::{LodDecision, LodQuery};
