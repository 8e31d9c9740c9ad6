//! Core types, errors, logging and configuration

pub mod types;
pub mod error;
pub mod logging;
pub mod config;

pub use types::*;
pub use error::{Error, LoadFailure};
pub use config::{PointGiConfig, OctreeConfig, GatherConfig, MAX_OCTREE_DEPTH};
