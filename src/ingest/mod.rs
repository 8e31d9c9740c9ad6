//! Surfel ingestion: point-cloud files and the source seam used by the cache

pub mod point_file;
pub mod source;

pub use point_file::{
    AttributeData, AttributeKind, PointFile, PointFileData,
    load_surfels, POINT_FILE_VERSION,
};
pub use source::{PointFileSource, SurfelSource};
