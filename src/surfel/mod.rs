//! Surfels: oriented radiance disks and the flat buffers that carry them.

pub mod record;
pub mod buffer;

pub use record::{SurfelRecord, SurfelRef, SURFEL_FLOATS, disk_area};
pub use buffer::SurfelBuffer;
