//! Error types for point hierarchy construction and loading

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot build a point hierarchy from zero points")]
    EmptyInput,

    #[error("invalid record stride {0}: surfel records need at least 10 floats")]
    InvalidStride(usize),

    #[error("surfel buffer length {len} is not a multiple of stride {stride}")]
    RaggedBuffer { len: usize, stride: usize },

    #[error("couldn't find required attribute \"{name}\" in {path}")]
    MissingAttribute { path: PathBuf, name: String },

    #[error("point attribute \"{name}\" has the wrong type or count in {path}")]
    AttributeType { path: PathBuf, name: String },

    #[error("point attribute \"{name}\" in {path} holds {actual} values, expected {expected}")]
    AttributeLength {
        path: PathBuf,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("point octree {what} {value} does not fit a 32-bit index")]
    IndexOverflow { what: &'static str, value: usize },

    #[error("point file error: {0}")]
    PointFile(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A recorded failure to produce a hierarchy for one cache identifier.
///
/// Cloned out to every caller that asks for the identifier; the underlying
/// error is shared, not re-created.
#[derive(Debug, Clone, Error)]
#[error("failed to load point hierarchy \"{identifier}\": {source}")]
pub struct LoadFailure {
    pub identifier: String,
    #[source]
    pub source: Arc<Error>,
}

impl LoadFailure {
    pub fn new(identifier: impl Into<String>, source: Error) -> Self {
        Self {
            identifier: identifier.into(),
            source: Arc::new(source),
        }
    }

    /// The error that caused the failure.
    pub fn error(&self) -> &Error {
        &self.source
    }
}
