//! Surfel sources: where the cache gets surfels for an identifier.

use std::path::{Path, PathBuf};

use crate::core::types::Result;
use crate::surfel::SurfelBuffer;

use super::point_file::load_surfels;

/// Produces the surfels for an identifier.
///
/// Called at most once per identifier by the hierarchy cache, possibly from
/// several threads at once for different identifiers.
pub trait SurfelSource: Send + Sync {
    fn load(&self, identifier: &str) -> Result<SurfelBuffer>;
}

impl<F> SurfelSource for F
where
    F: Fn(&str) -> Result<SurfelBuffer> + Send + Sync,
{
    fn load(&self, identifier: &str) -> Result<SurfelBuffer> {
        self(identifier)
    }
}

/// Treats identifiers as point-file paths, optionally relative to a root directory.
#[derive(Clone, Debug, Default)]
pub struct PointFileSource {
    root: Option<PathBuf>,
}

impl PointFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative identifiers against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    /// File path for an identifier
    pub fn resolve(&self, identifier: &str) -> PathBuf {
        let path = Path::new(identifier);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SurfelSource for PointFileSource {
    fn load(&self, identifier: &str) -> Result<SurfelBuffer> {
        load_surfels(&self.resolve(identifier))
    }
}
