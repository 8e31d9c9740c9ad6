//! Data-parallel indirect shading of point batches.

use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::HierarchyCache;
use crate::core::config::GatherConfig;
use crate::core::types::Vec3;
use crate::hierarchy::{LodQuery, PointOctree};
use crate::ingest::SurfelSource;

use super::gatherer::{DiskGatherer, GatherResult, RadianceGatherer};

/// A point to shade: position and surface normal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingPoint {
    pub position: Vec3,
    pub normal: Vec3,
}

impl ShadingPoint {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// Shade every point against `tree` with [`DiskGatherer`]s.
///
/// Without a tree every point gets [`GatherResult::NEUTRAL`].
pub fn shade_indirect(
    tree: Option<&PointOctree>,
    points: &[ShadingPoint],
    config: &GatherConfig,
) -> Vec<GatherResult> {
    shade_indirect_with(tree, points, config, DiskGatherer::new)
}

/// Shade every point, one gatherer per rayon worker made by `make_gatherer`.
///
/// Results are in input order, one per point.
pub fn shade_indirect_with<G, F>(
    tree: Option<&PointOctree>,
    points: &[ShadingPoint],
    config: &GatherConfig,
    make_gatherer: F,
) -> Vec<GatherResult>
where
    G: RadianceGatherer,
    F: Fn() -> G + Sync + Send,
{
    let Some(tree) = tree else {
        return vec![GatherResult::NEUTRAL; points.len()];
    };

    points
        .par_iter()
        .map_init(&make_gatherer, |gatherer, point| {
            let query = LodQuery::new(point.position, point.normal, config);
            gatherer.gather(tree, &query)
        })
        .collect()
}

/// Resolves point clouds through a shared cache and shades batches against them.
pub struct IndirectShader<S> {
    cache: Arc<HierarchyCache<S>>,
    config: GatherConfig,
}

impl<S: SurfelSource> IndirectShader<S> {
    pub fn new(cache: Arc<HierarchyCache<S>>, config: GatherConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &Arc<HierarchyCache<S>> {
        &self.cache
    }

    pub fn config(&self) -> &GatherConfig {
        &self.config
    }

    /// Shade `points` against the cloud named `identifier`.
    ///
    /// An empty identifier or a cloud that failed to load yields neutral
    /// results; the failure itself is logged once by the cache.
    pub fn shade(&self, identifier: &str, points: &[ShadingPoint]) -> Vec<GatherResult> {
        if identifier.is_empty() {
            return shade_indirect(None, points, &self.config);
        }

        let tree = self.cache.find(identifier).ok();
        let start = std::time::Instant::now();
        let results = shade_indirect(tree.as_deref(), points, &self.config);
        log::debug!(
            "Shaded {} points against {} in {:.1}ms",
            points.len(), identifier, start.elapsed().as_secs_f64() * 1000.0
        );
        results
    }
}
