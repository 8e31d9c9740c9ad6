//! Shade a grid of query points against a point file.
//!
//! Usage: cargo run --release --bin shade_points -- --ptc <FILE> [OPTIONS]
//!
//! Options:
//!   --ptc <FILE>      Point file to gather from (required)
//!   --config <FILE>   JSON config (octree and gather parameters)
//!   --grid <N>        Query grid resolution, N x N points (default: 64)
//!   --jobs <N>        Rayon worker threads (default: all cores)
//!
//! The grid sits just below the cloud's bound, facing +Z, so every query
//! looks into the cloud.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;

use pointgi::cache::HierarchyCache;
use pointgi::core::PointGiConfig;
use pointgi::gather::{GatherResult, IndirectShader, ShadingPoint};
use pointgi::hierarchy::PointOctree;
use pointgi::ingest::PointFileSource;

fn main() {
    pointgi::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(ptc) = parse_str_arg(&args, "--ptc") else {
        eprintln!("Usage: shade_points --ptc <FILE> [--config FILE] [--grid N] [--jobs N]");
        std::process::exit(2);
    };
    let grid = parse_usize_arg(&args, "--grid").unwrap_or(64).max(1);

    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("Failed to configure thread pool");
    }

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => PointGiConfig::load_sync(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Failed to load config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => PointGiConfig::default(),
    };

    println!("=== Pointgi Indirect Shading ===");
    println!("Point file: {}", ptc);
    println!("Grid:       {} x {}", grid, grid);
    println!("Threads:    {}", rayon::current_num_threads());
    println!(
        "Gather:     cone {:.3} rad, max solid angle {:.4} sr, bias {}",
        config.gather.cone_angle, config.gather.max_solid_angle, config.gather.bias
    );
    println!();

    let cache = Arc::new(HierarchyCache::new(PointFileSource::new(), config.octree));

    let build_start = Instant::now();
    let tree = match cache.find(&ptc) {
        Ok(tree) => tree,
        Err(failure) => {
            eprintln!("{}", failure);
            std::process::exit(1);
        }
    };
    print_tree_stats(&tree, build_start.elapsed().as_secs_f64());

    let points = query_grid(&tree, grid);
    let shader = IndirectShader::new(Arc::clone(&cache), config.gather);

    let shade_start = Instant::now();
    let results = shader.shade(&ptc, &points);
    let elapsed = shade_start.elapsed().as_secs_f64();

    print_results(&results);
    println!(
        "Shaded {} points in {:.1}ms ({:.0} points/sec)",
        results.len(),
        elapsed * 1000.0,
        results.len() as f64 / elapsed.max(1e-9)
    );

    let stats = cache.stats();
    println!("Cache: {} builds, {} hits, {} failures", stats.builds, stats.hits, stats.failures);
}

fn print_tree_stats(tree: &PointOctree, seconds: f64) {
    let stats = tree.stats();
    let bound = tree.bound();
    println!("Points:     {}", stats.point_count);
    println!("Nodes:      {} ({} leaves)", stats.node_count, stats.leaf_count);
    println!("Depth:      {}", stats.max_depth_reached);
    println!("Bound:      {:?} .. {:?}", bound.min, bound.max);
    println!("Total area: {:.4}", tree.total_area());
    if stats.depth_limited_leaves > 0 {
        println!("Depth-limited leaves: {}", stats.depth_limited_leaves);
    }
    if stats.degenerate_areas > 0 || stats.degenerate_normals > 0 {
        println!(
            "Degenerate: {} zero-area, {} cancelled normals",
            stats.degenerate_areas, stats.degenerate_normals
        );
    }
    println!("Loaded + built in {:.1}ms", seconds * 1000.0);
    println!();
}

/// N×N points under the cloud, facing up
fn query_grid(tree: &PointOctree, n: usize) -> Vec<ShadingPoint> {
    let bound = tree.bound();
    let size = bound.size();
    let z = bound.min.z - 0.05 * size.z.max(1e-3);

    let mut points = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let u = (i as f32 + 0.5) / n as f32;
            let v = (j as f32 + 0.5) / n as f32;
            let p = Vec3::new(bound.min.x + u * size.x, bound.min.y + v * size.y, z);
            points.push(ShadingPoint::new(p, Vec3::Z));
        }
    }
    points
}

fn print_results(results: &[GatherResult]) {
    if results.is_empty() {
        return;
    }
    let count = results.len() as f32;
    let mean_occlusion = results.iter().map(|r| r.occlusion).sum::<f32>() / count;
    let mean_radiance = results.iter().map(|r| r.radiance).sum::<Vec3>() / count;
    let min_occlusion = results.iter().map(|r| r.occlusion).fold(f32::INFINITY, f32::min);
    let max_occlusion = results.iter().map(|r| r.occlusion).fold(0.0, f32::max);

    println!("Occlusion: mean {:.4}, min {:.4}, max {:.4}", mean_occlusion, min_occlusion, max_occlusion);
    println!("Radiance:  mean ({:.4}, {:.4}, {:.4})", mean_radiance.x, mean_radiance.y, mean_radiance.z);
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
