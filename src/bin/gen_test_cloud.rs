//! Synthetic surfel cloud generator: writes a point file for testing.
//!
//! Usage: cargo run --release --bin gen_test_cloud -- [OPTIONS]
//!
//! Options:
//!   --shape <SHAPE>   sphere | plane | box (default: sphere)
//!   --count <N>       Approximate number of surfels (default: 100000)
//!   --radius <R>      Sphere radius / half-size of plane and box (default: 1.0)
//!   --out <FILE>      Output path (default: assets/clouds/<shape>.ptc)
//!
//! Surfel radii are chosen so the disks tile the surface area. Colors vary
//! with the surface normal so gathered radiance is easy to eyeball.

use std::f32::consts::PI;
use std::path::PathBuf;
use std::time::Instant;

use glam::Vec3;

use pointgi::ingest::PointFile;
use pointgi::surfel::SurfelBuffer;

fn main() {
    pointgi::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let shape = parse_str_arg(&args, "--shape").unwrap_or_else(|| "sphere".to_string());
    let count = parse_usize_arg(&args, "--count").unwrap_or(100_000).max(1);
    let radius = parse_f32_arg(&args, "--radius").unwrap_or(1.0);
    let out = parse_str_arg(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("assets/clouds/{}.ptc", shape)));

    println!("=== Pointgi Test Cloud Generator ===");
    println!("Shape:  {}", shape);
    println!("Count:  {}", count);
    println!("Radius: {}", radius);
    println!("Output: {}", out.display());
    println!();

    let start = Instant::now();
    let surfels = match shape.as_str() {
        "sphere" => sphere(count, radius),
        "plane" => plane(count, radius),
        "box" => cube(count, radius),
        other => {
            eprintln!("Unknown shape '{}', expected sphere, plane or box", other);
            std::process::exit(2);
        }
    };

    PointFile::from_buffer(&surfels)
        .save_sync(&out)
        .expect("Failed to write point file");

    let size = std::fs::metadata(&out).map(|m| m.len()).unwrap_or(0);
    println!(
        "Wrote {} surfels ({:.1} KB, total area {:.3}) in {:.1}ms",
        surfels.len(),
        size as f64 / 1024.0,
        surfels.total_area(),
        start.elapsed().as_secs_f64() * 1000.0
    );
}

fn color_for(normal: Vec3) -> Vec3 {
    normal * 0.5 + Vec3::splat(0.5)
}

/// Fibonacci spiral over a sphere, outward normals
fn sphere(count: usize, radius: f32) -> SurfelBuffer {
    let surfel_radius = (4.0 * radius * radius / count as f32).sqrt();
    let golden = PI * (3.0 - 5.0f32.sqrt());

    let mut buf = SurfelBuffer::default();
    for i in 0..count {
        let z = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
        let ring = (1.0 - z * z).max(0.0).sqrt();
        let theta = golden * i as f32;
        let n = Vec3::new(ring * theta.cos(), ring * theta.sin(), z);
        buf.push(n * radius, n, surfel_radius, color_for(n));
    }
    buf
}

/// Square grid on z = 0 facing +Z
fn plane(count: usize, half: f32) -> SurfelBuffer {
    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    let mut buf = SurfelBuffer::default();
    push_face(&mut buf, side, half, Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z);
    buf
}

/// Six grids on the faces of a cube, outward normals
fn cube(count: usize, half: f32) -> SurfelBuffer {
    let side = ((count as f32 / 6.0).sqrt().ceil().max(1.0)) as usize;
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut buf = SurfelBuffer::default();
    for (normal, u, v) in faces {
        push_face(&mut buf, side, half, normal * half, u, v, normal);
    }
    buf
}

/// `side`×`side` surfels tiling a square of half-size `half` around `center`
fn push_face(buf: &mut SurfelBuffer, side: usize, half: f32, center: Vec3, u: Vec3, v: Vec3, normal: Vec3) {
    let step = 2.0 * half / side as f32;
    let surfel_radius = step / PI.sqrt();
    for i in 0..side {
        for j in 0..side {
            let s = -half + (i as f32 + 0.5) * step;
            let t = -half + (j as f32 + 0.5) * step;
            buf.push(center + u * s + v * t, normal, surfel_radius, color_for(normal));
        }
    }
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
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
