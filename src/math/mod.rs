//! Mathematical utilities and data structures

pub mod aabb;
pub mod cone;

pub use aabb::Aabb;
pub use cone::{Cone, sphere_solid_angle};
