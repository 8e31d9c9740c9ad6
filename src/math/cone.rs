//! Cones and solid angles for hemisphere gathering

use std::f32::consts::PI;

use crate::core::types::Vec3;

/// Solid angle (steradians) subtended by a sphere of `radius` seen from `distance`.
///
/// Returns the full sphere (4π) when the viewer is inside.
pub fn sphere_solid_angle(radius: f32, distance: f32) -> f32 {
    if distance <= radius {
        return 4.0 * PI;
    }
    let sin_alpha = radius / distance;
    let cos_alpha = (1.0 - sin_alpha * sin_alpha).max(0.0).sqrt();
    2.0 * PI * (1.0 - cos_alpha)
}

/// Infinite cone with apex, unit axis and half-angle
#[derive(Clone, Copy, Debug)]
pub struct Cone {
    pub apex: Vec3,
    pub axis: Vec3,
    pub half_angle: f32,
    cos_half_angle: f32,
}

impl Cone {
    /// `axis` is normalized here; a zero axis yields +Z.
    pub fn new(apex: Vec3, axis: Vec3, half_angle: f32) -> Self {
        let half_angle = half_angle.clamp(0.0, PI);
        Self {
            apex,
            axis: axis.try_normalize().unwrap_or(Vec3::Z),
            half_angle,
            cos_half_angle: half_angle.cos(),
        }
    }

    /// Check whether a direction (not necessarily unit) lies inside the cone
    pub fn contains_direction(&self, dir: Vec3) -> bool {
        match dir.try_normalize() {
            Some(d) => d.dot(self.axis) >= self.cos_half_angle,
            None => true,
        }
    }

    /// Conservative test: true only if no part of the sphere lies inside the cone.
    pub fn excludes_sphere(&self, center: Vec3, radius: f32) -> bool {
        let to_center = center - self.apex;
        let distance = to_center.length();
        if distance <= radius {
            return false;
        }

        // Widen the cone by the sphere's angular radius
        let alpha = (radius / distance).asin();
        let widened = self.half_angle + alpha;
        if widened >= PI {
            return false;
        }

        let cos_beta = to_center.dot(self.axis) / distance;
        cos_beta < widened.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_solid_angle_inside_is_full_sphere() {
        assert_eq!(sphere_solid_angle(1.0, 0.5), 4.0 * PI);
    }

    #[test]
    fn test_solid_angle_small_sphere_approximation() {
        // Far away the cap tends to πr²/d²
        let omega = sphere_solid_angle(0.1, 100.0);
        let approx = PI * 0.01 / 10000.0;
        assert!((omega - approx).abs() / approx < 1e-2);
    }

    #[test]
    fn test_solid_angle_decreases_with_distance() {
        assert!(sphere_solid_angle(1.0, 2.0) > sphere_solid_angle(1.0, 4.0));
    }

    #[test]
    fn test_hemisphere_cone() {
        let cone = Cone::new(Vec3::ZERO, Vec3::Y, FRAC_PI_2);
        assert!(cone.contains_direction(Vec3::new(1.0, 0.1, 0.0)));
        assert!(!cone.contains_direction(Vec3::new(0.0, -1.0, 0.0)));

        // Sphere well below the horizon is excluded
        assert!(cone.excludes_sphere(Vec3::new(0.0, -10.0, 0.0), 1.0));
        // Sphere straddling the horizon is not
        assert!(!cone.excludes_sphere(Vec3::new(10.0, -0.5, 0.0), 1.0));
        // Sphere containing the apex is never excluded
        assert!(!cone.excludes_sphere(Vec3::new(0.0, -0.5, 0.0), 1.0));
    }

    #[test]
    fn test_narrow_cone() {
        let cone = Cone::new(Vec3::ZERO, Vec3::Z, 0.1);
        assert!(!cone.excludes_sphere(Vec3::new(0.0, 0.0, 10.0), 0.5));
        assert!(cone.excludes_sphere(Vec3::new(10.0, 0.0, 10.0), 0.5));
    }

    #[test]
    fn test_zero_axis_falls_back() {
        let cone = Cone::new(Vec3::ZERO, Vec3::ZERO, 0.5);
        assert_eq!(cone.axis, Vec3::Z);
    }
}
