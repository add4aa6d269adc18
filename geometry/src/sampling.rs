use math::hcm::{make_coord_system, spherical_direction, Vec3};
use std::f32::consts::PI;

/// Maps a uniform 2D sample to a direction uniformly distributed on the unit sphere.
pub fn uniform_sphere(uv: (f32, f32)) -> Vec3 {
    let z = 1.0 - 2.0 * uv.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    spherical_direction(r, z, 2.0 * PI * uv.1)
}

/// Uniform direction inside the cone of half-angle `acos(cos_max)` around +Z.
pub fn uniform_cone(cos_max: f32, uv: (f32, f32)) -> Vec3 {
    let cos_theta = 1.0 - uv.0 * (1.0 - cos_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    spherical_direction(sin_theta, cos_theta, 2.0 * PI * uv.1)
}

/// Rotates a direction expressed in a frame whose +Z is `axis` into world coordinates.
/// `axis` must be normalized.
pub fn to_world(local: Vec3, axis: Vec3) -> Vec3 {
    let (u, v) = make_coord_system(axis);
    u * local.x + v * local.y + axis * local.z
}

/// Deflects `incident` by the polar angle with cosine `cos_theta` and the azimuth `phi`.
pub fn deflect(incident: Vec3, cos_theta: f32, phi: f32) -> Vec3 {
    let cos_theta = cos_theta.clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    to_world(spherical_direction(sin_theta, cos_theta, phi), incident).hat()
}

#[cfg(test)]
mod test {
    use super::*;
    use math::float::linspace;

    #[test]
    fn sphere_samples_are_unit_and_balanced() {
        let (us, _) = linspace((0.0, 1.0), 32);
        let (vs, _) = linspace((0.0, 1.0), 32);
        let mut mean = Vec3::ZERO;
        for &u in us.iter() {
            for &v in vs.iter() {
                let w = uniform_sphere((u, v));
                assert!((w.norm() - 1.0).abs() < 1e-5);
                mean += w;
            }
        }
        mean = mean / (us.len() * vs.len()) as f32;
        assert!(mean.norm() < 0.05, "mean = {}", mean);
    }

    #[test]
    fn cone_stays_inside_half_angle() {
        let cos_max = 0.9;
        let (us, _) = linspace((0.0, 1.0), 16);
        for &u in us.iter() {
            let w = uniform_cone(cos_max, (u, 0.3));
            assert!(w.z >= cos_max - 1e-6);
        }
        assert_eq!(uniform_cone(1.0, (0.5, 0.5)).z, 1.0);
    }

    #[test]
    fn deflection_angle_is_relative_to_incident() {
        let incident = Vec3::new(0.3, -0.4, 0.5).hat();
        for &cos_theta in [-1.0f32, -0.3, 0.0, 0.6, 1.0].iter() {
            let out = deflect(incident, cos_theta, 1.3);
            assert!((out.norm() - 1.0).abs() < 1e-5);
            assert!((out.dot(incident) - cos_theta).abs() < 1e-4);
        }
    }
}
