//! Deterministic attenuation estimates, used to cross-check the Monte Carlo tallies.

use material::MaterialCatalog;
use math::float::linspace;
use math::hcm::Point3;
use radiometry::RadiationType;
use scene::Scene;

/// Uncollided transmission `exp(-mu * distance)` through a homogeneous medium.
pub fn analytical_attenuation(distance: f32, mu: f32) -> f64 {
    (-(mu as f64) * distance as f64).exp()
}

/// Uncollided transmission along the straight segment `from -> to`.
///
/// The segment is cut into `cells` equal pieces; the attenuation of each piece is that of the
/// innermost solid containing its midpoint (vacuum if none).
pub fn line_attenuation_factor(
    scene: &Scene, materials: &MaterialCatalog, kind: RadiationType, energy: f32, from: Point3,
    to: Point3, cells: usize,
) -> f64 {
    let length = from.distance_to(to);
    if length == 0.0 || cells == 0 {
        return 1.0;
    }
    let dir = (to - from).hat();
    let (midpoints, cell_length) = linspace((0.0, length), cells as i32);
    let optical_depth: f64 = midpoints
        .iter()
        .map(|&t| {
            let mu = scene
                .objects_containing(from + t * dir)
                .last()
                .and_then(|o| o.material())
                .and_then(|id| materials.get(id))
                .map_or(0.0, |m| m.linear_attenuation(kind, energy));
            mu as f64 * cell_length as f64
        })
        .sum();
    (-optical_depth).exp()
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::point3;

    #[test]
    fn homogeneous_medium() {
        assert_eq!(analytical_attenuation(0.0, 3.0), 1.0);
        assert!((analytical_attenuation(2.0, 0.5) - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn line_through_half_value_slab() {
        let (scene, materials) = scene::preset::slab_experiment(2.0).unwrap();
        let f = line_attenuation_factor(
            &scene,
            &materials,
            RadiationType::Gamma,
            662.0,
            point3(0.0, 0.0, -5.0),
            point3(0.0, 0.0, 5.0),
            1000,
        );
        assert!((f - 0.5).abs() < 0.01, "{}", f);
        // Neutrons see no attenuation table.
        let n = line_attenuation_factor(
            &scene,
            &materials,
            RadiationType::Neutron,
            662.0,
            point3(0.0, 0.0, -5.0),
            point3(0.0, 0.0, 5.0),
            100,
        );
        assert_eq!(n, 1.0);
        assert_eq!(
            line_attenuation_factor(&scene, &materials, RadiationType::Gamma, 662.0, Point3::ORIGIN, Point3::ORIGIN, 10),
            1.0
        );
    }
}
