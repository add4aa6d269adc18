use std::f32::consts::LN_2;

use geometry::InstanceTransform;
use material::{AttenuationSample, InteractionModel, Material, MaterialCatalog, MaterialId};
use math::hcm::{point3, vec3, Vec3};
use radiometry::RadiationType;
use shape::{Axis, Cuboid, Cylinder, Plane};
use source::Source;
use tlas::Object3D;

use crate::{Scene, SceneError, Sensor};

/// Names accepted by `load()`.
pub const PRESET_NAMES: [&str; 4] = ["shielding", "slab", "moderator", "cosmic"];

/// Builds a preset scene by name, along with the materials it refers to.
pub fn load(name: &str) -> Result<(Scene, MaterialCatalog), SceneError> {
    match name {
        "shielding" => shielding_demo(),
        "slab" => slab_experiment(1.0),
        "moderator" => neutron_moderator(),
        "cosmic" => cosmic_room(),
        _ => Err(SceneError::NotFound {
            kind: "preset",
            name: name.to_owned(),
        }),
    }
}

fn material_id(catalog: &MaterialCatalog, name: &str) -> Result<MaterialId, SceneError> {
    catalog
        .id_of(name)
        .ok_or_else(|| SceneError::UnknownMaterial(name.to_owned()))
}

fn placed<S: Into<shape::Shape>>(name: &str, shape: S, position: Vec3, material: MaterialId) -> Object3D {
    Object3D::new(name, shape)
        .with_transform(InstanceTransform::translater(position))
        .with_material(material)
}

// Functions that build the scenes: objects, sources and sensors.
// ------------------------------------------------------------------------------------------------

/// A Cs-137 point source behind a lead wall standing on a concrete floor, with one detector on
/// each side of the wall.
pub fn shielding_demo() -> Result<(Scene, MaterialCatalog), SceneError> {
    let catalog = MaterialCatalog::with_defaults();
    let lead = material_id(&catalog, "Lead")?;
    let concrete = material_id(&catalog, "Concrete")?;

    let mut scene = Scene::new();
    scene.add_object(placed(
        "Lead wall",
        Cuboid::new(vec3(2.0, 40.0, 40.0))?,
        vec3(10.0, 0.0, 0.0),
        lead,
    ))?;
    scene.add_object(placed(
        "Floor",
        Cuboid::new(vec3(100.0, 2.0, 100.0))?,
        vec3(0.0, -21.0, 0.0),
        concrete,
    ))?;
    scene.add_source(Source::gamma_point("Cs-137", 662.0, 3.7e4))?;
    scene.add_sensor(Sensor::point("Unshielded", point3(5.0, 0.0, 0.0), 1.0))?;
    scene.add_sensor(Sensor::point("Shielded", point3(15.0, 0.0, 0.0), 1.0))?;
    scene.add_sensor(
        Sensor::volume("Floor monitor", point3(0.0, -19.5, 0.0), vec3(20.0, 1.0, 20.0))
            .with_radiation_filter(&[RadiationType::Gamma]),
    )?;
    scene.build_acceleration_structure();
    Ok((scene, catalog))
}

/// Narrow-geometry attenuation setup: a 662 keV isotropic gamma source 1 cm in front of a slab of
/// the given thickness whose material attenuates by exactly one half across it. Two small point
/// detectors, windowed on the uncollided energy, sit on either side of the slab; their
/// radii grow with the distance to the source so that both subtend the same solid angle.
pub fn slab_experiment(thickness: f32) -> Result<(Scene, MaterialCatalog), SceneError> {
    let mut catalog = MaterialCatalog::new();
    let mu = LN_2 / thickness;
    let mut half_value = Material::new("Half-value slab", 1.0)?;
    for energy in [1.0, 10.0, 100.0, 1000.0, 10000.0] {
        half_value.add_attenuation(RadiationType::Gamma, AttenuationSample::linear(energy, mu))?;
    }
    half_value.set_interaction_model(InteractionModel {
        gamma_scatter_probability: 0.0,
        ..InteractionModel::default()
    });
    let slab_material = catalog.add(half_value)?;

    let half = thickness * 0.5;
    let mut scene = Scene::new();
    scene.add_object(
        Object3D::new("Slab", Cuboid::new(vec3(10.0, 10.0, thickness))?).with_material(slab_material),
    )?;
    scene.add_source(
        Source::gamma_point("Source", 662.0, 1.0).with_position(point3(0.0, 0.0, -half - 1.0)),
    )?;
    let window = (661.999, 662.001);
    scene.add_sensor(
        Sensor::point("Before", point3(0.0, 0.0, -half - 0.5), 0.125)
            .with_energy_window(window.0, window.1),
    )?;
    // The far detector sits (d + 1) / 2 past the slab, so its sphere stays clear of the slab.
    let after_gap = 0.5 * (thickness + 1.0);
    let after_radius = 0.125 * (thickness + 1.0 + after_gap) / 0.5;
    scene.add_sensor(
        Sensor::point("After", point3(0.0, 0.0, half + after_gap), after_radius)
            .with_energy_window(window.0, window.1),
    )?;
    scene.build_acceleration_structure();
    Ok((scene, catalog))
}

/// A collimated 2 MeV neutron beam through a polyethylene moderator onto an absorbing detector.
pub fn neutron_moderator() -> Result<(Scene, MaterialCatalog), SceneError> {
    let catalog = MaterialCatalog::with_defaults();
    let poly = material_id(&catalog, "Polyethylene")?;
    let steel = material_id(&catalog, "Steel")?;

    let mut scene = Scene::new();
    scene.add_object(placed("Moderator", Cuboid::new(vec3(10.0, 20.0, 20.0))?, Vec3::ZERO, poly))?;
    scene.add_object(placed(
        "Beam pipe",
        Cylinder::new(2.0, 15.0, Axis::X)?,
        vec3(-15.0, 0.0, 0.0),
        steel,
    ))?;
    scene.add_source(
        Source::neutron_beam("Beam", 2000.0, 1e6)
            .with_position(point3(-30.0, 0.0, 0.0))
            .with_direction(Vec3::X),
    )?;
    scene.add_sensor(
        Sensor::volume("Detector", point3(20.0, 0.0, 0.0), vec3(2.0, 20.0, 20.0))
            .with_radiation_filter(&[RadiationType::Neutron])
            .absorbing(),
    )?;
    scene.build_acceleration_structure();
    Ok((scene, catalog))
}

/// Cosmic muons raining onto a room with a concrete ceiling and a thin steel roof sheet.
pub fn cosmic_room() -> Result<(Scene, MaterialCatalog), SceneError> {
    let catalog = MaterialCatalog::with_defaults();
    let concrete = material_id(&catalog, "Concrete")?;
    let steel = material_id(&catalog, "Steel")?;

    let mut scene = Scene::new();
    scene.add_object(placed(
        "Ceiling",
        Cuboid::new(vec3(60.0, 4.0, 60.0))?,
        vec3(0.0, 5.0, 0.0),
        concrete,
    ))?;
    scene.add_object(
        Object3D::new("Roof sheet", Plane::finite(Vec3::Y, 9.0, 80.0, 80.0)?).with_material(steel),
    )?;
    scene.add_source(Source::cosmic_background())?;
    scene.add_sensor(
        Sensor::volume("Room detector", point3(0.0, 0.0, 0.0), vec3(10.0, 1.0, 10.0))
            .with_radiation_filter(&[RadiationType::Muon]),
    )?;
    scene.build_acceleration_structure();
    Ok((scene, catalog))
}
