pub mod preset;
pub mod sensor;

use std::collections::HashMap;

use geometry::bbox::{self, BBox};
use geometry::{Hit, Ray};
use material::{MaterialError, MaterialId};
use math::hcm::Point3;
use radiometry::{Particle, RadiationType};
use shape::ShapeError;
use source::Source;
use thiserror::Error;
use tlas::bvh::{containing_any_of, intersect_all, intersect_any_of};
use tlas::{Object3D, ObjectBvh, ObjectId};

pub use sensor::{Sensor, SensorGeometry, SensorTally};

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("no {kind} named '{name}'")]
    NotFound { kind: &'static str, name: String },
    #[error("unknown material '{0}'")]
    UnknownMaterial(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Material(#[from] MaterialError),
}

/// Closest intersection of a ray with the scene objects.
#[derive(Debug, Clone, Copy)]
pub struct SceneHit {
    pub hit: Hit,
    pub object: ObjectId,
    /// `None` stands for vacuum.
    pub material: Option<MaterialId>,
}

/// Default background rates per radiation type, counts/s.
pub const DEFAULT_BACKGROUND: [(RadiationType, f32); 3] = [
    (RadiationType::Gamma, 0.1),
    (RadiationType::Neutron, 0.01),
    (RadiationType::Muon, 0.05),
];

/// Registries of the objects, sensors and sources that make up a simulation setup, plus a
/// top-level BVH over the objects.
///
/// Objects live in an arena and are referred to by name or by `ObjectId`. Any change to the set
/// of objects or to their placement marks the acceleration structure dirty; ray queries then fall
/// back to testing every object until `build_acceleration_structure()` is called again.
pub struct Scene {
    objects: Vec<Object3D>,
    object_index: HashMap<String, usize>,
    id_index: HashMap<ObjectId, usize>,
    sensors: Vec<Sensor>,
    sources: Vec<Source>,
    background: HashMap<RadiationType, f32>,
    bvh: ObjectBvh,
    bvh_dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: vec![],
            object_index: HashMap::new(),
            id_index: HashMap::new(),
            sensors: vec![],
            sources: vec![],
            background: DEFAULT_BACKGROUND.iter().copied().collect(),
            bvh: ObjectBvh::empty(),
            bvh_dirty: false,
        }
    }

    // Objects
    // --------------------------------------------------------------------------------------------

    pub fn add_object(&mut self, object: Object3D) -> Result<ObjectId, SceneError> {
        if self.object_index.contains_key(object.name()) {
            return Err(SceneError::DuplicateName {
                kind: "object",
                name: object.name().to_owned(),
            });
        }
        let id = object.id();
        let index = self.objects.len();
        self.object_index.insert(object.name().to_owned(), index);
        self.id_index.insert(id, index);
        self.objects.push(object);
        self.bvh_dirty = true;
        Ok(id)
    }

    pub fn remove_object(&mut self, name: &str) -> Result<Object3D, SceneError> {
        let index = self.object_index.get(name).copied().ok_or_else(|| SceneError::NotFound {
            kind: "object",
            name: name.to_owned(),
        })?;
        let removed = self.objects.remove(index);
        self.reindex_objects();
        self.bvh_dirty = true;
        Ok(removed)
    }

    /// Changes the name of an object, keeping its id.
    pub fn rename_object(&mut self, name: &str, new_name: &str) -> Result<(), SceneError> {
        if name == new_name {
            return Ok(());
        }
        if self.object_index.contains_key(new_name) {
            return Err(SceneError::DuplicateName {
                kind: "object",
                name: new_name.to_owned(),
            });
        }
        let index = self.object_index.remove(name).ok_or_else(|| SceneError::NotFound {
            kind: "object",
            name: name.to_owned(),
        })?;
        self.objects[index].set_name(new_name);
        self.object_index.insert(new_name.to_owned(), index);
        Ok(())
    }

    fn reindex_objects(&mut self) {
        self.object_index.clear();
        self.id_index.clear();
        for (i, obj) in self.objects.iter().enumerate() {
            self.object_index.insert(obj.name().to_owned(), i);
            self.id_index.insert(obj.id(), i);
        }
    }

    pub fn object(&self, name: &str) -> Option<&Object3D> {
        self.object_index.get(name).map(|&i| &self.objects[i])
    }

    /// Mutable access to an object. The acceleration structure is marked dirty since the object
    /// may be moved or reshaped. Use `rename_object()` to change its name.
    pub fn object_mut(&mut self, name: &str) -> Option<&mut Object3D> {
        let index = *self.object_index.get(name)?;
        self.bvh_dirty = true;
        Some(&mut self.objects[index])
    }

    pub fn object_by_id(&self, id: ObjectId) -> Option<&Object3D> {
        self.id_index.get(&id).map(|&i| &self.objects[i])
    }

    pub fn objects(&self) -> &[Object3D] {
        &self.objects
    }
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // Sensors and sources
    // --------------------------------------------------------------------------------------------

    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<(), SceneError> {
        if self.sensor(sensor.name()).is_some() {
            return Err(SceneError::DuplicateName {
                kind: "sensor",
                name: sensor.name().to_owned(),
            });
        }
        self.sensors.push(sensor);
        Ok(())
    }

    pub fn remove_sensor(&mut self, name: &str) -> Result<Sensor, SceneError> {
        let index = self.sensors.iter().position(|s| s.name() == name).ok_or_else(|| {
            SceneError::NotFound {
                kind: "sensor",
                name: name.to_owned(),
            }
        })?;
        Ok(self.sensors.remove(index))
    }

    pub fn sensor(&self, name: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.name() == name)
    }
    pub fn sensor_mut(&mut self, name: &str) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.name() == name)
    }
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn add_source(&mut self, source: Source) -> Result<(), SceneError> {
        if self.source(source.name()).is_some() {
            return Err(SceneError::DuplicateName {
                kind: "source",
                name: source.name().to_owned(),
            });
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn remove_source(&mut self, name: &str) -> Result<Source, SceneError> {
        let index = self.sources.iter().position(|s| s.name() == name).ok_or_else(|| {
            SceneError::NotFound {
                kind: "source",
                name: name.to_owned(),
            }
        })?;
        Ok(self.sources.remove(index))
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name() == name)
    }
    pub fn source_mut(&mut self, name: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.name() == name)
    }
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    pub fn enabled_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.is_enabled())
    }
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    // Background
    // --------------------------------------------------------------------------------------------

    /// Ambient background rate for the radiation type, zero if never set.
    pub fn background_level(&self, kind: RadiationType) -> f32 {
        self.background.get(&kind).copied().unwrap_or(0.0)
    }
    pub fn set_background_level(&mut self, kind: RadiationType, level: f32) {
        self.background.insert(kind, level.max(0.0));
    }

    // Acceleration structure
    // --------------------------------------------------------------------------------------------

    pub fn build_acceleration_structure(&mut self) {
        self.bvh = ObjectBvh::build(&self.objects);
        self.bvh_dirty = false;
        log::info!(
            "Scene acceleration structure built over {} objects, height {}",
            self.objects.len(),
            self.bvh.height()
        );
    }

    /// Rebuilds the acceleration structure only if objects changed since the last build.
    pub fn update_acceleration_structure(&mut self) {
        if self.bvh_dirty {
            self.build_acceleration_structure();
        }
    }

    pub fn is_acceleration_structure_dirty(&self) -> bool {
        self.bvh_dirty
    }

    // Queries
    // --------------------------------------------------------------------------------------------

    pub fn intersect_ray(&self, ray: &Ray) -> Option<SceneHit> {
        let (index, hit) = if self.bvh_dirty {
            intersect_all(&self.objects, ray)
        } else {
            self.bvh.intersect(&self.objects, ray)
        }?;
        let object = &self.objects[index];
        Some(SceneHit {
            hit,
            object: object.id(),
            material: object.material(),
        })
    }

    /// Whether anything blocks the ray within its extent.
    pub fn intersect_ray_any(&self, ray: &Ray) -> bool {
        if self.bvh_dirty {
            intersect_any_of(&self.objects, ray)
        } else {
            self.bvh.intersect_any(&self.objects, ray)
        }
    }

    /// Solid objects containing the point, outermost (largest bounding box) first.
    pub fn objects_containing(&self, p: Point3) -> Vec<&Object3D> {
        let indices = if self.bvh_dirty {
            containing_any_of(&self.objects, p)
        } else {
            self.bvh.containing(&self.objects, p)
        };
        let mut found: Vec<&Object3D> = indices.into_iter().map(|i| &self.objects[i]).collect();
        found.sort_by(|a, b| b.bbox().volume().total_cmp(&a.bbox().volume()));
        found
    }

    /// Sensors that would detect the particle where it currently is.
    pub fn detecting_sensors(&self, particle: &Particle) -> Vec<&Sensor> {
        self.sensors.iter().filter(|s| s.detects(particle)).collect()
    }

    /// Bounding box of every object and sensor.
    pub fn scene_bounds(&self) -> BBox {
        let objects = self.objects.iter().map(|o| o.bbox());
        let sensors = self.sensors.iter().map(|s| s.bbox());
        objects.chain(sensors).fold(BBox::empty(), bbox::union)
    }

    // Statistics
    // --------------------------------------------------------------------------------------------

    pub fn clear_sensor_stats(&self) {
        self.sensors.iter().for_each(Sensor::clear_stats);
    }

    pub fn reset_source_stats(&self) {
        self.sources.iter().for_each(Source::reset_stats);
    }

    /// Sum of the tallies of every sensor.
    pub fn total_sensor_tally(&self) -> SensorTally {
        let mut total = SensorTally::default();
        for s in self.sensors.iter() {
            total.merge(&s.tally());
        }
        total
    }

    /// Removes every object, sensor and source; background levels go back to their defaults.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn summary(&self) -> String {
        format!(
            "Scene: {} objects, {} sensors, {} sources ({} enabled), bounds {}",
            self.objects.len(),
            self.sensors.len(),
            self.sources.len(),
            self.enabled_sources().count(),
            self.scene_bounds()
        )
    }
}
