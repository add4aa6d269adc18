use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use geometry::bbox::BBox;
use geometry::hit::Hit;
use geometry::ray::Ray;
use geometry::{InstanceTransform, Transform};
use material::MaterialId;
use math::hcm::Point3;
use shape::{LocalShape, Shape};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id of an object. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A shape placed in the world.
///
/// The world bounding box is computed on first use and cached; changing the shape or the
/// transform drops the cache.
pub struct Object3D {
    id: ObjectId,
    name: String,
    transform: InstanceTransform,
    material: Option<MaterialId>,
    shape: Shape,
    world_bbox: OnceLock<BBox>,
}

impl Debug for Object3D {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Object3D[{} '{}', material = {:?}, shape = {}]",
            self.id,
            self.name,
            self.material,
            self.shape.summary()
        )
    }
}

impl Object3D {
    pub fn new<S: Into<Shape>>(name: &str, shape: S) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.to_owned(),
            transform: InstanceTransform::identity(),
            material: None,
            shape: shape.into(),
            world_bbox: OnceLock::new(),
        }
    }

    pub fn with_transform(mut self, transform: InstanceTransform) -> Self {
        self.set_transform(transform);
        self
    }
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn transform(&self) -> &InstanceTransform {
        &self.transform
    }
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }
    pub fn set_transform(&mut self, transform: InstanceTransform) {
        self.transform = transform;
        self.world_bbox = OnceLock::new();
    }
    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
    }
    pub fn set_shape<S: Into<Shape>>(&mut self, shape: S) {
        self.shape = shape.into();
        self.world_bbox = OnceLock::new();
    }

    /// Bounding box of the transformed shape.
    pub fn bbox(&self) -> BBox {
        *self
            .world_bbox
            .get_or_init(|| self.transform.apply(self.shape.local_bbox()))
    }

    /// Closest hit of a world-space ray.
    ///
    /// The ray is mapped to the local frame without renormalizing its direction, so the local
    /// ray parameter range is the world one. The returned distance is measured in world space
    /// from the ray origin, which equals the ray parameter for unit-length directions.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let local_ray = self.transform.affine().inverse().apply(*ray);
        if local_ray.dir.is_zero() || !local_ray.dir.is_finite() {
            return None;
        }
        let local_hit = self.shape.intersect_local(&local_ray)?;
        let mut hit = self.transform.apply(local_hit);
        hit.distance = hit.pos.distance_to(ray.origin);
        Some(hit)
    }

    pub fn occludes(&self, ray: &Ray) -> bool {
        let local_ray = self.transform.affine().inverse().apply(*ray);
        !local_ray.dir.is_zero() && self.shape.occludes_local(&local_ray)
    }

    /// Whether the world point `p` lies inside the object; always false for surfaces.
    pub fn contains(&self, p: Point3) -> bool {
        self.bbox().contains(p) && self.shape.contains_local(self.transform.to_local(p))
    }

    pub fn is_solid(&self) -> bool {
        self.shape.is_solid()
    }

    pub fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
