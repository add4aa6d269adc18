mod mesh;
mod simple;

use enum_dispatch::enum_dispatch;
use geometry::bbox::BBox;
use geometry::hit::Hit;
use geometry::ray::Ray;
use math::hcm::Point3;
use thiserror::Error;

pub use mesh::*;
pub use simple::*;

/// Invalid shape parameters, reported when a shape is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("{what} must be positive and finite, got {value}")]
    InvalidDimension { what: &'static str, value: f32 },
    #[error("plane normal must be a non-zero finite vector")]
    DegenerateNormal,
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("mesh index count {0} is not a multiple of 3")]
    IndexCountNotMultipleOfThree(usize),
    #[error("mesh index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("mesh vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(usize),
}

pub(crate) fn check_dimension(what: &'static str, value: f32) -> Result<f32, ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ShapeError::InvalidDimension { what, value })
    }
}

/// Represents the characteristics of a shape in its own local frame: has a bounding box, and can
/// interact with a ray. World placement is handled by the object owning the shape.
/// - See `simple.rs` for the analytic shapes: `Cuboid`, `Sphere`, `Cylinder` and `Plane`.
/// - See `mesh.rs` for `TriangleMesh`.
#[enum_dispatch]
pub trait LocalShape {
    fn summary(&self) -> String;
    fn local_bbox(&self) -> BBox;
    /// Nearest intersection with parameter inside `[r.t_min, r.t_max]`.
    fn intersect_local(&self, r: &Ray) -> Option<Hit>;
    fn occludes_local(&self, r: &Ray) -> bool {
        self.intersect_local(r).is_some()
    }
    /// Whether `p` is in the interior; always false for surfaces.
    fn contains_local(&self, p: Point3) -> bool;
    /// Solids enclose a volume that particles can enter; surfaces are only crossed.
    fn is_solid(&self) -> bool {
        true
    }
    fn volume(&self) -> Option<f32> {
        None
    }
    fn surface_area(&self) -> Option<f32> {
        None
    }
}

/// Closed set of shapes an object can carry.
#[enum_dispatch(LocalShape)]
#[derive(Debug)]
pub enum Shape {
    Cuboid,
    Sphere,
    Cylinder,
    Plane,
    TriangleMesh,
}
