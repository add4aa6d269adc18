/// Defines the `BBox` axis-aligned bounding-box type.
pub mod bbox;
/// Bounding-volume hierarchy over an indexed set of bounding boxes.
pub mod bvh;
pub mod hit;
pub mod ray;
/// Mappings from uniform random pairs to directions.
pub mod sampling;
pub mod transform;

pub use bbox::BBox;
pub use hit::Hit;
pub use ray::Ray;
pub use transform::{AffineTransform, InstanceTransform, Transform};
