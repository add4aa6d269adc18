/// Top-level hierarchy over the objects of a scene.
pub mod bvh;
/// `Object3D`: a shape placed in the world with a name, a stable id and a material.
pub mod object;

pub use bvh::ObjectBvh;
pub use object::{Object3D, ObjectId};
