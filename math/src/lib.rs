/// Defines useful functions for common math operations, tools and constants:
/// - 1D interval,
/// - Linear and log-log interpolation,
/// - Macros to check if two math quantities are close, or ordered.
pub mod float;

/// Homogeneous-coordinate maths module.
/// - Types: 3D points and vectors, 4D vector, 3x3 and 4x4 matrices, rotation quaternions.
/// - Function `make_coord_system()` to build an orthogonal base from a `Vec3`.
/// - Function `spherical_direction()` to build a unit vector from polar angles.
pub mod hcm;
