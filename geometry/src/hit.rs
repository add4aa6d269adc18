use math::hcm::{Point3, Vec3};
use std::fmt::{Display, Formatter, Result};

/// Geometric information on a ray-surface intersection:
///  - `distance`: distance from the ray origin to the hit point (equals the ray parameter for
///    unit-length directions),
///  - `pos`: position of the intersection,
///  - `normal`: unit normal of the surface at `pos`, pointing outwards for solids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f32,
    pub pos: Point3,
    pub normal: Vec3,
}

impl Hit {
    pub fn new(distance: f32, pos: Point3, normal: Vec3) -> Hit {
        Hit {
            distance,
            pos,
            normal,
        }
    }

    /// Whether the ray that produced this hit was travelling out of the surface.
    pub fn is_exiting(&self, dir: Vec3) -> bool {
        self.normal.dot(dir) > 0.0
    }
}

impl Display for Hit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "pos = {}, distance = {:.3}, normal = {}",
            self.pos, self.distance, self.normal
        )
    }
}
