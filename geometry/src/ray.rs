use std::fmt::{Display, Formatter, Result};

use math::hcm;

/// Smallest accepted ray parameter by default. Keeps a ray spawned on a surface from hitting
/// that same surface again.
pub const DEFAULT_T_MIN: f32 = 1e-4;

/// Represents a ray:
///
///   origin + t * direction
///
/// where t lies in `[t_min, t_max]`.
///
/// The extent of the ray is by default infinite, but can be set to a positive number in order to
/// accelerate intersection tests. Distances reported by intersection routines are world lengths
/// only when `dir` is unit-length, which is how the transport code builds its rays.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: hcm::Point3,
    pub dir: hcm::Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(origin: hcm::Point3, dir: hcm::Vec3) -> Self {
        Ray {
            origin,
            dir,
            t_min: DEFAULT_T_MIN,
            t_max: f32::INFINITY,
        }
    }
    pub fn with_extent(self, t_max: f32) -> Self {
        Ray { t_max, ..self }
    }
    pub fn with_t_min(self, t_min: f32) -> Self {
        Ray { t_min, ..self }
    }
    /// Returns `None` if the given `t` is outside the ray's extent [`r.t_min`, `r.t_max`].
    /// `Some(t)` otherwise.
    pub fn truncated_t(&self, t: f32) -> Option<f32> {
        if t.is_nan() || t < self.t_min || t > self.t_max {
            None
        } else {
            Some(t)
        }
    }

    pub fn position_at(&self, t: f32) -> hcm::Point3 {
        self.origin + t * self.dir
    }
}

impl Display for Ray {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "{:.precision$} + t{:.precision$}, t in [{}, {}]",
            self.origin,
            self.dir,
            self.t_min,
            self.t_max,
            precision = precision
        )
    }
}
