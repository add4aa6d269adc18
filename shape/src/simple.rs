use geometry::bbox::{self, BBox};
use geometry::hit::Hit;
use geometry::ray::Ray;
use math::hcm::{make_coord_system, Point3, Vec3};
use std::f32::consts::PI;

use crate::{check_dimension, LocalShape, ShapeError};

/// Below this magnitude a direction component counts as parallel to an axis or plane.
const PARALLEL_EPSILON: f32 = 1e-12;

/// Half-size of the bounding box given to infinite planes.
pub const PLANE_EXTENT: f32 = 1.0e5;

/// Box centered at the local origin, aligned with the local axes.
#[derive(Debug, Clone, Copy)]
pub struct Cuboid {
    half_extents: Vec3,
}

impl Cuboid {
    /// Creates a box with the given full edge lengths.
    pub fn new(size: Vec3) -> Result<Self, ShapeError> {
        check_dimension("cuboid width", size.x)?;
        check_dimension("cuboid height", size.y)?;
        check_dimension("cuboid depth", size.z)?;
        Ok(Self {
            half_extents: size * 0.5,
        })
    }
    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }
}

/// Sphere centered at the local origin.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Result<Sphere, ShapeError> {
        Ok(Sphere {
            radius: check_dimension("sphere radius", radius)?,
        })
    }
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Closed cylinder centered at the local origin, its axis along one of the local axes.
#[derive(Debug, Clone, Copy)]
pub struct Cylinder {
    radius: f32,
    height: f32,
    axis: Axis,
}

impl Cylinder {
    pub fn new(radius: f32, height: f32, axis: Axis) -> Result<Self, ShapeError> {
        Ok(Self {
            radius: check_dimension("cylinder radius", radius)?,
            height: check_dimension("cylinder height", height)?,
            axis,
        })
    }
    pub fn radius(&self) -> f32 {
        self.radius
    }
    pub fn height(&self) -> f32 {
        self.height
    }
    pub fn axis(&self) -> Axis {
        self.axis
    }
}

/// The plane `normal . p = offset`, infinite or limited to a `width` x `height` rectangle around
/// the point of the plane closest to the origin.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    normal: Vec3,
    offset: f32,
    size: Option<(f32, f32)>,
    tangents: (Vec3, Vec3),
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Result<Self, ShapeError> {
        let normal = normal
            .try_hat()
            .filter(|n| n.is_finite())
            .ok_or(ShapeError::DegenerateNormal)?;
        if !offset.is_finite() {
            return Err(ShapeError::InvalidDimension {
                what: "plane offset",
                value: offset,
            });
        }
        Ok(Self {
            normal,
            offset,
            size: None,
            tangents: make_coord_system(normal),
        })
    }
    pub fn finite(normal: Vec3, offset: f32, width: f32, height: f32) -> Result<Self, ShapeError> {
        let plane = Self::new(normal, offset)?;
        Ok(Self {
            size: Some((
                check_dimension("plane width", width)?,
                check_dimension("plane height", height)?,
            )),
            ..plane
        })
    }
    pub fn normal(&self) -> Vec3 {
        self.normal
    }
    pub fn offset(&self) -> f32 {
        self.offset
    }
    fn center(&self) -> Point3 {
        Point3::from(self.normal * self.offset)
    }
}

// Implementation of the `LocalShape` trait for the shape implementations.

impl LocalShape for Cuboid {
    fn summary(&self) -> String {
        format!("Cuboid{{size = {}}}", self.size())
    }
    fn local_bbox(&self) -> BBox {
        BBox::new(Point3::from(-self.half_extents), Point3::from(self.half_extents))
    }

    fn intersect_local(&self, r: &Ray) -> Option<Hit> {
        let h = self.half_extents;
        let (mut t_enter, mut enter_axis) = (-f32::INFINITY, 0);
        let (mut t_exit, mut exit_axis) = (f32::INFINITY, 0);
        for axis in 0..3 {
            let (o, d) = (r.origin[axis], r.dir[axis]);
            if d.abs() < PARALLEL_EPSILON {
                // Parallel to this slab: either always inside it or never.
                if o < -h[axis] || o > h[axis] {
                    return None;
                }
                continue;
            }
            let inv_dir = 1.0 / d;
            let t0 = (-h[axis] - o) * inv_dir;
            let t1 = (h[axis] - o) * inv_dir;
            let (t0, t1) = math::float::min_max(t0, t1);
            if t0 > t_enter {
                t_enter = t0;
                enter_axis = axis;
            }
            if t1 < t_exit {
                t_exit = t1;
                exit_axis = axis;
            }
            if t_exit < t_enter {
                return None;
            }
        }
        // The entry face if it is in range, otherwise the exit face (ray starts inside).
        let (t, axis, outward_sign) = if let Some(t) = r.truncated_t(t_enter) {
            (t, enter_axis, -r.dir[enter_axis].signum())
        } else if t_exit.is_finite() {
            (r.truncated_t(t_exit)?, exit_axis, r.dir[exit_axis].signum())
        } else {
            return None;
        };
        let mut pos = r.position_at(t);
        pos[axis] = outward_sign * h[axis];
        let mut normal = Vec3::ZERO;
        normal[axis] = outward_sign;
        Some(Hit::new(t, pos, normal))
    }
    fn contains_local(&self, p: Point3) -> bool {
        (0..3).all(|axis| p[axis].abs() <= self.half_extents[axis])
    }
    fn volume(&self) -> Option<f32> {
        let s = self.size();
        Some(s.x * s.y * s.z)
    }
    fn surface_area(&self) -> Option<f32> {
        let s = self.size();
        Some(2.0 * (s.x * s.y + s.y * s.z + s.z * s.x))
    }
}

impl LocalShape for Sphere {
    fn summary(&self) -> String {
        format!("Sphere{{radius = {}}}", self.radius)
    }
    fn local_bbox(&self) -> BBox {
        BBox::centered(Point3::ORIGIN, Vec3::ONE * (2.0 * self.radius))
    }
    fn intersect_local(&self, r: &Ray) -> Option<Hit> {
        // r = o + td
        // sphere: p.p = radius^2
        // (td + o)^2 = radius^2
        // t^2 d^2 + o^2 + 2t d.o = radius^2
        let f = Vec3::from(r.origin);
        let a = r.dir.norm_squared();
        if a == 0.0 {
            return None;
        }
        let b_prime = -f.dot(r.dir);
        // Discriminant computed from the closest approach, which loses less precision.
        let delta = self.radius * self.radius - (f + b_prime / a * r.dir).norm_squared();
        if delta < 0.0 {
            return None;
        }
        let c = f.norm_squared() - self.radius * self.radius;
        let q = b_prime + b_prime.signum() * (delta * a).sqrt();
        let (t_low, t_high) = math::float::min_max(c / q, q / a);
        // The lower root if it is in range, otherwise the upper one (ray starts inside).
        let t = r.truncated_t(t_low).or_else(|| r.truncated_t(t_high))?;
        let pos = r.position_at(t);
        let normal = Vec3::from(pos).try_hat()?;
        Some(Hit::new(t, Point3::from(normal * self.radius), normal))
    }
    fn contains_local(&self, p: Point3) -> bool {
        Vec3::from(p).norm_squared() <= self.radius * self.radius
    }
    fn volume(&self) -> Option<f32> {
        Some(4.0 / 3.0 * PI * self.radius.powi(3))
    }
    fn surface_area(&self) -> Option<f32> {
        Some(4.0 * PI * self.radius.powi(2))
    }
}

impl LocalShape for Cylinder {
    fn summary(&self) -> String {
        format!(
            "Cylinder{{radius = {}, height = {}, axis = {:?}}}",
            self.radius, self.height, self.axis
        )
    }
    fn local_bbox(&self) -> BBox {
        let mut size = Vec3::ONE * (2.0 * self.radius);
        size[self.axis.index()] = self.height;
        BBox::centered(Point3::ORIGIN, size)
    }
    fn intersect_local(&self, r: &Ray) -> Option<Hit> {
        let a_idx = self.axis.index();
        let (u, v) = ((a_idx + 1) % 3, (a_idx + 2) % 3);
        let half_height = self.height * 0.5;
        let mut best: Option<Hit> = None;
        let mut consider = |hit: Hit| {
            if best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        };

        // Side surface: (ou + t du)^2 + (ov + t dv)^2 = radius^2
        let (ou, ov, du, dv) = (r.origin[u], r.origin[v], r.dir[u], r.dir[v]);
        let a = du * du + dv * dv;
        if a > PARALLEL_EPSILON {
            let b_prime = ou * du + ov * dv;
            let c = ou * ou + ov * ov - self.radius * self.radius;
            let disc = b_prime * b_prime - a * c;
            if disc >= 0.0 {
                let sq = disc.sqrt();
                for t in [(-b_prime - sq) / a, (-b_prime + sq) / a] {
                    if let Some(t) = r.truncated_t(t) {
                        let pos = r.position_at(t);
                        if pos[a_idx].abs() <= half_height {
                            let mut normal = Vec3::ZERO;
                            normal[u] = pos[u] / self.radius;
                            normal[v] = pos[v] / self.radius;
                            consider(Hit::new(t, pos, normal));
                        }
                    }
                }
            }
        }

        // End caps.
        let da = r.dir[a_idx];
        if da.abs() > PARALLEL_EPSILON {
            for cap in [-half_height, half_height] {
                if let Some(t) = r.truncated_t((cap - r.origin[a_idx]) / da) {
                    let mut pos = r.position_at(t);
                    if pos[u].powi(2) + pos[v].powi(2) <= self.radius * self.radius {
                        pos[a_idx] = cap;
                        let mut normal = Vec3::ZERO;
                        normal[a_idx] = cap.signum();
                        consider(Hit::new(t, pos, normal));
                    }
                }
            }
        }
        best
    }
    fn contains_local(&self, p: Point3) -> bool {
        let a_idx = self.axis.index();
        let (u, v) = ((a_idx + 1) % 3, (a_idx + 2) % 3);
        p[a_idx].abs() <= self.height * 0.5
            && p[u].powi(2) + p[v].powi(2) <= self.radius * self.radius
    }
    fn volume(&self) -> Option<f32> {
        Some(PI * self.radius.powi(2) * self.height)
    }
    fn surface_area(&self) -> Option<f32> {
        Some(2.0 * PI * self.radius * (self.radius + self.height))
    }
}

impl LocalShape for Plane {
    fn summary(&self) -> String {
        match self.size {
            None => format!("Plane{{normal = {}, offset = {}}}", self.normal, self.offset),
            Some((w, h)) => format!(
                "Plane{{normal = {}, offset = {}, size = {} x {}}}",
                self.normal, self.offset, w, h
            ),
        }
    }
    fn local_bbox(&self) -> BBox {
        let center = self.center();
        let (t0, t1) = self.tangents;
        match self.size {
            Some((w, h)) => {
                let (du, dv) = (t0 * (w * 0.5), t1 * (h * 0.5));
                bbox::union(
                    BBox::new(center + du + dv, center + du - dv),
                    BBox::new(center - du - dv, center - du + dv),
                )
            }
            None => {
                let mut size = Vec3::ONE * (2.0 * PLANE_EXTENT);
                let axis = self.normal.abs().max_dimension();
                if (self.normal[axis].abs() - 1.0).abs() < 1e-6 {
                    // Axis-aligned infinite plane: flat along its normal.
                    size[axis] = 0.0;
                    let mut c = Point3::ORIGIN;
                    c[axis] = center[axis];
                    BBox::centered(c, size)
                } else {
                    BBox::centered(Point3::ORIGIN, size)
                }
            }
        }
    }
    fn intersect_local(&self, r: &Ray) -> Option<Hit> {
        // Plane: n.p = offset. With p = o + td, t = (offset - n.o) / n.d
        let denom = self.normal.dot(r.dir);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (self.offset - self.normal.dot(Vec3::from(r.origin))) / denom;
        let t = r.truncated_t(t)?;
        let pos = r.position_at(t);
        if let Some((w, h)) = self.size {
            let (t0, t1) = self.tangents;
            let rel = pos - self.center();
            if rel.dot(t0).abs() > w * 0.5 || rel.dot(t1).abs() > h * 0.5 {
                return None;
            }
        }
        Some(Hit::new(t, pos, self.normal))
    }
    fn contains_local(&self, _p: Point3) -> bool {
        false
    }
    fn is_solid(&self) -> bool {
        false
    }
    fn surface_area(&self) -> Option<f32> {
        self.size.map(|(w, h)| w * h)
    }
}
