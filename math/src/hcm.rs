use core::convert::TryFrom;
use std::{
    fmt,
    ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub},
};

pub fn vec3(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, y, z)
}

pub fn point3(x: f32, y: f32, z: f32) -> Point3 {
    Point3::new(x, y, z)
}

pub use glam::Vec4;

/// Represents a 3D vector. Each component is a `f32` number.
/// Components can be accessed using `v.x` `v.y` `v.z`,
/// or indices `v[i]` where i is 0, 1, or 2.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "({:.p$}, {:.p$}, {:.p$})",
            self.x,
            self.y,
            self.z,
            p = precision
        )
    }
}
impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "[{:.p$}, {:.p$}, {:.p$}]",
            self.x,
            self.y,
            self.z,
            p = precision
        )
    }
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }
    pub fn as_vec4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 0.0)
    }
    pub const X: Vec3 = Self::new(1.0, 0.0, 0.0);
    pub const Y: Vec3 = Self::new(0.0, 1.0, 0.0);
    pub const Z: Vec3 = Self::new(0.0, 0.0, 1.0);
    pub const ZERO: Vec3 = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Self::new(1.0, 1.0, 1.0);

    pub fn dot(self, v: Vec3) -> f32 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
    pub fn cross(self, v: Vec3) -> Vec3 {
        // x1 y1 z1
        // x2 y2 z2
        // i  j  k
        Vec3::new(
            self.y * v.z - self.z * v.y,
            self.z * v.x - self.x * v.z,
            self.x * v.y - self.y * v.x,
        )
    }

    pub fn norm_squared(self) -> f32 {
        self.dot(self)
    }
    pub fn norm(self) -> f32 {
        f32::sqrt(self.norm_squared())
    }
    pub fn is_zero(self) -> bool {
        self.norm_squared() == 0.0
    }

    /// Returns a normalized (unit-length) `self` vector.
    /// Panics if the vector length is zero, NaN or infinite.
    pub fn hat(self) -> Vec3 {
        let norm2 = self.norm_squared();
        assert!(norm2 != 0.0 && norm2.is_finite());
        let inv_sqrt = 1.0 / self.norm();
        self * inv_sqrt
    }
    /// Returns a normalized `self`, or `None` if the length is zero, NaN or infinite.
    pub fn try_hat(self) -> Option<Self> {
        let inv_length = 1.0 / self.norm();
        (inv_length.is_finite() && inv_length != 0.0).then(|| inv_length * self)
    }

    /// Component-wise quotient.
    pub fn div_by(self, s: Vec3) -> Vec3 {
        Vec3::new(self.x / s.x, self.y / s.y, self.z / s.z)
    }
    pub fn abs(self) -> Vec3 {
        Vec3::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    // Returns the index to the element with minimum magnitude.
    pub fn abs_min_dimension(self) -> usize {
        let abs = [self.x.abs(), self.y.abs(), self.z.abs()];
        let res = if abs[0] < abs[1] { 0 } else { 1 };
        if abs[res] < abs[2] {
            res
        } else {
            2
        }
    }

    pub fn max_dimension(self) -> usize {
        let res = if self.x > self.y { 0 } else { 1 };
        if self[2] > self[res] {
            2
        } else {
            res
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}
impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Add<Point3> for Vec3 {
    type Output = Point3;
    fn add(self, other: Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}
impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}
impl Index<usize> for Vec3 {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("invalid index"),
        }
    }
}
impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("invalid index"),
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}
impl Mul<Vec3> for f32 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}
impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, s: f32) -> Vec3 {
        Vec3::new(self.x / s, self.y / s, self.z / s)
    }
}

// Implementation of Points
impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Point3 {
        Point3 { x, y, z }
    }
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);
    pub fn distance_to(self, p: Self) -> f32 {
        (self - p).norm()
    }
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
    pub fn as_vec4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 1.0)
    }
}

impl Add<Vec3> for Point3 {
    type Output = Point3;
    fn add(self, v: Vec3) -> Point3 {
        Point3::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}
impl AddAssign<Vec3> for Point3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, from: Point3) -> Vec3 {
        Vec3::new(self.x - from.x, self.y - from.y, self.z - from.z)
    }
}
impl Sub<Vec3> for Point3 {
    type Output = Point3;
    fn sub(self, t: Vec3) -> Point3 {
        Point3::new(self.x - t.x, self.y - t.y, self.z - t.z)
    }
}
impl Index<usize> for Point3 {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("invalid index"),
        }
    }
}
impl IndexMut<usize> for Point3 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("invalid index"),
        }
    }
}

// Explicit conversion between Vec3 and Point3.
// -------------------------------------------------------------------------------------------------
impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Point3::new(v.x, v.y, v.z)
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<Vec4> for Vec3 {
    fn from(v4: Vec4) -> Self {
        Vec3::new(v4.x, v4.y, v4.z)
    }
}

impl TryFrom<Vec4> for Point3 {
    type Error = &'static str;
    fn try_from(value: Vec4) -> Result<Self, Self::Error> {
        if value.w == 1.0 {
            Ok(Point3::new(value.x, value.y, value.z))
        } else if value.w == 0.0 {
            Err("homogeneous coordinate is zero")
        } else {
            let w = value.w;
            Ok(Point3::new(value.x / w, value.y / w, value.z / w))
        }
    }
}

/// ------------------------------------------------------------------------------------------------
/// Mat3: implements m * m, m * v, m - m
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub cols: [Vec3; 3],
}

impl Mat3 {
    pub const ZERO: Self = Self {
        cols: [Vec3::ZERO; 3],
    };
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };
    pub fn from_cols(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { cols: [v0, v1, v2] }
    }
    pub fn nonuniform_scale(s: Vec3) -> Self {
        let mut mat = Self::IDENTITY;
        mat.cols[0][0] = s[0];
        mat.cols[1][1] = s[1];
        mat.cols[2][2] = s[2];
        mat
    }
    pub fn transpose(&self) -> Self {
        let mut mat = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                mat.cols[i][j] = self.cols[j][i];
            }
        }
        mat
    }
    pub fn frobenius_norm_squared(&self) -> f32 {
        (0..3).map(|i| self.cols[i].norm_squared()).sum()
    }
}

impl Mul for Mat3 {
    type Output = Mat3;
    fn mul(self, m: Self) -> Mat3 {
        Mat3::from_cols(self * m.cols[0], self * m.cols[1], self * m.cols[2])
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        self.cols[0] * v[0] + self.cols[1] * v[1] + self.cols[2] * v[2]
    }
}

impl Sub for Mat3 {
    type Output = Mat3;
    fn sub(self, rhs: Mat3) -> Self::Output {
        Self::from_cols(
            self.cols[0] - rhs.cols[0],
            self.cols[1] - rhs.cols[1],
            self.cols[2] - rhs.cols[2],
        )
    }
}

// Quaternion
// -------------------------------------------------------------------------------------------------

/// Unit quaternion `w + xi + yj + zk` representing a 3D rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f32,
    pub v: Vec3,
}

impl Quat {
    pub const IDENTITY: Quat = Quat { w: 1.0, v: Vec3::ZERO };

    /// Rotation of `angle` radians around `axis` (right-handed). A zero axis gives the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Quat {
        match axis.try_hat() {
            None => Self::IDENTITY,
            Some(axis) => {
                let (sin_h, cos_h) = (angle * 0.5).sin_cos();
                Quat { w: cos_h, v: axis * sin_h }
            }
        }
    }

    /// Composes rotations around the fixed X, Y then Z axes (angles in radians).
    pub fn from_euler_xyz(x: f32, y: f32, z: f32) -> Quat {
        Self::from_axis_angle(Vec3::Z, z)
            * Self::from_axis_angle(Vec3::Y, y)
            * Self::from_axis_angle(Vec3::X, x)
    }

    pub fn norm(self) -> f32 {
        (self.w * self.w + self.v.norm_squared()).sqrt()
    }

    /// Rescales to unit length; degenerate quaternions become the identity.
    pub fn normalized(self) -> Quat {
        let n = self.norm();
        if n.is_finite() && n > 0.0 {
            Quat { w: self.w / n, v: self.v / n }
        } else {
            Self::IDENTITY
        }
    }

    pub fn conjugate(self) -> Quat {
        Quat { w: self.w, v: -self.v }
    }

    /// Rotates `x` by this (unit) quaternion.
    pub fn rotate(self, x: Vec3) -> Vec3 {
        // v' = x + 2w(q x x) + 2 q x (q x x)
        let t = 2.0 * self.v.cross(x);
        x + self.w * t + self.v.cross(t)
    }

    pub fn to_mat3(self) -> Mat3 {
        Mat3::from_cols(self.rotate(Vec3::X), self.rotate(Vec3::Y), self.rotate(Vec3::Z))
    }
}

impl Mul for Quat {
    type Output = Quat;
    fn mul(self, q: Quat) -> Quat {
        Quat {
            w: self.w * q.w - self.v.dot(q.v),
            v: q.v * self.w + self.v * q.w + self.v.cross(q.v),
        }
    }
}

impl fmt::Display for Quat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        write!(f, "q({:.p$}; {:.p$})", self.w, self.v, p = precision)
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub cols: [Vec4; 4],
}

impl Mat4 {
    pub const ZERO: Mat4 = Mat4 {
        cols: [Vec4::ZERO; 4],
    };
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };
    pub fn translater(t: Vec3) -> Mat4 {
        let mut mat = Self::IDENTITY;
        mat.cols[3] = Vec4::new(t.x, t.y, t.z, 1.0);
        mat
    }
    pub fn nonuniform_scale(s: Vec3) -> Mat4 {
        let mut mat = Self::IDENTITY;
        mat.cols[0][0] = s[0];
        mat.cols[1][1] = s[1];
        mat.cols[2][2] = s[2];
        mat
    }
    pub fn from_mat3(m: Mat3) -> Mat4 {
        let mut mat = Self::IDENTITY;
        for i in 0..3 {
            mat.cols[i] = m.cols[i].as_vec4();
        }
        mat
    }
    pub fn rotater(q: Quat) -> Mat4 {
        Self::from_mat3(q.to_mat3())
    }
    pub fn transpose(&self) -> Mat4 {
        let mut mat = Self::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                mat.cols[i][j] = self.cols[j][i];
            }
        }
        mat
    }
    /// The upper-left 3x3 block (linear part).
    pub fn orientation(&self) -> Mat3 {
        Mat3::from_cols(
            self.cols[0].into(),
            self.cols[1].into(),
            self.cols[2].into(),
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        self.cols[0] * v[0] + self.cols[1] * v[1] + self.cols[2] * v[2] + self.cols[3] * v[3]
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, m: Self) -> Mat4 {
        Mat4 {
            cols: [
                self * m.cols[0],
                self * m.cols[1],
                self * m.cols[2],
                self * m.cols[3],
            ],
        }
    }
}

impl Mul<Vec3> for Mat4 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        let v4 = self.cols[0] * v[0] + self.cols[1] * v[1] + self.cols[2] * v[2];
        Vec3::new(v4.x, v4.y, v4.z)
    }
}

impl Mul<Point3> for Mat4 {
    type Output = Point3;
    fn mul(self, p: Point3) -> Self::Output {
        let v4 = self * p.as_vec4();
        if v4.w == 1.0 {
            Point3::new(v4.x, v4.y, v4.z)
        } else {
            Point3::new(v4.x / v4.w, v4.y / v4.w, v4.z / v4.w)
        }
    }
}

/// Computes a pair of unit-vectors that forms a orthonormal matrix with `v`.
/// ```
/// use math::hcm::{Vec3, Mat3, make_coord_system};
/// let v0 = Vec3::new(0.3, 0.4, -0.6).hat();
/// let (v1, v2) = make_coord_system(v0);
///
/// let basis = Mat3::from_cols(v0, v1, v2);
/// // basis * basis^T should be identity.
/// let diff_to_eye = basis * basis.transpose() - Mat3::IDENTITY;
/// assert!(diff_to_eye.frobenius_norm_squared() < 1e-6);
/// ```
pub fn make_coord_system(v: Vec3) -> (Vec3, Vec3) {
    let i0 = v.abs_min_dimension();
    let (i1, i2) = ((i0 + 1) % 3, (i0 + 2) % 3);
    let mut v1 = Vec3::ZERO;
    // v = [x, y, z] -> [x, 0, z], v1 = [-z, 0, x]
    v1[i1] = v[i2];
    v1[i2] = -v[i1];
    let v2 = v.cross(v1);
    (v1.hat(), v2.hat())
}

/// Computes a unit-vector on a unit-sphere given longitude and latitude values.
///
/// The computed vector is (0, 0, 1) rotated `theta` radians away from the z-axis and then rotates
/// around the z-axis with angle `phi`. Note that sin(theta) and cos(theta) values are passed in
/// as usually the trigonometry values are more directly available rather than the angle itself.
pub fn spherical_direction(sin_theta: f32, cos_theta: f32, phi: f32) -> Vec3 {
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}

#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        if ($left - $right).norm_squared() > 1e-4 {
            panic!(
                "Assertion failed: Close({}, {}) values: {} vs. {}, dist = {}",
                stringify!($left),
                stringify!($right),
                $left,
                $right,
                ($left - $right).norm()
            )
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn quat_quarter_turn() {
        let q = Quat::from_axis_angle(Vec3::Z, FRAC_PI_2);
        assert_close!(q.rotate(Vec3::X), Vec3::Y);
        assert_close!(q.rotate(Vec3::Y), -Vec3::X);
        assert_close!(q.to_mat3() * Vec3::Z, Vec3::Z);
    }

    #[test]
    fn quat_composition_matches_matrices() {
        let q0 = Quat::from_axis_angle(vec3(0.6, 0.8, 0.0), 0.3);
        let q1 = Quat::from_euler_xyz(0.1, -0.7, 1.9);
        let v = vec3(0.3, -2.0, 1.5);
        let composed = (q0 * q1).rotate(v);
        assert_close!(composed, q0.to_mat3() * (q1.to_mat3() * v));
        assert_close!(q0.conjugate().rotate(q0.rotate(v)), v);
    }

    #[test]
    fn rotation_matrix_is_orthonormal() {
        let m = Quat::from_euler_xyz(0.4, 1.1, -2.3).to_mat3();
        let diff = m * m.transpose() - Mat3::IDENTITY;
        assert!(diff.frobenius_norm_squared() < 1e-8, "diff = {:?}", diff);
    }

    #[test]
    fn mat4_transforms_points_and_vectors() {
        let m = Mat4::translater(vec3(1.0, 2.0, 3.0)) * Mat4::nonuniform_scale(vec3(2.0, 2.0, 2.0));
        assert_close!(m * point3(1.0, 1.0, 1.0), point3(3.0, 4.0, 5.0));
        assert_close!(m * Vec3::X, vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn spherical_direction_is_unit() {
        let (s, c) = 0.7f32.sin_cos();
        let d = spherical_direction(s, c, 2.1);
        assert!((d.norm() - 1.0).abs() < 1e-6);
        assert!((d.z - c).abs() < 1e-6);
    }
}
