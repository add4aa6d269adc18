use crate::bbox::BBox;
use crate::hit::Hit;
use crate::ray::Ray;
use math::hcm::{Mat4, Point3, Quat, Vec3};
use std::convert::TryFrom;
use std::ops::Mul;

/// Smallest magnitude a scale component may take before it is clamped.
pub const MIN_SCALE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    forward: Mat4,
    inverse: Mat4,
}

pub trait Transform<T> {
    fn apply(&self, x: T) -> T;
}

impl std::fmt::Display for AffineTransform {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.forward;
        write!(
            f,
            "\n|{:5.2} {:5.2} {:5.2} {:5.2}|\
             \n|{:5.2} {:5.2} {:5.2} {:5.2}|\
             \n|{:5.2} {:5.2} {:5.2} {:5.2}|\
             \n|{:5.2} {:5.2} {:5.2} {:5.2}|\n",
            m.cols[0][0], m.cols[1][0], m.cols[2][0], m.cols[3][0],
            m.cols[0][1], m.cols[1][1], m.cols[2][1], m.cols[3][1],
            m.cols[0][2], m.cols[1][2], m.cols[2][2], m.cols[3][2],
            m.cols[0][3], m.cols[1][3], m.cols[2][3], m.cols[3][3]
        )
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            forward: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
        }
    }
    pub fn translater(t: Vec3) -> Self {
        Self {
            forward: Mat4::translater(t),
            inverse: Mat4::translater(-t),
        }
    }
    pub fn rotater(q: Quat) -> Self {
        let q = q.normalized();
        Self {
            forward: Mat4::rotater(q),
            inverse: Mat4::rotater(q.conjugate()),
        }
    }
    pub fn scaler(scale: Vec3) -> Self {
        Self {
            forward: Mat4::nonuniform_scale(scale),
            inverse: Mat4::nonuniform_scale(Vec3::ONE.div_by(scale)),
        }
    }
    pub fn inverse(&self) -> Self {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }
    pub fn forward_matrix(&self) -> Mat4 {
        self.forward
    }
    pub fn inverse_matrix(&self) -> Mat4 {
        self.inverse
    }

    /// Transforms a surface normal with the inverse-transpose of the linear part and renormalizes
    /// it. Falls back to the untransformed normal if the result degenerates.
    pub fn apply_normal(&self, n: Vec3) -> Vec3 {
        let normal_matrix = self.inverse.orientation().transpose();
        (normal_matrix * n).try_hat().unwrap_or(n)
    }
}

impl Mul for AffineTransform {
    type Output = AffineTransform;
    fn mul(self, rhs: Self) -> Self::Output {
        // self * rhs -> self.forward * rhs.forward, rhs.inverse * self.inverse.
        Self {
            forward: self.forward * rhs.forward,
            inverse: rhs.inverse * self.inverse,
        }
    }
}

/// Placement of an object in the world: a translation, a rotation and a non-uniform scale,
/// composed as `T * R * S`. The matrices are recomputed on every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    affine: AffineTransform,
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl InstanceTransform {
    pub fn identity() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let rotation = rotation.normalized();
        let scale = clamp_scale(scale);
        let affine = AffineTransform::translater(position)
            * AffineTransform::rotater(rotation)
            * AffineTransform::scaler(scale);
        Self {
            position,
            rotation,
            scale,
            affine,
        }
    }

    pub fn translater(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Vec3::ONE)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
    pub fn rotation(&self) -> Quat {
        self.rotation
    }
    pub fn scale(&self) -> Vec3 {
        self.scale
    }
    pub fn affine(&self) -> &AffineTransform {
        &self.affine
    }

    pub fn with_position(self, position: Vec3) -> Self {
        Self::new(position, self.rotation, self.scale)
    }
    pub fn with_rotation(self, rotation: Quat) -> Self {
        Self::new(self.position, rotation, self.scale)
    }
    pub fn with_scale(self, scale: Vec3) -> Self {
        Self::new(self.position, self.rotation, scale)
    }

    /// Maps a world-space point into the local frame.
    pub fn to_local(&self, p: Point3) -> Point3 {
        self.affine.inverse().apply(p)
    }
}

fn clamp_scale(scale: Vec3) -> Vec3 {
    let mut clamped = scale;
    for axis in 0..3 {
        if clamped[axis].is_nan() || clamped[axis].abs() < MIN_SCALE {
            let sign = if clamped[axis].is_sign_negative() { -1.0 } else { 1.0 };
            clamped[axis] = sign * MIN_SCALE;
        }
    }
    if clamped != scale {
        log::warn!("Scale {} has a degenerate component, clamped to {}", scale, clamped);
    }
    clamped
}

// Implements all kinds of transforms that `AffineTransform` can do.
// Transforms on:
// - Vec3
// - Point3
// - Ray
// - BBox
// - Hit
// -------------------------------------------------------------------------------------------------

impl Transform<Vec3> for AffineTransform {
    fn apply(&self, x: Vec3) -> Vec3 {
        self.forward * x
    }
}
impl Transform<Point3> for AffineTransform {
    fn apply(&self, p: Point3) -> Point3 {
        let v4 = self.forward * p.as_vec4();
        Point3::try_from(v4).unwrap_or_else(|_| Point3::new(v4.x, v4.y, v4.z))
    }
}
/// The direction is not renormalized, so the ray parameter `t` of any point is the same in both
/// frames and `[t_min, t_max]` carries over unchanged.
impl Transform<Ray> for AffineTransform {
    fn apply(&self, r: Ray) -> Ray {
        Ray {
            origin: self.apply(r.origin),
            dir: self.apply(r.dir),
            ..r
        }
    }
}
impl Transform<BBox> for AffineTransform {
    fn apply(&self, b: BBox) -> BBox {
        if b.is_empty() {
            return b;
        }
        b.all_corners()
            .iter()
            .fold(BBox::empty(), |res, corner| res.union(self.apply(*corner)))
    }
}
/// Maps position and normal; the distance is left for the caller to recompute in the target frame.
impl Transform<Hit> for AffineTransform {
    fn apply(&self, h: Hit) -> Hit {
        Hit::new(h.distance, self.apply(h.pos), self.apply_normal(h.normal))
    }
}

impl<T> Transform<T> for InstanceTransform
where
    AffineTransform: Transform<T>,
{
    fn apply(&self, x: T) -> T {
        self.affine.apply(x)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::assert_le;
    use math::hcm::{point3, vec3, Mat4};

    fn frobenius(m: Mat4) -> f32 {
        m.cols.iter().map(|c| c.length_squared()).sum()
    }

    #[test]
    fn trs_inverse_roundtrip() {
        let t = InstanceTransform::new(
            vec3(0.3, -4.0, 6.0),
            Quat::from_axis_angle(vec3(0.6, 0.8, 0.0), 0.3),
            vec3(2.0, 0.5, 3.0),
        );
        let a = t.affine();
        let product = a.forward_matrix() * a.inverse_matrix();
        let mut diff = product;
        for i in 0..4 {
            diff.cols[i] = product.cols[i] - Mat4::IDENTITY.cols[i];
        }
        assert_le!(frobenius(diff), 1e-9);

        let p = point3(1.0, 2.0, 3.0);
        assert!(t.to_local(t.apply(p)).distance_to(p) < 1e-5);
    }

    #[test]
    fn composition_order_is_translate_rotate_scale() {
        let t = InstanceTransform::new(
            vec3(10.0, 0.0, 0.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
            vec3(2.0, 1.0, 1.0),
        );
        // (1, 0, 0) -> scaled (2, 0, 0) -> rotated (0, 2, 0) -> translated (10, 2, 0)
        let p = t.apply(point3(1.0, 0.0, 0.0));
        assert!(p.distance_to(point3(10.0, 2.0, 0.0)) < 1e-5, "p = {}", p);
    }

    #[test]
    fn normals_use_inverse_transpose() {
        // A plane x = y in a frame stretched along x keeps its normal perpendicular to the surface.
        let t = InstanceTransform::identity().with_scale(vec3(4.0, 1.0, 1.0));
        let n_local = vec3(1.0, -1.0, 0.0).hat();
        let tangent_local = vec3(1.0, 1.0, 0.0);
        let n_world = t.affine().apply_normal(n_local);
        let tangent_world = t.apply(tangent_local);
        assert!(n_world.dot(tangent_world).abs() < 1e-5);
        assert!((n_world.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bbox_transform_covers_corners() {
        let t = InstanceTransform::new(
            vec3(7.0, 8.0, -13.0),
            Quat::from_axis_angle(vec3(0.6, 0.8, 0.0), 0.3),
            Vec3::ONE,
        );
        let bbox = BBox::new(point3(-0.3, 0.4, 0.8), point3(3.4, 2.3, 4.4));
        let t_bbox = t.apply(bbox);
        for corner in bbox.all_corners().iter() {
            assert!(t_bbox.contains(t.apply(*corner)));
        }
    }

    #[test]
    fn zero_scale_is_clamped() {
        let t = InstanceTransform::identity().with_scale(vec3(0.0, 1.0, -0.0));
        assert_eq!(t.scale(), vec3(MIN_SCALE, 1.0, -MIN_SCALE));
        assert!(t.affine().inverse_matrix().cols.iter().all(|c| c.is_finite()));
    }
}
