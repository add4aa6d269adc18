use geometry::bbox::BBox;
use geometry::bvh::{Bvh, BvhStats};
use geometry::hit::Hit;
use geometry::ray::Ray;
use math::hcm::Point3;

use crate::object::Object3D;

/// Hierarchy over a snapshot of an object arena. Leaves hold indices into the arena slice the
/// tree was built from; every query takes that same slice.
pub struct ObjectBvh {
    bvh: Bvh,
}

impl ObjectBvh {
    pub fn empty() -> Self {
        ObjectBvh { bvh: Bvh::empty() }
    }

    pub fn build(objects: &[Object3D]) -> Self {
        let bboxes = objects.iter().map(|obj| obj.bbox()).collect::<Vec<_>>();
        let bvh = Bvh::build(&bboxes);
        log::debug!("object bvh over {} objects: {}", objects.len(), bvh.stats());
        ObjectBvh { bvh }
    }

    pub fn num_items(&self) -> usize {
        self.bvh.num_items()
    }
    pub fn bbox(&self) -> BBox {
        self.bvh.bbox()
    }
    pub fn height(&self) -> usize {
        self.bvh.height()
    }
    pub fn node_count(&self) -> usize {
        self.bvh.node_count()
    }
    pub fn stats(&self) -> BvhStats {
        self.bvh.stats()
    }

    /// Closest object hit by the ray, as an arena index and the world-space hit.
    pub fn intersect(&self, objects: &[Object3D], ray: &Ray) -> Option<(usize, Hit)> {
        self.bvh
            .intersect(ray, |index, r| {
                objects
                    .get(index)?
                    .intersect(r)
                    .map(|hit| (hit.distance, (index, hit)))
            })
            .map(|(_, found)| found)
    }

    pub fn intersect_any(&self, objects: &[Object3D], ray: &Ray) -> bool {
        self.bvh.intersect_any(ray, |index, r| {
            objects.get(index).map_or(false, |obj| obj.occludes(r))
        })
    }

    /// Indices of the solids containing `p`.
    pub fn containing(&self, objects: &[Object3D], p: Point3) -> Vec<usize> {
        let mut found = vec![];
        self.bvh.visit_point(p, |index| {
            if objects.get(index).map_or(false, |obj| obj.contains(p)) {
                found.push(index);
            }
        });
        found
    }
}

/// Closest hit found by testing every object; used while no up-to-date hierarchy exists.
pub fn intersect_all(objects: &[Object3D], ray: &Ray) -> Option<(usize, Hit)> {
    let mut closest: Option<(usize, Hit)> = None;
    let mut r = *ray;
    for (index, obj) in objects.iter().enumerate() {
        if let Some(hit) = obj.intersect(&r) {
            if closest.map_or(true, |(_, best)| hit.distance < best.distance) {
                r.t_max = hit.distance;
                closest = Some((index, hit));
            }
        }
    }
    closest
}

pub fn intersect_any_of(objects: &[Object3D], ray: &Ray) -> bool {
    objects.iter().any(|obj| obj.occludes(ray))
}

pub fn containing_any_of(objects: &[Object3D], p: Point3) -> Vec<usize> {
    (0..objects.len()).filter(|&i| objects[i].contains(p)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use geometry::InstanceTransform;
    use math::hcm::{point3, vec3, Vec3};
    use shape::{Cuboid, Sphere};

    fn row_of_spheres(n: usize) -> Vec<Object3D> {
        (0..n)
            .map(|i| {
                Object3D::new(&format!("s{}", i), Sphere::new(0.5).unwrap())
                    .with_transform(InstanceTransform::translater(vec3(i as f32 * 2.0, 0.0, 0.0)))
            })
            .collect()
    }

    #[test]
    fn finds_nearest_along_a_row() {
        let objects = row_of_spheres(9);
        let bvh = ObjectBvh::build(&objects);
        assert_eq!(bvh.num_items(), 9);
        let ray = Ray::new(point3(-5.0, 0.0, 0.0), Vec3::X);
        let (index, hit) = bvh.intersect(&objects, &ray).unwrap();
        assert_eq!(index, 0);
        assert!((hit.distance - 4.5).abs() < 1e-4);

        let back = Ray::new(point3(30.0, 0.0, 0.0), -Vec3::X);
        assert_eq!(bvh.intersect(&objects, &back).unwrap().0, 8);
        assert!(!bvh.intersect_any(&objects, &Ray::new(point3(0.0, 5.0, 0.0), Vec3::X)));
    }

    #[test]
    fn containment_reports_nested_solids() {
        let objects = vec![
            Object3D::new("outer", Cuboid::new(vec3(10.0, 10.0, 10.0)).unwrap()),
            Object3D::new("inner", Sphere::new(1.0).unwrap()),
            Object3D::new("away", Sphere::new(1.0).unwrap())
                .with_transform(InstanceTransform::translater(vec3(20.0, 0.0, 0.0))),
        ];
        let bvh = ObjectBvh::build(&objects);
        let mut inside = bvh.containing(&objects, Point3::ORIGIN);
        inside.sort_unstable();
        assert_eq!(inside, vec![0, 1]);
        assert_eq!(containing_any_of(&objects, point3(3.0, 0.0, 0.0)), vec![0]);
        assert!(bvh.containing(&objects, point3(50.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn empty_scene() {
        let bvh = ObjectBvh::build(&[]);
        assert!(bvh.intersect(&[], &Ray::new(Point3::ORIGIN, Vec3::X)).is_none());
        assert!(intersect_all(&[], &Ray::new(Point3::ORIGIN, Vec3::X)).is_none());
        assert_eq!(ObjectBvh::empty().height(), 0);
    }
}
