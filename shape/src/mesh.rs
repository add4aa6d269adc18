use std::collections::HashMap;

use geometry::bbox::BBox;
use geometry::bvh::Bvh;
use geometry::hit::Hit;
use geometry::ray::Ray;
use math::hcm::{Point3, Vec3};

use crate::{LocalShape, ShapeError};

/// Below this cosine between the ray and the triangle plane, the ray is taken as parallel.
const PARALLEL_COSINE_EPSILON: f32 = 1e-6;

/// Indexed triangle mesh in local coordinates, with its own triangle hierarchy.
///
/// A mesh whose every edge is shared by exactly two triangles is closed and treated as a solid;
/// any other mesh is a surface that particles cross without entering.
pub struct TriangleMesh {
    positions: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    bbox: BBox,
    bvh: Bvh,
    closed: bool,
}

impl std::fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl TriangleMesh {
    /// Builds a mesh from a vertex array and a flat index array, three indices per triangle.
    pub fn new(vertices: Vec<Point3>, indices: Vec<u32>) -> Result<Self, ShapeError> {
        if indices.is_empty() {
            return Err(ShapeError::EmptyMesh);
        }
        if indices.len() % 3 != 0 {
            return Err(ShapeError::IndexCountNotMultipleOfThree(indices.len()));
        }
        if let Some(bad) = vertices.iter().position(|p| !p.is_finite()) {
            return Err(ShapeError::NonFiniteVertex(bad));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ShapeError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|ijk| [ijk[0], ijk[1], ijk[2]])
            .collect::<Vec<_>>();
        let tri_boxes = triangles
            .iter()
            .map(|&[i, j, k]| {
                BBox::new(vertices[i as usize], vertices[j as usize]).union(vertices[k as usize])
            })
            .collect::<Vec<_>>();
        let bvh = Bvh::build(&tri_boxes);
        let closed = is_closed(&triangles);
        log::debug!(
            "Mesh with {} triangles over {} vertices ({})",
            triangles.len(),
            vertices.len(),
            if closed { "closed" } else { "open, treated as a surface" }
        );
        Ok(Self {
            bbox: bvh.bbox(),
            positions: vertices,
            triangles,
            bvh,
            closed,
        })
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn corners(&self, tri: usize) -> (Point3, Point3, Point3) {
        let [i, j, k] = self.triangles[tri];
        (
            self.positions[i as usize],
            self.positions[j as usize],
            self.positions[k as usize],
        )
    }

    pub fn bvh_shape_summary(&self) -> String {
        format!("height = {}, node count = {}", self.bvh.height(), self.bvh.node_count())
    }
}

fn is_closed(triangles: &[[u32; 3]]) -> bool {
    let mut edge_uses: HashMap<(u32, u32), u32> = HashMap::new();
    for &[i, j, k] in triangles {
        for (a, b) in [(i, j), (j, k), (k, i)] {
            *edge_uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    !edge_uses.is_empty() && edge_uses.values().all(|&uses| uses == 2)
}

impl LocalShape for TriangleMesh {
    fn summary(&self) -> String {
        format!(
            "TriangleMesh{{{} triangles, {} vertices, bbox = {}, bvh = {}}}",
            self.triangles.len(),
            self.positions.len(),
            self.bbox,
            self.bvh_shape_summary()
        )
    }
    fn local_bbox(&self) -> BBox {
        self.bbox
    }
    fn intersect_local(&self, r: &Ray) -> Option<Hit> {
        self.bvh
            .intersect(r, |tri, ray| {
                let (p0, p1, p2) = self.corners(tri);
                intersect_triangle(p0, p1, p2, ray).map(|hit| (hit.distance, hit))
            })
            .map(|(_, hit)| hit)
    }
    fn occludes_local(&self, r: &Ray) -> bool {
        self.bvh.intersect_any(r, |tri, ray| {
            let (p0, p1, p2) = self.corners(tri);
            intersect_triangle(p0, p1, p2, ray).is_some()
        })
    }
    /// Parity test: a point is inside a closed mesh if a ray from it crosses the surface an odd
    /// number of times.
    fn contains_local(&self, p: Point3) -> bool {
        if !self.closed || !self.bbox.contains(p) {
            return false;
        }
        // An irrational-looking direction keeps the probe away from edges of axis-aligned meshes.
        let probe = Ray::new(p, Vec3::new(0.5773, 0.5779, 0.5769)).with_t_min(0.0);
        let mut crossings = 0;
        self.bvh.intersect_any(&probe, |tri, ray| {
            let (p0, p1, p2) = self.corners(tri);
            if intersect_triangle(p0, p1, p2, ray).is_some() {
                crossings += 1;
            }
            false
        });
        crossings % 2 == 1
    }
    fn is_solid(&self) -> bool {
        self.closed
    }
    fn surface_area(&self) -> Option<f32> {
        Some(
            (0..self.triangles.len())
                .map(|tri| {
                    let (p0, p1, p2) = self.corners(tri);
                    (p1 - p0).cross(p2 - p0).norm() * 0.5
                })
                .sum(),
        )
    }
}

/// Computes ray-triangle intersection with the Möller–Trumbore algorithm.
///
/// The normal of the resulting `Hit` follows the winding order `p0 -> p1 -> p2`, so it points
/// outwards on a consistently wound closed mesh. The `distance` is the ray parameter.
pub fn intersect_triangle(p0: Point3, p1: Point3, p2: Point3, r: &Ray) -> Option<Hit> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let face = edge1.cross(edge2);
    let h = r.dir.cross(edge2);
    let det = edge1.dot(h);
    // |det| = |dir| |face| |cos|, so the test does not depend on the mesh scale.
    if det.abs() <= PARALLEL_COSINE_EPSILON * r.dir.norm() * face.norm() {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = r.origin - p0;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = inv_det * r.dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = r.truncated_t(inv_det * edge2.dot(q))?;
    let normal = face.try_hat()?;
    Some(Hit::new(t, r.position_at(t), normal))
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::{point3, vec3};

    /// Unit cube [0, 1]^3 wound counter-clockwise seen from outside.
    pub fn unit_cube() -> TriangleMesh {
        let vertices = (0..8)
            .map(|i| point3((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
            .collect::<Vec<_>>();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  1, 2, 3, // z = 0
            4, 5, 6,  5, 7, 6, // z = 1
            0, 1, 4,  1, 5, 4, // y = 0
            2, 6, 3,  3, 6, 7, // y = 1
            0, 4, 2,  2, 4, 6, // x = 0
            1, 3, 5,  3, 7, 5, // x = 1
        ];
        TriangleMesh::new(vertices, indices).unwrap()
    }

    #[test]
    fn triangle_hit_and_barycentric_rejection() {
        let (p0, p1, p2) = (point3(0.0, 0.0, 0.0), point3(1.0, 0.0, 0.0), point3(0.0, 1.0, 0.0));
        let r = Ray::new(point3(0.2, 0.2, 1.0), -Vec3::Z);
        let hit = intersect_triangle(p0, p1, p2, &r).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-6);
        assert_eq!(hit.normal, Vec3::Z);

        let outside = Ray::new(point3(0.6, 0.6, 1.0), -Vec3::Z);
        assert!(intersect_triangle(p0, p1, p2, &outside).is_none());
        let parallel = Ray::new(point3(0.2, 0.2, 1.0), Vec3::X);
        assert!(intersect_triangle(p0, p1, p2, &parallel).is_none());
    }

    #[test]
    fn tiny_triangles_are_hit() {
        let s = 1e-4;
        let (p0, p1, p2) = (point3(0.0, 0.0, 0.0), point3(s, 0.0, 0.0), point3(0.0, s, 0.0));
        let r = Ray::new(point3(0.2 * s, 0.2 * s, 1.0), -Vec3::Z);
        let hit = intersect_triangle(p0, p1, p2, &r).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).norm() < 1e-5, "normal = {}", hit.normal);

        let grazing = Ray::new(point3(0.2 * s, 0.2 * s, 1.0), vec3(1.0, 0.0, 1e-9));
        assert!(intersect_triangle(p0, p1, p2, &grazing).is_none());

        let mesh = TriangleMesh::new(vec![p0, p1, p2], vec![0, 1, 2]).unwrap();
        assert!(mesh.occludes_local(&r));
    }

    #[test]
    fn cube_mesh_is_closed_solid() {
        let cube = unit_cube();
        assert!(cube.is_closed());
        assert!(cube.is_solid());
        assert!(cube.contains_local(point3(0.5, 0.5, 0.5)));
        assert!(!cube.contains_local(point3(1.5, 0.5, 0.5)));
        assert!((cube.surface_area().unwrap() - 6.0).abs() < 1e-5);

        let r = Ray::new(point3(0.3, 0.6, -2.0), Vec3::Z);
        let hit = cube.intersect_local(&r).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.normal + Vec3::Z).norm() < 1e-5, "normal = {}", hit.normal);
    }

    #[test]
    fn open_mesh_is_surface() {
        let quad = TriangleMesh::new(
            vec![
                point3(0.0, 0.0, 0.0),
                point3(1.0, 0.0, 0.0),
                point3(1.0, 1.0, 0.0),
                point3(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        assert!(!quad.is_closed());
        assert!(!quad.contains_local(point3(0.5, 0.5, 0.0)));
        assert!(quad.occludes_local(&Ray::new(point3(0.9, 0.1, 3.0), vec3(0.0, 0.0, -1.0))));
    }

    #[test]
    fn malformed_index_arrays_are_rejected() {
        let v = vec![Point3::ORIGIN, point3(1.0, 0.0, 0.0), point3(0.0, 1.0, 0.0)];
        assert_eq!(
            TriangleMesh::new(v.clone(), vec![0, 1]).unwrap_err(),
            ShapeError::IndexCountNotMultipleOfThree(2)
        );
        assert_eq!(
            TriangleMesh::new(v.clone(), vec![0, 1, 3]).unwrap_err(),
            ShapeError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        );
        assert_eq!(TriangleMesh::new(v, vec![]).unwrap_err(), ShapeError::EmptyMesh);
    }
}
