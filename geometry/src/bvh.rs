use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Range;

use crate::bbox::{self, BBox};
use crate::ray::Ray;
use math::hcm::Point3;
use partition::partition;

/// Nodes holding this many items or fewer become leaves.
pub const MAX_ITEMS_PER_LEAF: usize = 4;
/// Nodes at this depth become leaves regardless of their size.
pub const MAX_DEPTH: usize = 20;

enum BvhNodeContent {
    Children([Box<BvhNode>; 2], usize),
    Leaf(Range<usize>),
}

use BvhNodeContent::Children;
use BvhNodeContent::Leaf;

struct BvhNode {
    bbox: BBox,
    content: BvhNodeContent,
}

impl BvhNode {
    fn height(&self) -> usize {
        match &self.content {
            Children([left, right], _) => std::cmp::max(left.height(), right.height()) + 1,
            Leaf(_) => 1,
        }
    }
    fn count(&self) -> usize {
        match &self.content {
            Children([left, right], _) => left.count() + right.count() + 1,
            Leaf(_) => 1,
        }
    }
    fn collect_stats(&self, depth: usize, stats: &mut BvhStats) {
        stats.total_nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        match &self.content {
            Children([left, right], _) => {
                left.collect_stats(depth + 1, stats);
                right.collect_stats(depth + 1, stats);
            }
            Leaf(range) => {
                stats.leaf_nodes += 1;
                stats.max_items_per_leaf = stats.max_items_per_leaf.max(range.len());
            }
        }
    }
}

/// Shape statistics of a built hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub max_depth: usize,
    pub max_items_per_leaf: usize,
    pub average_items_per_leaf: f32,
}

impl Display for BvhStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes ({} leaves), depth {}, items per leaf: max {}, avg {:.2}",
            self.total_nodes,
            self.leaf_nodes,
            self.max_depth,
            self.max_items_per_leaf,
            self.average_items_per_leaf
        )
    }
}

/// A bounding-volume hierarchy over items known only by their index and bounding box.
///
/// The tree doesn't own the items: queries hand item indices back to a caller-provided closure,
/// which tests the actual item. The hierarchy is immutable once built and can be shared by any
/// number of threads.
pub struct Bvh {
    root: Option<BvhNode>,
    // Leaf ranges index into this permutation of the item indices.
    order: Vec<usize>,
}

impl Bvh {
    pub fn empty() -> Self {
        Bvh {
            root: None,
            order: vec![],
        }
    }

    /// Builds the hierarchy over items whose bounding boxes are `bboxes[0..n]`.
    pub fn build(bboxes: &[BBox]) -> Self {
        if bboxes.is_empty() {
            return Self::empty();
        }
        let mut order: Vec<usize> = (0..bboxes.len()).collect();
        let num_items = order.len();
        let root = recursive_build(&mut order, bboxes, 0..num_items, 0);
        Bvh {
            root: Some(root),
            order,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
    pub fn num_items(&self) -> usize {
        self.order.len()
    }
    pub fn bbox(&self) -> BBox {
        self.root.as_ref().map_or(BBox::empty(), |node| node.bbox)
    }
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |node| node.height())
    }
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |node| node.count())
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        if let Some(root) = &self.root {
            root.collect_stats(0, &mut stats);
            stats.average_items_per_leaf = self.order.len() as f32 / stats.leaf_nodes as f32;
        }
        stats
    }

    /// Finds the closest item hit by the ray.
    ///
    /// `hit_item(index, ray)` tests one item and returns the hit distance with a payload. The
    /// ray handed to it has its `t_max` shrunk to the closest hit found so far, and the closure
    /// is expected to reject hits beyond it.
    pub fn intersect<T, F>(&self, r: &Ray, mut hit_item: F) -> Option<(f32, T)>
    where
        F: FnMut(usize, &Ray) -> Option<(f32, T)>,
    {
        let root = self.root.as_ref()?;
        let mut node_stack = Vec::with_capacity(2 * MAX_DEPTH + 2);
        node_stack.push(root);

        let mut closest: Option<(f32, T)> = None;
        let mut ray = *r;
        while let Some(node) = node_stack.pop() {
            if !node.bbox.intersect(&ray) {
                continue;
            }
            match &node.content {
                Leaf(range) => {
                    for &index in self.order[range.clone()].iter() {
                        if let Some((t, payload)) = hit_item(index, &ray) {
                            if closest.as_ref().map_or(true, |(best, _)| t < *best) {
                                ray.t_max = t;
                                closest = Some((t, payload));
                            }
                        }
                    }
                }
                Children([left, right], axis) => {
                    // Visits the child on the near side first.
                    if ray.dir[*axis] > 0.0 {
                        node_stack.push(right);
                        node_stack.push(left);
                    } else {
                        node_stack.push(left);
                        node_stack.push(right);
                    }
                }
            }
        }
        closest
    }

    /// Returns true as soon as any item reports a hit.
    pub fn intersect_any<F>(&self, r: &Ray, mut item_pred: F) -> bool
    where
        F: FnMut(usize, &Ray) -> bool,
    {
        let root = match &self.root {
            None => return false,
            Some(root) => root,
        };
        let mut node_stack = Vec::with_capacity(2 * MAX_DEPTH + 2);
        node_stack.push(root);

        while let Some(node) = node_stack.pop() {
            if !node.bbox.intersect(r) {
                continue;
            }
            match &node.content {
                Leaf(range) => {
                    if self.order[range.clone()]
                        .iter()
                        .any(|&index| item_pred(index, r))
                    {
                        return true;
                    }
                }
                Children([left, right], _) => {
                    node_stack.push(left);
                    node_stack.push(right);
                }
            }
        }
        false
    }

    /// Calls `visit` on every item whose leaf box contains `p`.
    pub fn visit_point<F>(&self, p: Point3, mut visit: F)
    where
        F: FnMut(usize),
    {
        let mut node_stack: Vec<&BvhNode> = self.root.iter().collect();
        while let Some(node) = node_stack.pop() {
            if !node.bbox.contains(p) {
                continue;
            }
            match &node.content {
                Leaf(range) => self.order[range.clone()].iter().for_each(|&i| visit(i)),
                Children([left, right], _) => {
                    node_stack.push(left);
                    node_stack.push(right);
                }
            }
        }
    }
}

fn axis_center(b: &BBox, axis: usize) -> f32 {
    b.midpoint()[axis]
}

fn recursive_build(
    order: &mut [usize], bboxes: &[BBox], range: Range<usize>, depth: usize,
) -> BvhNode {
    let bbox = order[range.clone()]
        .iter()
        .fold(BBox::empty(), |b, &i| bbox::union(b, bboxes[i]));
    if range.len() <= MAX_ITEMS_PER_LEAF || depth >= MAX_DEPTH {
        return BvhNode {
            bbox,
            content: Leaf(range),
        };
    }

    // Splits the node box in half along its largest extent.
    let split_axis = bbox.diag().max_dimension();
    let pivot_value = axis_center(&bbox, split_axis);

    let (left, _) = partition(&mut order[range.clone()], |&i| {
        axis_center(&bboxes[i], split_axis) < pivot_value
    });
    let mut mid_point = left.len() + range.start;

    if mid_point == range.start || mid_point == range.end {
        // All centers fall on one side: falls back to the median.
        order[range.clone()].select_nth_unstable_by(range.len() / 2, |&i0, &i1| {
            axis_center(&bboxes[i0], split_axis)
                .partial_cmp(&axis_center(&bboxes[i1], split_axis))
                .unwrap_or(Ordering::Equal)
        });
        mid_point = range.start + range.len() / 2;
    }

    let left_child = recursive_build(order, bboxes, range.start..mid_point, depth + 1);
    let right_child = recursive_build(order, bboxes, mid_point..range.end, depth + 1);

    BvhNode {
        bbox,
        content: Children([Box::new(left_child), Box::new(right_child)], split_axis),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::{point3, vec3, Vec3};

    fn unit_boxes_along_x(n: usize) -> Vec<BBox> {
        (0..n)
            .map(|i| BBox::centered(point3(i as f32 * 3.0, 0.0, 0.0), Vec3::ONE))
            .collect()
    }

    #[test]
    fn leaves_respect_capacity() {
        let bvh = Bvh::build(&unit_boxes_along_x(100));
        let stats = bvh.stats();
        assert_eq!(bvh.num_items(), 100);
        assert!(stats.max_items_per_leaf <= MAX_ITEMS_PER_LEAF, "{}", stats);
        assert_eq!(stats.total_nodes, bvh.node_count());
        assert_eq!(stats.total_nodes, 2 * stats.leaf_nodes - 1);
        assert_eq!(stats.max_depth + 1, bvh.height());
    }

    #[test]
    fn identical_boxes_fall_back_to_median() {
        let boxes = vec![BBox::centered(Point3::ORIGIN, Vec3::ONE); 64];
        let bvh = Bvh::build(&boxes);
        let stats = bvh.stats();
        assert!(stats.max_items_per_leaf <= MAX_ITEMS_PER_LEAF, "{}", stats);
        assert!(stats.max_depth <= MAX_DEPTH);
    }

    #[test]
    fn closest_box_wins() {
        let boxes = unit_boxes_along_x(20);
        let bvh = Bvh::build(&boxes);
        let ray = Ray::new(point3(100.0, 0.0, 0.0), vec3(-1.0, 0.0, 0.0));
        let hit = bvh.intersect(&ray, |i, r| {
            let (t0, _) = boxes[i].hit_range(r)?;
            Some((t0, i))
        });
        assert_eq!(hit.map(|(_, i)| i), Some(19));
        assert!(bvh.intersect_any(&ray, |i, r| boxes[i].intersect(r)));
        let miss = Ray::new(point3(0.0, 5.0, 0.0), Vec3::X);
        assert!(!bvh.intersect_any(&miss, |i, r| boxes[i].intersect(r)));
    }

    #[test]
    fn empty_tree_reports_nothing() {
        let bvh = Bvh::build(&[]);
        assert!(bvh.is_empty());
        let ray = Ray::new(Point3::ORIGIN, Vec3::X);
        assert!(bvh.intersect(&ray, |_, _| Some((1.0, ()))).is_none());
        assert_eq!(bvh.stats(), BvhStats::default());
    }

    #[test]
    fn point_visits_overlapping_leaves() {
        let boxes = unit_boxes_along_x(30);
        let bvh = Bvh::build(&boxes);
        let mut visited = vec![];
        bvh.visit_point(point3(9.2, 0.1, 0.0), |i| {
            if boxes[i].contains(point3(9.2, 0.1, 0.0)) {
                visited.push(i)
            }
        });
        assert_eq!(visited, vec![3]);
    }
}
