//! The width-specialized tree: a point store plus a flat arena of nodes.
//!
//! Construction takes ownership of the cloud and partitions it in place, so a
//! node's point index is the point's final position in the reordered store.
//! Nodes are appended in post-order and the root is the last slot; after the
//! build neither the store nor the arena is ever mutated again.

use std::io;
use std::io::Write;

use log::debug;

use super::index::ArenaIndex;
use super::node::Node;
use super::point::{Axis, Point3};

/// A k-d tree whose arena is indexed by `I`.
///
/// The dispatcher guarantees `points.len() < I::NONE`, so every position in
/// either vector is representable as an `I` distinct from the sentinel.
#[derive(Debug)]
pub(crate) struct ArenaTree<I: ArenaIndex> {
    points: Vec<Point3>,
    nodes: Vec<Node<I>>,
}

impl<I: ArenaIndex> ArenaTree<I> {
    /// Builds the tree over `points`, consuming and reordering them.
    ///
    /// Both vectors reach their final size here; the arena is reserved up
    /// front and filled by the recursion, one node per point.
    pub fn new(points: Vec<Point3>) -> Self {
        let cardinality = points.len();
        let mut tree = ArenaTree {
            points,
            nodes: Vec::with_capacity(cardinality),
        };
        tree.build(0, cardinality);
        debug_assert_eq!(tree.nodes.len(), cardinality);

        debug!(
            "built {}-bit arena tree over {} points",
            I::BITS,
            cardinality
        );
        tree
    }

    /// Builds the subtree over the point range `[begin, end)` and returns its
    /// root position, or the sentinel for an empty range.
    ///
    /// Recursion depth is the tree height, logarithmic in the range length
    /// thanks to the median split.
    fn build(&mut self, begin: usize, end: usize) -> I {
        if begin >= end {
            return I::NONE;
        }

        let axis = self.choose_split_axis(begin, end);

        if end - begin == 1 {
            self.nodes
                .push(Node::new(I::from_usize(begin), I::NONE, I::NONE, axis));
            return self.root_position();
        }

        let median = self.partition_around_median(begin, end, axis);
        let left = self.build(begin, median);
        let right = self.build(median + 1, end);

        self.nodes
            .push(Node::new(I::from_usize(median), left, right, axis));
        self.root_position()
    }

    /// Chooses the axis along which `[begin, end)` has the largest extent.
    ///
    /// Y and Z are only chosen on a strictly larger extent, so ties resolve
    /// X before Y before Z. Single-point slices split on X by convention.
    fn choose_split_axis(&self, begin: usize, end: usize) -> Axis {
        debug_assert!(begin < end);

        if begin + 1 == end {
            return Axis::X;
        }

        let first = self.points[begin];
        let (mut lower, mut upper) = (first, first);
        for point in &self.points[begin + 1..end] {
            lower = lower.inf(point);
            upper = upper.sup(point);
        }

        let extent = upper - lower;
        if extent.y > extent.x && extent.y > extent.z {
            Axis::Y
        } else if extent.z > extent.x && extent.z > extent.y {
            Axis::Z
        } else {
            Axis::X
        }
    }

    /// Reorders `[begin, end)` in place so that the middle position holds the
    /// median on `axis`, everything before it is no greater on that component
    /// and everything after it is no smaller. Returns the median position.
    ///
    /// This is an in-place selection, expected O(n); the ordering within each
    /// side is unspecified and ties may land on either side.
    fn partition_around_median(&mut self, begin: usize, end: usize, axis: Axis) -> usize {
        let half = (end - begin) / 2;
        self.points[begin..end]
            .select_nth_unstable_by(half, |a, b| a[axis as usize].total_cmp(&b[axis as usize]));
        begin + half
    }

    /// The position of the most recently appended node, i.e. the root of the
    /// subtree the recursion just finished. After construction this is the
    /// root of the whole tree.
    pub fn root_position(&self) -> I {
        debug_assert!(!self.nodes.is_empty());
        I::from_usize(self.nodes.len() - 1)
    }

    /// The number of points the tree was built over.
    pub fn cardinality(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn nodes(&self) -> &[Node<I>] {
        &self.nodes
    }

    pub fn node(&self, position: I) -> &Node<I> {
        &self.nodes[position.as_usize()]
    }

    /// The representative point of `node` in the reordered store.
    pub fn node_point(&self, node: &Node<I>) -> Point3 {
        self.points[node.point().as_usize()]
    }

    /// Whether every subtree's children differ in size by at most one.
    ///
    /// The builder's median split guarantees this; the check exists so the
    /// guarantee stays testable. Arenas of up to two nodes are trivially
    /// balanced.
    pub fn is_balanced(&self) -> bool {
        match self.nodes.last() {
            Some(root) if self.nodes.len() > 2 => root.is_balanced(&self.nodes),
            _ => true,
        }
    }

    /// Writes the diagnostic listing: point and node counts, then one entry
    /// per arena slot in order.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "== KD TREE ====")?;
        writeln!(out, "POINT COUNT: {}", self.points.len())?;
        writeln!(out, "NODE COUNT: {}\n", self.nodes.len())?;

        writeln!(out, "-- NODES ----")?;
        for (position, node) in self.nodes.iter().enumerate() {
            write!(out, "{}: ", position)?;
            node.dump(&self.points, out)?;
        }
        out.flush()
    }
}
