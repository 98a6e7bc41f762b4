//! Exact nearest-neighbor search.
//!
//! The search walks the arena iteratively with an explicit stack holding the
//! current descent path. It first descends to the leaf the query would land
//! in, then backtracks: each node on the path is compared against the running
//! best, and a node's far subtree is entered only when the squared distance
//! from the query to the node's splitting plane is still below the best: a
//! subtree entirely on the other side of a plane at least that far away
//! cannot improve the result.

use crate::core::index::ArenaIndex;
use crate::core::node::Node;
use crate::core::point::Point3;
use crate::core::tree::ArenaTree;

/// The running result of a nearest-neighbor query.
///
/// Callers hand a `Nearest` to [`crate::KdTree::nearest`] and read both
/// fields back on success. The distance is squared Euclidean; take the square
/// root externally if the plain distance is wanted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// The closest point found so far.
    pub point: Point3,
    /// The squared Euclidean distance from the query to `point`.
    pub distance_squared: f64,
}

impl Nearest {
    /// A result that any point beats: the distance starts at the +∞ ceiling
    /// and is only ever replaced on strict improvement.
    pub fn new() -> Self {
        Nearest {
            point: Point3::zeros(),
            distance_squared: f64::INFINITY,
        }
    }
}

impl Default for Nearest {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the point closest to `query`, writing it into `nearest`.
///
/// Returns `false` without touching `nearest` iff the tree is empty. All
/// replacements are strict, so among equidistant points the first one
/// encountered wins, and a far subtree exactly on the pruning boundary is
/// skipped because it could only offer ties.
pub(crate) fn search<I: ArenaIndex>(
    tree: &ArenaTree<I>,
    query: &Point3,
    nearest: &mut Nearest,
) -> bool {
    if tree.nodes().is_empty() {
        return false;
    }

    // The capacity hint covers the height of a balanced tree; the stack is
    // free to grow past it.
    let mut stack: Vec<I> = Vec::with_capacity(tree.nodes().len().ilog2() as usize + 2);
    let root = tree.root_position();
    stack.push(root);
    descend_to_leaf(tree, root, &mut stack, query);

    let mut last_popped = I::NONE;
    while let Some(&position) = stack.last() {
        let node = tree.node(position);
        consider(tree, node, query, nearest);

        if node.is_leaf() {
            last_popped = position;
            stack.pop();
            continue;
        }

        if plane_distance_squared(tree, node, query) >= nearest.distance_squared {
            last_popped = position;
            stack.pop();
            continue;
        }

        // The far subtree is entered exactly once, on the way back from the
        // descent-side child; returning from the far child means both sides
        // are done.
        if last_popped == next_child(tree, node, query) {
            let far = if last_popped == node.left() {
                node.right()
            } else {
                node.left()
            };
            if far != I::NONE {
                stack.push(far);
                descend_to_leaf(tree, far, &mut stack, query);
                continue;
            }
        }

        last_popped = position;
        stack.pop();
    }

    true
}

/// Exhaustive scan over the point store, with the same component arithmetic
/// as the tree walk so both produce bit-identical squared distances.
pub(crate) fn linear(points: &[Point3], query: &Point3, nearest: &mut Nearest) -> bool {
    if points.is_empty() {
        return false;
    }

    for &point in points {
        let distance_squared = (*query - point).norm_squared();
        if distance_squared < nearest.distance_squared {
            nearest.point = point;
            nearest.distance_squared = distance_squared;
        }
    }

    true
}

/// Pushes children onto the stack until the path from `position` reaches the
/// leaf the query descends to.
fn descend_to_leaf<I: ArenaIndex>(
    tree: &ArenaTree<I>,
    mut position: I,
    stack: &mut Vec<I>,
    query: &Point3,
) {
    loop {
        let node = tree.node(position);
        if node.is_leaf() {
            return;
        }
        position = next_child(tree, node, query);
        stack.push(position);
    }
}

/// The child the descent takes from a non-leaf node: a lone child if only one
/// exists, otherwise left iff the query sits on or below the splitting plane
/// (ties go left by convention).
fn next_child<I: ArenaIndex>(tree: &ArenaTree<I>, node: &Node<I>, query: &Point3) -> I {
    debug_assert!(!node.is_leaf());

    if node.left() == I::NONE {
        return node.right();
    }
    if node.right() == I::NONE {
        return node.left();
    }

    let axis = node.axis();
    if axis.component(query) <= axis.component(&tree.node_point(node)) {
        node.left()
    } else {
        node.right()
    }
}

/// Replaces the running result iff this node's point is strictly closer.
fn consider<I: ArenaIndex>(
    tree: &ArenaTree<I>,
    node: &Node<I>,
    query: &Point3,
    nearest: &mut Nearest,
) {
    let point = tree.node_point(node);
    let distance_squared = (*query - point).norm_squared();
    if distance_squared < nearest.distance_squared {
        nearest.point = point;
        nearest.distance_squared = distance_squared;
    }
}

/// The squared distance from the query to the node's splitting plane; the
/// far subtree lies entirely beyond it.
fn plane_distance_squared<I: ArenaIndex>(
    tree: &ArenaTree<I>,
    node: &Node<I>,
    query: &Point3,
) -> f64 {
    let axis = node.axis();
    let to_plane = axis.component(query) - axis.component(&tree.node_point(node));
    to_plane * to_plane
}
