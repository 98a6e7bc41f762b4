//! The public tree handle and its index-width dispatcher.
//!
//! Nearest-neighbor search is memory-bound on the arena, so node size
//! matters: a cloud under 255 points gets `u8` child links, halving the node
//! record against `u16` and quartering it against `u32`. The width is picked
//! once at construction, the smallest whose sentinel strictly exceeds the
//! point count, and every operation dispatches to the matching specialization
//! for the life of the tree.

use std::io;
use std::io::Write;

use rayon::prelude::*;

use crate::core::index::ArenaIndex;
use crate::core::tree::ArenaTree;
use crate::errors::{CanopyError, CanopyResult};
use crate::search::nearest;
use crate::search::Nearest;
use crate::Point3;

/// Width-tagged storage, one variant per supported index width. An invalid
/// tag has no representation, so the dispatcher cannot be observed in a
/// broken state.
#[derive(Debug)]
enum Dispatch {
    U8(ArenaTree<u8>),
    U16(ArenaTree<u16>),
    U32(ArenaTree<u32>),
    U64(ArenaTree<u64>),
}

macro_rules! dispatch {
    ($dispatch:expr, $tree:pat => $body:expr) => {
        match $dispatch {
            Dispatch::U8($tree) => $body,
            Dispatch::U16($tree) => $body,
            Dispatch::U32($tree) => $body,
            Dispatch::U64($tree) => $body,
        }
    };
}

impl Dispatch {
    /// Picks the narrowest width whose sentinel strictly exceeds the point
    /// count and builds the specialization for it.
    fn new(points: Vec<Point3>) -> CanopyResult<Self> {
        let cardinality = points.len();
        if cardinality < <u8 as ArenaIndex>::NONE as usize {
            Ok(Dispatch::U8(ArenaTree::new(points)))
        } else if cardinality < <u16 as ArenaIndex>::NONE as usize {
            Ok(Dispatch::U16(ArenaTree::new(points)))
        } else if cardinality < <u32 as ArenaIndex>::NONE as usize {
            Ok(Dispatch::U32(ArenaTree::new(points)))
        } else if (cardinality as u128) < <u64 as ArenaIndex>::NONE as u128 {
            Ok(Dispatch::U64(ArenaTree::new(points)))
        } else {
            Err(CanopyError::CapacityExceeded(cardinality))
        }
    }
}

fn width_bits<I: ArenaIndex>(_: &ArenaTree<I>) -> u32 {
    I::BITS
}

/// A static k-d tree over a 3-D point cloud.
///
/// Built once from a cloud and immutable afterwards; queries take `&self` and
/// may run concurrently from any number of threads.
#[derive(Debug)]
pub struct KdTree {
    dispatch: Dispatch,
}

impl KdTree {
    /// Builds a tree over `points`, consuming the cloud to avoid a copy.
    ///
    /// The cloud is reordered during construction; queries return points by
    /// value, so the original ordering is not observable through the tree.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if the cloud is too large for even 64-bit indices
    /// to address alongside their sentinel.
    pub fn new(points: Vec<Point3>) -> CanopyResult<Self> {
        Ok(KdTree {
            dispatch: Dispatch::new(points)?,
        })
    }

    /// Builds a tree over a borrowed cloud, copying it.
    ///
    /// # Errors
    ///
    /// As for [`KdTree::new`].
    pub fn from_slice(points: &[Point3]) -> CanopyResult<Self> {
        Self::new(points.to_vec())
    }

    /// The number of points in the tree.
    pub fn cardinality(&self) -> usize {
        dispatch!(&self.dispatch, tree => tree.cardinality())
    }

    /// Whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// The width, in bits, of the index type the dispatcher chose at
    /// construction: 8, 16, 32 or 64.
    pub fn index_bits(&self) -> u32 {
        dispatch!(&self.dispatch, tree => width_bits(tree))
    }

    /// Finds the stored point closest to `query`.
    ///
    /// `nearest` carries the running result; initialize it with
    /// [`Nearest::new`] (or any ceiling distance) before the call. It is only
    /// ever replaced on strict improvement, so among equidistant candidates
    /// the first one encountered wins.
    ///
    /// # Returns
    ///
    /// `false`, with `nearest` untouched, iff the tree is empty; `true` with
    /// `nearest` holding the closest point and its squared Euclidean distance
    /// otherwise.
    pub fn nearest(&self, query: &Point3, nearest: &mut Nearest) -> bool {
        dispatch!(&self.dispatch, tree => nearest::search(tree, query, nearest))
    }

    /// As [`KdTree::nearest`], but owning the result record.
    pub fn nearest_point(&self, query: &Point3) -> Option<Nearest> {
        let mut nearest = Nearest::new();
        self.nearest(query, &mut nearest).then_some(nearest)
    }

    /// Answers one query per input point, in parallel.
    ///
    /// The tree is immutable, so the queries share it freely across the
    /// thread pool.
    pub fn batch_nearest(&self, queries: &[Point3]) -> Vec<Option<Nearest>> {
        queries
            .par_iter()
            .map(|query| self.nearest_point(query))
            .collect()
    }

    /// Finds the closest point by exhaustive scan instead of the tree walk.
    ///
    /// Same contract and same component arithmetic as [`KdTree::nearest`],
    /// so the two agree to the bit; this is the oracle the tree walk is
    /// tested against.
    pub fn linear_nearest(&self, query: &Point3, nearest: &mut Nearest) -> bool {
        dispatch!(&self.dispatch, tree => nearest::linear(tree.points(), query, nearest))
    }

    /// Whether every node's two subtrees differ in size by at most one.
    ///
    /// Construction guarantees this; an empty tree is balanced.
    pub fn is_balanced(&self) -> bool {
        dispatch!(&self.dispatch, tree => tree.is_balanced())
    }

    /// Writes a diagnostic listing of the arena to `out`: point and node
    /// counts, then one entry per slot. The format is for human eyes, not a
    /// stable interface.
    ///
    /// # Errors
    ///
    /// Propagates whatever the sink reports.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        dispatch!(&self.dispatch, tree => tree.dump(out))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    use super::KdTree;
    use crate::{Nearest, Point3};

    fn random_cloud(cardinality: usize, seed: u64) -> Vec<Point3> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..cardinality)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                )
            })
            .collect()
    }

    fn nearest_to(tree: &KdTree, query: Point3) -> Nearest {
        let mut nearest = Nearest::new();
        assert!(tree.nearest(&query, &mut nearest));
        nearest
    }

    #[test]
    fn three_points_on_a_line() {
        let tree = KdTree::new(vec![
            Point3::new(1., 0., 0.),
            Point3::new(2., 0., 0.),
            Point3::new(3., 0., 0.),
        ])
        .unwrap();

        let nearest = nearest_to(&tree, Point3::new(2.1, 0., 0.));
        assert_eq!(nearest.point, Point3::new(2., 0., 0.));
        assert!(approx_eq!(f64, nearest.distance_squared, 0.01, epsilon = 1e-12));
    }

    #[test]
    fn origin_beats_the_far_corners() {
        let tree = KdTree::new(vec![
            Point3::new(0., 0., 0.),
            Point3::new(10., 0., 0.),
            Point3::new(0., 10., 0.),
            Point3::new(0., 0., 10.),
        ])
        .unwrap();

        let nearest = nearest_to(&tree, Point3::new(1., 1., 1.));
        assert_eq!(nearest.point, Point3::zeros());
        assert_eq!(nearest.distance_squared, 3.);
    }

    #[test]
    fn duplicate_points_are_searchable() {
        let point = Point3::new(1., 1., 1.);
        let tree = KdTree::new(vec![point, point]).unwrap();

        let nearest = nearest_to(&tree, point);
        assert_eq!(nearest.point, point);
        assert_eq!(nearest.distance_squared, 0.);
        assert!(tree.is_balanced());
    }

    #[test]
    fn unit_cube_corner_query() {
        let corners = (0..8)
            .map(|i| {
                Point3::new(
                    f64::from(i & 1),
                    f64::from((i >> 1) & 1),
                    f64::from((i >> 2) & 1),
                )
            })
            .collect::<Vec<_>>();
        let tree = KdTree::new(corners).unwrap();

        let nearest = nearest_to(&tree, Point3::new(0.6, 0.6, 0.6));
        assert_eq!(nearest.point, Point3::new(1., 1., 1.));
        assert!(approx_eq!(f64, nearest.distance_squared, 0.48, epsilon = 1e-12));
    }

    #[test]
    fn colinear_points_on_each_axis() {
        for axis in 0..3 {
            let cloud = (-5..=5)
                .map(|i| {
                    let mut point = Point3::zeros();
                    point[axis] = f64::from(i);
                    point
                })
                .collect::<Vec<_>>();
            let tree = KdTree::new(cloud).unwrap();

            for i in -6..=6 {
                let mut query = Point3::zeros();
                query[axis] = f64::from(i) + 0.025;

                let nearest = nearest_to(&tree, query);
                let expected = f64::from(i.clamp(-5, 5));
                assert_eq!(
                    nearest.point[axis], expected,
                    "axis {axis}, query offset {i}"
                );
            }
        }
    }

    #[test]
    fn empty_cloud_queries_and_dumps() {
        let tree = KdTree::new(Vec::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.cardinality(), 0);
        assert!(tree.is_balanced());

        let mut nearest = Nearest::new();
        assert!(!tree.nearest(&Point3::zeros(), &mut nearest));
        assert!(!tree.linear_nearest(&Point3::zeros(), &mut nearest));
        assert_eq!(nearest.distance_squared, f64::INFINITY);
        assert_eq!(tree.nearest_point(&Point3::zeros()), None);
        assert_eq!(tree.batch_nearest(&[Point3::zeros()]), vec![None]);

        let mut out = Vec::new();
        tree.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("POINT COUNT: 0\nNODE COUNT: 0\n"));
    }

    #[test]
    fn dispatcher_picks_the_narrowest_width() {
        let sizes = [(0, 8), (100, 8), (254, 8), (255, 16), (300, 16), (70_000, 32)];
        for (cardinality, bits) in sizes {
            let cloud = (0..cardinality)
                .map(|i| Point3::new(i as f64, 0., 0.))
                .collect::<Vec<_>>();
            let tree = KdTree::new(cloud).unwrap();
            assert_eq!(tree.index_bits(), bits, "cardinality {cardinality}");
            assert!(tree.is_balanced());
        }
    }

    #[test]
    fn from_slice_matches_the_consuming_constructor() {
        let cloud = random_cloud(128, 5);
        let owned = KdTree::new(cloud.clone()).unwrap();
        let copied = KdTree::from_slice(&cloud).unwrap();

        let query = Point3::new(1., 2., 3.);
        assert_eq!(owned.nearest_point(&query), copied.nearest_point(&query));
        assert_eq!(owned.index_bits(), copied.index_bits());
    }

    #[test]
    fn batch_queries_match_single_queries() {
        let tree = KdTree::new(random_cloud(500, 9)).unwrap();
        let queries = random_cloud(20, 10);

        let batched = tree.batch_nearest(&queries);
        for (query, batched) in queries.iter().zip(batched) {
            assert_eq!(batched, tree.nearest_point(query));
        }
    }

    #[test]
    fn tree_walk_agrees_with_the_oracle_on_a_large_cloud() {
        let tree = KdTree::new(random_cloud(10_000, 1987)).unwrap();
        assert!(tree.is_balanced());

        let mut rng = ChaCha8Rng::seed_from_u64(1988);
        for _ in 0..1000 {
            let query = Point3::new(
                rng.gen_range(-120.0..120.0),
                rng.gen_range(-120.0..120.0),
                rng.gen_range(-120.0..120.0),
            );

            let mut from_tree = Nearest::new();
            let mut from_scan = Nearest::new();
            assert!(tree.nearest(&query, &mut from_tree));
            assert!(tree.linear_nearest(&query, &mut from_scan));

            assert_eq!(from_tree.point, from_scan.point);
            assert_eq!(
                from_tree.distance_squared.to_bits(),
                from_scan.distance_squared.to_bits()
            );
        }
    }

    #[test]
    #[ignore = "takes minutes without optimizations"]
    fn million_point_cloud_balances_and_answers() {
        let tree = KdTree::new(random_cloud(1_000_000, 1987)).unwrap();
        assert_eq!(tree.index_bits(), 32);
        assert!(tree.is_balanced());

        let mut rng = ChaCha8Rng::seed_from_u64(1989);
        for _ in 0..100 {
            let query = Point3::new(
                rng.gen_range(-120.0..120.0),
                rng.gen_range(-120.0..120.0),
                rng.gen_range(-120.0..120.0),
            );

            let mut from_tree = Nearest::new();
            let mut from_scan = Nearest::new();
            assert!(tree.nearest(&query, &mut from_tree));
            assert!(tree.linear_nearest(&query, &mut from_scan));
            assert_eq!(from_tree, from_scan);
        }
    }
}
