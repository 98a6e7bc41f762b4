#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

//! # Canopy
//!
//! A static k-d tree over a 3-D point cloud, built once and queried for exact
//! nearest neighbors.
//!
//! The tree is stored as a flat arena of nodes rather than as boxed links:
//! construction appends nodes in post-order, so the root is the last slot and
//! every child index points strictly backwards. Child links use the narrowest
//! unsigned width that can address the cloud (8, 16, 32 or 64 bits, chosen at
//! construction), which keeps nodes small and traversal cache-dense.
//!
//! ```
//! use canopy::{KdTree, Nearest, Point3};
//!
//! let cloud = vec![
//!     Point3::new(0., 0., 0.),
//!     Point3::new(10., 0., 0.),
//!     Point3::new(0., 10., 0.),
//! ];
//! let tree = KdTree::new(cloud).unwrap();
//!
//! let mut nearest = Nearest::new();
//! assert!(tree.nearest(&Point3::new(1., 1., 1.), &mut nearest));
//! assert_eq!(nearest.point, Point3::new(0., 0., 0.));
//! assert_eq!(nearest.distance_squared, 3.);
//! ```
//!
//! Queries never mutate the tree, so a built tree may be shared across
//! threads freely; [`KdTree::batch_nearest`] does exactly that.

mod core;
pub mod errors;
mod search;
mod tree;

pub use crate::core::point::{Axis, Point3};
pub use crate::errors::{CanopyError, CanopyResult};
pub use crate::search::Nearest;
pub use crate::tree::KdTree;

/// The current version of the crate.
pub const VERSION: &str = "0.3.0";
