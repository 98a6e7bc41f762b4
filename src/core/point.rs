//! The point type and the split axes of the tree.

use std::fmt;

/// A point in the cloud. Double precision throughout; distances are computed
/// component-wise in x, y, z order, so two equal clouds produce bit-identical
/// squared distances.
pub type Point3 = nalgebra::Vector3<f64>;

/// One of the three coordinate directions a node may split on.
///
/// The discriminants match the component order of [`Point3`], so an axis can
/// index a point directly with `point[axis as usize]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x direction.
    X = 0,
    /// The y direction.
    Y = 1,
    /// The z direction.
    Z = 2,
}

impl Axis {
    /// Returns the component of `point` along this axis.
    #[inline]
    pub fn component(self, point: &Point3) -> f64 {
        point[self as usize]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}
