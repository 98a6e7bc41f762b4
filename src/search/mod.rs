//! Query algorithms over a built tree.

pub(crate) mod nearest;

pub use nearest::Nearest;
