//! The errors that can occur while building a tree.

use thiserror::Error;

/// Helper type for a call that could go wrong.
pub type CanopyResult<T> = Result<T, CanopyError>;

/// Error type for canopy. Construction is the only fallible operation;
/// queries on an empty tree report emptiness through their return value
/// instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanopyError {
    /// The cloud holds too many points for even the widest index type to
    /// address alongside its sentinel.
    #[error("{0} points cannot be addressed by any supported index width")]
    CapacityExceeded(usize),
}
