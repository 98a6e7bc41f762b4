//! Arena indices of selectable width.
//!
//! Nodes refer to their children and their point by index, and for small
//! clouds a narrow index keeps the node record small: an arena of `u8`-indexed
//! nodes packs four nodes where a `u32`-indexed arena fits one. The maximum
//! value of each width is reserved as the "no node" sentinel, so a width can
//! only address clouds strictly smaller than that sentinel.

use std::fmt;

use num_traits::{PrimInt, Unsigned};

/// An unsigned primitive usable as an index into the node arena.
///
/// The dispatcher in [`crate::KdTree`] picks the narrowest implementor whose
/// [`ArenaIndex::NONE`] exceeds the point count; conversions below therefore
/// never truncate for indices that actually occur in an arena.
pub(crate) trait ArenaIndex: PrimInt + Unsigned + fmt::Debug + Send + Sync {
    /// The reserved sentinel meaning "no node"; never a valid index.
    const NONE: Self;

    /// The width of this index type in bits.
    const BITS: u32;

    /// Converts a position into an index.
    fn from_usize(value: usize) -> Self;

    /// Converts this index back into a position.
    fn as_usize(self) -> usize;
}

macro_rules! impl_arena_index {
    ($($width:ty),+) => {$(
        impl ArenaIndex for $width {
            const NONE: Self = <$width>::MAX;
            const BITS: u32 = <$width>::BITS;

            #[inline]
            fn from_usize(value: usize) -> Self {
                debug_assert!(value < Self::NONE as usize);
                value as $width
            }

            #[inline]
            fn as_usize(self) -> usize {
                self as usize
            }
        }
    )+};
}

impl_arena_index!(u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::ArenaIndex;

    #[test]
    fn sentinel_is_max_value() {
        assert_eq!(<u8 as ArenaIndex>::NONE, u8::MAX);
        assert_eq!(<u16 as ArenaIndex>::NONE, u16::MAX);
        assert_eq!(<u32 as ArenaIndex>::NONE, u32::MAX);
        assert_eq!(<u64 as ArenaIndex>::NONE, u64::MAX);
    }

    #[test]
    fn round_trips_positions() {
        for position in [0usize, 1, 200, 254] {
            assert_eq!(u8::from_usize(position).as_usize(), position);
        }
        assert_eq!(u64::from_usize(1 << 40).as_usize(), 1 << 40);
    }
}
