//! # Signature Masks
//!
//! A signature mask is a fixed-width bitfield: bit `i` set means the
//! archetype stores component type `i`. The width is picked by the caller
//! through the mask type.

use std::fmt::{Binary, Debug};
use std::hash::Hash;

/// Unsigned integer usable as an archetype signature.
pub trait ComponentMask: Copy + Debug + Binary + Eq + Hash + Send + Sync + 'static {
    /// Number of bits, which is also the maximum number of component types.
    const BITS: usize;

    /// The mask with no bits set.
    const EMPTY: Self;

    /// Returns `true` if bit `index` is set. Indices past the width are unset.
    fn contains(self, index: usize) -> bool;

    /// Returns this mask with bit `index` set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::BITS`.
    #[must_use]
    fn with(self, index: usize) -> Self;

    /// Number of set bits.
    fn count(self) -> usize;

    /// Widens the mask for error reporting.
    fn to_u128(self) -> u128;

    /// Iterates over the set bit indices in ascending order.
    fn indices(self) -> MaskIndices<Self> {
        MaskIndices { mask: self, next: 0 }
    }

    /// Builds a mask from a list of component indices.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= Self::BITS`.
    #[must_use]
    fn from_indices(indices: &[usize]) -> Self {
        indices.iter().fold(Self::EMPTY, |mask, &index| mask.with(index))
    }
}

macro_rules! impl_component_mask {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ComponentMask for $ty {
                const BITS: usize = <$ty>::BITS as usize;
                const EMPTY: Self = 0;

                #[inline]
                fn contains(self, index: usize) -> bool {
                    index < <Self as ComponentMask>::BITS && (self >> index) & 1 == 1
                }

                #[inline]
                fn with(self, index: usize) -> Self {
                    assert!(
                        index < <Self as ComponentMask>::BITS,
                        "component index {index} exceeds mask width"
                    );
                    self | (1 << index)
                }

                #[inline]
                fn count(self) -> usize {
                    self.count_ones() as usize
                }

                #[inline]
                fn to_u128(self) -> u128 {
                    u128::from(self)
                }
            }
        )*
    };
}

impl_component_mask!(u8, u16, u32, u64, u128);

/// Ascending iterator over the set bits of a mask.
#[derive(Clone, Debug)]
pub struct MaskIndices<M> {
    mask: M,
    next: usize,
}

impl<M: ComponentMask> Iterator for MaskIndices<M> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < M::BITS {
            let index = self.next;
            self.next += 1;
            if self.mask.contains(index) {
                return Some(index);
            }
        }
        None
    }
}
