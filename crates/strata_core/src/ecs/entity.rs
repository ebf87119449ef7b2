//! # Entity Handles and Records
//!
//! Entities are plain integers drawn from `[0, capacity)`. They carry no
//! data of their own; the allocator maps each live entity to a [`Record`]
//! that says where its components are stored.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Unsigned integer usable as an entity id.
///
/// The width bounds the allocator capacity: `u8` ids allow at most 256
/// entities, `u16` ids 65 536, and so on.
pub trait EntityIndex: Copy + Debug + Display + Eq + Hash + Ord + Send + Sync + 'static {
    /// Number of distinct ids the type can represent (saturating at `usize::MAX`).
    const MAX_CAPACITY: usize;

    /// Converts the id into a table index.
    fn index(self) -> usize;

    /// Converts a table index into an id, if it fits.
    fn from_index(index: usize) -> Option<Self>;

    /// Widens the id for error reporting.
    fn to_u64(self) -> u64;
}

macro_rules! impl_entity_index {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EntityIndex for $ty {
                const MAX_CAPACITY: usize = {
                    if (<$ty>::BITS as usize) < (usize::BITS as usize) {
                        1usize << <$ty>::BITS
                    } else {
                        usize::MAX
                    }
                };

                #[inline]
                fn index(self) -> usize {
                    // Capacity never exceeds MAX_CAPACITY, so live ids always fit.
                    usize::try_from(self).unwrap_or(usize::MAX)
                }

                #[inline]
                fn from_index(index: usize) -> Option<Self> {
                    <$ty>::try_from(index).ok()
                }

                #[inline]
                fn to_u64(self) -> u64 {
                    u64::try_from(self).unwrap_or(u64::MAX)
                }
            }
        )*
    };
}

impl_entity_index!(u8, u16, u32, u64, usize);

/// Identifier of an archetype inside an [`Archetypes`](super::Archetypes) slab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Creates an id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the slab slot of this id.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl Display for ArchetypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of an entity's components: archetype and row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Record {
    /// Archetype holding the entity, `None` for a cleared record.
    pub archetype: Option<ArchetypeId>,
    /// Row of the entity inside the archetype's columns.
    pub row: usize,
}

impl Record {
    /// The cleared record: no archetype, row 0.
    pub const CLEARED: Self = Self {
        archetype: None,
        row: 0,
    };

    /// Creates a record pointing at `row` of `archetype`.
    #[inline]
    #[must_use]
    pub const fn new(archetype: ArchetypeId, row: usize) -> Self {
        Self {
            archetype: Some(archetype),
            row,
        }
    }

    /// Checks if this record is cleared.
    #[inline]
    #[must_use]
    pub const fn is_cleared(self) -> bool {
        self.archetype.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_index_roundtrip() {
        assert_eq!(<u8 as EntityIndex>::from_index(255), Some(255u8));
        assert_eq!(<u8 as EntityIndex>::from_index(256), None);
        assert_eq!(EntityIndex::index(42u16), 42);
        assert_eq!(EntityIndex::to_u64(7u32), 7);
    }

    #[test]
    fn test_max_capacity() {
        assert_eq!(<u8 as EntityIndex>::MAX_CAPACITY, 256);
        assert_eq!(<u16 as EntityIndex>::MAX_CAPACITY, 65_536);
        assert_eq!(<usize as EntityIndex>::MAX_CAPACITY, usize::MAX);
    }

    #[test]
    fn test_record_cleared() {
        assert!(Record::CLEARED.is_cleared());
        assert_eq!(Record::default(), Record::CLEARED);

        let record = Record::new(ArchetypeId::new(3), 5);
        assert!(!record.is_cleared());
        assert_eq!(record.archetype.map(ArchetypeId::raw), Some(3));
    }
}
