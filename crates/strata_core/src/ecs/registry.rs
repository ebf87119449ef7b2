//! # Component Registry
//!
//! Append-only table of component byte sizes, indexed by the bit position a
//! component occupies in a signature mask.
//!
//! Slots are reserved eight at a time (one byte of mask bits), so scanning
//! the first byte-multiple of a mask never addresses an unreserved slot.

use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use super::mask::ComponentMask;
use crate::error::{StorageError, StorageResult};

/// Number of registry slots reserved per growth step.
pub const REGISTRY_BLOCK: usize = 8;

/// Maps component indices to component byte sizes.
///
/// Indices are assigned sequentially from 0 and never removed. At most
/// `M::BITS` types can be registered, one per mask bit.
#[derive(Clone, Debug)]
pub struct ComponentRegistry<M: ComponentMask> {
    /// Byte size per registered component index.
    sizes: Vec<usize>,
    _mask: PhantomData<M>,
}

impl<M: ComponentMask> Default for ComponentRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ComponentMask> ComponentRegistry<M> {
    /// Creates an empty registry. No slots are reserved until the first registration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sizes: Vec::new(),
            _mask: PhantomData,
        }
    }

    /// Registers a component type of `size` bytes and returns its index.
    ///
    /// # Errors
    ///
    /// - [`StorageError::RegistryFull`] if every mask bit already has a type.
    /// - [`StorageError::Allocation`] if the next block of slots cannot be
    ///   reserved. The registry is unchanged in both cases.
    pub fn register(&mut self, size: usize) -> StorageResult<usize> {
        let index = self.sizes.len();
        if index >= M::BITS {
            tracing::warn!(capacity = M::BITS, "Component registry full");
            return Err(StorageError::RegistryFull { capacity: M::BITS });
        }

        if index == self.sizes.capacity() {
            self.sizes
                .try_reserve_exact(REGISTRY_BLOCK)
                .map_err(|_| StorageError::Allocation {
                    bytes: REGISTRY_BLOCK * size_of::<usize>(),
                })?;
        }
        self.sizes.push(size);

        tracing::debug!(index, size, "Registered component type");
        Ok(index)
    }

    /// Registers the plain-data type `T`, sized by `size_of::<T>()`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_type<T: Pod>(&mut self) -> StorageResult<usize> {
        self.register(size_of::<T>())
    }

    /// Returns the sizes of every component in `mask`, in ascending index order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnregisteredComponent`] if a set bit has no
    /// registered type.
    pub fn sizes_for_mask(&self, mask: M) -> StorageResult<Vec<usize>> {
        mask.indices()
            .map(|index| {
                self.size_of(index)
                    .ok_or(StorageError::UnregisteredComponent(index))
            })
            .collect()
    }

    /// Returns the byte size of component `index`, if registered.
    #[inline]
    #[must_use]
    pub fn size_of(&self, index: usize) -> Option<usize> {
        self.sizes.get(index).copied()
    }

    /// Returns the number of registered component types.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Returns the number of reserved slots.
    #[inline]
    #[must_use]
    pub fn reserved_slots(&self) -> usize {
        self.sizes.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_indices() {
        let mut registry: ComponentRegistry<u8> = ComponentRegistry::new();
        assert_eq!(registry.register(4).unwrap(), 0);
        assert_eq!(registry.register(8).unwrap(), 1);
        assert_eq!(registry.register_type::<[f32; 3]>().unwrap(), 2);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.size_of(2), Some(12));
        assert_eq!(registry.size_of(3), None);
    }

    #[test]
    fn test_sizes_for_mask_ascending() {
        let mut registry: ComponentRegistry<u16> = ComponentRegistry::new();
        for size in [1, 2, 4, 8, 16] {
            registry.register(size).unwrap();
        }
        assert_eq!(registry.sizes_for_mask(0b1_0110).unwrap(), vec![2, 4, 16]);
        assert_eq!(registry.sizes_for_mask(0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_sizes_for_unregistered_bit() {
        let mut registry: ComponentRegistry<u8> = ComponentRegistry::new();
        registry.register(4).unwrap();
        assert_eq!(
            registry.sizes_for_mask(0b101),
            Err(StorageError::UnregisteredComponent(2))
        );
    }

    #[test]
    fn test_block_growth() {
        let mut registry: ComponentRegistry<u32> = ComponentRegistry::new();
        assert_eq!(registry.reserved_slots(), 0);
        registry.register(4).unwrap();
        assert!(registry.reserved_slots() >= REGISTRY_BLOCK);
        for _ in 1..REGISTRY_BLOCK + 1 {
            registry.register(4).unwrap();
        }
        assert!(registry.reserved_slots() >= 2 * REGISTRY_BLOCK);
    }

    #[test]
    fn test_registry_full() {
        let mut registry: ComponentRegistry<u8> = ComponentRegistry::new();
        for _ in 0..8 {
            registry.register(1).unwrap();
        }
        assert_eq!(
            registry.register(1),
            Err(StorageError::RegistryFull { capacity: 8 })
        );
        assert_eq!(registry.count(), 8);
    }
}
