//! # Component Columns
//!
//! A column is a type-erased buffer holding one component type for every
//! row of one archetype. It records its element size and capacity but not a
//! length: the owning table's used-row count is the logical length.
//!
//! Typed access goes through [`bytemuck`], so any `Pod` type whose size
//! matches the element size can be read or written. Reads copy the value
//! out, which keeps access alignment-independent.

use std::mem::size_of;
use std::ops::Range;

use bytemuck::Pod;

use crate::error::{StorageError, StorageResult};

/// Resizable storage for one component type.
///
/// Every element slot up to `capacity` is initialized; new slots are zeroed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentColumn {
    /// Raw element bytes, `element_size * capacity` long.
    bytes: Vec<u8>,
    /// Size of one element in bytes.
    element_size: usize,
    /// Number of element slots.
    capacity: usize,
}

impl ComponentColumn {
    /// Creates a column of `capacity` zeroed elements of `element_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Allocation`] if the buffer cannot be allocated.
    pub fn new(element_size: usize, capacity: usize) -> StorageResult<Self> {
        let mut column = Self {
            bytes: Vec::new(),
            element_size,
            capacity: 0,
        };
        column.resize(capacity)?;
        Ok(column)
    }

    /// Resizes the column to exactly `new_count` elements.
    ///
    /// Growing zeroes the new slots. Shrinking drops trailing elements and
    /// releases their memory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Allocation`] if growing fails. The column's
    /// contents and capacity are then exactly as they were before the call.
    pub(crate) fn resize(&mut self, new_count: usize) -> StorageResult<()> {
        if new_count <= self.capacity {
            self.truncate(new_count);
            return Ok(());
        }

        let new_len = self
            .element_size
            .checked_mul(new_count)
            .ok_or(StorageError::Allocation { bytes: usize::MAX })?;
        self.bytes
            .try_reserve_exact(new_len - self.bytes.len())
            .map_err(|_| StorageError::Allocation { bytes: new_len })?;
        self.bytes.resize(new_len, 0);

        self.capacity = new_count;
        Ok(())
    }

    /// Shrinks the column to `new_count` elements, releasing the tail.
    ///
    /// Does nothing if `new_count >= capacity`. Never allocates.
    pub(crate) fn truncate(&mut self, new_count: usize) {
        if new_count >= self.capacity {
            return;
        }
        // new_count < capacity, so the product fits.
        self.bytes.truncate(new_count * self.element_size);
        self.bytes.shrink_to_fit();
        self.capacity = new_count;
    }

    /// Returns the element size in bytes.
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns the number of element slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the whole buffer, `element_size * capacity` bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    fn range(&self, index: usize) -> Range<usize> {
        assert!(
            index < self.capacity,
            "column index {index} out of range for capacity {}",
            self.capacity
        );
        let start = index * self.element_size;
        start..start + self.element_size
    }

    /// Returns the bytes of element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    #[must_use]
    pub fn element(&self, index: usize) -> &[u8] {
        let range = self.range(index);
        &self.bytes[range]
    }

    /// Returns the bytes of element `index` for writing.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub fn element_mut(&mut self, index: usize) -> &mut [u8] {
        let range = self.range(index);
        &mut self.bytes[range]
    }

    /// Copies element `src` over element `dst`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= capacity`.
    #[inline]
    pub(crate) fn copy_element(&mut self, src: usize, dst: usize) {
        let src = self.range(src);
        let dst = self.range(dst).start;
        self.bytes.copy_within(src, dst);
    }

    fn check_type<T: Pod>(&self) -> StorageResult<()> {
        if size_of::<T>() == self.element_size {
            Ok(())
        } else {
            Err(StorageError::ComponentSizeMismatch {
                expected: self.element_size,
                actual: size_of::<T>(),
            })
        }
    }

    /// Reads element `index` as a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentSizeMismatch`] if `T` is not exactly
    /// `element_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn read<T: Pod>(&self, index: usize) -> StorageResult<T> {
        self.check_type::<T>()?;
        Ok(bytemuck::pod_read_unaligned(self.element(index)))
    }

    /// Overwrites element `index` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentSizeMismatch`] if `T` is not exactly
    /// `element_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn write<T: Pod>(&mut self, index: usize, value: T) -> StorageResult<()> {
        self.check_type::<T>()?;
        self.element_mut(index)
            .copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let column = ComponentColumn::new(4, 8).unwrap();
        assert_eq!(column.capacity(), 8);
        assert_eq!(column.element_size(), 4);
        assert_eq!(column.as_bytes().len(), 32);
        assert!(column.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_resize_keeps_prefix() {
        let mut column = ComponentColumn::new(4, 2).unwrap();
        column.write(0, 7u32).unwrap();
        column.write(1, 9u32).unwrap();

        column.resize(3).unwrap();
        assert_eq!(column.capacity(), 3);
        assert_eq!(column.read::<u32>(0).unwrap(), 7);
        assert_eq!(column.read::<u32>(1).unwrap(), 9);
        assert_eq!(column.read::<u32>(2).unwrap(), 0);

        column.resize(1).unwrap();
        assert_eq!(column.capacity(), 1);
        assert_eq!(column.as_bytes(), &7u32.to_ne_bytes());
    }

    #[test]
    fn test_failed_resize_is_transactional() {
        let mut column = ComponentColumn::new(16, 4).unwrap();
        column.write(3, [1u64, 2u64]).unwrap();
        let before = column.clone();

        let err = column.resize(usize::MAX / 8).unwrap_err();
        assert!(matches!(err, StorageError::Allocation { .. }));
        assert_eq!(column, before);

        let mut narrow = ComponentColumn::new(1, 4).unwrap();
        narrow.write(1, 5u8).unwrap();
        let before = narrow.clone();
        assert!(narrow.resize(usize::MAX / 2).is_err());
        assert_eq!(narrow, before);
    }

    #[test]
    fn test_truncate() {
        let mut column = ComponentColumn::new(2, 4).unwrap();
        column.write(0, 0xABCDu16).unwrap();
        column.write(3, 0x1234u16).unwrap();

        column.truncate(9);
        assert_eq!(column.capacity(), 4);

        column.truncate(1);
        assert_eq!(column.capacity(), 1);
        assert_eq!(column.as_bytes(), &0xABCDu16.to_ne_bytes());

        column.truncate(0);
        assert_eq!(column.capacity(), 0);
        assert!(column.as_bytes().is_empty());
    }

    #[test]
    fn test_copy_element() {
        let mut column = ComponentColumn::new(8, 3).unwrap();
        column.write(2, 0xDEAD_BEEFu64).unwrap();
        column.copy_element(2, 0);
        assert_eq!(column.read::<u64>(0).unwrap(), 0xDEAD_BEEF);
        assert_eq!(column.read::<u64>(2).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_size_mismatch() {
        let mut column = ComponentColumn::new(4, 1).unwrap();
        assert_eq!(
            column.read::<u64>(0),
            Err(StorageError::ComponentSizeMismatch { expected: 4, actual: 8 })
        );
        assert!(column.write(0, 1u16).is_err());
    }

    #[test]
    fn test_zero_sized_elements() {
        let mut column = ComponentColumn::new(0, 4).unwrap();
        column.resize(10).unwrap();
        assert_eq!(column.capacity(), 10);
        assert!(column.element(9).is_empty());
        assert!(column.read::<()>(5).is_ok());
    }
}
