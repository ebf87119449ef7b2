//! # Archetype Tables
//!
//! An archetype stores every entity that shares one signature mask. Its
//! data is laid out as one column per component type:
//!
//! ```text
//! mask 0b1011   columns:  [C0 C0 C0 ..]  [C1 C1 C1 ..]  [C3 C3 C3 ..]
//!               entities: [ e7  e2  e9 ..]
//!                           row 0 1 2
//! ```
//!
//! Rows are appended at the end and removed with swap-remove: the last row
//! is copied into the hole, so removal is O(columns) and never shifts
//! earlier rows. The entity that was moved is reported back so its record
//! can be re-pointed.
//!
//! ## Row structure
//!
//! Rows are added and removed only by the entity allocator, which keeps
//! every entity record in step with the row it points at. Code outside the
//! crate can read and write component bytes in place but cannot add, remove
//! or move rows:
//!
//! ```compile_fail
//! use strata_core::ArchetypeTable;
//!
//! fn drop_first_row(table: &mut ArchetypeTable<u64, u32>) {
//!     let _ = table.remove_row(0);
//! }
//! ```
//!
//! Views into a column (`column`, `row_bytes`, ...) borrow the table, so a
//! structural call ends them.

use bytemuck::Pod;

use super::column::ComponentColumn;
use super::entity::{ArchetypeId, EntityIndex};
use super::mask::ComponentMask;
use super::registry::ComponentRegistry;
use crate::config::{GrowthPolicy, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Columnar table holding all components of entities with one signature.
#[derive(Clone, Debug)]
pub struct ArchetypeTable<M: ComponentMask, E: EntityIndex> {
    /// Signature identifying this archetype.
    mask: M,
    /// One column per set mask bit, in ascending component order.
    columns: Vec<ComponentColumn>,
    /// Column index per component index, `None` where the mask bit is clear.
    column_of: Vec<Option<usize>>,
    /// Rows allocated in every column.
    allocated_rows: usize,
    /// Entity per used row. Its length is the used-row count.
    row_entities: Vec<E>,
    /// Column growth strategy.
    growth: GrowthPolicy,
}

impl<M: ComponentMask, E: EntityIndex> ArchetypeTable<M, E> {
    /// Creates an empty table for `mask`.
    ///
    /// Every column is allocated with `config.initial_column_capacity` rows,
    /// sized from `registry`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnregisteredComponent`] if a mask bit has no
    ///   registered type.
    /// - [`StorageError::Allocation`] if any buffer cannot be allocated.
    pub fn new(
        mask: M,
        registry: &ComponentRegistry<M>,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let sizes = registry.sizes_for_mask(mask)?;

        let mut column_of = Vec::new();
        column_of
            .try_reserve_exact(M::BITS)
            .map_err(|_| StorageError::Allocation {
                bytes: M::BITS * std::mem::size_of::<Option<usize>>(),
            })?;
        column_of.resize(M::BITS, None);
        for (column, component) in mask.indices().enumerate() {
            column_of[component] = Some(column);
        }

        let mut columns = Vec::new();
        columns
            .try_reserve_exact(sizes.len())
            .map_err(|_| StorageError::Allocation {
                bytes: sizes.len() * std::mem::size_of::<ComponentColumn>(),
            })?;
        for size in sizes {
            columns.push(ComponentColumn::new(size, config.initial_column_capacity)?);
        }

        tracing::debug!(
            mask = mask.to_u128(),
            columns = columns.len(),
            rows = config.initial_column_capacity,
            "Created archetype table"
        );

        Ok(Self {
            mask,
            columns,
            column_of,
            allocated_rows: config.initial_column_capacity,
            row_entities: Vec::new(),
            growth: config.growth,
        })
    }

    /// Returns the signature of this archetype.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> M {
        self.mask
    }

    /// Returns the number of columns, equal to the number of set mask bits.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the number of used rows.
    #[inline]
    #[must_use]
    pub fn used_rows(&self) -> usize {
        self.row_entities.len()
    }

    /// Returns the number of rows allocated in every column.
    #[inline]
    #[must_use]
    pub fn allocated_rows(&self) -> usize {
        self.allocated_rows
    }

    /// Checks if the table has no used rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_entities.is_empty()
    }

    /// Returns the entity stored in `row`, if the row is used.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, row: usize) -> Option<E> {
        self.row_entities.get(row).copied()
    }

    /// Returns the entities of all used rows, in row order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[E] {
        &self.row_entities
    }

    /// Returns all columns in ascending component order.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[ComponentColumn] {
        &self.columns
    }

    /// Returns the column index holding `component`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentNotInArchetype`] if the component's
    /// mask bit is clear.
    #[inline]
    pub fn column_index(&self, component: usize) -> StorageResult<usize> {
        self.column_of
            .get(component)
            .copied()
            .flatten()
            .ok_or(StorageError::ComponentNotInArchetype {
                component,
                mask: self.mask.to_u128(),
            })
    }

    /// Returns the column holding `component`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentNotInArchetype`] if the component's
    /// mask bit is clear.
    pub fn column(&self, component: usize) -> StorageResult<&ComponentColumn> {
        let index = self.column_index(component)?;
        Ok(&self.columns[index])
    }

    /// Returns the column holding `component` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentNotInArchetype`] if the component's
    /// mask bit is clear.
    pub fn column_mut(&mut self, component: usize) -> StorageResult<&mut ComponentColumn> {
        let index = self.column_index(component)?;
        Ok(&mut self.columns[index])
    }

    fn check_row(&self, row: usize) -> StorageResult<()> {
        if row < self.used_rows() {
            Ok(())
        } else {
            Err(StorageError::RowOutOfBounds {
                row,
                used_rows: self.used_rows(),
            })
        }
    }

    /// Returns the bytes of `component` in `row`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ComponentNotInArchetype`] if the mask bit is clear.
    /// - [`StorageError::RowOutOfBounds`] if `row` is not used.
    pub fn row_bytes(&self, component: usize, row: usize) -> StorageResult<&[u8]> {
        self.check_row(row)?;
        Ok(self.column(component)?.element(row))
    }

    /// Returns the bytes of `component` in `row` for writing.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ComponentNotInArchetype`] if the mask bit is clear.
    /// - [`StorageError::RowOutOfBounds`] if `row` is not used.
    pub fn row_bytes_mut(&mut self, component: usize, row: usize) -> StorageResult<&mut [u8]> {
        self.check_row(row)?;
        Ok(self.column_mut(component)?.element_mut(row))
    }

    /// Reads `component` of `row` as a `T`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ComponentNotInArchetype`] if the mask bit is clear.
    /// - [`StorageError::RowOutOfBounds`] if `row` is not used.
    /// - [`StorageError::ComponentSizeMismatch`] if `T` has the wrong size.
    pub fn read<T: Pod>(&self, component: usize, row: usize) -> StorageResult<T> {
        self.check_row(row)?;
        self.column(component)?.read(row)
    }

    /// Writes `value` into `component` of `row`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ComponentNotInArchetype`] if the mask bit is clear.
    /// - [`StorageError::RowOutOfBounds`] if `row` is not used.
    /// - [`StorageError::ComponentSizeMismatch`] if `T` has the wrong size.
    pub fn write<T: Pod>(&mut self, component: usize, row: usize, value: T) -> StorageResult<()> {
        self.check_row(row)?;
        self.column_mut(component)?.write(row, value)
    }

    /// Resizes every column to `rows`, all or nothing.
    fn resize_columns(&mut self, rows: usize) -> StorageResult<()> {
        for index in 0..self.columns.len() {
            if let Err(err) = self.columns[index].resize(rows) {
                for column in &mut self.columns[..index] {
                    column.truncate(self.allocated_rows);
                }
                tracing::warn!(rows, "Column growth failed, table left unchanged");
                return Err(err);
            }
        }
        self.allocated_rows = rows;
        Ok(())
    }

    /// Appends a row for `entity` and returns its index.
    ///
    /// If every allocated row is used, all columns grow first according to
    /// the table's [`GrowthPolicy`]. The new row's component bytes are
    /// whatever the slot last held (zero for never-used slots); callers
    /// write the components they need.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Allocation`] if growing fails; the table is
    /// then unchanged.
    pub(crate) fn add_row(&mut self, entity: E) -> StorageResult<usize> {
        let row = self.used_rows();

        self.row_entities
            .try_reserve(1)
            .map_err(|_| StorageError::Allocation {
                bytes: (row + 1) * std::mem::size_of::<E>(),
            })?;

        if row >= self.allocated_rows {
            self.resize_columns(self.growth.next_capacity(self.allocated_rows))?;
        }

        self.row_entities.push(entity);
        tracing::trace!(row, entity = entity.to_u64(), "Added archetype row");
        Ok(row)
    }

    /// Removes `row` by swap-remove.
    ///
    /// When `row` is not the last used row, the last row's components are
    /// copied into `row` and the entity that owned the last row is returned:
    /// it now lives at `row`. Removing the last row returns `None`.
    ///
    /// Under [`GrowthPolicy::Linear`] the allocated capacity also shrinks by
    /// one row, except when the sole used row is removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RowOutOfBounds`] if `row >= used_rows()`; the
    /// table is then unchanged.
    pub(crate) fn remove_row(&mut self, row: usize) -> StorageResult<Option<E>> {
        self.check_row(row)?;

        if self.used_rows() == 1 {
            self.row_entities.clear();
            tracing::trace!(row, "Removed sole archetype row");
            return Ok(None);
        }

        let last = self.used_rows() - 1;
        let moved = if row < last {
            for column in &mut self.columns {
                column.copy_element(last, row);
            }
            let entity = self.row_entities[last];
            self.row_entities[row] = entity;
            Some(entity)
        } else {
            None
        };
        self.row_entities.truncate(last);

        if self.growth.shrinks_on_remove() {
            let rows = self.allocated_rows - 1;
            for column in &mut self.columns {
                column.truncate(rows);
            }
            self.allocated_rows = rows;
        }

        tracing::trace!(row, moved = moved.map(EntityIndex::to_u64), "Removed archetype row");
        Ok(moved)
    }
}

/// Slab of archetype tables addressed by [`ArchetypeId`].
///
/// Ids are never reused: a removed archetype leaves an empty slot behind.
#[derive(Clone, Debug)]
pub struct Archetypes<M: ComponentMask, E: EntityIndex> {
    tables: Vec<Option<ArchetypeTable<M, E>>>,
    live: usize,
}

impl<M: ComponentMask, E: EntityIndex> Default for Archetypes<M, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ComponentMask, E: EntityIndex> Archetypes<M, E> {
    /// Creates an empty slab.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: Vec::new(),
            live: 0,
        }
    }

    /// Stores `table` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Allocation`] if the slab cannot grow or the
    /// id space is exhausted.
    pub fn insert(&mut self, table: ArchetypeTable<M, E>) -> StorageResult<ArchetypeId> {
        let raw = u32::try_from(self.tables.len())
            .map_err(|_| StorageError::Allocation { bytes: usize::MAX })?;
        self.tables
            .try_reserve(1)
            .map_err(|_| StorageError::Allocation {
                bytes: (self.tables.len() + 1) * std::mem::size_of::<Option<ArchetypeTable<M, E>>>(),
            })?;
        self.tables.push(Some(table));
        self.live += 1;
        Ok(ArchetypeId::new(raw))
    }

    /// Returns the table for `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&ArchetypeTable<M, E>> {
        self.tables.get(id.slot())?.as_ref()
    }

    /// Returns the table for `id` for writing.
    #[inline]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut ArchetypeTable<M, E>> {
        self.tables.get_mut(id.slot())?.as_mut()
    }

    /// Takes the table for `id` out of the slab.
    pub fn remove(&mut self, id: ArchetypeId) -> Option<ArchetypeTable<M, E>> {
        let table = self.tables.get_mut(id.slot())?.take()?;
        self.live -= 1;
        Some(table)
    }

    /// Returns the number of live archetypes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Checks if no archetype is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live archetypes with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &ArchetypeTable<M, E>)> {
        self.tables.iter().enumerate().filter_map(|(slot, table)| {
            let raw = u32::try_from(slot).ok()?;
            table.as_ref().map(|table| (ArchetypeId::new(raw), table))
        })
    }
}
