//! # Storage
//!
//! The context object that owns a component registry, the archetype tables
//! and the entity allocator. Everything a caller needs goes through here;
//! there is no global state.
//!
//! ## Usage
//!
//! ```
//! use bytemuck::{Pod, Zeroable};
//! use strata_core::{ComponentMask, Storage};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, Pod, Zeroable)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! let mut storage: Storage = Storage::with_defaults()?;
//! let position = storage.register::<Position>()?;
//! let archetype = storage.create_archetype(u64::from_indices(&[position]))?;
//!
//! let entity = storage.spawn(archetype)?;
//! storage.set(entity, position, Position { x: 1.0, y: 2.0 })?;
//! assert_eq!(storage.get::<Position>(entity, position)?.y, 2.0);
//! # Ok::<(), strata_core::StorageError>(())
//! ```

use bytemuck::Pod;

use super::allocator::EntityAllocator;
use super::archetype::{ArchetypeTable, Archetypes};
use super::entity::{ArchetypeId, EntityIndex, Record};
use super::executor::{RowExecutor, RowSystem};
use super::mask::ComponentMask;
use super::registry::ComponentRegistry;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Archetype storage engine.
///
/// `M` is the signature mask type (and bounds the number of component
/// types), `E` the entity id type (and bounds the entity capacity).
#[derive(Clone, Debug)]
pub struct Storage<M: ComponentMask = u64, E: EntityIndex = u32> {
    config: StorageConfig,
    registry: ComponentRegistry<M>,
    archetypes: Archetypes<M, E>,
    allocator: EntityAllocator<E>,
}

impl<M: ComponentMask, E: EntityIndex> Storage<M, E> {
    /// Creates an empty storage.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidConfig`] if `config` does not validate for `E`.
    /// - [`StorageError::Allocation`] if the entity tables cannot be allocated.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate::<E>()?;
        let allocator = EntityAllocator::new(config.entity_capacity)?;

        tracing::debug!(
            entity_capacity = config.entity_capacity,
            initial_column_capacity = config.initial_column_capacity,
            growth = ?config.growth,
            mask_bits = M::BITS,
            "Created storage"
        );

        Ok(Self {
            config,
            registry: ComponentRegistry::new(),
            archetypes: Archetypes::new(),
            allocator,
        })
    }

    /// Creates an empty storage with [`StorageConfig::default`].
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_defaults() -> StorageResult<Self> {
        Self::new(StorageConfig::default())
    }

    /// Returns the configuration this storage was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the component registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry<M> {
        &self.registry
    }

    /// Returns the entity allocator.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &EntityAllocator<E> {
        &self.allocator
    }

    /// Returns the archetype slab.
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &Archetypes<M, E> {
        &self.archetypes
    }

    /// Registers a component type of `size` bytes.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`].
    pub fn register_component(&mut self, size: usize) -> StorageResult<usize> {
        self.registry.register(size)
    }

    /// Registers the plain-data type `T`.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`].
    pub fn register<T: Pod>(&mut self) -> StorageResult<usize> {
        self.registry.register_type::<T>()
    }

    /// Creates an empty archetype for `mask`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnregisteredComponent`] if a mask bit has no type.
    /// - [`StorageError::Allocation`] if the columns cannot be allocated.
    pub fn create_archetype(&mut self, mask: M) -> StorageResult<ArchetypeId> {
        let table = ArchetypeTable::new(mask, &self.registry, &self.config)?;
        let id = self.archetypes.insert(table)?;
        tracing::debug!(%id, mask = mask.to_u128(), "Created archetype");
        Ok(id)
    }

    /// Destroys an archetype and frees every entity still living in it.
    ///
    /// Returns the number of entities freed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownArchetype`] if `id` is not live.
    pub fn destroy_archetype(&mut self, id: ArchetypeId) -> StorageResult<usize> {
        let table = self
            .archetypes
            .remove(id)
            .ok_or(StorageError::UnknownArchetype(id.raw()))?;
        let released = self.allocator.release_archetype(id, table.entities());
        tracing::debug!(%id, released, "Destroyed archetype");
        Ok(released)
    }

    /// Returns the table of archetype `id`.
    #[inline]
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&ArchetypeTable<M, E>> {
        self.archetypes.get(id)
    }

    /// Returns the table of archetype `id` for writing component bytes.
    ///
    /// Rows can only be added or removed through [`spawn`](Self::spawn) and
    /// [`despawn`](Self::despawn).
    #[inline]
    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<&mut ArchetypeTable<M, E>> {
        self.archetypes.get_mut(id)
    }

    /// Spawns an entity in archetype `id` with zeroed or recycled component
    /// bytes.
    ///
    /// # Errors
    ///
    /// See [`EntityAllocator::allocate`].
    pub fn spawn(&mut self, id: ArchetypeId) -> StorageResult<E> {
        self.allocator.allocate(id, &mut self.archetypes)
    }

    /// Despawns `entity`, removing its row.
    ///
    /// # Errors
    ///
    /// See [`EntityAllocator::free`].
    pub fn despawn(&mut self, entity: E) -> StorageResult<()> {
        self.allocator.free(entity, &mut self.archetypes)
    }

    /// Returns where `entity`'s components live, if it is alive.
    #[inline]
    #[must_use]
    pub fn record(&self, entity: E) -> Option<Record> {
        self.allocator.record(entity)
    }

    /// Checks if `entity` is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: E) -> bool {
        self.allocator.is_allocated(entity)
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.allocated_count()
    }

    fn locate(&self, entity: E) -> StorageResult<(ArchetypeId, usize)> {
        let record = self.record(entity).ok_or_else(|| {
            if entity.index() < self.allocator.capacity() {
                StorageError::EntityAlreadyFree(entity.to_u64())
            } else {
                StorageError::InvalidEntity {
                    entity: entity.to_u64(),
                    capacity: self.allocator.capacity(),
                }
            }
        })?;
        let id = record
            .archetype
            .ok_or(StorageError::EntityAlreadyFree(entity.to_u64()))?;
        Ok((id, record.row))
    }

    fn table_of(&self, entity: E) -> StorageResult<(&ArchetypeTable<M, E>, usize)> {
        let (id, row) = self.locate(entity)?;
        let table = self
            .archetypes
            .get(id)
            .ok_or(StorageError::UnknownArchetype(id.raw()))?;
        Ok((table, row))
    }

    /// Reads `component` of `entity`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidEntity`] or [`StorageError::EntityAlreadyFree`]
    ///   if `entity` is not alive.
    /// - [`StorageError::ComponentNotInArchetype`] if its archetype lacks
    ///   `component`.
    /// - [`StorageError::ComponentSizeMismatch`] if `T` has the wrong size.
    pub fn get<T: Pod>(&self, entity: E, component: usize) -> StorageResult<T> {
        let (table, row) = self.table_of(entity)?;
        table.read(component, row)
    }

    /// Writes `component` of `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn set<T: Pod>(&mut self, entity: E, component: usize, value: T) -> StorageResult<()> {
        let (id, row) = self.locate(entity)?;
        self.archetypes
            .get_mut(id)
            .ok_or(StorageError::UnknownArchetype(id.raw()))?
            .write(component, row, value)
    }

    /// Returns the raw bytes of `component` of `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), minus the size check.
    pub fn component_bytes(&self, entity: E, component: usize) -> StorageResult<&[u8]> {
        let (table, row) = self.table_of(entity)?;
        table.row_bytes(component, row)
    }

    /// Runs `system` over every row of archetype `id`.
    ///
    /// Returns the number of rows visited.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownArchetype`] if `id` is not live.
    pub fn run<S>(&mut self, id: ArchetypeId, system: &mut S) -> StorageResult<usize>
    where
        S: RowSystem<M, E> + ?Sized,
    {
        let table = self
            .archetypes
            .get_mut(id)
            .ok_or(StorageError::UnknownArchetype(id.raw()))?;
        Ok(RowExecutor::run(table, system))
    }
}
