//! # Entity Allocator
//!
//! Fixed-capacity pool of entity ids, recycled without a free list.
//!
//! ## Layout
//!
//! The pool is a permutation of `[0, capacity)` kept together with its
//! inverse:
//!
//! ```text
//! pool:      [ 3  0  5 | 1  2  4 ]      pool[position[e]] == e
//!              allocated | available
//! ```
//!
//! The first `allocated` slots hold exactly the live ids. Allocation hands
//! out the first available slot and moves the boundary right; freeing swaps
//! the id with the last live slot and moves the boundary left. Both are O(1)
//! apart from the archetype row work.

use super::archetype::Archetypes;
use super::entity::{ArchetypeId, EntityIndex, Record};
use super::mask::ComponentMask;
use crate::error::{StorageError, StorageResult};

/// Pool of entity ids with per-entity component records.
#[derive(Clone, Debug)]
pub struct EntityAllocator<E: EntityIndex> {
    /// Permutation of all ids; `[0, allocated)` are live.
    pool: Vec<E>,
    /// Inverse of `pool`: slot of each id.
    position: Vec<usize>,
    /// Component location per id, cleared for free ids.
    records: Vec<Record>,
    /// Number of live ids.
    allocated: usize,
}

impl<E: EntityIndex> EntityAllocator<E> {
    /// Creates an allocator for ids `[0, capacity)`, all free.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidConfig`] if `capacity` is zero or does not
    ///   fit the id type.
    /// - [`StorageError::Allocation`] if the tables cannot be allocated.
    pub fn new(capacity: usize) -> StorageResult<Self> {
        if capacity == 0 || capacity > E::MAX_CAPACITY {
            return Err(StorageError::InvalidConfig(format!(
                "entity capacity {capacity} must be in 1..={}",
                E::MAX_CAPACITY
            )));
        }

        let alloc_err = |width: usize| StorageError::Allocation {
            bytes: capacity.saturating_mul(width),
        };

        let mut pool = Vec::new();
        pool.try_reserve_exact(capacity)
            .map_err(|_| alloc_err(std::mem::size_of::<E>()))?;
        let mut position = Vec::new();
        position
            .try_reserve_exact(capacity)
            .map_err(|_| alloc_err(std::mem::size_of::<usize>()))?;
        let mut records = Vec::new();
        records
            .try_reserve_exact(capacity)
            .map_err(|_| alloc_err(std::mem::size_of::<Record>()))?;

        for index in 0..capacity {
            let entity = E::from_index(index).ok_or_else(|| {
                StorageError::InvalidConfig(format!("entity {index} does not fit the id type"))
            })?;
            pool.push(entity);
            position.push(index);
        }
        records.resize(capacity, Record::CLEARED);

        tracing::debug!(capacity, "Created entity allocator");

        Ok(Self {
            pool,
            position,
            records,
            allocated: 0,
        })
    }

    /// Returns the total number of ids.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    /// Returns the number of live ids.
    #[inline]
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Returns the pool permutation. The first
    /// [`allocated_count`](Self::allocated_count) ids are live.
    #[inline]
    #[must_use]
    pub fn pool_order(&self) -> &[E] {
        &self.pool
    }

    /// Returns the pool slot of `entity`, if it is in range.
    #[inline]
    #[must_use]
    pub fn pool_position(&self, entity: E) -> Option<usize> {
        self.position.get(entity.index()).copied()
    }

    /// Checks if `entity` is live.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, entity: E) -> bool {
        self.pool_position(entity)
            .is_some_and(|slot| slot < self.allocated)
    }

    /// Returns the record of a live entity.
    #[inline]
    #[must_use]
    pub fn record(&self, entity: E) -> Option<Record> {
        if self.is_allocated(entity) {
            self.records.get(entity.index()).copied()
        } else {
            None
        }
    }

    /// Allocates an id and gives it a row in `archetype`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoEntitiesAvailable`] if every id is live.
    /// - [`StorageError::UnknownArchetype`] if `archetype` is not in the slab.
    /// - Any error from [`add_row`](super::ArchetypeTable::add_row).
    ///
    /// The allocator is unchanged on error.
    pub fn allocate<M: ComponentMask>(
        &mut self,
        archetype: ArchetypeId,
        archetypes: &mut Archetypes<M, E>,
    ) -> StorageResult<E> {
        let Some(&entity) = self.pool.get(self.allocated) else {
            tracing::warn!(capacity = self.capacity(), "Entity pool exhausted");
            return Err(StorageError::NoEntitiesAvailable {
                capacity: self.capacity(),
            });
        };

        let table = archetypes
            .get_mut(archetype)
            .ok_or(StorageError::UnknownArchetype(archetype.raw()))?;
        let row = table.add_row(entity)?;

        self.records[entity.index()] = Record::new(archetype, row);
        self.allocated += 1;

        tracing::trace!(entity = entity.to_u64(), %archetype, row, "Allocated entity");
        Ok(entity)
    }

    /// Checks that `entity` is in range and live.
    fn check_live(&self, entity: E) -> StorageResult<usize> {
        let Some(slot) = self.pool_position(entity) else {
            return Err(StorageError::InvalidEntity {
                entity: entity.to_u64(),
                capacity: self.capacity(),
            });
        };
        if slot >= self.allocated {
            return Err(StorageError::EntityAlreadyFree(entity.to_u64()));
        }
        Ok(slot)
    }

    /// Moves a live id to the boundary and marks it free.
    fn release_slot(&mut self, entity: E, slot: usize) {
        let last = self.allocated - 1;
        let other = self.pool[last];
        self.pool.swap(slot, last);
        self.position[other.index()] = slot;
        self.position[entity.index()] = last;
        self.records[entity.index()] = Record::CLEARED;
        self.allocated = last;
    }

    /// Frees `entity` and removes its row.
    ///
    /// If removing the row relocates another entity, that entity's record is
    /// re-pointed at the freed row.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidEntity`] if `entity >= capacity`.
    /// - [`StorageError::EntityAlreadyFree`] if `entity` is not live.
    /// - [`StorageError::RowOutOfBounds`] if the record disagrees with the
    ///   table (the allocator is then unchanged).
    pub fn free<M: ComponentMask>(
        &mut self,
        entity: E,
        archetypes: &mut Archetypes<M, E>,
    ) -> StorageResult<()> {
        let slot = match self.check_live(entity) {
            Ok(slot) => slot,
            Err(err) => {
                tracing::warn!(entity = entity.to_u64(), %err, "Rejected free");
                return Err(err);
            }
        };

        let record = self.records[entity.index()];
        if let Some(table) = record.archetype.and_then(|id| archetypes.get_mut(id)) {
            if let Some(moved) = table.remove_row(record.row)? {
                self.records[moved.index()].row = record.row;
            }
        }

        self.release_slot(entity, slot);
        tracing::trace!(entity = entity.to_u64(), "Freed entity");
        Ok(())
    }

    /// Frees every id in `entities` whose record points at `archetype`,
    /// without touching any table.
    ///
    /// Used after the archetype itself has been taken out of the slab.
    /// Returns the number of ids freed.
    pub fn release_archetype(&mut self, archetype: ArchetypeId, entities: &[E]) -> usize {
        let mut released = 0;
        for &entity in entities {
            let Ok(slot) = self.check_live(entity) else {
                continue;
            };
            if self.records[entity.index()].archetype == Some(archetype) {
                self.release_slot(entity, slot);
                released += 1;
            }
        }
        tracing::debug!(%archetype, released, "Released archetype entities");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::ecs::archetype::ArchetypeTable;
    use crate::ecs::registry::ComponentRegistry;

    fn setup(capacity: usize) -> (EntityAllocator<u16>, Archetypes<u8, u16>, ArchetypeId) {
        let mut registry: ComponentRegistry<u8> = ComponentRegistry::new();
        registry.register(4).unwrap();
        let mut archetypes = Archetypes::new();
        let id = archetypes
            .insert(ArchetypeTable::new(0b1, &registry, &StorageConfig::default()).unwrap())
            .unwrap();
        (EntityAllocator::new(capacity).unwrap(), archetypes, id)
    }

    fn assert_permutation(allocator: &EntityAllocator<u16>) {
        for entity in 0..allocator.capacity() {
            let entity = u16::try_from(entity).unwrap();
            let slot = allocator.pool_position(entity).unwrap();
            assert_eq!(allocator.pool_order()[slot], entity);
        }
    }

    #[test]
    fn test_new_is_identity() {
        let allocator: EntityAllocator<u8> = EntityAllocator::new(4).unwrap();
        assert_eq!(allocator.pool_order(), &[0, 1, 2, 3]);
        assert_eq!(allocator.allocated_count(), 0);
        assert_eq!(allocator.record(0), None);
    }

    #[test]
    fn test_new_rejects_bad_capacity() {
        assert!(EntityAllocator::<u8>::new(0).is_err());
        assert!(EntityAllocator::<u8>::new(257).is_err());
        assert!(EntityAllocator::<u8>::new(256).is_ok());
    }

    #[test]
    fn test_allocate_takes_first_available() {
        let (mut allocator, mut archetypes, id) = setup(4);
        assert_eq!(allocator.allocate(id, &mut archetypes).unwrap(), 0);
        assert_eq!(allocator.allocate(id, &mut archetypes).unwrap(), 1);
        assert_eq!(allocator.record(1), Some(Record::new(id, 1)));
        assert_eq!(allocator.allocated_count(), 2);
        assert_permutation(&allocator);
    }

    #[test]
    fn test_free_repoints_moved_record() {
        let (mut allocator, mut archetypes, id) = setup(4);
        let a = allocator.allocate(id, &mut archetypes).unwrap();
        let b = allocator.allocate(id, &mut archetypes).unwrap();
        archetypes.get_mut(id).unwrap().write(0, 1, 42u32).unwrap();

        allocator.free(a, &mut archetypes).unwrap();

        assert!(!allocator.is_allocated(a));
        assert_eq!(allocator.record(a), None);
        assert_eq!(allocator.record(b), Some(Record::new(id, 0)));
        let table = archetypes.get(id).unwrap();
        assert_eq!(table.used_rows(), 1);
        assert_eq!(table.read::<u32>(0, 0).unwrap(), 42);
        assert_eq!(allocator.pool_order()[0], b);
        assert_permutation(&allocator);
    }

    #[test]
    fn test_freed_id_is_reused() {
        let (mut allocator, mut archetypes, id) = setup(2);
        let a = allocator.allocate(id, &mut archetypes).unwrap();
        allocator.allocate(id, &mut archetypes).unwrap();
        allocator.free(a, &mut archetypes).unwrap();
        assert_eq!(allocator.allocate(id, &mut archetypes).unwrap(), a);
    }

    #[test]
    fn test_exhaustion_leaves_state_unchanged() {
        let (mut allocator, mut archetypes, id) = setup(3);
        for _ in 0..3 {
            allocator.allocate(id, &mut archetypes).unwrap();
        }
        let pool = allocator.pool_order().to_vec();

        assert_eq!(
            allocator.allocate(id, &mut archetypes),
            Err(StorageError::NoEntitiesAvailable { capacity: 3 })
        );
        assert_eq!(allocator.pool_order(), pool.as_slice());
        assert_eq!(allocator.allocated_count(), 3);
        assert_eq!(archetypes.get(id).unwrap().used_rows(), 3);
    }

    #[test]
    fn test_unknown_archetype() {
        let (mut allocator, mut archetypes, _) = setup(3);
        let missing = ArchetypeId::new(9);
        assert_eq!(
            allocator.allocate(missing, &mut archetypes),
            Err(StorageError::UnknownArchetype(9))
        );
        assert_eq!(allocator.allocated_count(), 0);
    }

    #[test]
    fn test_free_errors() {
        let (mut allocator, mut archetypes, id) = setup(3);
        let a = allocator.allocate(id, &mut archetypes).unwrap();
        allocator.free(a, &mut archetypes).unwrap();

        assert_eq!(
            allocator.free(a, &mut archetypes),
            Err(StorageError::EntityAlreadyFree(0))
        );
        assert_eq!(
            allocator.free(3, &mut archetypes),
            Err(StorageError::InvalidEntity { entity: 3, capacity: 3 })
        );
    }

    #[test]
    fn test_release_archetype() {
        let (mut allocator, mut archetypes, id) = setup(4);
        for _ in 0..3 {
            allocator.allocate(id, &mut archetypes).unwrap();
        }
        let table = archetypes.remove(id).unwrap();

        assert_eq!(allocator.release_archetype(id, table.entities()), 3);
        assert_eq!(allocator.allocated_count(), 0);
        assert!(allocator.record(1).is_none());
        assert_permutation(&allocator);
    }
}
