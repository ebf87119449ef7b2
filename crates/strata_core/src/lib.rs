//! # STRATA Core
//!
//! Archetype-based component storage:
//! - Entities with the same component set share one table
//! - Every component type lives in its own contiguous column
//! - Entity ids come from a fixed-capacity, O(1) recycling pool
//!
//! ## Architecture Rules
//!
//! 1. **Explicit context** - All state lives in a [`Storage`] value
//! 2. **Data-oriented design** - Rows are packed, removal is swap-remove
//! 3. **Fallible allocation** - Out-of-memory is an error, never an abort
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{Storage, StorageConfig};
//!
//! let mut storage: Storage<u32, u16> =
//!     Storage::new(StorageConfig::default().with_entity_capacity(1024))?;
//! let health = storage.register_component(4)?;
//! let archetype = storage.create_archetype(1 << health)?;
//!
//! let entity = storage.spawn(archetype)?;
//! storage.set(entity, health, 100u32)?;
//! storage.run(archetype, &mut |table: &mut strata_core::ArchetypeTable<u32, u16>, row: usize| {
//!     let hp: u32 = table.read(health, row).unwrap_or(0);
//!     let _ = table.write(health, row, hp.saturating_sub(1));
//! })?;
//! assert_eq!(storage.get::<u32>(entity, health)?, 99);
//! # Ok::<(), strata_core::StorageError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{GrowthPolicy, StorageConfig};
pub use ecs::{
    ArchetypeId, ArchetypeTable, Archetypes, ComponentColumn, ComponentMask, ComponentRegistry,
    EntityAllocator, EntityIndex, Record, RowExecutor, RowSystem, Storage,
};
pub use error::{StorageError, StorageResult};
