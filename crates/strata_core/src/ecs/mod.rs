//! # Entity Component System
//!
//! Archetype storage built bottom-up:
//!
//! - [`registry`]: component index to byte size
//! - [`column`]: one type-erased buffer per component
//! - [`archetype`]: columns grouped by signature mask, swap-remove rows
//! - [`allocator`]: entity id pool and entity records
//! - [`executor`]: per-row systems
//! - [`storage`]: the context object tying them together

pub mod allocator;
pub mod archetype;
pub mod column;
pub mod entity;
pub mod executor;
pub mod mask;
pub mod registry;
pub mod storage;

pub use allocator::EntityAllocator;
pub use archetype::{ArchetypeTable, Archetypes};
pub use column::ComponentColumn;
pub use entity::{ArchetypeId, EntityIndex, Record};
pub use executor::{RowExecutor, RowSystem};
pub use mask::{ComponentMask, MaskIndices};
pub use registry::{ComponentRegistry, REGISTRY_BLOCK};
pub use storage::Storage;
