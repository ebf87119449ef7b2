//! # Storage Error Types
//!
//! All errors that can occur in the storage engine.
//!
//! Two families exist:
//! - Allocation failures, returned from every call that may grow a buffer.
//!   A failed grow never changes the state that was there before.
//! - Usage errors (bad entity ids, double frees, out-of-range rows, ...),
//!   each with its own variant. The engine never retries or repairs state.

use thiserror::Error;

/// Errors that can occur in the storage engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A buffer could not be allocated or grown.
    #[error("allocation failed: could not reserve {bytes} bytes")]
    Allocation {
        /// Size of the failed request in bytes.
        bytes: usize,
    },

    /// Every entity id of the allocator is in use.
    #[error("no entities available: all {capacity} entity ids are allocated")]
    NoEntitiesAvailable {
        /// Fixed capacity of the allocator.
        capacity: usize,
    },

    /// The entity id lies outside `[0, capacity)`.
    #[error("invalid entity id {entity}: capacity is {capacity}")]
    InvalidEntity {
        /// The offending id.
        entity: u64,
        /// Fixed capacity of the allocator.
        capacity: usize,
    },

    /// The entity is not currently allocated.
    #[error("entity {0} is already free")]
    EntityAlreadyFree(u64),

    /// A row removal addressed a row that is not in use.
    #[error("row {row} is out of bounds: table has {used_rows} used rows")]
    RowOutOfBounds {
        /// The requested row.
        row: usize,
        /// Number of used rows in the table.
        used_rows: usize,
    },

    /// The registry already holds one type per mask bit.
    #[error("component registry full: mask holds at most {capacity} component types")]
    RegistryFull {
        /// Number of bits in the signature mask.
        capacity: usize,
    },

    /// A mask bit refers to a component index that was never registered.
    #[error("component type {0} is not registered")]
    UnregisteredComponent(usize),

    /// The component's bit is not set in the archetype's mask.
    #[error("component type {component} is not part of archetype mask {mask:#b}")]
    ComponentNotInArchetype {
        /// The requested component index.
        component: usize,
        /// The archetype's signature mask.
        mask: u128,
    },

    /// A typed access used a type whose size differs from the column's element size.
    #[error("component size mismatch: column stores {expected} bytes, type has {actual}")]
    ComponentSizeMismatch {
        /// Element size of the column.
        expected: usize,
        /// Size of the requested type.
        actual: usize,
    },

    /// The archetype id does not name a live archetype.
    #[error("unknown archetype {0}")]
    UnknownArchetype(u32),

    /// The storage configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<toml::de::Error> for StorageError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
