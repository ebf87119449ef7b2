//! # Storage Configuration
//!
//! Initialization-time settings for a [`Storage`](crate::Storage).
//!
//! Integer widths are chosen through type parameters (`M` for the signature
//! mask, `E` for entity ids). Everything else lives here and can be loaded
//! once at startup from TOML:
//!
//! ```toml
//! entity_capacity = 4096
//! initial_column_capacity = 16
//! growth = "doubling"
//! ```

use serde::Deserialize;

use crate::ecs::EntityIndex;
use crate::error::{StorageError, StorageResult};

/// Default number of entity ids in the allocator pool.
pub const DEFAULT_ENTITY_CAPACITY: usize = 256;

/// Default number of rows every new column is allocated with.
pub const DEFAULT_INITIAL_COLUMN_CAPACITY: usize = 8;

/// How archetype columns grow when a row is appended to a full table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Grow by exactly one row, and shrink by one row on every removal.
    ///
    /// Every insertion past capacity reallocates every column.
    #[default]
    Linear,
    /// Double the capacity (minimum one row); removals never shrink.
    Doubling,
}

impl GrowthPolicy {
    /// Returns the capacity to grow to from a full table of `current` rows.
    #[inline]
    #[must_use]
    pub const fn next_capacity(self, current: usize) -> usize {
        match self {
            Self::Linear => current + 1,
            Self::Doubling => {
                if current == 0 {
                    1
                } else {
                    current * 2
                }
            }
        }
    }

    /// Returns `true` if removing a row also releases one row of capacity.
    #[inline]
    #[must_use]
    pub const fn shrinks_on_remove(self) -> bool {
        matches!(self, Self::Linear)
    }
}

/// Settings fixed when a storage is created.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Number of entity ids in the pool. Fixed for the storage's lifetime.
    pub entity_capacity: usize,
    /// Rows allocated (zeroed) for every column of a new archetype.
    pub initial_column_capacity: usize,
    /// Column growth strategy.
    pub growth: GrowthPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            initial_column_capacity: DEFAULT_INITIAL_COLUMN_CAPACITY,
            growth: GrowthPolicy::Linear,
        }
    }
}

impl StorageConfig {
    /// Parses a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the text is not valid TOML
    /// or contains unknown keys.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: Self = toml::from_str(text)?;
        tracing::debug!(
            entity_capacity = config.entity_capacity,
            initial_column_capacity = config.initial_column_capacity,
            "Loaded storage configuration"
        );
        Ok(config)
    }

    /// Sets the entity capacity.
    #[must_use]
    pub const fn with_entity_capacity(mut self, entity_capacity: usize) -> Self {
        self.entity_capacity = entity_capacity;
        self
    }

    /// Sets the initial column capacity.
    #[must_use]
    pub const fn with_initial_column_capacity(mut self, rows: usize) -> Self {
        self.initial_column_capacity = rows;
        self
    }

    /// Sets the growth policy.
    #[must_use]
    pub const fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Checks that the configuration can be used with entity ids of type `E`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the entity capacity is zero
    /// or larger than the number of ids `E` can represent.
    pub fn validate<E: EntityIndex>(&self) -> StorageResult<()> {
        if self.entity_capacity == 0 {
            return Err(StorageError::InvalidConfig(
                "entity_capacity must be greater than zero".to_string(),
            ));
        }
        if self.entity_capacity > E::MAX_CAPACITY {
            return Err(StorageError::InvalidConfig(format!(
                "entity_capacity {} exceeds the {} ids representable by the entity type",
                self.entity_capacity,
                E::MAX_CAPACITY
            )));
        }
        Ok(())
    }
}
