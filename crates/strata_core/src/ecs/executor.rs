//! # Row Executor
//!
//! Runs a system over every used row of one archetype, in ascending row
//! order. Systems get the whole table so they can read and write any of its
//! columns; per-run state is captured by the closure or held in the system
//! struct. Systems cannot add or remove rows, so the row set is fixed for
//! the whole run.

use super::archetype::ArchetypeTable;
use super::entity::EntityIndex;
use super::mask::ComponentMask;

/// Per-row logic run by [`RowExecutor`].
pub trait RowSystem<M: ComponentMask, E: EntityIndex> {
    /// Processes `row` of `table`.
    fn run_row(&mut self, table: &mut ArchetypeTable<M, E>, row: usize);
}

impl<M, E, F> RowSystem<M, E> for F
where
    M: ComponentMask,
    E: EntityIndex,
    F: FnMut(&mut ArchetypeTable<M, E>, usize),
{
    #[inline]
    fn run_row(&mut self, table: &mut ArchetypeTable<M, E>, row: usize) {
        self(table, row);
    }
}

/// Drives a [`RowSystem`] across an archetype.
pub struct RowExecutor;

impl RowExecutor {
    /// Calls `system` for each row in `[0, used_rows)`.
    ///
    /// Returns the number of rows visited.
    pub fn run<M, E, S>(table: &mut ArchetypeTable<M, E>, system: &mut S) -> usize
    where
        M: ComponentMask,
        E: EntityIndex,
        S: RowSystem<M, E> + ?Sized,
    {
        let rows = table.used_rows();
        for row in 0..rows {
            system.run_row(table, row);
        }
        tracing::trace!(rows, "Ran row system");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::ecs::registry::ComponentRegistry;

    fn table(rows: u32) -> ArchetypeTable<u8, u32> {
        let mut registry: ComponentRegistry<u8> = ComponentRegistry::new();
        registry.register(4).unwrap();
        let mut table = ArchetypeTable::new(0b1, &registry, &StorageConfig::default()).unwrap();
        for entity in 0..rows {
            let row = table.add_row(entity).unwrap();
            table.write(0, row, entity).unwrap();
        }
        table
    }

    #[test]
    fn test_visits_rows_in_order() {
        let mut table = table(4);
        let mut seen = Vec::new();
        let mut collect = |table: &mut ArchetypeTable<u8, u32>, row: usize| {
            seen.push(table.read::<u32>(0, row).unwrap());
        };
        let visited = RowExecutor::run(&mut table, &mut collect);
        assert_eq!(visited, 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_table() {
        let mut table = table(0);
        let mut calls = 0;
        let mut count = |_: &mut ArchetypeTable<u8, u32>, _: usize| calls += 1;
        let visited = RowExecutor::run(&mut table, &mut count);
        assert_eq!(visited, 0);
        assert_eq!(calls, 0);
    }

    struct Scale(u32);

    impl RowSystem<u8, u32> for Scale {
        fn run_row(&mut self, table: &mut ArchetypeTable<u8, u32>, row: usize) {
            let value: u32 = table.read(0, row).unwrap();
            table.write(0, row, value * self.0).unwrap();
        }
    }

    #[test]
    fn test_named_system() {
        let mut table = table(3);
        RowExecutor::run(&mut table, &mut Scale(10));
        assert_eq!(table.read::<u32>(0, 2).unwrap(), 20);
    }

    #[test]
    fn test_in_place_writes_keep_rows() {
        let mut table = table(3);
        let mut stamp = |table: &mut ArchetypeTable<u8, u32>, row: usize| {
            table
                .row_bytes_mut(0, row)
                .unwrap()
                .copy_from_slice(&7u32.to_ne_bytes());
        };
        assert_eq!(RowExecutor::run(&mut table, &mut stamp), 3);
        assert_eq!(table.entities(), &[0, 1, 2]);
        assert_eq!(table.allocated_rows(), 8);
        for row in 0..3 {
            assert_eq!(table.read::<u32>(0, row).unwrap(), 7);
        }
    }
}
