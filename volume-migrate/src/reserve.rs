//! §5 — space reservation for an in-flight migration.
//!
//! Grounded on `reiser4_grab_space`/`reserve_migration_iter`/
//! `all_grabbed2free` in `extent_volume_ops.c`: before a chunk of an item is
//! rewritten onto its destination brick, the engine grabs enough space on
//! that brick to guarantee the rewrite can't fail partway through with
//! `ENOSPC`; whatever it didn't end up using is handed back once the chunk
//! commits.

use crate::error::{Error, Result};

/// Tracks blocks grabbed against one brick's free-space budget for the
/// duration of a migration step, and returns what's left unused.
pub trait SpaceBudget {
    /// Free blocks currently available to grab from.
    fn available(&self) -> u64;
    /// Grab `count` blocks, making them unavailable to any other reserver.
    fn grab(&mut self, count: u64);
    /// Hand back `count` previously grabbed blocks.
    fn release(&mut self, count: u64);
}

/// A single reservation, released automatically if the migration step that
/// requested it returns early without consuming it.
pub struct Reservation<'a, B: SpaceBudget> {
    budget: &'a mut B,
    grabbed: u64,
    used: u64,
}

impl<'a, B: SpaceBudget> Reservation<'a, B> {
    /// Grab `count` blocks from `budget`, failing with [`Error::NoSpace`] if
    /// there isn't enough free space.
    pub fn grab(budget: &'a mut B, count: u64) -> Result<Self> {
        if budget.available() < count {
            return Err(Error::NoSpace);
        }
        budget.grab(count);
        Ok(Self {
            budget,
            grabbed: count,
            used: 0,
        })
    }

    /// Record that `count` of the grabbed blocks were actually written.
    pub fn consume(&mut self, count: u64) {
        self.used = self.used.saturating_add(count).min(self.grabbed);
    }
}

impl<'a, B: SpaceBudget> Drop for Reservation<'a, B> {
    fn drop(&mut self) {
        let unused = self.grabbed - self.used;
        if unused > 0 {
            self.budget.release(unused);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Budget(u64);
    impl SpaceBudget for Budget {
        fn available(&self) -> u64 {
            self.0
        }
        fn grab(&mut self, count: u64) {
            self.0 -= count;
        }
        fn release(&mut self, count: u64) {
            self.0 += count;
        }
    }

    #[test]
    fn unused_blocks_return_to_the_budget_on_drop() {
        let mut budget = Budget(100);
        {
            let mut res = Reservation::grab(&mut budget, 10).unwrap();
            res.consume(4);
        }
        assert_eq!(budget.available(), 94);
    }

    #[test]
    fn fully_consumed_reservation_returns_nothing() {
        let mut budget = Budget(100);
        {
            let mut res = Reservation::grab(&mut budget, 10).unwrap();
            res.consume(10);
        }
        assert_eq!(budget.available(), 90);
    }

    #[test]
    fn grabbing_more_than_available_fails_without_touching_the_budget() {
        let mut budget = Budget(5);
        assert!(matches!(Reservation::grab(&mut budget, 10), Err(Error::NoSpace)));
        assert_eq!(budget.available(), 5);
    }
}
