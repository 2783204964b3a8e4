//! §4.8 — the `{Skip, Split, Migrate}` interpreter.
//!
//! Grounded on `what_to_do`/`what_to_do_nosplit` (the decision procedures),
//! `migrate_blocks`/`do_migrate_extent` (executing a `Migrate` step,
//! capped at [`Config::migration_granularity_pages`] pages per call so a
//! single huge item doesn't block the caller for the whole transfer), and
//! `reiser4_migrate_extent` (the top-level `while (!mctx.stop)` loop).

use crate::config::Config;
use crate::error::Result;
use crate::mctx::{Action, MigrateContext};
use crate::reserve::{Reservation, SpaceBudget};
use crate::traits::{JournalNode, PageCache, TreeCoord};

/// §4.8 decision procedure: does the current item need to skip, split, or
/// migrate, given a function mapping a stripe index to its target brick?
///
/// When splitting is allowed, walks stripes from the item's rightmost
/// toward its leftmost looking for the boundary where the target brick
/// stops matching the item's current brick; the matching suffix.
pub fn what_to_do<C: TreeCoord>(cfg: &Config, coord: &C, dst: &dyn Fn(u64) -> u64) -> (Action, u64) {
    let (start, end) = coord.item_range();
    let current = coord.brick();
    let stripe = cfg.stripe_size_pages.max(1);

    if !cfg.split_allowed {
        return what_to_do_nosplit(start, end, current, dst, stripe);
    }

    let mut boundary = end;
    let mut s = ((end - 1) / stripe) * stripe;
    loop {
        if dst(s / stripe) == current {
            break;
        }
        boundary = s;
        if s <= start {
            break;
        }
        s -= stripe;
    }

    if boundary == end {
        (Action::Skip, 0)
    } else if boundary <= start {
        (Action::Migrate, start)
    } else {
        (Action::Split, boundary)
    }
}

fn what_to_do_nosplit(
    start: u64,
    end: u64,
    current: u64,
    dst: &dyn Fn(u64) -> u64,
    stripe: u64,
) -> (Action, u64) {
    let mut s = start;
    while s < end {
        if dst(s / stripe) != current {
            return (Action::Migrate, start);
        }
        s += stripe;
    }
    (Action::Skip, 0)
}

/// Cut the current item in two at `split_off`, without moving any data.
/// Leaves the cursor on the right half, matching `what_to_do`'s convention
/// that the boundary it returns starts the part that still needs to move.
pub fn split_item<C: TreeCoord>(coord: &mut C, split_off: u64) -> Result<()> {
    coord.split_at(split_off)
}

/// Execute one `Migrate` step: grab a space reservation for the chunk, pin
/// and mark the pages being rewritten, reassign the item (or a
/// granularity-capped tail chunk of it) to `ctx.new_brick`, then try to fold
/// it back into a same-brick neighbor. The reservation is consumed only once
/// the chunk has actually committed; any early return (a failed pin, a
/// failed split) drops it first, handing the whole grant back to `budget`.
pub fn migrate_item<C, P, J, B>(
    ctx: &mut MigrateContext,
    cfg: &Config,
    coord: &mut C,
    pages: &mut P,
    journal: &J,
    budget: &mut B,
) -> Result<u64>
where
    C: TreeCoord,
    P: PageCache,
    J: JournalNode,
    B: SpaceBudget,
{
    let (start, end) = coord.item_range();
    let old_brick = coord.brick();
    let cap = cfg.migration_granularity_pages.max(1);
    let chunk_end = (start + cap).min(end);
    let chunk_len = chunk_end - start;

    let mut reservation = Reservation::grab(budget, chunk_len)?;
    pages.pin_range(start, chunk_end)?;
    pages.mark_write_prepared(start, chunk_end);

    coord.set_brick(ctx.new_brick);

    if chunk_end == end {
        coord.try_merge_left();
        coord.try_merge_right();
        ctx.migrate_whole_item = true;
    } else {
        // Split off the still-unmigrated remainder and put its brick back;
        // the part up to `chunk_end` stays tagged with `new_brick` as the
        // now-separate item the split left behind.
        coord.split_at(chunk_end)?;
        coord.set_brick(old_brick);
        ctx.migrate_whole_item = false;
    }

    reservation.consume(chunk_len);
    pages.release_range(start, chunk_end);
    journal.mark_dirty();

    ctx.blocks_migrated += chunk_len;
    ctx.done_off = chunk_end;
    Ok(chunk_len)
}

/// §4.8's top-level interpreter: loop `what_to_do` → act → `what_to_do`
/// until the item is fully resolved (idempotent: a second call against an
/// already-migrated item immediately resolves to `Skip`).
pub fn migrate_extent<C, P, J, B>(
    ctx: &mut MigrateContext,
    cfg: &Config,
    coord: &mut C,
    pages: &mut P,
    journal: &J,
    dst: &dyn Fn(u64) -> u64,
    budget: &mut B,
) -> Result<()>
where
    C: TreeCoord,
    P: PageCache,
    J: JournalNode,
    B: SpaceBudget,
{
    ctx.stop = false;
    while !ctx.stop {
        let (action, split_off) = what_to_do(cfg, coord, dst);
        ctx.act = action;
        match action {
            Action::Skip => {
                coord.try_merge_right();
                ctx.stop = true;
            }
            Action::Split => {
                split_item(coord, split_off)?;
            }
            Action::Migrate => {
                migrate_item(ctx, cfg, coord, pages, journal, budget)?;
                let (_, end) = coord.item_range();
                if ctx.migrate_whole_item || ctx.done_off >= end || ctx.done_off >= ctx.stop_off {
                    ctx.stop = true;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::fakes::{FakeCoord, FakeJournalNode, FakePageCache};

    fn cfg() -> Config {
        Config {
            split_allowed: true,
            stripe_size_pages: 1,
            migration_granularity_pages: 1024,
        }
    }

    struct UnlimitedBudget;
    impl SpaceBudget for UnlimitedBudget {
        fn available(&self) -> u64 {
            u64::MAX
        }
        fn grab(&mut self, _count: u64) {}
        fn release(&mut self, _count: u64) {}
    }

    #[test]
    fn skip_when_every_stripe_already_matches() {
        let coord = FakeCoord::new(0, 4, 7);
        let (action, _) = what_to_do(&cfg(), &coord, &|_| 7);
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn migrate_whole_item_when_no_stripe_matches() {
        let coord = FakeCoord::new(0, 4, 7);
        let (action, off) = what_to_do(&cfg(), &coord, &|_| 9);
        assert_eq!(action, Action::Migrate);
        assert_eq!(off, 0);
    }

    #[test]
    fn split_when_only_a_suffix_needs_to_move() {
        let coord = FakeCoord::new(0, 10, 7);
        let (action, off) = what_to_do(&cfg(), &coord, &|s| if s >= 6 { 9 } else { 7 });
        assert_eq!(action, Action::Split);
        assert_eq!(off, 6);
    }

    #[test]
    fn end_to_end_migration_converges_and_is_idempotent() {
        let mut coord = FakeCoord::new(0, 10, 1);
        let mut pages = FakePageCache::new();
        let journal = FakeJournalNode::new();
        let mut ctx = MigrateContext::new(42, 2);

        migrate_extent(
            &mut ctx,
            &cfg(),
            &mut coord,
            &mut pages,
            &journal,
            &|_| 2,
            &mut UnlimitedBudget,
        )
        .unwrap();

        assert_eq!(coord.brick(), 2);
        assert_eq!(ctx.blocks_migrated, 10);
        assert_eq!(journal.dirtied.get(), 1);

        // second run against the already-migrated item is a pure skip
        let mut ctx2 = MigrateContext::new(42, 2);
        migrate_extent(
            &mut ctx2,
            &cfg(),
            &mut coord,
            &mut pages,
            &journal,
            &|_| 2,
            &mut UnlimitedBudget,
        )
        .unwrap();
        assert_eq!(ctx2.blocks_migrated, 0);
        assert_eq!(ctx2.act, Action::Skip);
    }

    #[test]
    fn granularity_cap_splits_large_migrations_into_chunks() {
        let mut coord = FakeCoord::new(0, 5, 1);
        let mut pages = FakePageCache::new();
        let journal = FakeJournalNode::new();
        let mut ctx = MigrateContext::new(1, 2);
        let small_cfg = Config {
            split_allowed: true,
            stripe_size_pages: 1,
            migration_granularity_pages: 2,
        };

        migrate_extent(
            &mut ctx,
            &small_cfg,
            &mut coord,
            &mut pages,
            &journal,
            &|_| 2,
            &mut UnlimitedBudget,
        )
        .unwrap();

        assert_eq!(ctx.blocks_migrated, 5);
        assert!(pages.pinned.len() >= 2);
    }
}
