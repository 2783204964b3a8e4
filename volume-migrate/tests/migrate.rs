use std::cell::Cell;

use volume_migrate::{
    migrate_extent, Config, Error, JournalNode, MigrateContext, PageCache, Result, SpaceBudget,
    TreeCoord,
};

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

struct Item {
    start: u64,
    end: u64,
    brick: u64,
}

impl TreeCoord for Item {
    fn item_range(&self) -> (u64, u64) {
        (self.start, self.end)
    }
    fn brick(&self) -> u64 {
        self.brick
    }
    fn set_brick(&mut self, brick: u64) {
        self.brick = brick;
    }
    fn split_at(&mut self, at: u64) -> Result<()> {
        if at <= self.start || at >= self.end {
            return Err(Error::InvalidArgument("split point outside item range"));
        }
        self.start = at;
        Ok(())
    }
    fn try_merge_right(&mut self) -> bool {
        false
    }
    fn try_merge_left(&mut self) -> bool {
        false
    }
}

struct Journal {
    dirtied: Cell<u32>,
}

impl JournalNode for Journal {
    fn mark_dirty(&self) {
        self.dirtied.set(self.dirtied.get() + 1);
    }
}

struct Pages {
    pinned: Vec<(u64, u64)>,
}

impl PageCache for Pages {
    fn pin_range(&mut self, start: u64, end: u64) -> Result<()> {
        self.pinned.push((start, end));
        Ok(())
    }
    fn mark_write_prepared(&mut self, _start: u64, _end: u64) {}
    fn release_range(&mut self, _start: u64, _end: u64) {}
}

#[test]
fn item_spanning_two_target_bricks_splits_and_migrates_only_the_mismatched_tail() {
    let mut item = Item {
        start: 0,
        end: 10,
        brick: 1,
    };
    let mut pages = Pages { pinned: Vec::new() };
    let journal = Journal {
        dirtied: Cell::new(0),
    };
    let mut ctx = MigrateContext::new(7, 2);
    let cfg = Config {
        split_allowed: true,
        stripe_size_pages: 1,
        migration_granularity_pages: 1024,
    };

    // stripes [0,6) still belong on brick 1, [6,10) now route to brick 2
    let dst = |stripe: u64| if stripe < 6 { 1 } else { 2 };
    let mut budget = Budget(100);

    migrate_extent(
        &mut ctx,
        &cfg,
        &mut item,
        &mut pages,
        &journal,
        &dst,
        &mut budget,
    )
    .unwrap();

    assert_eq!(item.item_range(), (6, 10));
    assert_eq!(item.brick(), 2);
    assert_eq!(ctx.blocks_migrated, 4);
    assert_eq!(journal.dirtied.get(), 1);
    assert_eq!(budget.available(), 96, "the grabbed chunk should stay consumed, not leak back");
}

#[test]
fn reserve_failure_propagates_and_stops_the_walk() {
    let mut item = Item {
        start: 0,
        end: 4,
        brick: 1,
    };
    let mut pages = Pages { pinned: Vec::new() };
    let journal = Journal {
        dirtied: Cell::new(0),
    };
    let mut ctx = MigrateContext::new(1, 9);
    let cfg = Config::default();
    let mut budget = Budget(0);

    let err = migrate_extent(
        &mut ctx,
        &cfg,
        &mut item,
        &mut pages,
        &journal,
        &|_| 9,
        &mut budget,
    )
    .unwrap_err();

    assert!(matches!(err, Error::NoSpace));
    assert_eq!(item.brick(), 1, "no migration should have committed");
    assert_eq!(budget.available(), 0, "a failed grab must not touch the budget");
}

#[test]
fn already_migrated_item_resolves_as_a_no_op_second_time() {
    let mut item = Item {
        start: 0,
        end: 8,
        brick: 3,
    };
    let mut pages = Pages { pinned: Vec::new() };
    let journal = Journal {
        dirtied: Cell::new(0),
    };
    let cfg = Config::default();
    let dst = |_: u64| 3u64;

    let mut ctx = MigrateContext::new(5, 3);
    let mut budget = Budget(100);
    migrate_extent(
        &mut ctx,
        &cfg,
        &mut item,
        &mut pages,
        &journal,
        &dst,
        &mut budget,
    )
    .unwrap();

    assert_eq!(ctx.blocks_migrated, 0);
    assert_eq!(journal.dirtied.get(), 0);
    assert_eq!(item.brick(), 3);
    assert_eq!(budget.available(), 100, "a pure skip must never grab from the budget");
}
