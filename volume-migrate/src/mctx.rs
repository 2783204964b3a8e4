//! §4.8 — the migration context carried across the interpreter loop's
//! iterations. Grounded on `extent_migrate_context`.

/// What the interpreter decided to do with the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Every stripe of the current item already resolves to its target
    /// brick; nothing to do.
    Skip,
    /// Part of the item matches its target brick and part doesn't; cut the
    /// non-matching suffix into its own item before migrating it.
    Split,
    /// The whole current item needs to move to `new_brick`.
    Migrate,
}

/// Per-file migration state, threaded through one run of [`crate::state::migrate_extent`].
pub struct MigrateContext {
    pub act: Action,
    pub inode: u64,
    pub new_brick: u64,
    /// Page offset (exclusive) up to which migration should stop for this
    /// call; set by the caller to bound one invocation's work.
    pub stop_off: u64,
    /// Page offset (exclusive) migrated so far.
    pub done_off: u64,
    pub blocks_migrated: u64,
    /// Whether the most recent `Migrate` step moved the item in one shot
    /// (true) or only a granularity-capped tail chunk of it (false).
    pub migrate_whole_item: bool,
    pub stop: bool,
}

impl MigrateContext {
    pub fn new(inode: u64, new_brick: u64) -> Self {
        Self {
            act: Action::Skip,
            inode,
            new_brick,
            stop_off: u64::MAX,
            done_off: 0,
            blocks_migrated: 0,
            migrate_whole_item: false,
            stop: false,
        }
    }
}
