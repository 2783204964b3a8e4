//! Extent migration engine: decides, for each item of a file, whether it
//! needs to move to a new brick after a distribution table reconfiguration,
//! and drives that move through caller-supplied tree/page-cache/journal
//! collaborators.

mod config;
mod error;
mod mctx;
mod reserve;
mod state;
mod traits;

pub use config::{Config, DEFAULT_MIGRATION_GRANULARITY_PAGES};
pub use error::{Error, Result};
pub use mctx::{Action, MigrateContext};
pub use reserve::{Reservation, SpaceBudget};
pub use state::{migrate_extent, migrate_item, split_item, what_to_do};
pub use traits::{JournalNode, PageCache, TreeCoord};
