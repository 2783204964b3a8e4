//! Balanced Fiber-Striped eXtendable array with Weights, over a 32-bit hash
//! space: a deterministic, reconfigurable map from hash key to brick.
//!
//! This crate is pure in-memory logic: it owns no I/O, no locking, and no
//! knowledge of what a "brick" actually is beyond [`Bucket`]. The daemon
//! that drives it is responsible for persistence, concurrency, and turning
//! opcodes into calls against a [`table::DistCtx`].
#![forbid(unsafe_code)]

mod bucket;
mod calibrate;
mod error;
mod fiber;
mod hash;
mod reconfig;
mod serde;
mod table;

pub use bucket::{Bucket, BucketVec};
pub use calibrate::{calibrate32, calibrate64};
pub use error::{Error, Result};
pub use hash::murmur3_x86_32;
pub use reconfig::{check_space, dec, inc, spl};
pub use table::{DistCtx, MAX_BUCKETS, MAX_SHIFT, MIN_NUMS_BITS};
