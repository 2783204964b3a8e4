//! §4.4 — the `inc` operator: add a brick, or grow one that is already a
//! member, and steal the exact number of segments needed from every other
//! fiber to pay for the larger share.
//!
//! Grounded on `balance_inc`/`inc_fsx32`. Each reconfiguration operator here
//! builds and releases its own fiber scratch space instead of depending on
//! the caller having pre-built it, which removes a cross-call invariant
//! present in the original without changing any outcome: fibers are always
//! a pure function of the current table and bucket set.

use crate::bucket::{Bucket, BucketVec};
use crate::calibrate::calibrate32;
use crate::error::{Error, Result};
use crate::fiber::{build_fibers, release_fibers};
use crate::table::{DistCtx, MAX_BUCKETS};

/// Run the `inc` operator.
///
/// When `inserting` is `true`, a brand new brick has already been inserted
/// into `buckets` at `target_pos` (the caller owns that insertion, mirroring
/// the original's "`vec` already updated" contract) and this call folds it
/// into the table. When `false`, the existing brick at `target_pos` has
/// simply grown (a capacity increase) and no insertion takes place.
pub fn inc<B: Bucket>(
    ctx: &mut DistCtx,
    buckets: &mut BucketVec<B>,
    target_pos: u32,
    inserting: bool,
) -> Result<()> {
    let old_numb = ctx.numb;
    let new_numb = if inserting {
        if old_numb == MAX_BUCKETS {
            return Err(Error::InvalidArgument("bucket vector is at capacity"));
        }
        old_numb + 1
    } else {
        old_numb
    };

    if buckets.len() as u32 != new_numb {
        return Err(Error::InvalidState(
            "bucket vector size does not match the requested reconfiguration",
        ));
    }
    if target_pos >= new_numb {
        return Err(Error::InvalidArgument("target_pos out of range"));
    }

    let nums = ctx.nums();
    if new_numb > nums {
        return Err(Error::InvalidArgument(
            "current table resolution cannot address this many bricks",
        ));
    }

    let caps: Vec<u64> = buckets.iter().map(|b| b.capacity()).collect();
    let mut new_weights = vec![0u32; new_numb as usize];
    calibrate32(nums, &caps, &mut new_weights);

    let mut old_weights = vec![0u32; new_numb as usize];
    build_fibers(&ctx.tab, buckets, &mut old_weights);

    let mut exc = vec![0u32; new_numb as usize];
    for i in 0..target_pos {
        exc[i as usize] = old_weights[i as usize] - new_weights[i as usize];
    }
    for i in (target_pos + 1)..new_numb {
        // old_weights is keyed by id via build_fibers over the post-insertion
        // buckets, so it's already new-indexed; no position-shift correction.
        exc[i as usize] = old_weights[i as usize] - new_weights[i as usize];
    }
    debug_assert_eq!(exc[target_pos as usize], 0);

    let mut tab = ctx.tab.clone();
    let target_id = buckets.idx2id(target_pos) as u32;

    // Steal segments of every fiber to the left of target_pos.
    for i in 0..target_pos {
        let fiber = buckets.fiber_at(i).to_vec();
        let base = new_weights[i as usize] as usize;
        for j in 0..exc[i as usize] as usize {
            let slot = fiber[base + j] as usize;
            debug_assert_eq!(tab[slot], buckets.idx2id(i) as u32);
            tab[slot] = target_id;
        }
    }
    // Steal segments of every fiber to the right of target_pos.
    for i in (target_pos + 1)..new_numb {
        let fiber = buckets.fiber_at(i).to_vec();
        let base = new_weights[i as usize] as usize;
        let owner_id = buckets.idx2id(i) as u32;
        for j in 0..exc[i as usize] as usize {
            let slot = fiber[base + j] as usize;
            debug_assert_eq!(tab[slot], owner_id);
            tab[slot] = target_id;
        }
    }

    release_fibers(buckets);
    ctx.tab = tab;
    ctx.weights = new_weights;
    ctx.numb = new_numb;
    Ok(())
}
