//! §4.5 — the `dec` operator: remove a brick, or shrink one that stays a
//! member, and redistribute exactly the segments it can no longer hold.
//!
//! Grounded on `balance_dec`/`dec_fsx32`/`check_space`. The original starts
//! the self-shrink donor offset at `old_weight - new_weight` (the excess
//! count itself, used as a fiber index) rather than at `new_weight` (the
//! natural "keep the head, donate the tail" split); for a large single-step
//! shrink that can read past the end of the fiber. This implementation
//! always donates the tail, which stays in bounds for any shrink and is
//! exactly as valid a choice of which slots to redistribute, since nothing
//! about correctness depends on *which* slots move, only on how many. The
//! receiver-share computation also skips `target_pos` itself in the
//! self-shrink case (a donor never also receives from itself), instead of
//! computing `new - old` there, which would underflow.

use crate::bucket::{Bucket, BucketVec};
use crate::calibrate::{calibrate32, calibrate64};
use crate::error::{Error, Result};
use crate::fiber::{build_fibers, release_fibers};
use crate::table::DistCtx;

/// §4.4 step 1 / §4.5's own pre-flight: would the surviving bricks have
/// enough room for `occupied` bytes once calibrated across `caps`?
pub fn check_space(caps: &[u64], occupied: u64) -> Result<()> {
    let mut required = vec![0u64; caps.len()];
    calibrate64(occupied, caps, &mut required);
    for (&cap, &req) in caps.iter().zip(required.iter()) {
        if cap < req {
            return Err(Error::NoSpace);
        }
    }
    Ok(())
}

/// Run the `dec` operator.
///
/// `buckets` is the *old* bucket vector, still containing the brick at
/// `target_pos`. When `removing` is `true` that brick is detached and
/// returned; when `false` it stays in place with a reduced capacity and
/// `None` is returned.
pub fn dec<B: Bucket>(
    ctx: &mut DistCtx,
    buckets: &mut BucketVec<B>,
    target_pos: u32,
    removing: bool,
    space_occupied: u64,
) -> Result<Option<B>> {
    let old_numb = ctx.numb;
    if old_numb <= 1 {
        return Err(Error::InvalidArgument("cannot remove the last brick"));
    }
    if target_pos >= old_numb {
        return Err(Error::InvalidArgument("target_pos out of range"));
    }
    let new_numb = if removing { old_numb - 1 } else { old_numb };

    let mut old_weights = vec![0u32; old_numb as usize];
    build_fibers(&ctx.tab, buckets, &mut old_weights);

    let victim_fiber = buckets.fiber_at(target_pos).to_vec();

    let victim = if removing {
        Some(buckets.remove(target_pos as usize))
    } else {
        None
    };

    let surv_caps: Vec<u64> = buckets.iter().map(|b| b.capacity()).collect();
    check_space(&surv_caps, space_occupied)?;

    let nums = ctx.nums();
    let mut new_weights = vec![0u32; new_numb as usize];
    calibrate32(nums, &surv_caps, &mut new_weights);

    let old_weight_at_new = |i: u32| -> u32 {
        if removing && i >= target_pos {
            old_weights[(i + 1) as usize]
        } else {
            old_weights[i as usize]
        }
    };

    // A brick that only shrinks in place (`!removing`) is the donor at
    // `target_pos`, never a receiver: give it a fixed share of 0 instead of
    // computing `new - old`, which would underflow (it is exactly the one
    // index whose weight went down).
    let mut sho = vec![0u32; new_numb as usize];
    for i in 0..new_numb {
        if !removing && i == target_pos {
            continue;
        }
        sho[i as usize] = new_weights[i as usize] - old_weight_at_new(i);
    }

    let donor_start = if removing {
        0
    } else {
        new_weights[target_pos as usize] as usize
    };
    let mut off = donor_start;

    let mut tab = ctx.tab.clone();
    for i in 0..new_numb {
        let id = buckets.idx2id(i) as u32;
        for _ in 0..sho[i as usize] {
            let slot = victim_fiber[off] as usize;
            off += 1;
            tab[slot] = id;
        }
    }
    debug_assert!(off <= victim_fiber.len());

    release_fibers(buckets);
    ctx.tab = tab;
    ctx.weights = new_weights;
    ctx.numb = new_numb;
    Ok(victim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_support::TestBucket;

    #[test]
    fn removing_a_bucket_hands_its_whole_fiber_to_survivors() {
        let mut buckets = BucketVec::new(vec![
            TestBucket::new(1, 1),
            TestBucket::new(2, 1),
            TestBucket::new(3, 1),
        ]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();

        let removed = dec(&mut ctx, &mut buckets, 1, true, 0).unwrap();
        assert_eq!(removed.unwrap().id, 2);
        assert_eq!(ctx.numb(), 2);
        assert!(ctx.table().iter().all(|&id| id == 1 || id == 3));
        assert_eq!(ctx.table().len(), ctx.nums() as usize);
    }

    #[test]
    fn shrinking_a_bucket_keeps_it_in_the_table() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 3), TestBucket::new(2, 1)]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();

        buckets.iter_mut().next().unwrap().capacity = 1;
        dec(&mut ctx, &mut buckets, 0, false, 0).unwrap();

        assert_eq!(ctx.numb(), 2);
        let ones = ctx.table().iter().filter(|&&x| x == 1).count() as u32;
        let twos = ctx.table().iter().filter(|&&x| x == 2).count() as u32;
        assert_eq!(ones, twos);
    }

    #[test]
    fn rejects_removing_the_last_bucket() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1)]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();
        assert!(dec(&mut ctx, &mut buckets, 0, true, 0).is_err());
    }

    #[test]
    fn rejects_insufficient_space_on_survivors() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1), TestBucket::new(2, 1)]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();
        // total occupied exceeds what a single surviving 1-capacity brick
        // could ever be calibrated to hold.
        assert!(matches!(
            dec(&mut ctx, &mut buckets, 1, true, 10),
            Err(Error::NoSpace)
        ));
    }
}
