//! §4.6 — the `spl` operator: stretch every table slot into `factor`
//! contiguous slots (raising `nums_bits` by `fact_bits`), then relocate just
//! enough of the now-oversized bricks' stretched segments to reach the
//! freshly calibrated weights at the new resolution.
//!
//! Grounded on `balance_spl`/`spl_fsx32`. `calibrate`'s remainder rule hands
//! the +1 fixup to the first `nums % numb` bricks (§4.1); stretching
//! multiplies every brick's old weight by `factor` uniformly, so those same
//! bricks are the only ones that end up oversized relative to the new
//! calibration and the only ones that need to give segments away.

use crate::bucket::{Bucket, BucketVec};
use crate::calibrate::calibrate32;
use crate::error::{Error, Result};
use crate::fiber::{build_fibers, release_fibers};
use crate::table::{DistCtx, MAX_SHIFT};

pub fn spl<B: Bucket>(ctx: &mut DistCtx, buckets: &mut BucketVec<B>, fact_bits: u32) -> Result<()> {
    if ctx.nums_bits + fact_bits > MAX_SHIFT {
        return Err(Error::InvalidArgument(
            "stretch factor would exceed the maximum table resolution",
        ));
    }
    let numb = ctx.numb;
    let nums = ctx.nums();
    let factor = 1u32 << fact_bits;
    let new_nums_bits = ctx.nums_bits + fact_bits;
    let new_nums = 1u32 << new_nums_bits;

    let caps: Vec<u64> = buckets.iter().map(|b| b.capacity()).collect();
    let mut new_weights = vec![0u32; numb as usize];
    calibrate32(new_nums, &caps, &mut new_weights);

    let num_exc = (nums % numb) as usize;
    let num_sho = numb as usize - num_exc;

    let mut tab = Vec::with_capacity(new_nums as usize);
    for &id in ctx.tab.iter() {
        for _ in 0..factor {
            tab.push(id);
        }
    }

    if num_exc == 0 {
        // numb divides nums evenly: stretching alone already matches the
        // new calibration, nothing to relocate.
        ctx.tab = tab;
        ctx.weights = new_weights;
        ctx.nums_bits = new_nums_bits;
        return Ok(());
    }

    let stretched_old_weights: Vec<u32> = ctx.weights.iter().map(|&w| w * factor).collect();

    let mut exc = vec![0u32; num_exc];
    for i in 0..num_exc {
        exc[i] = stretched_old_weights[i] - new_weights[i];
    }
    let mut sho = vec![0u32; num_sho];
    for i in 0..num_sho {
        sho[i] = new_weights[num_exc + i] - stretched_old_weights[num_exc + i];
    }

    let mut fiber_weights = vec![0u32; numb as usize];
    build_fibers(&tab, buckets, &mut fiber_weights);
    debug_assert_eq!(fiber_weights, stretched_old_weights);

    let mut reloc = Vec::new();
    for i in 0..num_exc {
        let fiber = buckets.fiber_at(i as u32).to_vec();
        let base = new_weights[i] as usize;
        for j in 0..exc[i] as usize {
            reloc.push(fiber[base + j]);
        }
    }

    let mut k = 0usize;
    for i in 0..num_sho {
        let id = buckets.idx2id((num_exc + i) as u32) as u32;
        for _ in 0..sho[i] {
            let slot = reloc[k] as usize;
            k += 1;
            tab[slot] = id;
        }
    }
    debug_assert_eq!(k, reloc.len());

    release_fibers(buckets);
    ctx.tab = tab;
    ctx.weights = new_weights;
    ctx.nums_bits = new_nums_bits;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_support::TestBucket;

    #[test]
    fn evenly_divisible_split_needs_no_relocation() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1), TestBucket::new(2, 1)]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();
        let before = ctx.table().to_vec();

        spl(&mut ctx, &mut buckets, 2).unwrap();

        assert_eq!(ctx.nums_bits(), 12);
        assert_eq!(ctx.table().len(), 1 << 12);
        for (slot, &id) in ctx.table().iter().enumerate() {
            assert_eq!(id, before[slot / 4]);
        }
    }

    #[test]
    fn uneven_split_still_balances_to_the_new_calibration() {
        let mut buckets = BucketVec::new(vec![
            TestBucket::new(1, 1),
            TestBucket::new(2, 1),
            TestBucket::new(3, 1),
        ]);
        let mut ctx = DistCtx::init(&mut buckets, 10).unwrap();

        spl(&mut ctx, &mut buckets, 1).unwrap();

        let nums = ctx.nums();
        let count = |id: u32| ctx.table().iter().filter(|&&x| x == id).count() as u32;
        assert_eq!(count(1) + count(2) + count(3), nums);
        assert_eq!(ctx.weights(), &[count(1), count(2), count(3)][..]);
    }
}
