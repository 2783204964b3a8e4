//! §4.3 — the system table itself: `DistCtx` owns the table, the per-brick
//! weight vector, and the resolution (`nums_bits`) it was built at.

use crate::bucket::{Bucket, BucketVec};
use crate::calibrate::calibrate32;
use crate::error::{Error, Result};
use crate::fiber::build_fibers;
use crate::hash::murmur3_x86_32;

/// `nums_bits` may not reach this; `1 << MAX_SHIFT` would overflow a `u32`
/// table slot count.
pub const MAX_SHIFT: u32 = 31;
pub const MAX_BUCKETS: u32 = 1 << MAX_SHIFT;
pub const MIN_NUMS_BITS: u32 = 10;

/// A balanced, fiber-striped distribution table over a 32-bit hash space.
pub struct DistCtx {
    pub(crate) numb: u32,
    pub(crate) nums_bits: u32,
    pub(crate) weights: Vec<u32>,
    pub(crate) tab: Vec<u32>,
}

impl DistCtx {
    /// Build a fresh table for `buckets`, the weights proportional to their
    /// capacities, at resolution `nums_bits`.
    ///
    /// The original special-cases `numb == 1` (there is nothing to
    /// calibrate a single brick's share against). Laying the whole table out
    /// in contiguous per-brick blocks handles that case for free: with one
    /// brick, its block is the entire table.
    pub fn init<B: Bucket>(buckets: &mut BucketVec<B>, nums_bits: u32) -> Result<Self> {
        let numb = buckets.len() as u32;
        if numb == 0 {
            return Err(Error::InvalidArgument("no bricks to distribute over"));
        }
        if numb > MAX_BUCKETS {
            return Err(Error::InvalidArgument("too many bricks"));
        }
        if nums_bits >= MAX_SHIFT {
            return Err(Error::InvalidArgument("nums_bits out of range"));
        }
        let nums = 1u32 << nums_bits;
        if numb >= nums {
            return Err(Error::InvalidArgument(
                "table resolution too low for this many bricks",
            ));
        }

        let caps: Vec<u64> = buckets.iter().map(|b| b.capacity()).collect();
        let mut weights = vec![0u32; numb as usize];
        calibrate32(nums, &caps, &mut weights);

        let mut tab = vec![0u32; nums as usize];
        let mut k = 0usize;
        for (idx, &w) in weights.iter().enumerate() {
            let id = buckets.idx2id(idx as u32) as u32;
            for _ in 0..w {
                tab[k] = id;
                k += 1;
            }
        }
        debug_assert_eq!(k, nums as usize);

        build_fibers(&tab, buckets, &mut weights);
        crate::fiber::release_fibers(buckets);

        Ok(Self {
            numb,
            nums_bits,
            weights,
            tab,
        })
    }

    pub fn numb(&self) -> u32 {
        self.numb
    }

    pub fn nums_bits(&self) -> u32 {
        self.nums_bits
    }

    pub fn nums(&self) -> u32 {
        1u32 << self.nums_bits
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    pub fn table(&self) -> &[u32] {
        &self.tab
    }

    /// §4.3 — hash `key`, take the top `nums_bits` bits as the table slot,
    /// and return the id of the brick owning that slot.
    pub fn lookup(&self, key: &[u8], seed: u32) -> u64 {
        let hash = murmur3_x86_32(key, seed);
        let slot = hash >> (32 - self.nums_bits);
        self.tab[slot as usize] as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_support::TestBucket;

    #[test]
    fn single_bucket_owns_the_whole_table() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(7, 1)]);
        let ctx = DistCtx::init(&mut buckets, MIN_NUMS_BITS).unwrap();
        assert!(ctx.table().iter().all(|&id| id == 7));
    }

    #[test]
    fn table_is_partitioned_by_weight() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1), TestBucket::new(2, 3)]);
        let ctx = DistCtx::init(&mut buckets, MIN_NUMS_BITS).unwrap();
        let nums = ctx.nums();
        let ones = ctx.table().iter().filter(|&&id| id == 1).count() as u32;
        let twos = ctx.table().iter().filter(|&&id| id == 2).count() as u32;
        assert_eq!(ones + twos, nums);
        assert_eq!(twos, ones * 3);
    }

    #[test]
    fn lookup_returns_an_id_present_in_the_bucket_vector() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1), TestBucket::new(2, 1)]);
        let ctx = DistCtx::init(&mut buckets, MIN_NUMS_BITS).unwrap();
        let id = ctx.lookup(b"some/file/path", 0);
        assert!(id == 1 || id == 2);
    }

    #[test]
    fn rejects_too_few_table_slots() {
        let mut buckets = BucketVec::new(vec![TestBucket::new(1, 1), TestBucket::new(2, 1)]);
        assert!(DistCtx::init(&mut buckets, 0).is_err());
    }
}
