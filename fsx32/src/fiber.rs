//! §4.2 — fiber construction: rebuilding, for each brick, the ascending list
//! of table slots currently mapped to it.
//!
//! Fibers are transient reconfiguration scaffolding (§3, "Fiber"): built at
//! the start of a reconfiguration operator, consulted while the table is
//! rewritten, and released before the operator returns.

use std::collections::HashMap;

use crate::bucket::{Bucket, BucketVec};

/// Zero `weights`, clear every brick's fiber, then repopulate both from
/// `tab` in ascending slot order.
pub fn build_fibers<B: Bucket>(tab: &[u32], buckets: &mut BucketVec<B>, weights: &mut [u32]) {
    debug_assert_eq!(weights.len(), buckets.len());

    let id_to_idx: HashMap<u64, u32> = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id(), i as u32))
        .collect();

    for w in weights.iter_mut() {
        *w = 0;
    }
    for b in buckets.iter_mut() {
        b.fiber_mut().clear();
    }

    for (slot, &id) in tab.iter().enumerate() {
        let idx = *id_to_idx
            .get(&(id as u64))
            .expect("table entry references a brick id not present in the bucket vector");
        buckets.fiber_at_mut(idx).push(slot as u32);
        weights[idx as usize] += 1;
    }

    for (idx, w) in weights.iter().enumerate() {
        debug_assert_eq!(*w as usize, buckets.fiber_at(idx as u32).len());
    }
}

/// Free every brick's fiber. Transient scaffolding only — never leave stale
/// fibers lying around between reconfigurations.
pub fn release_fibers<B: Bucket>(buckets: &mut BucketVec<B>) {
    for b in buckets.iter_mut() {
        let fiber = b.fiber_mut();
        fiber.clear();
        fiber.shrink_to_fit();
    }
}

pub fn replace_fibers<B: Bucket>(tab: &[u32], buckets: &mut BucketVec<B>, weights: &mut [u32]) {
    release_fibers(buckets);
    build_fibers(tab, buckets, weights);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_support::TestBucket;

    #[test]
    fn fibers_partition_the_table_in_ascending_order() {
        let tab: Vec<u32> = vec![10, 20, 10, 10, 20];
        let mut buckets = BucketVec::new(vec![TestBucket::new(10, 1), TestBucket::new(20, 1)]);
        let mut weights = [0u32; 2];

        build_fibers(&tab, &mut buckets, &mut weights);

        assert_eq!(weights, [3, 2]);
        assert_eq!(buckets.fiber_at(0), &[0, 2, 3]);
        assert_eq!(buckets.fiber_at(1), &[1, 4]);
    }

    #[test]
    fn release_clears_every_fiber() {
        let tab: Vec<u32> = vec![10, 20];
        let mut buckets = BucketVec::new(vec![TestBucket::new(10, 1), TestBucket::new(20, 1)]);
        let mut weights = [0u32; 2];
        build_fibers(&tab, &mut buckets, &mut weights);

        release_fibers(&mut buckets);

        assert!(buckets.fiber_at(0).is_empty());
        assert!(buckets.fiber_at(1).is_empty());
    }
}
