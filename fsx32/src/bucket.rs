//! The bucket-vector interface (§6): an externally owned ordered sequence of
//! bricks, each with a capacity, an opaque 64-bit identifier, and a fiber
//! slot used as reconfiguration scaffolding.
//!
//! This plays the role `driver-block::Disk` plays for disk drivers in this
//! workspace: a thin trait the core algorithm drives, implemented by
//! whatever concrete brick type the caller has (a real block device, a file,
//! or — in tests — a bare capacity number).

/// A single brick as seen by the distribution core.
pub trait Bucket {
    /// Opaque identifier stored in table slots that map to this brick.
    fn id(&self) -> u64;

    /// Capacity used to calibrate this brick's share of table slots.
    fn capacity(&self) -> u64;

    /// Current fiber: the ascending list of table slot indices mapped to
    /// this brick. Empty outside of a reconfiguration.
    fn fiber(&self) -> &[u32];

    fn fiber_mut(&mut self) -> &mut Vec<u32>;
}

impl<T: Bucket + ?Sized> Bucket for Box<T> {
    fn id(&self) -> u64 {
        (**self).id()
    }
    fn capacity(&self) -> u64 {
        (**self).capacity()
    }
    fn fiber(&self) -> &[u32] {
        (**self).fiber()
    }
    fn fiber_mut(&mut self) -> &mut Vec<u32> {
        (**self).fiber_mut()
    }
}

/// The ordered collection of bricks currently making up the volume.
///
/// Position in this vector is the *index* (`0..numb`) used internally by the
/// distribution core; `Bucket::id` is the opaque identifier stored in table
/// slots. The two are related only by [`BucketVec::id2idx`] /
/// [`BucketVec::idx2id`], never by equality.
pub struct BucketVec<B> {
    buckets: Vec<B>,
}

impl<B: Bucket> BucketVec<B> {
    pub fn new(buckets: Vec<B>) -> Self {
        Self { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn cap_at(&self, idx: u32) -> u64 {
        self.buckets[idx as usize].capacity()
    }

    pub fn idx2id(&self, idx: u32) -> u64 {
        self.buckets[idx as usize].id()
    }

    pub fn id2idx(&self, id: u64) -> u32 {
        self.buckets
            .iter()
            .position(|b| b.id() == id)
            .expect("id2idx: brick id not present in bucket vector") as u32
    }

    pub fn fiber_at(&self, idx: u32) -> &[u32] {
        self.buckets[idx as usize].fiber()
    }

    pub fn fiber_at_mut(&mut self, idx: u32) -> &mut Vec<u32> {
        self.buckets[idx as usize].fiber_mut()
    }

    pub fn fiber_len_at(&self, idx: u32) -> u64 {
        self.buckets[idx as usize].fiber().len() as u64
    }

    pub fn insert(&mut self, pos: usize, bucket: B) {
        self.buckets.insert(pos, bucket);
    }

    pub fn remove(&mut self, pos: usize) -> B {
        self.buckets.remove(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> {
        self.buckets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut B> {
        self.buckets.iter_mut()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Bucket;

    /// The simplest possible bucket: an id, a capacity, and a fiber. Used by
    /// `fsx32`'s own tests and re-used by `volume-migrate`'s test harness.
    pub struct TestBucket {
        pub id: u64,
        pub capacity: u64,
        pub fiber: Vec<u32>,
    }

    impl TestBucket {
        pub fn new(id: u64, capacity: u64) -> Self {
            Self {
                id,
                capacity,
                fiber: Vec::new(),
            }
        }
    }

    impl Bucket for TestBucket {
        fn id(&self) -> u64 {
            self.id
        }
        fn capacity(&self) -> u64 {
            self.capacity
        }
        fn fiber(&self) -> &[u32] {
            &self.fiber
        }
        fn fiber_mut(&mut self) -> &mut Vec<u32> {
            &mut self.fiber
        }
    }
}
