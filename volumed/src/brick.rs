//! A concrete, file-backed brick: the `fsx32::Bucket` the daemon drives the
//! distribution core with. Mirrors `driver-block::Disk` in spirit (a thin
//! wrapper the core's generic code never needs to know is backed by a real
//! file) but only needs to answer identity/capacity/fiber questions — actual
//! extent I/O happens through the `volume-migrate` collaborator traits, not
//! through `Bucket` itself.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fsx32::Bucket;

pub struct Brick {
    id: u64,
    path: PathBuf,
    capacity: u64,
    fiber: Vec<u32>,
    file: File,
}

impl Brick {
    pub fn open(id: u64, path: impl Into<PathBuf>, capacity: u64) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self {
            id,
            path,
            capacity,
            fiber: Vec::new(),
            file,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Bucket for Brick {
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
