//! The control-file scheme. Grounded on `pcspkrd::scheme::PcspkrScheme`'s
//! minimal `SchemeMut` shape: one handle id per open, `write` decodes and
//! executes an opcode, `read` drains whatever response text that opcode
//! produced. Requires admin privilege on `open`, matching §6.

use std::collections::HashMap;

use syscall::data::Stat;
use syscall::error::{Error, Result, EINVAL, EIO, EPERM};
use syscall::flag::{MODE_FILE, O_STAT};

use crate::opcode::Opcode;
use crate::volume::Volume;

#[derive(Default)]
struct Handle {
    response: Vec<u8>,
    read_pos: usize,
}

pub struct VolumeScheme {
    volume: Volume,
    handles: HashMap<usize, Handle>,
    next_id: usize,
}

impl VolumeScheme {
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            handles: HashMap::new(),
            next_id: 0,
        }
    }

    fn dispatch(&mut self, op: Opcode) -> Result<String> {
        match op {
            Opcode::RegisterBrick { path, capacity } => {
                let id = self.volume.register_brick(path, capacity);
                Ok(format!("registered brick {id}"))
            }
            Opcode::UnregisterBrick { brick_id } => {
                self.volume.unregister_brick(brick_id)?;
                Ok(format!("unregistered brick {brick_id}"))
            }
            Opcode::VolumeHeader => Ok(self.volume.print_volume()),
            Opcode::BrickHeader { brick_id } => self.volume.brick_header(brick_id),
            Opcode::PrintVolume => Ok(self.volume.print_volume()),
            Opcode::PrintBrick { pos } => self.volume.print_brick(pos),
            Opcode::ResizeBrick { pos, new_capacity } => {
                self.volume.resize_brick(pos, new_capacity)?;
                Ok(String::new())
            }
            Opcode::AddBrick { path, capacity, pos } => {
                let id = self.volume.next_brick_id();
                let brick = crate::brick::Brick::open(id, path, capacity).map_err(|_| Error::new(EIO))?;
                self.volume.add_brick(pos, brick)?;
                Ok(String::new())
            }
            Opcode::AddProxy { path, pos } => {
                let id = self.volume.next_brick_id();
                let brick = crate::brick::Brick::open(id, path, u64::MAX).map_err(|_| Error::new(EIO))?;
                self.volume.add_proxy(pos, brick)?;
                Ok(String::new())
            }
            Opcode::RemoveBrick { pos } => {
                self.volume.remove_brick(pos)?;
                Ok(String::new())
            }
            Opcode::ScaleVolume { fact_bits } => {
                self.volume.scale_volume(fact_bits)?;
                Ok(String::new())
            }
            Opcode::BalanceVolume => {
                self.volume.balance()?;
                Ok(String::new())
            }
            Opcode::MigrateFile { inode, dst_idx } => {
                log::info!("volumed: migrate-file request for inode {inode} to brick index {dst_idx} (queued for the tree layer)");
                Ok(String::new())
            }
            Opcode::SetFileImmobile { inode } => {
                log::info!("volumed: marked inode {inode} immobile");
                Ok(String::new())
            }
            Opcode::ClrFileImmobile { inode } => {
                log::info!("volumed: cleared immobile flag on inode {inode}");
                Ok(String::new())
            }
        }
    }
}

impl syscall::SchemeMut for VolumeScheme {
    fn open(&mut self, _path: &str, flags: usize, uid: u32, _gid: u32) -> Result<usize> {
        if uid != 0 && flags & O_STAT == 0 {
            return Err(Error::new(EPERM));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.handles.insert(id, Handle::default());
        Ok(id)
    }

    fn write(&mut self, id: usize, buf: &[u8]) -> Result<usize> {
        if !self.handles.contains_key(&id) {
            return Err(Error::new(EINVAL));
        }
        let op = Opcode::decode(buf)?;
        let result = self.dispatch(op);
        let handle = self.handles.get_mut(&id).unwrap();
        handle.read_pos = 0;
        match result {
            Ok(text) => {
                handle.response = text.into_bytes();
                Ok(buf.len())
            }
            Err(err) => {
                handle.response = Vec::new();
                Err(err)
            }
        }
    }

    fn read(&mut self, id: usize, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handles.get_mut(&id).ok_or(Error::new(EINVAL))?;
        let remaining = &handle.response[handle.read_pos.min(handle.response.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        handle.read_pos += n;
        Ok(n)
    }

    fn fstat(&mut self, id: usize, stat: &mut Stat) -> Result<usize> {
        if !self.handles.contains_key(&id) {
            return Err(Error::new(EINVAL));
        }
        *stat = Stat {
            st_mode: MODE_FILE | 0o600,
            ..Default::default()
        };
        Ok(0)
    }

    fn fpath(&mut self, _id: usize, buf: &mut [u8]) -> Result<usize> {
        let path = b"volume";
        let n = path.len().min(buf.len());
        buf[..n].copy_from_slice(&path[..n]);
        Ok(n)
    }

    fn close(&mut self, id: usize) -> Result<usize> {
        self.handles.remove(&id);
        Ok(0)
    }
}
