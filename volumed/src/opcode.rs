//! §4.9/§6 — the volume-op surface's opcode set and wire encoding.
//!
//! Requests arrive as a single `write()` to the control file: one tag byte
//! followed by a fixed-size argument block, with any variable-length path
//! argument taking up the rest of the buffer. This plays the role the
//! original's `ioctl` argument struct plays, flattened into the one buffer a
//! scheme `write` hands the daemon.

use syscall::error::{Error, Result, EINVAL, ENOTTY};

#[derive(Debug, Clone)]
pub enum Opcode {
    // off-line: no transaction, touches only the on-disk brick registry.
    RegisterBrick { path: String, capacity: u64 },
    UnregisterBrick { brick_id: u64 },
    VolumeHeader,
    BrickHeader { brick_id: u64 },

    // on-line, directory-level.
    PrintVolume,
    PrintBrick { pos: u32 },
    ResizeBrick { pos: u32, new_capacity: u64 },
    AddBrick { path: String, capacity: u64, pos: u32 },
    AddProxy { path: String, pos: u32 },
    RemoveBrick { pos: u32 },
    ScaleVolume { fact_bits: u32 },
    BalanceVolume,

    // on-line, file-level.
    MigrateFile { inode: u64, dst_idx: u32 },
    SetFileImmobile { inode: u64 },
    ClrFileImmobile { inode: u64 },
}

impl Opcode {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (&tag, rest) = buf.split_first().ok_or(Error::new(EINVAL))?;
        match tag {
            1 => {
                let (capacity, path) = take_u64_then_str(rest)?;
                Ok(Opcode::RegisterBrick { path, capacity })
            }
            2 => Ok(Opcode::UnregisterBrick {
                brick_id: take_u64(rest)?,
            }),
            3 => Ok(Opcode::VolumeHeader),
            4 => Ok(Opcode::BrickHeader {
                brick_id: take_u64(rest)?,
            }),
            5 => Ok(Opcode::PrintVolume),
            6 => Ok(Opcode::PrintBrick {
                pos: take_u32(rest)?,
            }),
            7 => {
                let (pos, new_capacity) = take_u32_then_u64(rest)?;
                Ok(Opcode::ResizeBrick { pos, new_capacity })
            }
            8 => {
                let (pos, capacity, path) = take_u32_u64_then_str(rest)?;
                Ok(Opcode::AddBrick { path, capacity, pos })
            }
            9 => {
                let (pos, path) = take_u32_then_str(rest)?;
                Ok(Opcode::AddProxy { path, pos })
            }
            10 => Ok(Opcode::RemoveBrick {
                pos: take_u32(rest)?,
            }),
            11 => Ok(Opcode::ScaleVolume {
                fact_bits: take_u32(rest)?,
            }),
            12 => Ok(Opcode::BalanceVolume),
            13 => {
                let (inode, dst_idx) = take_u64_then_u32(rest)?;
                Ok(Opcode::MigrateFile { inode, dst_idx })
            }
            14 => Ok(Opcode::SetFileImmobile {
                inode: take_u64(rest)?,
            }),
            15 => Ok(Opcode::ClrFileImmobile {
                inode: take_u64(rest)?,
            }),
            _ => Err(Error::new(ENOTTY)),
        }
    }
}

fn take_u64(buf: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = buf.get(0..8).ok_or(Error::new(EINVAL))?.try_into().unwrap();
    Ok(u64::from_le_bytes(arr))
}

fn take_u32(buf: &[u8]) -> Result<u32> {
    let arr: [u8; 4] = buf.get(0..4).ok_or(Error::new(EINVAL))?.try_into().unwrap();
    Ok(u32::from_le_bytes(arr))
}

fn take_u64_then_u32(buf: &[u8]) -> Result<(u64, u32)> {
    let a = take_u64(buf)?;
    let b = take_u32(buf.get(8..).ok_or(Error::new(EINVAL))?)?;
    Ok((a, b))
}

fn take_u32_then_u64(buf: &[u8]) -> Result<(u32, u64)> {
    let a = take_u32(buf)?;
    let b = take_u64(buf.get(4..).ok_or(Error::new(EINVAL))?)?;
    Ok((a, b))
}

fn take_u64_then_str(buf: &[u8]) -> Result<(u64, String)> {
    let n = take_u64(buf)?;
    let s = str_from(buf.get(8..).ok_or(Error::new(EINVAL))?)?;
    Ok((n, s))
}

fn take_u32_then_str(buf: &[u8]) -> Result<(u32, String)> {
    let n = take_u32(buf)?;
    let s = str_from(buf.get(4..).ok_or(Error::new(EINVAL))?)?;
    Ok((n, s))
}

fn take_u32_u64_then_str(buf: &[u8]) -> Result<(u32, u64, String)> {
    let pos = take_u32(buf)?;
    let cap = take_u64(buf.get(4..).ok_or(Error::new(EINVAL))?)?;
    let s = str_from(buf.get(12..).ok_or(Error::new(EINVAL))?)?;
    Ok((pos, cap, s))
}

fn str_from(buf: &[u8]) -> Result<String> {
    core::str::from_utf8(buf)
        .map(str::to_string)
        .map_err(|_| Error::new(EINVAL))
}
