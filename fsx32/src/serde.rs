//! §4.7 — on-disk (de)serialization of the system table. The wire format is
//! a flat stream of little-endian `u32` slots, grounded on
//! `pack_fsx32`/`unpack_fsx32`/`dump_fsx32`.

use crate::error::{Error, Result};
use crate::table::DistCtx;

impl DistCtx {
    /// Serialize `count` table slots starting at `src_off` into `to`, as
    /// little-endian `u32`s.
    pub fn pack(&self, to: &mut Vec<u8>, src_off: usize, count: usize) -> Result<()> {
        let end = src_off
            .checked_add(count)
            .filter(|&e| e <= self.tab.len())
            .ok_or(Error::InvalidArgument("pack range out of bounds"))?;
        to.reserve(count * 4);
        for &slot in &self.tab[src_off..end] {
            to.extend_from_slice(&slot.to_le_bytes());
        }
        Ok(())
    }

    /// Overwrite `count` table slots starting at `dst_off` by decoding
    /// little-endian `u32`s from `from`.
    pub fn unpack(&mut self, from: &[u8], dst_off: usize, count: usize) -> Result<()> {
        if from.len() < count * 4 {
            return Err(Error::InvalidArgument("unpack source too short"));
        }
        let end = dst_off
            .checked_add(count)
            .filter(|&e| e <= self.tab.len())
            .ok_or(Error::InvalidArgument("unpack range out of bounds"))?;
        for (slot, chunk) in self.tab[dst_off..end].iter_mut().zip(from.chunks_exact(4)) {
            *slot = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Raw byte dump of `size` bytes of the table starting at `offset`
    /// (native-endian, for local snapshotting rather than on-disk storage).
    pub fn dump(&self, offset: usize, size: usize) -> Result<Vec<u8>> {
        let byte_off = offset * 4;
        let end = byte_off
            .checked_add(size)
            .filter(|&e| e <= self.tab.len() * 4)
            .ok_or(Error::InvalidArgument("dump range out of bounds"))?;
        let bytes: &[u8] = &bytemuck_cast_slice(&self.tab);
        Ok(bytes[byte_off..end].to_vec())
    }

    /// Rebuild a table from a packed little-endian byte stream produced by
    /// repeated [`DistCtx::pack`] calls (or a single full-table pack).
    pub fn from_packed(numb: u32, nums_bits: u32, weights: Vec<u32>, packed: &[u8]) -> Result<Self> {
        let nums = 1usize << nums_bits;
        if packed.len() != nums * 4 {
            return Err(Error::InvalidArgument(
                "packed table length does not match nums_bits",
            ));
        }
        let tab = packed
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self {
            numb,
            nums_bits,
            weights,
            tab,
        })
    }
}

/// No unsafe transmutes in this crate: reinterpret a `u32` table as bytes by
/// copying, not casting the allocation in place.
fn bytemuck_cast_slice(tab: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tab.len() * 4);
    for &v in tab {
        out.extend_from_slice(&v.to_ne_bytes());
    }
    out
}
