//! §6 — persisted volume state: the current table, the balanced/unbalanced
//! flag, and the incomplete-removal marker, so that a crash mid-`REMOVE_BRICK`
//! is finished on the next mount. Grounded on `fsx32::serde`'s pack/dump for
//! the table bytes; the header itself is the same small fixed-layout binary
//! blob style `fsx32::serde` uses, not a general serialization crate.

use std::fs;
use std::path::Path;

use fsx32::DistCtx;

const MAGIC: u32 = 0x5846_5830; // "FX" + table byte "X0"

pub struct Header {
    pub numb: u32,
    pub nums_bits: u32,
    pub weights: Vec<u32>,
    pub balanced: bool,
    /// Pending victim brick id from a `REMOVE_BRICK` that didn't finish.
    pub incomplete_removal: Option<u64>,
    pub table: Vec<u8>,
}

pub fn save(path: &Path, header: &Header) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(32 + header.weights.len() * 4 + header.table.len());
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&header.numb.to_le_bytes());
    buf.extend_from_slice(&header.nums_bits.to_le_bytes());
    buf.push(header.balanced as u8);
    match header.incomplete_removal {
        Some(id) => {
            buf.push(1);
            buf.extend_from_slice(&id.to_le_bytes());
        }
        None => {
            buf.push(0);
            buf.extend_from_slice(&0u64.to_le_bytes());
        }
    }
    for &w in &header.weights {
        buf.extend_from_slice(&w.to_le_bytes());
    }
    buf.extend_from_slice(&header.table);
    fs::write(path, buf)
}

pub fn load(path: &Path) -> std::io::Result<Header> {
    let buf = fs::read(path)?;
    let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "bad volume header magic",
        ));
    }
    let numb = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    let nums_bits = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let balanced = buf[12] != 0;
    let has_removal = buf[13] != 0;
    let victim = u64::from_le_bytes(buf[14..22].try_into().unwrap());
    let incomplete_removal = has_removal.then_some(victim);

    let weights_off = 22;
    let weights_end = weights_off + numb as usize * 4;
    let weights = buf[weights_off..weights_end]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    let table = buf[weights_end..].to_vec();

    Ok(Header {
        numb,
        nums_bits,
        weights,
        balanced,
        incomplete_removal,
        table,
    })
}

/// Build a [`Header`] ready to [`save`] from a live `DistCtx`.
pub fn header_of(dcx: &DistCtx, balanced: bool, incomplete_removal: Option<u64>) -> fsx32::Result<Header> {
    let mut table = Vec::new();
    dcx.pack(&mut table, 0, dcx.table().len())?;
    Ok(Header {
        numb: dcx.numb(),
        nums_bits: dcx.nums_bits(),
        weights: dcx.weights().to_vec(),
        balanced,
        incomplete_removal,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_bytes() {
        let dir = std::env::temp_dir().join(format!("volumed-persist-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vol.hdr");

        let header = Header {
            numb: 2,
            nums_bits: 10,
            weights: vec![512, 512],
            balanced: false,
            incomplete_removal: Some(7),
            table: vec![0u8; 1024 * 4],
        };
        save(&path, &header).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.numb, 2);
        assert_eq!(loaded.nums_bits, 10);
        assert_eq!(loaded.weights, vec![512, 512]);
        assert!(!loaded.balanced);
        assert_eq!(loaded.incomplete_removal, Some(7));
        assert_eq!(loaded.table.len(), 1024 * 4);

        std::fs::remove_dir_all(&dir).ok();
    }
}
