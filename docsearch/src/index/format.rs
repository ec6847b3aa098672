//! On-disk layout of an index file.
//!
//! All integers are little-endian.
//!
//! | bytes   | field                                     |
//! |---------|-------------------------------------------|
//! | 0..4    | magic `DSIX`                              |
//! | 4..8    | format version (`u32`)                    |
//! | 8..16   | entry count `N` (`u64`)                   |
//! | 16..    | `N` entries: slot (`u32`), counter (`u64`) |
//!
//! Entries are sorted by slot with no duplicates, so only slots that some
//! token hashed to take up space and a lookup is a binary search.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"DSIX";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 16;
pub const ENTRY_LEN: usize = 12;

/// Writes a complete index file for `entries`, which must be sorted by slot.
///
/// Returns the number of bytes written.
pub fn write_index<W: Write>(writer: &mut W, entries: &[(u32, u64)]) -> io::Result<u64> {
    debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(entries.len() as u64).to_le_bytes())?;
    for &(slot, count) in entries {
        writer.write_all(&slot.to_le_bytes())?;
        writer.write_all(&count.to_le_bytes())?;
    }
    writer.flush()?;

    Ok((HEADER_LEN + entries.len() * ENTRY_LEN) as u64)
}

/// Borrowed, validated view over the bytes of an index file
#[derive(Debug, Clone, Copy)]
pub struct IndexView<'a> {
    table: &'a [u8],
}

impl<'a> IndexView<'a> {
    /// Validates the header and table size. `None` for anything that is not
    /// a well-formed index of the current version.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_LEN)?;
        if &header[0..4] != MAGIC {
            return None;
        }
        let version = u32::from_le_bytes(header[4..8].try_into().ok()?);
        if version != VERSION {
            return None;
        }
        let count = u64::from_le_bytes(header[8..16].try_into().ok()?);
        let table_len = usize::try_from(count).ok()?.checked_mul(ENTRY_LEN)?;
        let table = bytes.get(HEADER_LEN..HEADER_LEN.checked_add(table_len)?)?;
        Some(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len() / ENTRY_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn entry(&self, i: usize) -> (u32, u64) {
        let raw = &self.table[i * ENTRY_LEN..(i + 1) * ENTRY_LEN];
        let mut slot = [0u8; 4];
        let mut count = [0u8; 8];
        slot.copy_from_slice(&raw[..4]);
        count.copy_from_slice(&raw[4..]);
        (u32::from_le_bytes(slot), u64::from_le_bytes(count))
    }

    /// Counter stored for `slot`, 0 when the slot was never written.
    pub fn get(&self, slot: u32) -> u64 {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (found, count) = self.entry(mid);
            match found.cmp(&slot) {
                std::cmp::Ordering::Equal => return count,
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        0
    }
}

/// Reads the counter for `slot` from the index file at `path`.
///
/// Never fails: a file that cannot be opened, mapped or parsed reads as 0.
pub fn lookup(path: &Path, slot: u32) -> u64 {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Index {} unavailable: {}", path.display(), e);
            return 0;
        }
    };

    // Index files are written once, before any lookup, and not touched while mapped.
    let mmap = match unsafe { Mmap::map(&file) } {
        Ok(mmap) => mmap,
        Err(e) => {
            debug!("Index {} could not be mapped: {}", path.display(), e);
            return 0;
        }
    };

    match IndexView::parse(&mmap) {
        Some(view) => view.get(slot),
        None => {
            debug!("Index {} is malformed", path.display());
            0
        }
    }
}
