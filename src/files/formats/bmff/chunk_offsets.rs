//! Chunk offset patching
//!
//! `stco` and `co64` tables inside `moov` hold absolute file positions of
//! media chunks. When the bytes ahead of `mdat` change, every entry must move
//! by the same amount. The patcher walks the box tree of an in-memory `moov`
//! payload by byte ranges and rewrites those entries in place; it never builds
//! a parsed tree.

use super::BoxHeader;
use crate::core::fourcc::FourCC;
use tracing::{debug, warn};

/// Boxes whose payload is a plain sequence of child boxes
const CONTAINER_BOXES: &[&[u8; 4]] = &[
    b"moov", b"trak", b"mdia", b"minf", b"stbl", b"udta", b"edts", b"meta",
];

/// version(1) + flags(3) + entry_count(4)
const TABLE_PREAMBLE: usize = 8;

/// Counters from one patching pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PatchStats {
    /// `stco` tables visited
    pub stco_tables: usize,
    /// `co64` tables visited
    pub co64_tables: usize,
    /// Entries rewritten
    pub entries: usize,
    /// Entries that saturated at the bounds of their field width
    pub clamped: usize,
}

fn is_container(box_type: &FourCC) -> bool {
    CONTAINER_BOXES.iter().any(|c| box_type == *c)
}

/// Shift every `stco`/`co64` entry in `moov` by `delta`.
///
/// `moov` is the complete box, header included. 32-bit entries saturate
/// at `0..=u32::MAX` instead of being promoted to 64-bit.
pub fn patch_chunk_offsets(moov: &mut [u8], delta: i64) -> PatchStats {
    let mut stats = PatchStats::default();
    if delta == 0 {
        return stats;
    }
    let len = moov.len();
    patch_range(moov, 0, len, delta, &mut stats);
    stats
}

/// Walk the sibling boxes in `buffer[start..end]`
fn patch_range(buffer: &mut [u8], start: usize, end: usize, delta: i64, stats: &mut PatchStats) {
    let mut pos = start;
    while pos < end {
        let Some(header) = BoxHeader::parse(&buffer[pos..end]) else {
            break;
        };
        let Some(size) = header.resolve((end - pos) as u64) else {
            break;
        };
        // resolve() bounds size by the remaining range, so it fits in usize
        let size = size as usize;
        let content_start = pos + header.header_size as usize;
        let content_end = pos + size;

        if header.box_type == FourCC::STCO {
            stats.stco_tables += 1;
            patch_stco(&mut buffer[content_start..content_end], delta, stats);
        } else if header.box_type == FourCC::CO64 {
            stats.co64_tables += 1;
            patch_co64(&mut buffer[content_start..content_end], delta, stats);
        } else if is_container(&header.box_type) {
            patch_range(buffer, content_start, content_end, delta, stats);
        }

        pos = content_end;
    }
}

/// Entry count, clipped to the entries that actually fit in the table
fn table_entries(table: &[u8], entry_size: usize) -> usize {
    if table.len() < TABLE_PREAMBLE {
        return 0;
    }
    let declared = u32::from_be_bytes([table[4], table[5], table[6], table[7]]) as usize;
    let available = (table.len() - TABLE_PREAMBLE) / entry_size;
    if declared > available {
        warn!(declared, available, "chunk offset table shorter than its entry count");
    }
    declared.min(available)
}

fn patch_stco(table: &mut [u8], delta: i64, stats: &mut PatchStats) {
    let count = table_entries(table, 4);
    debug!(entries = count, delta, "patching stco");
    for entry in table[TABLE_PREAMBLE..].chunks_exact_mut(4).take(count) {
        let old = u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]);
        let shifted = old as i64 + delta;
        let new = shifted.clamp(0, u32::MAX as i64);
        if new != shifted {
            stats.clamped += 1;
            warn!(old, delta, "stco entry saturated");
        }
        entry.copy_from_slice(&(new as u32).to_be_bytes());
        stats.entries += 1;
    }
}

fn patch_co64(table: &mut [u8], delta: i64, stats: &mut PatchStats) {
    let count = table_entries(table, 8);
    debug!(entries = count, delta, "patching co64");
    for entry in table[TABLE_PREAMBLE..].chunks_exact_mut(8).take(count) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(entry);
        let old = u64::from_be_bytes(bytes);
        let shifted = old as i128 + delta as i128;
        let new = shifted.clamp(0, u64::MAX as i128);
        if new != shifted {
            stats.clamped += 1;
            warn!(old, delta, "co64 entry saturated");
        }
        entry.copy_from_slice(&(new as u64).to_be_bytes());
        stats.entries += 1;
    }
}
