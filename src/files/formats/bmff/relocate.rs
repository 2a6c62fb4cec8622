//! Relocation engine
//!
//! Rewrites a container so `moov` sits right after `ftyp` and/or padding
//! boxes are gone. The output order and the chunk offset shift are worked
//! out first from the box list alone (see [`plan_relocation`]); only then is
//! anything written. `moov` is buffered and patched in memory, every other
//! box is streamed in bounded chunks.

use super::chunk_offsets::{patch_chunk_offsets, PatchStats};
use super::scanner::{find_box, scan_with_len};
use super::BmffBox;
use crate::core::error::{MoovError, MoovResult};
use crate::core::fourcc::FourCC;
use crate::files::options::RelocateOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, info};

/// Streaming copy granularity
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Output layout computed from a box list, before any byte is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationPlan {
    /// Boxes in output order
    pub order: Vec<BmffBox>,
    /// The `moov` box being patched
    pub moov: BmffBox,
    /// The `mdat` box whose payload the chunk offsets point into
    pub mdat: BmffBox,
    /// Shift applied to every chunk offset
    pub delta: i64,
    /// `moov` moves from behind `mdat` to the front
    pub moves_metadata: bool,
    /// Padding bytes left out of the output
    pub removed_padding: u64,
}

impl RelocationPlan {
    /// Total length of the rewritten container
    pub fn output_size(&self) -> u64 {
        self.order.iter().map(|b| b.size).sum()
    }

    /// Offset of `box_info` in the rewritten container
    pub fn new_offset(&self, box_info: &BmffBox) -> Option<u64> {
        let mut offset = 0;
        for b in &self.order {
            if b.offset == box_info.offset {
                return Some(offset);
            }
            offset += b.size;
        }
        None
    }
}

/// What a relocation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RelocationSummary {
    /// `moov` was moved ahead of `mdat`
    pub moved_metadata: bool,
    /// Padding bytes dropped
    pub removed_padding: u64,
    /// Shift applied to chunk offsets
    pub delta: i64,
    /// Length of the output
    pub bytes_written: u64,
    /// Chunk offset tables touched
    pub patch: PatchStats,
}

fn required(boxes: &[BmffBox], box_type: FourCC) -> MoovResult<BmffBox> {
    find_box(boxes, box_type)
        .copied()
        .ok_or(MoovError::BoxNotFound(box_type))
}

/// Work out the output order and offset shift for `boxes`.
///
/// # Errors
///
/// * `BoxNotFound` if `ftyp`, `moov` or `mdat` is missing
/// * `NothingToOptimize` if the options would leave the file unchanged
pub fn plan_relocation(boxes: &[BmffBox], options: &RelocateOptions) -> MoovResult<RelocationPlan> {
    let ftyp = required(boxes, FourCC::FTYP)?;
    let moov = required(boxes, FourCC::MOOV)?;
    let mdat = required(boxes, FourCC::MDAT)?;

    let is_fast_start = moov.offset < mdat.offset;
    let has_padding = boxes.iter().any(|b| b.box_type.is_padding());

    let needs_move = options.move_metadata_to_front && !is_fast_start;
    let needs_padding_removal = options.remove_padding && has_padding;
    if !needs_move && !needs_padding_removal {
        return Err(MoovError::NothingToOptimize);
    }

    // moov goes right after ftyp unless it trails mdat and must stay put
    let metadata_up_front = is_fast_start || needs_move;

    let mut order = Vec::with_capacity(boxes.len());
    order.push(ftyp);
    if metadata_up_front {
        order.push(moov);
    }

    let mut removed_padding = 0;
    for b in boxes {
        if b.offset == ftyp.offset || (metadata_up_front && b.offset == moov.offset) {
            continue;
        }
        if options.remove_padding && b.box_type.is_padding() {
            removed_padding += b.size;
            continue;
        }
        order.push(*b);
    }

    let mut plan = RelocationPlan {
        order,
        moov,
        mdat,
        delta: 0,
        moves_metadata: needs_move,
        removed_padding,
    };

    // Chunk offsets point into mdat, so they move exactly as far as mdat does
    let new_mdat_offset = plan
        .new_offset(&mdat)
        .ok_or(MoovError::BoxNotFound(FourCC::MDAT))?;
    plan.delta = new_mdat_offset as i64 - mdat.offset as i64;

    debug!(
        delta = plan.delta,
        moves_metadata = plan.moves_metadata,
        removed_padding = plan.removed_padding,
        "relocation planned"
    );
    Ok(plan)
}

/// Rewrite a container according to `options`.
///
/// Nothing is written to `writer` unless scanning, planning and reading the
/// `moov` payload all succeed.
///
/// # Errors
///
/// * `BoxNotFound` if `ftyp`, `moov` or `mdat` is missing
/// * `NothingToOptimize` if the options would leave the file unchanged
/// * `ReadFailure` / `WriteFailure` on I/O errors
///
/// # Example
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::io::{BufReader, BufWriter};
/// use quickmoov::{relocate, RelocateOptions};
///
/// let input = BufReader::new(File::open("movie.mp4")?);
/// let output = BufWriter::new(File::create("movie_modified.mp4")?);
/// let summary = relocate(input, output, &RelocateOptions::default())?;
/// println!("chunk offsets shifted by {}", summary.delta);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn relocate<R: Read + Seek, W: Write>(
    mut reader: R,
    mut writer: W,
    options: &RelocateOptions,
) -> MoovResult<RelocationSummary> {
    let file_len = reader
        .seek(SeekFrom::End(0))
        .map_err(MoovError::read("measuring source"))?;
    let boxes = scan_with_len(&mut reader, file_len)?;
    let plan = plan_relocation(&boxes, options)?;
    write_plan(&mut reader, &mut writer, &plan)
}

/// Read `moov` from `reader`, patch it, and stream the planned layout to
/// `writer`.
pub fn write_plan<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    plan: &RelocationPlan,
) -> MoovResult<RelocationSummary> {
    let moov_len = usize::try_from(plan.moov.size).map_err(|_| {
        MoovError::Corrupt(format!("moov box of {} bytes cannot be buffered", plan.moov.size))
    })?;

    reader
        .seek(SeekFrom::Start(plan.moov.offset))
        .map_err(MoovError::read("seeking to moov"))?;
    let mut moov_buf = vec![0u8; moov_len];
    reader
        .read_exact(&mut moov_buf)
        .map_err(MoovError::read("reading moov"))?;

    let patch = patch_chunk_offsets(&mut moov_buf, plan.delta);

    let largest = plan
        .order
        .iter()
        .filter(|b| b.offset != plan.moov.offset)
        .map(|b| b.size)
        .max()
        .unwrap_or(0);
    let chunk_len = usize::try_from(largest).map_or(COPY_CHUNK_SIZE, |l| l.min(COPY_CHUNK_SIZE));
    let mut chunk = vec![0u8; chunk_len];

    let mut bytes_written = 0u64;
    for b in &plan.order {
        if b.offset == plan.moov.offset {
            writer
                .write_all(&moov_buf)
                .map_err(MoovError::write("writing moov"))?;
        } else {
            copy_box(reader, writer, b, &mut chunk)?;
        }
        bytes_written += b.size;
    }
    writer
        .flush()
        .map_err(MoovError::write("flushing output"))?;

    let summary = RelocationSummary {
        moved_metadata: plan.moves_metadata,
        removed_padding: plan.removed_padding,
        delta: plan.delta,
        bytes_written,
        patch,
    };
    info!(
        moved_metadata = summary.moved_metadata,
        removed_padding = summary.removed_padding,
        delta = summary.delta,
        tables = patch.stco_tables + patch.co64_tables,
        entries = patch.entries,
        bytes_written,
        "relocation complete"
    );
    Ok(summary)
}

/// Copy one box verbatim, `chunk.len()` bytes at a time
fn copy_box<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    box_info: &BmffBox,
    chunk: &mut [u8],
) -> MoovResult<()> {
    let (read_step, write_step) = if box_info.box_type == FourCC::MDAT {
        ("copying mdat", "writing mdat")
    } else if box_info.box_type == FourCC::FTYP {
        ("copying ftyp", "writing ftyp")
    } else {
        ("copying box", "writing box")
    };

    reader
        .seek(SeekFrom::Start(box_info.offset))
        .map_err(MoovError::read(read_step))?;

    let mut remaining = box_info.size;
    while remaining > 0 {
        let n = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
        reader
            .read_exact(&mut chunk[..n])
            .map_err(MoovError::read(read_step))?;
        writer
            .write_all(&chunk[..n])
            .map_err(MoovError::write(write_step))?;
        remaining -= n as u64;
    }
    Ok(())
}
