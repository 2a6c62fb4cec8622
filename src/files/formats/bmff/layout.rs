//! Layout analysis
//!
//! Classifies a scanned box list: is the metadata already ahead of the media
//! data, and how much padding does the file carry.

use super::scanner::{find_box, scan_with_len};
use super::BmffBox;
use crate::core::error::{MoovError, MoovResult};
use crate::core::fourcc::FourCC;
use std::io::{Read, Seek, SeekFrom};

/// Snapshot of a container's top-level layout.
///
/// Derived metrics are methods so they can never disagree with the sizes
/// they are computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Analysis {
    /// `moov` starts before `mdat`
    pub is_fast_start: bool,
    /// At least one `free`/`skip` box exists
    pub has_free_atom: bool,
    /// Total size of all `free`/`skip` boxes
    pub free_atom_size: u64,
    /// Length of the source
    pub file_size: u64,
    /// Size of the `moov` box
    pub moov_size: u64,
    /// Size of the `mdat` box
    pub mdat_size: u64,
    /// Top-level box types in file order
    pub atom_tags: Vec<FourCC>,
}

/// What, if anything, a rewrite would improve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LayoutStatus {
    /// `moov` sits after `mdat`
    NeedsFastStart,
    /// Fast-start already, but padding boxes could be removed
    HasPadding,
    /// Fast-start with no padding
    Optimized,
}

impl Analysis {
    /// Fast-start and free of padding
    pub fn is_streaming_optimized(&self) -> bool {
        self.is_fast_start && !self.has_free_atom
    }

    /// Fraction of the file taken by `moov`
    pub fn metadata_ratio(&self) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        self.moov_size as f64 / self.file_size as f64
    }

    /// Fraction of the file taken by padding
    pub fn padding_ratio(&self) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        self.free_atom_size as f64 / self.file_size as f64
    }

    pub fn status(&self) -> LayoutStatus {
        if !self.is_fast_start {
            LayoutStatus::NeedsFastStart
        } else if self.has_free_atom {
            LayoutStatus::HasPadding
        } else {
            LayoutStatus::Optimized
        }
    }
}

fn moov_and_mdat(boxes: &[BmffBox]) -> MoovResult<(&BmffBox, &BmffBox)> {
    let moov = find_box(boxes, FourCC::MOOV);
    let mdat = find_box(boxes, FourCC::MDAT);
    match (moov, mdat) {
        (Some(moov), Some(mdat)) => Ok((moov, mdat)),
        (None, Some(_)) => Err(MoovError::InvalidFormat("no moov box".to_string())),
        (Some(_), None) => Err(MoovError::InvalidFormat("no mdat box".to_string())),
        (None, None) => Err(MoovError::InvalidFormat(
            "no moov or mdat box".to_string(),
        )),
    }
}

/// Build an [`Analysis`] from a scanned box list.
///
/// # Errors
///
/// `InvalidFormat` if `moov` or `mdat` is missing.
pub fn analyze_boxes(boxes: &[BmffBox], file_size: u64) -> MoovResult<Analysis> {
    let (moov, mdat) = moov_and_mdat(boxes)?;

    let free_atom_size = boxes
        .iter()
        .filter(|b| b.box_type.is_padding())
        .map(|b| b.size)
        .sum();

    Ok(Analysis {
        is_fast_start: moov.offset < mdat.offset,
        has_free_atom: boxes.iter().any(|b| b.box_type.is_padding()),
        free_atom_size,
        file_size,
        moov_size: moov.size,
        mdat_size: mdat.size,
        atom_tags: boxes.iter().map(|b| b.box_type).collect(),
    })
}

/// `moov` comes after `mdat`.
///
/// # Errors
///
/// `InvalidFormat` if `moov` or `mdat` is missing.
pub fn needs_relocation_boxes(boxes: &[BmffBox]) -> MoovResult<bool> {
    let (moov, mdat) = moov_and_mdat(boxes)?;
    Ok(moov.offset > mdat.offset)
}

/// Scan and analyze a container.
pub fn analyze<R: Read + Seek>(mut reader: R) -> MoovResult<Analysis> {
    let file_size = reader
        .seek(SeekFrom::End(0))
        .map_err(MoovError::read("measuring source"))?;
    let boxes = scan_with_len(&mut reader, file_size)?;
    analyze_boxes(&boxes, file_size)
}

/// Scan a container and report whether its `moov` box trails `mdat`.
pub fn needs_relocation<R: Read + Seek>(mut reader: R) -> MoovResult<bool> {
    let file_size = reader
        .seek(SeekFrom::End(0))
        .map_err(MoovError::read("measuring source"))?;
    let boxes = scan_with_len(&mut reader, file_size)?;
    needs_relocation_boxes(&boxes)
}
