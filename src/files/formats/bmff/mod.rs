//! ISO Base Media File Format (BMFF) support
//!
//! This module provides the box-level building blocks shared by the scanner,
//! the layout analyzer and the relocation engine. It covers every container
//! in the MPEG-4/QuickTime family: MP4, MOV, M4A, M4V and 3GP.
//!
//! BMFF Structure:
//! - Files are composed of "boxes" (also called "atoms" in QuickTime)
//! - Each box has: 4-byte size, 4-byte type, optional extended size, data
//! - A size of 1 means a 64-bit size follows the type
//! - A size of 0 means the box runs to the end of its parent (or the file)
//! - All multi-byte integers are big-endian

use crate::core::fourcc::FourCC;
use std::io::{Read, Seek, SeekFrom};

pub mod chunk_offsets;
pub mod layout;
pub mod relocate;
pub mod scanner;

pub use chunk_offsets::{patch_chunk_offsets, PatchStats};
pub use layout::{
    analyze, analyze_boxes, needs_relocation, needs_relocation_boxes, Analysis, LayoutStatus,
};
pub use relocate::{plan_relocation, relocate, write_plan, RelocationPlan, RelocationSummary};
pub use scanner::{find_box, scan, scan_with_len};

// ============================================================================
// Constants
// ============================================================================

/// Size of a compact box header (size + type)
pub const HEADER_SIZE: u64 = 8;

/// Size of a box header carrying a 64-bit extended size
pub const EXTENDED_HEADER_SIZE: u64 = 16;

/// Top-level QuickTime boxes that may legitimately open a file without `ftyp`
const QT_LEADING_BOXES: &[&[u8; 4]] = &[b"moov", b"mdat", b"wide", b"free", b"skip", b"pnot"];

// ============================================================================
// Types
// ============================================================================

/// A top-level box located in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BmffBox {
    /// Box type (4-byte FourCC)
    pub box_type: FourCC,
    /// Absolute offset of the box header in the source
    pub offset: u64,
    /// Box size including its header
    pub size: u64,
    /// Header length: 8, or 16 with an extended size
    pub header_size: u64,
}

impl BmffBox {
    /// Offset one past the last byte of the box
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Offset where the box payload starts
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    /// Size of the box payload (excluding header)
    pub fn data_size(&self) -> u64 {
        self.size - self.header_size
    }
}

/// Declared size of a box, before it is resolved against its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredSize {
    /// Explicit size including the header
    Exact(u64),
    /// Size field of 0: the box extends to the end of its parent
    ToEnd,
}

/// A parsed box header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: FourCC,
    pub size: DeclaredSize,
    pub header_size: u64,
}

impl BoxHeader {
    /// Parse a header from the start of `buf`.
    ///
    /// Returns `None` when `buf` is too short to hold the header, including
    /// the extended size when the size field is 1.
    pub fn parse(buf: &[u8]) -> Option<BoxHeader> {
        if buf.len() < HEADER_SIZE as usize {
            return None;
        }
        let size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
        let box_type = FourCC([buf[4], buf[5], buf[6], buf[7]]);

        match size {
            0 => Some(BoxHeader {
                box_type,
                size: DeclaredSize::ToEnd,
                header_size: HEADER_SIZE,
            }),
            1 => {
                let ext = buf.get(8..16)?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(ext);
                Some(BoxHeader {
                    box_type,
                    size: DeclaredSize::Exact(u64::from_be_bytes(bytes)),
                    header_size: EXTENDED_HEADER_SIZE,
                })
            }
            n => Some(BoxHeader {
                box_type,
                size: DeclaredSize::Exact(n),
                header_size: HEADER_SIZE,
            }),
        }
    }

    /// Resolve the full box size given the bytes left in the parent,
    /// counted from the start of this header.
    ///
    /// Returns `None` when the size is smaller than the header or does not
    /// fit in the remaining bytes.
    pub fn resolve(&self, remaining: u64) -> Option<u64> {
        let size = match self.size {
            DeclaredSize::Exact(n) => n,
            DeclaredSize::ToEnd => remaining,
        };
        if size < self.header_size || size > remaining {
            return None;
        }
        Some(size)
    }
}

// ============================================================================
// Reading Functions
// ============================================================================

/// Read a box header at the current position.
///
/// Returns `Ok(None)` when the source ends before a full header (including
/// an extended size) could be read.
pub fn read_box_header<R: Read>(reader: &mut R) -> std::io::Result<Option<BoxHeader>> {
    let mut buf = [0u8; EXTENDED_HEADER_SIZE as usize];
    match reader.read_exact(&mut buf[..HEADER_SIZE as usize]) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    // Handle extended size (size == 1 means extended size follows)
    if buf[..4] == 1u32.to_be_bytes() {
        match reader.read_exact(&mut buf[HEADER_SIZE as usize..]) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        return Ok(BoxHeader::parse(&buf));
    }

    Ok(BoxHeader::parse(&buf[..HEADER_SIZE as usize]))
}

/// Check if this looks like a BMFF file.
///
/// Only the first box header is inspected and the reader position is
/// restored afterwards.
pub fn is_bmff<R: Read + Seek>(reader: &mut R) -> std::io::Result<bool> {
    let pos = reader.stream_position()?;

    // Check minimum file length
    let file_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    if file_len < HEADER_SIZE {
        return Ok(false);
    }

    let mut header = [0u8; 8];
    if reader.read_exact(&mut header).is_err() {
        reader.seek(SeekFrom::Start(pos))?;
        return Ok(false);
    }
    reader.seek(SeekFrom::Start(pos))?;

    let box_size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let box_type = &header[4..8];

    // Special case: size 0 means "extends to EOF", size 1 means 64-bit extended size
    if box_size != 0 && box_size != 1 && box_size < 8 {
        return Ok(false);
    }

    if box_type == FourCC::FTYP.as_bytes() {
        return Ok(true);
    }

    // Also accept QuickTime files that may start with other boxes
    Ok(QT_LEADING_BOXES.iter().any(|qt| box_type == &qt[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn create_minimal_bmff() -> Vec<u8> {
        let mut data = Vec::new();
        // ftyp box
        data.extend_from_slice(&20u32.to_be_bytes()); // size
        data.extend_from_slice(b"ftyp"); // type
        data.extend_from_slice(b"isom"); // brand
        data.extend_from_slice(&0u32.to_be_bytes()); // version
        data.extend_from_slice(b"isom"); // compatible brand
        data
    }

    #[test]
    fn test_is_bmff() {
        let data = create_minimal_bmff();
        let mut reader = Cursor::new(data);
        assert!(is_bmff(&mut reader).unwrap());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_is_bmff_quicktime_leading_box() {
        let mut data = Vec::new();
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(b"wide");
        let mut reader = Cursor::new(data);
        assert!(is_bmff(&mut reader).unwrap());
    }

    #[test]
    fn test_is_bmff_invalid() {
        let data = vec![0x00, 0x01, 0x02, 0x03];
        let mut reader = Cursor::new(data);
        assert!(!is_bmff(&mut reader).unwrap());

        let mut reader = Cursor::new(b"\x00\x00\x00\x10RIFFWAVEfmt ".to_vec());
        assert!(!is_bmff(&mut reader).unwrap());
    }

    #[test]
    fn test_read_box_header() {
        let data = create_minimal_bmff();
        let mut reader = Cursor::new(data);
        let header = read_box_header(&mut reader).unwrap().unwrap();
        assert_eq!(header.box_type, FourCC::FTYP);
        assert_eq!(header.size, DeclaredSize::Exact(20));
        assert_eq!(header.header_size, 8);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_read_extended_header() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&0x1_0000_0010u64.to_be_bytes());
        let header = read_box_header(&mut Cursor::new(data)).unwrap().unwrap();
        assert_eq!(header.size, DeclaredSize::Exact(0x1_0000_0010));
        assert_eq!(header.header_size, 16);
    }

    #[test]
    fn test_read_truncated_header() {
        let mut reader = Cursor::new(vec![0, 0, 0, 8, b'f']);
        assert!(read_box_header(&mut reader).unwrap().is_none());

        // Extended size cut short
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[0, 0, 0]);
        assert!(read_box_header(&mut Cursor::new(data)).unwrap().is_none());
    }

    #[test]
    fn test_resolve() {
        let header = BoxHeader::parse(b"\x00\x00\x00\x00free").unwrap();
        assert_eq!(header.resolve(100), Some(100));

        let header = BoxHeader::parse(b"\x00\x00\x00\x04free").unwrap();
        assert_eq!(header.resolve(100), None);

        let header = BoxHeader::parse(b"\x00\x00\x00\x80free").unwrap();
        assert_eq!(header.resolve(100), None);
        assert_eq!(header.resolve(128), Some(128));
    }
}
