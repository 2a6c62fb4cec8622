//! Top-level box scanner
//!
//! Walks the outermost box headers of a container and records each box's
//! type, offset and size. The payload of every box, `moov` included, is
//! opaque at this level.

use super::{read_box_header, BmffBox};
use crate::core::error::{MoovError, MoovResult};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Scan the top-level boxes of a container.
///
/// The source length is taken by seeking to its end. A truncated trailing
/// header or a malformed size ends the list early instead of failing.
///
/// # Errors
///
/// * `Corrupt` if the source is empty or too short for a single box header
/// * `ReadFailure` if the source cannot be read or seeked
pub fn scan<R: Read + Seek>(mut reader: R) -> MoovResult<Vec<BmffBox>> {
    let file_len = reader
        .seek(SeekFrom::End(0))
        .map_err(MoovError::read("measuring source"))?;
    scan_with_len(&mut reader, file_len)
}

/// Scan the top-level boxes of a source whose length is already known.
pub fn scan_with_len<R: Read + Seek>(reader: &mut R, file_len: u64) -> MoovResult<Vec<BmffBox>> {
    if file_len == 0 {
        return Err(MoovError::Corrupt("source is empty".to_string()));
    }

    let mut boxes = Vec::new();
    let mut curr_pos = 0u64;

    while curr_pos < file_len {
        reader
            .seek(SeekFrom::Start(curr_pos))
            .map_err(MoovError::read("seeking to box header"))?;

        let Some(header) = read_box_header(reader).map_err(MoovError::read("reading box header"))?
        else {
            debug!(offset = curr_pos, "truncated box header, ending scan");
            break;
        };

        let Some(size) = header.resolve(file_len - curr_pos) else {
            warn!(
                offset = curr_pos,
                box_type = %header.box_type,
                declared = ?header.size,
                "malformed box size, ending scan"
            );
            break;
        };

        let box_info = BmffBox {
            box_type: header.box_type,
            offset: curr_pos,
            size,
            header_size: header.header_size,
        };
        debug!(box_type = %box_info.box_type, offset = box_info.offset, size, "box");
        boxes.push(box_info);

        curr_pos += size;
    }

    if boxes.is_empty() {
        return Err(MoovError::Corrupt(format!(
            "no complete box header in {} bytes",
            file_len
        )));
    }

    Ok(boxes)
}

/// Find the first top-level box of the given type
pub fn find_box(boxes: &[BmffBox], box_type: crate::core::fourcc::FourCC) -> Option<&BmffBox> {
    boxes.iter().find(|b| b.box_type == box_type)
}
