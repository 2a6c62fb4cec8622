//! Synthetic container fixtures
//!
//! Builds small but structurally complete files: `ftyp`, a `moov` holding one
//! track whose chunk offset table points into `mdat`, optional padding, and
//! an `mdat` whose chunks carry distinct byte patterns so tests can check
//! that every patched offset still lands on the right data.

#![allow(dead_code)]

use std::io::Cursor;

/// A top-level box to emit, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Ftyp,
    Moov,
    Free(usize),
    Skip(usize),
    Mdat,
}

/// Which chunk offset table the track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Stco,
    Co64,
}

/// A built file plus what its chunk offsets are expected to reference
#[derive(Debug, Clone)]
pub struct Fixture {
    pub bytes: Vec<u8>,
    pub chunk_offsets: Vec<u64>,
    pub chunks: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Builder {
    parts: Vec<Part>,
    table: Table,
    chunk_count: usize,
    chunk_len: usize,
    moov_size: Option<usize>,
    tracks: usize,
}

impl Builder {
    pub fn new(parts: &[Part]) -> Self {
        Self {
            parts: parts.to_vec(),
            table: Table::Stco,
            chunk_count: 4,
            chunk_len: 64,
            moov_size: None,
            tracks: 1,
        }
    }

    pub fn table(mut self, table: Table) -> Self {
        self.table = table;
        self
    }

    pub fn chunks(mut self, count: usize, len: usize) -> Self {
        self.chunk_count = count;
        self.chunk_len = len;
        self
    }

    /// Pad `mvhd` so the whole `moov` box is exactly `size` bytes
    pub fn moov_size(mut self, size: usize) -> Self {
        self.moov_size = Some(size);
        self
    }

    /// Number of tracks, each with its own table over the same chunks
    pub fn tracks(mut self, tracks: usize) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn build(&self) -> Fixture {
        let chunks: Vec<Vec<u8>> = (0..self.chunk_count)
            .map(|i| {
                (0..self.chunk_len)
                    .map(|j| (i * 31 + j * 7 + 1) as u8)
                    .collect()
            })
            .collect();

        let placeholder = vec![0u64; self.chunk_count];
        let moov_len = self.moov(&placeholder).len();

        let mut position = 0usize;
        let mut mdat_data = 0usize;
        for part in &self.parts {
            if *part == Part::Mdat {
                mdat_data = position + 8;
            }
            position += match part {
                Part::Ftyp => ftyp().len(),
                Part::Moov => moov_len,
                Part::Free(n) | Part::Skip(n) => *n,
                Part::Mdat => 8 + self.chunk_count * self.chunk_len,
            };
        }

        let chunk_offsets: Vec<u64> = (0..self.chunk_count)
            .map(|i| (mdat_data + i * self.chunk_len) as u64)
            .collect();

        let mut bytes = Vec::with_capacity(position);
        for part in &self.parts {
            match part {
                Part::Ftyp => bytes.extend(ftyp()),
                Part::Moov => bytes.extend(self.moov(&chunk_offsets)),
                Part::Free(n) => bytes.extend(padding(b"free", *n)),
                Part::Skip(n) => bytes.extend(padding(b"skip", *n)),
                Part::Mdat => bytes.extend(make_box(b"mdat", &chunks.concat())),
            }
        }
        assert_eq!(bytes.len(), position);

        Fixture {
            bytes,
            chunk_offsets,
            chunks,
        }
    }

    fn moov(&self, offsets: &[u64]) -> Vec<u8> {
        let traks: Vec<u8> = (0..self.tracks)
            .flat_map(|_| track(self.table, offsets))
            .collect();
        let base = 8 + 8 + traks.len();
        let mvhd_payload = match self.moov_size {
            Some(size) => {
                assert!(size >= base, "moov cannot shrink below {} bytes", base);
                size - base
            }
            None => 100,
        };
        let mvhd = make_box(b"mvhd", &vec![0u8; mvhd_payload]);
        make_box(b"moov", &[mvhd, traks].concat())
    }
}

pub fn make_box(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend(((payload.len() + 8) as u32).to_be_bytes());
    out.extend(tag);
    out.extend(payload);
    out
}

pub fn ftyp() -> Vec<u8> {
    make_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso2avc1mp41")
}

fn padding(tag: &[u8; 4], size: usize) -> Vec<u8> {
    assert!(size >= 8);
    make_box(tag, &vec![0u8; size - 8])
}

fn track(table: Table, offsets: &[u64]) -> Vec<u8> {
    let mut payload = vec![0u8; 4];
    payload.extend((offsets.len() as u32).to_be_bytes());
    let tag = match table {
        Table::Stco => {
            for o in offsets {
                payload.extend((*o as u32).to_be_bytes());
            }
            b"stco"
        }
        Table::Co64 => {
            for o in offsets {
                payload.extend(o.to_be_bytes());
            }
            b"co64"
        }
    };
    let stbl = make_box(b"stbl", &make_box(tag, &payload));
    let minf = make_box(b"minf", &stbl);
    let mdia = make_box(b"mdia", &minf);
    make_box(b"trak", &mdia)
}

/// Top-level `(tag, size)` pairs of a file
pub fn layout(bytes: &[u8]) -> Vec<(String, u64)> {
    quickmoov::scan(Cursor::new(bytes))
        .unwrap()
        .iter()
        .map(|b| (b.box_type.to_string(), b.size))
        .collect()
}

/// Every chunk offset in every track, in file order
pub fn read_chunk_offsets(bytes: &[u8]) -> Vec<u64> {
    let boxes = quickmoov::scan(Cursor::new(bytes)).unwrap();
    let moov = boxes
        .iter()
        .find(|b| b.box_type == *b"moov")
        .expect("moov present");
    let mut out = Vec::new();
    walk(
        bytes,
        moov.data_offset() as usize,
        moov.end() as usize,
        &mut out,
    );
    out
}

fn walk(bytes: &[u8], mut pos: usize, end: usize, out: &mut Vec<u64>) {
    while pos + 8 <= end {
        let size = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let tag = &bytes[pos + 4..pos + 8];
        let body = pos + 8;
        match tag {
            b"trak" | b"mdia" | b"minf" | b"stbl" => walk(bytes, body, pos + size, out),
            b"stco" | b"co64" => {
                let count =
                    u32::from_be_bytes(bytes[body + 4..body + 8].try_into().unwrap()) as usize;
                let width = if tag == b"stco" { 4 } else { 8 };
                for i in 0..count {
                    let at = body + 8 + i * width;
                    let value = if width == 4 {
                        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap()) as u64
                    } else {
                        u64::from_be_bytes(bytes[at..at + 8].try_into().unwrap())
                    };
                    out.push(value);
                }
            }
            _ => {}
        }
        pos += size;
    }
}

/// Assert every chunk offset in `output` points at the chunk it did in the
/// source fixture.
pub fn assert_chunks_resolve(fixture: &Fixture, output: &[u8]) {
    let offsets = read_chunk_offsets(output);
    let per_track = fixture.chunks.len();
    assert_eq!(offsets.len() % per_track, 0);
    for (i, offset) in offsets.iter().enumerate() {
        let chunk = &fixture.chunks[i % per_track];
        let at = *offset as usize;
        assert_eq!(
            &output[at..at + chunk.len()],
            chunk.as_slice(),
            "chunk {} at offset {} does not match",
            i,
            offset
        );
    }
}
