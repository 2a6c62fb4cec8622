//! MP4 File API
//!
//! This module provides a path-based API on top of the reader-level
//! functions: open a container once, inspect it, and write an optimized copy.

use crate::core::error::{MoovError, MoovResult};
use crate::files::formats::bmff::{
    analyze_boxes, needs_relocation_boxes, plan_relocation, scan_with_len, write_plan, Analysis,
    BmffBox, RelocationSummary,
};
use crate::files::options::RelocateOptions;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions of the containers QuickMoov handles
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "m4a", "3gp"];

/// Check a path's extension against [`SUPPORTED_EXTENSIONS`] (case-insensitive)
pub fn is_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// `<dir>/<stem>_modified.<ext>` next to `input`
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_modified.{}", stem, ext.to_string_lossy()),
        None => format!("{}_modified", stem),
    };
    input.with_file_name(name)
}

/// A container on disk, scanned once on open.
///
/// The box list is a snapshot: no file handle is kept between calls, and
/// each relocation opens its own input and output.
///
/// # Example
///
/// ```rust,no_run
/// use quickmoov::{default_output_path, Mp4File, RelocateOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = Mp4File::open("movie.mp4")?;
/// if !file.analyze()?.is_streaming_optimized() {
///     file.relocate_to(default_output_path("movie.mp4"), &RelocateOptions::default())?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Mp4File {
    path: PathBuf,
    file_size: u64,
    boxes: Vec<BmffBox>,
}

impl Mp4File {
    /// Open and scan a container.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `path` does not exist
    /// * `ReadFailure` if it cannot be opened or read
    /// * `Corrupt` if it holds no complete box
    pub fn open<P: AsRef<Path>>(path: P) -> MoovResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MoovError::NotFound(path.display().to_string()));
        }

        let file = File::open(path).map_err(MoovError::read("opening input"))?;
        let mut reader = BufReader::new(file);
        let file_size = reader
            .seek(SeekFrom::End(0))
            .map_err(MoovError::read("measuring input"))?;
        let boxes = scan_with_len(&mut reader, file_size)?;
        debug!(path = %path.display(), file_size, boxes = boxes.len(), "opened container");

        Ok(Self {
            path: path.to_path_buf(),
            file_size,
            boxes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Top-level boxes in file order
    pub fn boxes(&self) -> &[BmffBox] {
        &self.boxes
    }

    /// Classify the layout.
    pub fn analyze(&self) -> MoovResult<Analysis> {
        analyze_boxes(&self.boxes, self.file_size)
    }

    /// `moov` trails `mdat`.
    pub fn needs_relocation(&self) -> MoovResult<bool> {
        needs_relocation_boxes(&self.boxes)
    }

    /// Write an optimized copy to `output`.
    ///
    /// The output file is only created once the relocation plan is known to
    /// be valid, so `BoxNotFound` and `NothingToOptimize` never leave a file
    /// behind. A failure while streaming may leave a partial output.
    ///
    /// # Errors
    ///
    /// * `BadParam` if `output` is the input file itself
    /// * `BoxNotFound` / `NothingToOptimize` from planning
    /// * `ReadFailure` / `WriteFailure` on I/O errors
    pub fn relocate_to<P: AsRef<Path>>(
        &self,
        output: P,
        options: &RelocateOptions,
    ) -> MoovResult<RelocationSummary> {
        let output = output.as_ref();
        if self.is_same_file(output) {
            return Err(MoovError::BadParam(format!(
                "output {} would overwrite the input",
                output.display()
            )));
        }

        let plan = plan_relocation(&self.boxes, options)?;

        let input = File::open(&self.path).map_err(MoovError::read("opening input"))?;
        let mut reader = BufReader::new(input);
        let out = File::create(output).map_err(MoovError::write("creating output"))?;
        let mut writer = BufWriter::new(out);

        write_plan(&mut reader, &mut writer, &plan)
    }

    fn is_same_file(&self, other: &Path) -> bool {
        if other == self.path {
            return true;
        }
        match (self.path.canonicalize(), other.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
