//! # QuickMoov
//!
//! Fast-start optimizer for ISO base media containers (MP4, MOV, M4V, M4A,
//! 3GP).
//!
//! Players can only start a progressive download once they have the `moov`
//! box. Many encoders write it after the media data, so the whole file must
//! arrive first. QuickMoov rewrites such files with `moov` right after
//! `ftyp`, optionally dropping `free`/`skip` padding, and shifts every
//! `stco`/`co64` chunk offset so the result stays seekable. Media payloads
//! are streamed untouched.
//!
//! ## Reader-level API
//!
//! ```rust,no_run
//! use std::fs::File;
//! use quickmoov::{analyze, relocate, RelocateOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analysis = analyze(File::open("movie.mp4")?)?;
//! if !analysis.is_fast_start {
//!     relocate(
//!         File::open("movie.mp4")?,
//!         File::create("movie_modified.mp4")?,
//!         &RelocateOptions::default(),
//!     )?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Path-based API
//!
//! ```rust,no_run
//! use quickmoov::{default_output_path, Mp4File, RelocateOptions};
//!
//! # fn main() -> Result<(), quickmoov::MoovError> {
//! let file = Mp4File::open("movie.mp4")?;
//! println!("{:?}", file.analyze()?.status());
//! file.relocate_to(default_output_path("movie.mp4"), &RelocateOptions::fast_start_only())?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod files;

pub use crate::core::error::{MoovError, MoovResult};
pub use crate::core::fourcc::FourCC;
pub use files::{
    analyze, default_output_path, is_bmff, is_supported_extension, needs_relocation, relocate,
    scan, Analysis, BmffBox, LayoutStatus, Mp4File, PatchStats, RelocateOptions,
    RelocationPlan, RelocationSummary, SUPPORTED_EXTENSIONS,
};
