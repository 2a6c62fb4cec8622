//! Container file support
//!
//! This module provides the box-level scanner, analyzer and relocation
//! engine (under [`formats::bmff`]) and the path-based [`Mp4File`] API on
//! top of them.

pub mod file;
pub mod formats;
pub mod options;

pub use file::{default_output_path, is_supported_extension, Mp4File, SUPPORTED_EXTENSIONS};
pub use formats::bmff::{
    analyze, is_bmff, needs_relocation, relocate, scan, Analysis, BmffBox, LayoutStatus,
    PatchStats, RelocationPlan, RelocationSummary,
};
pub use options::RelocateOptions;
