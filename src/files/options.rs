//! Relocation options
//!
//! This module defines the switches that control what a rewrite does.

/// Options for a relocation.
///
/// Both switches are on by default. Use the presets or the builder methods
/// to turn one of them off.
///
/// # Example
///
/// ```rust,no_run
/// use quickmoov::{Mp4File, RelocateOptions};
///
/// let file = Mp4File::open("movie.mp4")?;
/// // Move moov to the front but leave padding boxes where they are
/// file.relocate_to("movie_modified.mp4", &RelocateOptions::default().keep_padding())?;
/// # Ok::<(), quickmoov::MoovError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelocateOptions {
    /// Move `moov` ahead of `mdat` when it trails it
    pub move_metadata_to_front: bool,
    /// Drop `free`/`skip` boxes
    pub remove_padding: bool,
}

impl Default for RelocateOptions {
    fn default() -> Self {
        Self {
            move_metadata_to_front: true,
            remove_padding: true,
        }
    }
}

impl RelocateOptions {
    /// Only move `moov` to the front; keep padding.
    pub fn fast_start_only() -> Self {
        Self::default().keep_padding()
    }

    /// Only strip padding; leave `moov` where it is.
    pub fn remove_padding_only() -> Self {
        Self::default().keep_metadata_in_place()
    }

    /// Keep `free`/`skip` boxes in the output.
    pub fn keep_padding(mut self) -> Self {
        self.remove_padding = false;
        self
    }

    /// Do not move `moov`.
    pub fn keep_metadata_in_place(mut self) -> Self {
        self.move_metadata_to_front = false;
        self
    }
}
