//! Core types shared by every layer: errors and box tags.

pub mod error;
pub mod fourcc;

pub use error::{MoovError, MoovResult};
pub use fourcc::FourCC;
