//! Container format implementations

pub mod bmff;
