//! The recording driver: frame source in, finished container out.

pub mod completion;
pub mod recording;
