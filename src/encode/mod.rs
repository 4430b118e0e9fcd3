//! Encoding: configuration, encoder/container capability traits, the encoder session state
//! machine, and the bundled backends.
//!
//! The session only talks to [`codec::VideoEncoder`], [`codec::InputSurface`] and
//! [`container::ContainerWriter`]. Backends bind those to a concrete encoder and muxer.

/// Surface and output-buffer plumbing shared by the software encoders.
pub mod buffers;
pub mod codec;
pub mod config;
pub mod container;
/// In-memory container writer for tests and debugging.
pub mod memory;
/// MP4 container writer.
pub mod mp4;
/// Software H.264 encoder.
#[cfg(feature = "openh264")]
pub mod openh264;
/// Uncompressed pass-through encoder for tests and debugging.
pub mod raw;
pub mod session;
