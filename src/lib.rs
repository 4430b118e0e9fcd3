//! animreel records frame-based animations into MP4 video.
//!
//! A recording is a straight pipeline:
//!
//! - a [`Composition`] renders premultiplied RGBA frames,
//! - a [`FrameSource`] scales it once and pulls frames `0..=duration_frames` in order,
//! - an [`EncoderSession`] draws each frame onto the encoder's input surface, drains compressed
//!   output and muxes it with synthetic, evenly spaced timestamps,
//! - a [`RecordingOperation`] drives the two and signals completion exactly once.
//!
//! The encoder and the container are capability traits ([`VideoEncoder`], [`ContainerWriter`]).
//! The default `openh264` feature binds them to a software H.264 encoder and an MP4 writer;
//! [`record_to_mp4`] wires that stack for one call.
#![forbid(unsafe_code)]

mod foundation;

/// Animation resources and the bundled flipbook composition.
pub mod composition;
/// Encoder configuration, capability traits, the encoder session and its backends.
pub mod encode;
/// Rasters and the frame source.
pub mod frame;
/// The recording driver and its completion notification.
pub mod session;

pub use crate::foundation::core::{Canvas, FrameIndex, Rgba8Premul};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::composition::flipbook::{Flipbook, KeyArt};
pub use crate::composition::model::Composition;
pub use crate::encode::codec::{
    BufferFlags, BufferInfo, CodecFormat, ColorFormat, DequeueStatus, InputSurface, OutputFormat,
    VideoEncoder,
};
pub use crate::encode::config::{EncoderConfig, EncoderConfigBuilder, MIME_AVC, MIME_RAW};
pub use crate::encode::container::ContainerWriter;
pub use crate::encode::memory::InMemoryContainer;
pub use crate::encode::mp4::Mp4ContainerWriter;
#[cfg(feature = "openh264")]
pub use crate::encode::openh264::OpenH264Encoder;
pub use crate::encode::raw::RawVideoEncoder;
pub use crate::encode::session::{DrainOutcome, EncoderSession, SessionState, SessionStats};
pub use crate::frame::raster::FrameRGBA;
pub use crate::frame::source::{Frame, FrameBounds, FrameSource, TARGET_WIDTH_PX};
pub use crate::session::completion::Completion;
#[cfg(feature = "openh264")]
pub use crate::session::recording::record_to_mp4;
pub use crate::session::recording::{RecordingOperation, RecordingSummary};
