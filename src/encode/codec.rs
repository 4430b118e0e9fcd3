use std::ops::BitOr;
use std::time::Duration;

use crate::encode::config::EncoderConfig;
use crate::foundation::error::ReelResult;
use crate::frame::raster::FrameRGBA;

/// Pixel source the encoder reads its input from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorFormat {
    /// Input arrives through a drawable [`InputSurface`].
    Surface,
}

/// Format descriptor an encoder is configured with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecFormat {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub color_format: ColorFormat,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub key_frame_interval_secs: u32,
}

impl CodecFormat {
    pub fn from_config(cfg: &EncoderConfig) -> Self {
        Self {
            mime: cfg.mime().to_string(),
            width: cfg.width(),
            height: cfg.height(),
            color_format: ColorFormat::Surface,
            bit_rate: cfg.bit_rate(),
            frame_rate: cfg.fps(),
            key_frame_interval_secs: cfg.key_frame_interval_secs(),
        }
    }
}

/// Format an encoder reports once it knows its actual output parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFormat {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Codec-specific setup data. For AVC: `[sps, pps]` as Annex-B NAL units.
    pub codec_specific_data: Vec<Vec<u8>>,
}

/// Per-buffer flags reported by [`VideoEncoder::dequeue_output_buffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferFlags(u32);

impl BufferFlags {
    pub const NONE: Self = Self(0);
    /// The buffer holds a sync sample.
    pub const KEY_FRAME: Self = Self(1);
    /// The buffer holds codec setup data, already delivered through [`OutputFormat`].
    pub const CODEC_CONFIG: Self = Self(1 << 1);
    /// The last buffer of the stream.
    pub const END_OF_STREAM: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for BufferFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Metadata of one output buffer. `offset..offset + size` is the valid byte range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferInfo {
    pub offset: usize,
    pub size: usize,
    pub presentation_time_us: u64,
    pub flags: BufferFlags,
}

/// Result of polling the encoder's output queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DequeueStatus {
    /// Nothing is ready within the timeout.
    TryAgainLater,
    /// The output format is now known; read it with [`VideoEncoder::output_format`].
    OutputFormatChanged,
    /// An output buffer is ready; its metadata was written into the `BufferInfo`.
    Buffer(usize),
    /// A status code the caller does not understand. Not fatal; poll again.
    Unexpected(i32),
}

/// Drawable render target whose posted contents become the encoder's next input frame.
pub trait InputSurface {
    /// Borrow a canvas sized to the encoder's input. Contents are unspecified.
    fn lock_canvas(&mut self) -> ReelResult<FrameRGBA>;

    /// Submit the canvas as the next input frame.
    fn unlock_canvas_and_post(&mut self, canvas: FrameRGBA) -> ReelResult<()>;

    fn release(&mut self);
}

/// Stateful video encoder with a surface input and a polled output queue.
///
/// Lifecycle: `configure` -> `create_input_surface` -> `start` -> repeated
/// `dequeue_output_buffer`/`release_output_buffer` -> `signal_end_of_input_stream` -> drain until
/// a buffer flagged [`BufferFlags::END_OF_STREAM`] -> `stop` -> `release`.
pub trait VideoEncoder {
    type Surface: InputSurface;

    fn configure(&mut self, format: &CodecFormat) -> ReelResult<()>;

    fn create_input_surface(&mut self) -> ReelResult<Self::Surface>;

    fn start(&mut self) -> ReelResult<()>;

    /// Poll for output, waiting at most `timeout`. On [`DequeueStatus::Buffer`] `info` is filled.
    fn dequeue_output_buffer(
        &mut self,
        info: &mut BufferInfo,
        timeout: Duration,
    ) -> ReelResult<DequeueStatus>;

    fn output_format(&self) -> ReelResult<OutputFormat>;

    /// Bytes of a dequeued, not yet released buffer.
    fn output_buffer(&self, index: usize) -> ReelResult<&[u8]>;

    /// Hand a dequeued buffer back to the encoder's pool.
    fn release_output_buffer(&mut self, index: usize) -> ReelResult<()>;

    fn signal_end_of_input_stream(&mut self) -> ReelResult<()>;

    fn stop(&mut self) -> ReelResult<()>;

    fn release(&mut self);
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
