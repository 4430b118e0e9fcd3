use std::collections::VecDeque;
use std::time::Duration;

use crate::encode::buffers::{Lifecycle, OutputQueue, PostedFrames, QueueSurface};
use crate::encode::codec::{
    BufferFlags, BufferInfo, CodecFormat, DequeueStatus, OutputFormat, VideoEncoder,
};
use crate::encode::config::MIME_RAW;
use crate::foundation::error::{ReelError, ReelResult};

/// Encoder that emits every posted canvas unchanged as one premultiplied RGBA8 sample.
///
/// `latency` frames are held back before output appears, the way a hardware encoder pipelines
/// its input. The output format is reported once, right before the first sample, and an empty
/// buffer flagged end-of-stream follows the last sample.
pub struct RawVideoEncoder {
    latency: usize,
    state: Lifecycle,
    format: Option<CodecFormat>,
    posted: PostedFrames,
    held: VecDeque<Vec<u8>>,
    out: OutputQueue,
    format_reported: bool,
    input_ended: bool,
    eos_queued: bool,
    frames_out: u64,
}

impl RawVideoEncoder {
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    pub fn with_latency(latency: usize) -> Self {
        Self {
            latency,
            state: Lifecycle::Created,
            format: None,
            posted: PostedFrames::default(),
            held: VecDeque::new(),
            out: OutputQueue::default(),
            format_reported: false,
            input_ended: false,
            eos_queued: false,
            frames_out: 0,
        }
    }

    /// Buffers dequeued and not yet released.
    pub fn buffers_in_flight(&self) -> usize {
        self.out.in_flight()
    }

    fn require(&self, state: Lifecycle, op: &str) -> ReelResult<()> {
        self.state.require(state, "raw", op)
    }

    fn pump(&mut self) -> ReelResult<()> {
        for canvas in self.posted.take_all()? {
            self.held.push_back(canvas.data);
        }

        let step = self
            .format
            .as_ref()
            .map(|f| 1_000_000 / u64::from(f.frame_rate.max(1)))
            .unwrap_or(0);
        while self.held.len() > self.latency || (self.input_ended && !self.held.is_empty()) {
            let Some(data) = self.held.pop_front() else {
                break;
            };
            let info = BufferInfo {
                offset: 0,
                size: data.len(),
                presentation_time_us: self.frames_out * step,
                flags: BufferFlags::KEY_FRAME,
            };
            self.out.push(info, data);
            self.frames_out += 1;
        }

        if self.input_ended && self.held.is_empty() && !self.eos_queued {
            self.eos_queued = true;
            let info = BufferInfo {
                offset: 0,
                size: 0,
                presentation_time_us: self.frames_out * step,
                flags: BufferFlags::END_OF_STREAM,
            };
            self.out.push(info, Vec::new());
        }
        Ok(())
    }
}

impl Default for RawVideoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for RawVideoEncoder {
    type Surface = QueueSurface;

    fn configure(&mut self, format: &CodecFormat) -> ReelResult<()> {
        self.require(Lifecycle::Created, "configure")?;
        if format.mime != MIME_RAW {
            return Err(ReelError::config(format!(
                "raw encoder cannot produce '{}'",
                format.mime
            )));
        }
        self.format = Some(format.clone());
        self.state = Lifecycle::Configured;
        Ok(())
    }

    fn create_input_surface(&mut self) -> ReelResult<QueueSurface> {
        self.require(Lifecycle::Configured, "create_input_surface")?;
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| ReelError::state("raw encoder is not configured"))?;
        Ok(self.posted.surface(format.width, format.height))
    }

    fn start(&mut self) -> ReelResult<()> {
        self.require(Lifecycle::Configured, "start")?;
        self.state = Lifecycle::Started;
        Ok(())
    }

    fn dequeue_output_buffer(
        &mut self,
        info: &mut BufferInfo,
        _timeout: Duration,
    ) -> ReelResult<DequeueStatus> {
        self.require(Lifecycle::Started, "dequeue_output_buffer")?;
        self.pump()?;

        if !self.format_reported && self.out.has_ready() {
            self.format_reported = true;
            return Ok(DequeueStatus::OutputFormatChanged);
        }
        Ok(match self.out.dequeue(info) {
            Some(index) => DequeueStatus::Buffer(index),
            None => DequeueStatus::TryAgainLater,
        })
    }

    fn output_format(&self) -> ReelResult<OutputFormat> {
        let format = self
            .format
            .as_ref()
            .filter(|_| self.format_reported)
            .ok_or_else(|| ReelError::state("raw encoder output format is not known yet"))?;
        Ok(OutputFormat {
            mime: MIME_RAW.to_string(),
            width: format.width,
            height: format.height,
            frame_rate: format.frame_rate,
            codec_specific_data: Vec::new(),
        })
    }

    fn output_buffer(&self, index: usize) -> ReelResult<&[u8]> {
        self.out.get(index)
    }

    fn release_output_buffer(&mut self, index: usize) -> ReelResult<()> {
        self.out.release(index)
    }

    fn signal_end_of_input_stream(&mut self) -> ReelResult<()> {
        self.require(Lifecycle::Started, "signal_end_of_input_stream")?;
        if self.input_ended {
            return Err(ReelError::state("end of input stream already signalled"));
        }
        self.input_ended = true;
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<()> {
        self.require(Lifecycle::Started, "stop")?;
        self.state = Lifecycle::Stopped;
        Ok(())
    }

    fn release(&mut self) {
        self.state = Lifecycle::Released;
        self.held.clear();
        self.out.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/raw.rs"]
mod tests;
