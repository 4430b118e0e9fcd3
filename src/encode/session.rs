use std::time::Duration;

use crate::encode::codec::{
    BufferFlags, BufferInfo, CodecFormat, DequeueStatus, InputSurface, VideoEncoder,
};
use crate::encode::config::EncoderConfig;
use crate::encode::container::ContainerWriter;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};
use crate::frame::source::Frame;

/// Upper bound for a single output poll while draining.
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Lifecycle of an [`EncoderSession`].
///
/// `Created -> Configured -> Started` happens inside [`EncoderSession::start`]; a constructed
/// session is always at least `Started`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting frames.
    Started,
    /// End of stream signalled; draining the remaining output.
    Draining,
    /// Container finalized and all resources released.
    Finalized,
}

/// Result of one drain pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// No more output is ready right now.
    Pending,
    /// The encoder delivered its end-of-stream buffer.
    EndOfStream,
}

/// Counters accumulated over a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_submitted: u64,
    pub samples_written: u64,
    pub bytes_written: u64,
    /// Presentation time of the last written sample, set once end of stream is seen.
    pub encoded_duration_us: u64,
}

/// One recording's encoder, input surface and container writer, driven as a single state
/// machine.
///
/// Every written sample gets a synthetic presentation time: `0, step, 2 * step, ...` with
/// `step = 1_000_000 / fps`. The container track is registered when the encoder reports its
/// output format, which must happen exactly once and before the first sample.
pub struct EncoderSession<E: VideoEncoder, W: ContainerWriter> {
    config: EncoderConfig,
    state: SessionState,
    encoder: E,
    surface: E::Surface,
    writer: W,
    track_index: Option<usize>,
    muxer_started: bool,
    frame_step_us: u64,
    next_pts_us: u64,
    last_pts_us: Option<u64>,
    info: BufferInfo,
    stats: SessionStats,
    released: bool,
}

impl<E: VideoEncoder, W: ContainerWriter> EncoderSession<E, W> {
    /// Configure and start `encoder`, and take ownership of `writer`.
    ///
    /// `writer` must be bound to its destination, not started and without tracks. On failure
    /// both are released.
    #[tracing::instrument(skip_all, fields(out = %config.out_path().display()))]
    pub fn start(config: EncoderConfig, mut encoder: E, mut writer: W) -> ReelResult<Self> {
        let format = CodecFormat::from_config(&config);
        tracing::debug!(?format, "configuring encoder");

        let surface = match Self::start_encoder(&mut encoder, &format) {
            Ok(surface) => surface,
            Err(err) => {
                encoder.release();
                writer.release();
                return Err(err);
            }
        };

        tracing::info!(
            width = format.width,
            height = format.height,
            fps = format.frame_rate,
            "encoder session started"
        );
        Ok(Self {
            frame_step_us: config.frame_duration_us(),
            config,
            state: SessionState::Started,
            encoder,
            surface,
            writer,
            track_index: None,
            muxer_started: false,
            next_pts_us: 0,
            last_pts_us: None,
            info: BufferInfo::default(),
            stats: SessionStats::default(),
            released: false,
        })
    }

    fn start_encoder(encoder: &mut E, format: &CodecFormat) -> ReelResult<E::Surface> {
        encoder.configure(format)?;
        let mut surface = encoder.create_input_surface()?;
        if let Err(err) = encoder.start() {
            surface.release();
            return Err(err);
        }
        Ok(surface)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Track registered in the container, once the output format is known.
    pub fn track_index(&self) -> Option<usize> {
        self.track_index
    }

    pub fn muxer_started(&self) -> bool {
        self.muxer_started
    }

    /// Presentation time the next written sample will get.
    pub fn next_presentation_time_us(&self) -> u64 {
        self.next_pts_us
    }

    pub fn encoded_duration_us(&self) -> u64 {
        self.stats.encoded_duration_us
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn container(&self) -> &W {
        &self.writer
    }

    /// Drain ready output, then clear the input surface, draw `frame` at the origin and post it.
    #[tracing::instrument(skip_all, fields(frame = frame.index.0))]
    pub fn submit_frame(&mut self, frame: &Frame) -> ReelResult<()> {
        if self.state != SessionState::Started {
            return Err(ReelError::state(format!(
                "submit_frame called in state {:?}",
                self.state
            )));
        }
        self.drain(false)?;

        let mut canvas = self.surface.lock_canvas()?;
        canvas.clear(Rgba8Premul::transparent());
        let drawn = canvas.draw(&frame.raster, 0, 0);
        // The canvas goes back to the surface even if drawing failed.
        self.surface.unlock_canvas_and_post(canvas)?;
        drawn?;

        self.stats.frames_submitted += 1;
        Ok(())
    }

    /// Move whatever output is ready into the container without waiting for more.
    pub fn drain_pending(&mut self) -> ReelResult<DrainOutcome> {
        if self.state != SessionState::Started {
            return Err(ReelError::state(format!(
                "drain_pending called in state {:?}",
                self.state
            )));
        }
        self.drain(false)
    }

    /// Signal end of stream, drain until the encoder confirms it, finalize the container and
    /// release everything. A second call fails.
    #[tracing::instrument(skip_all, fields(out = %self.config.out_path().display()))]
    pub fn finish(&mut self) -> ReelResult<SessionStats> {
        if self.state != SessionState::Started {
            return Err(ReelError::state(format!(
                "finish called in state {:?}; it must be called exactly once",
                self.state
            )));
        }
        self.state = SessionState::Draining;

        tracing::debug!("sending end of stream to encoder");
        self.encoder.signal_end_of_input_stream()?;
        self.drain(true)?;
        self.close()?;

        self.state = SessionState::Finalized;
        tracing::info!(
            frames = self.stats.frames_submitted,
            samples = self.stats.samples_written,
            bytes = self.stats.bytes_written,
            duration_us = self.stats.encoded_duration_us,
            "encoder session finalized"
        );
        Ok(self.stats)
    }

    fn drain(&mut self, end_of_stream: bool) -> ReelResult<DrainOutcome> {
        loop {
            let status = self
                .encoder
                .dequeue_output_buffer(&mut self.info, DRAIN_TIMEOUT)?;
            match status {
                DequeueStatus::TryAgainLater => {
                    if !end_of_stream {
                        return Ok(DrainOutcome::Pending);
                    }
                    tracing::trace!("no output available, spinning to await end of stream");
                }
                DequeueStatus::OutputFormatChanged => self.start_muxer()?,
                DequeueStatus::Buffer(index) => {
                    if self.consume_buffer(index, end_of_stream)? {
                        return Ok(DrainOutcome::EndOfStream);
                    }
                }
                DequeueStatus::Unexpected(code) => {
                    tracing::warn!(code, "unexpected result from dequeue_output_buffer");
                }
            }
        }
    }

    fn start_muxer(&mut self) -> ReelResult<()> {
        if self.muxer_started || self.track_index.is_some() {
            return Err(ReelError::protocol("encoder output format changed twice"));
        }
        let format = self.encoder.output_format()?;
        tracing::debug!(?format, "encoder output format changed");

        let track = self.writer.add_track(&format)?;
        self.track_index = Some(track);
        self.writer.start()?;
        self.muxer_started = true;
        Ok(())
    }

    /// Returns true once the end-of-stream buffer has been consumed.
    fn consume_buffer(&mut self, index: usize, end_of_stream: bool) -> ReelResult<bool> {
        let mut info = self.info;
        if info.flags.contains(BufferFlags::CODEC_CONFIG) {
            // Already delivered to the container through the output format.
            tracing::debug!("ignoring codec config buffer");
            info.size = 0;
        }

        let written = if info.size != 0 {
            self.write_sample(index, &mut info)
        } else {
            Ok(())
        };
        let released = self.encoder.release_output_buffer(index);
        written?;
        released?;

        if info.flags.contains(BufferFlags::END_OF_STREAM) {
            if end_of_stream {
                tracing::debug!("end of stream reached");
            } else {
                tracing::warn!("reached end of stream unexpectedly");
            }
            self.stats.encoded_duration_us = self.last_pts_us.unwrap_or(0);
            return Ok(true);
        }
        Ok(false)
    }

    fn write_sample(&mut self, index: usize, info: &mut BufferInfo) -> ReelResult<()> {
        let Some(track) = self.track_index.filter(|_| self.muxer_started) else {
            return Err(ReelError::protocol("sample arrived before the muxer started"));
        };

        let data = self.encoder.output_buffer(index)?;
        let end = info
            .offset
            .checked_add(info.size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                ReelError::encoder(format!(
                    "output buffer {index} range {}+{} exceeds its {} bytes",
                    info.offset,
                    info.size,
                    data.len()
                ))
            })?;

        info.presentation_time_us = self.next_pts_us;
        self.writer
            .write_sample_data(track, &data[info.offset..end], info)?;

        self.last_pts_us = Some(self.next_pts_us);
        self.next_pts_us += self.frame_step_us;
        self.stats.samples_written += 1;
        self.stats.bytes_written += info.size as u64;
        tracing::trace!(
            bytes = info.size,
            pts_us = info.presentation_time_us,
            "sent sample to muxer"
        );
        Ok(())
    }

    fn close(&mut self) -> ReelResult<()> {
        tracing::debug!("releasing encoder objects");
        let encoder_stopped = self.encoder.stop();
        self.encoder.release();
        self.surface.release();
        let writer_stopped = self.writer.stop();
        self.writer.release();
        self.released = true;

        encoder_stopped?;
        writer_stopped
    }
}

impl<E: VideoEncoder, W: ContainerWriter> Drop for EncoderSession<E, W> {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(state = ?self.state, "encoder session dropped before finish");
            self.encoder.release();
            self.surface.release();
            self.writer.release();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
