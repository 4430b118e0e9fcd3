use std::path::PathBuf;

use crate::composition::model::Composition;
use crate::encode::codec::VideoEncoder;
use crate::encode::container::ContainerWriter;
use crate::encode::session::EncoderSession;
use crate::foundation::error::{ReelError, ReelResult};
use crate::frame::source::FrameSource;
use crate::session::completion::{Completion, CompletionHub};

#[cfg(feature = "openh264")]
use crate::encode::{config::EncoderConfig, mp4::Mp4ContainerWriter, openh264::OpenH264Encoder};

/// What a finished recording produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingSummary {
    pub frames: u64,
    pub samples_written: u64,
    pub bytes_written: u64,
    /// Presentation time of the last sample.
    pub encoded_duration_us: u64,
    pub out_path: PathBuf,
}

/// Pulls every frame out of a [`FrameSource`] into an [`EncoderSession`], finalizes the
/// container, then notifies completion listeners exactly once.
///
/// ```no_run
/// # use animreel::{EncoderConfig, EncoderSession, FrameSource, Flipbook, Mp4ContainerWriter,
/// #     OpenH264Encoder, RecordingOperation};
/// # fn main() -> animreel::ReelResult<()> {
/// let comp = Flipbook::from_path("anim/manifest.json".as_ref())?;
/// let config = EncoderConfig::builder("out/anim.mp4").build()?;
/// let writer = Mp4ContainerWriter::create(config.out_path())?;
/// let session = EncoderSession::start(config, OpenH264Encoder::new(), writer)?;
///
/// let mut op = RecordingOperation::new(FrameSource::new(comp)?, session);
/// let done = op.subscribe();
/// let summary = op.start()?;
/// assert!(done.wait());
/// println!("wrote {} samples to {}", summary.samples_written, summary.out_path.display());
/// # Ok(())
/// # }
/// ```
pub struct RecordingOperation<C, E, W>
where
    C: Composition,
    E: VideoEncoder,
    W: ContainerWriter,
{
    source: FrameSource<C>,
    session: EncoderSession<E, W>,
    completion: CompletionHub,
}

impl<C, E, W> RecordingOperation<C, E, W>
where
    C: Composition,
    E: VideoEncoder,
    W: ContainerWriter,
{
    pub fn new(source: FrameSource<C>, session: EncoderSession<E, W>) -> Self {
        Self {
            source,
            session,
            completion: CompletionHub::default(),
        }
    }

    /// Run `f` once the recording has completed. Not called if it fails.
    pub fn on_complete(&mut self, f: impl FnOnce() + Send + 'static) -> &mut Self {
        self.completion.on_complete(f);
        self
    }

    /// A handle that resolves once the recording has completed.
    pub fn subscribe(&mut self) -> Completion {
        self.completion.subscribe()
    }

    /// True while the source still has frames to deliver.
    pub fn is_recording(&self) -> bool {
        !self.source.has_ended()
    }

    pub fn source(&self) -> &FrameSource<C> {
        &self.source
    }

    pub fn session(&self) -> &EncoderSession<E, W> {
        &self.session
    }

    /// Record every remaining frame and finalize the container.
    ///
    /// The first error aborts the recording; the session is then dropped, which releases the
    /// encoder and the container without finalizing the file. A source with no frames at all is
    /// rejected before anything is submitted.
    #[tracing::instrument(skip_all, fields(out = %self.session.config().out_path().display()))]
    pub fn start(mut self) -> ReelResult<RecordingSummary> {
        if self.source.total_frames() == 0 {
            return Err(ReelError::composition(
                "composition produces no frames within the recording bounds",
            ));
        }
        tracing::info!(
            frames = self.source.total_frames(),
            fps = self.session.config().fps(),
            "recording started"
        );

        while !self.source.has_ended() {
            let frame = self.source.next_frame()?;
            self.session.submit_frame(&frame)?;
        }
        let stats = self.session.finish()?;

        let summary = RecordingSummary {
            frames: stats.frames_submitted,
            samples_written: stats.samples_written,
            bytes_written: stats.bytes_written,
            encoded_duration_us: stats.encoded_duration_us,
            out_path: self.session.config().out_path().to_path_buf(),
        };
        tracing::info!(
            frames = summary.frames,
            duration_us = summary.encoded_duration_us,
            listeners = self.completion.listeners(),
            "recording complete"
        );
        self.completion.fire();
        Ok(summary)
    }
}

/// Record `comp` to an H.264 MP4 at `config.out_path()`, scaled to the default target width.
#[cfg(feature = "openh264")]
#[tracing::instrument(skip_all, fields(out = %config.out_path().display()))]
pub fn record_to_mp4<C: Composition>(
    comp: C,
    config: EncoderConfig,
) -> ReelResult<RecordingSummary> {
    let source = FrameSource::new(comp)?;
    let writer = Mp4ContainerWriter::create(config.out_path())?;
    let session = EncoderSession::start(config, OpenH264Encoder::new(), writer)?;
    RecordingOperation::new(source, session).start()
}

#[cfg(test)]
#[path = "../../tests/unit/session/recording.rs"]
mod tests;
