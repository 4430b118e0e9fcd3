use std::time::Duration;

use openh264::encoder::{Encoder, EncoderConfig as H264Config, FrameType, RateControlMode};
use openh264::formats::{RGBSource, YUVBuffer};
use openh264::{OpenH264API, Timestamp};

use crate::encode::buffers::{Lifecycle, OutputQueue, PostedFrames, QueueSurface};
use crate::encode::codec::{
    BufferFlags, BufferInfo, CodecFormat, DequeueStatus, OutputFormat, VideoEncoder,
};
use crate::encode::config::MIME_AVC;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::flatten_to_opaque_rgba8;
use crate::frame::raster::FrameRGBA;

const NAL_TYPE_SPS: u8 = 7;
const NAL_TYPE_PPS: u8 = 8;

/// Transparent pixels are composited over opaque black before encoding.
const BACKGROUND_RGBA: [u8; 4] = [0, 0, 0, 255];

/// Software H.264 encoder backed by OpenH264.
///
/// Output is Annex-B. The SPS/PPS are reported through the output format and once as a
/// [`BufferFlags::CODEC_CONFIG`] buffer; picture samples never carry them. A key frame is forced
/// every `key_frame_interval_secs * frame_rate` frames, or on every frame when the interval is
/// zero. Rate control targets `bit_rate` with frame skipping disabled, so every submitted frame
/// produces a sample and short bursts may overshoot the target.
pub struct OpenH264Encoder {
    state: Lifecycle,
    format: Option<CodecFormat>,
    inner: Option<Encoder>,
    posted: PostedFrames,
    out: OutputQueue,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    config_queued: bool,
    format_reported: bool,
    input_ended: bool,
    eos_queued: bool,
    frames_in: u64,
    rgba: Vec<u8>,
}

impl OpenH264Encoder {
    pub fn new() -> Self {
        Self {
            state: Lifecycle::Created,
            format: None,
            inner: None,
            posted: PostedFrames::default(),
            out: OutputQueue::default(),
            sps: None,
            pps: None,
            config_queued: false,
            format_reported: false,
            input_ended: false,
            eos_queued: false,
            frames_in: 0,
            rgba: Vec::new(),
        }
    }

    /// Frames encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_in
    }

    fn require(&self, state: Lifecycle, op: &str) -> ReelResult<()> {
        self.state.require(state, "openh264", op)
    }

    fn pump(&mut self) -> ReelResult<()> {
        for canvas in self.posted.take_all()? {
            self.encode_canvas(&canvas)?;
        }
        if self.input_ended && !self.eos_queued {
            self.eos_queued = true;
            let info = BufferInfo {
                offset: 0,
                size: 0,
                presentation_time_us: self.pts_us(self.frames_in),
                flags: BufferFlags::END_OF_STREAM,
            };
            self.out.push(info, Vec::new());
        }
        Ok(())
    }

    fn pts_us(&self, frame: u64) -> u64 {
        let fps = self.format.as_ref().map_or(1, |f| u64::from(f.frame_rate.max(1)));
        frame * 1_000_000 / fps
    }

    fn key_frame_due(&self) -> bool {
        let Some(format) = self.format.as_ref() else {
            return false;
        };
        if format.key_frame_interval_secs == 0 {
            return self.frames_in > 0;
        }
        let interval = u64::from(format.key_frame_interval_secs) * u64::from(format.frame_rate);
        self.frames_in > 0 && self.frames_in.is_multiple_of(interval)
    }

    fn encode_canvas(&mut self, canvas: &FrameRGBA) -> ReelResult<()> {
        self.rgba.resize(canvas.data.len(), 0);
        flatten_to_opaque_rgba8(
            &mut self.rgba,
            &canvas.data,
            canvas.premultiplied,
            BACKGROUND_RGBA,
        )?;
        let yuv = YUVBuffer::from_rgb_source(OpaqueRgb {
            width: canvas.width as usize,
            height: canvas.height as usize,
            rgba: &self.rgba,
        });

        let force_key = self.key_frame_due();
        let pts_us = self.pts_us(self.frames_in);
        let encoder = self
            .inner
            .as_mut()
            .ok_or_else(|| ReelError::state("openh264 encoder is not configured"))?;
        if force_key {
            tracing::debug!(frame = self.frames_in, "forcing key frame");
            encoder.force_intra_frame();
        }
        let bitstream = encoder
            .encode_at(&yuv, Timestamp::from_millis(pts_us / 1000))
            .map_err(|e| ReelError::encoder(format!("openh264 encode failed: {e}")))?;

        let key = matches!(bitstream.frame_type(), FrameType::I | FrameType::IDR);
        let mut sample = Vec::new();
        for l in 0..bitstream.num_layers() {
            let Some(layer) = bitstream.layer(l) else {
                continue;
            };
            for n in 0..layer.nal_count() {
                let Some(nal) = layer.nal_unit(n) else {
                    continue;
                };
                match nal_type(nal) {
                    Some(NAL_TYPE_SPS) => {
                        self.sps.get_or_insert_with(|| nal.to_vec());
                    }
                    Some(NAL_TYPE_PPS) => {
                        self.pps.get_or_insert_with(|| nal.to_vec());
                    }
                    _ if layer.is_video() => sample.extend_from_slice(nal),
                    _ => {}
                }
            }
        }
        let frame = self.frames_in;
        self.frames_in += 1;

        if !self.config_queued
            && let (Some(sps), Some(pps)) = (&self.sps, &self.pps)
        {
            let mut csd = Vec::with_capacity(sps.len() + pps.len());
            csd.extend_from_slice(sps);
            csd.extend_from_slice(pps);
            let info = BufferInfo {
                offset: 0,
                size: csd.len(),
                presentation_time_us: 0,
                flags: BufferFlags::CODEC_CONFIG,
            };
            self.out.push(info, csd);
            self.config_queued = true;
        }

        if sample.is_empty() {
            tracing::warn!(frame, "encoder produced no picture");
            return Ok(());
        }
        if !self.config_queued {
            return Err(ReelError::encoder(
                "encoder produced a picture before its parameter sets",
            ));
        }
        let info = BufferInfo {
            offset: 0,
            size: sample.len(),
            presentation_time_us: pts_us,
            flags: if key {
                BufferFlags::KEY_FRAME
            } else {
                BufferFlags::NONE
            },
        };
        tracing::trace!(frame, bytes = sample.len(), key, "encoded frame");
        self.out.push(info, sample);
        Ok(())
    }
}

impl Default for OpenH264Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for OpenH264Encoder {
    type Surface = QueueSurface;

    #[tracing::instrument(skip_all, fields(width = format.width, height = format.height))]
    fn configure(&mut self, format: &CodecFormat) -> ReelResult<()> {
        self.require(Lifecycle::Created, "configure")?;
        if format.mime != MIME_AVC {
            return Err(ReelError::config(format!(
                "openh264 cannot produce '{}'",
                format.mime
            )));
        }
        let even = |v: u32| v > 0 && v.is_multiple_of(2);
        if !even(format.width) || !even(format.height) {
            return Err(ReelError::config(format!(
                "openh264 needs even, non-zero dimensions, got {}x{}",
                format.width, format.height
            )));
        }
        if format.frame_rate == 0 {
            return Err(ReelError::config("openh264 needs a positive frame rate"));
        }

        let config = H264Config::new()
            .rate_control_mode(RateControlMode::Bitrate)
            .set_bitrate_bps(format.bit_rate)
            .max_frame_rate(format.frame_rate as f32)
            .enable_skip_frame(false);
        let encoder = Encoder::with_api_config(OpenH264API::from_source(), config)
            .map_err(|e| ReelError::encoder(format!("failed to create openh264 encoder: {e}")))?;
        tracing::debug!(bit_rate = format.bit_rate, fps = format.frame_rate, "openh264 configured");

        self.inner = Some(encoder);
        self.format = Some(format.clone());
        self.state = Lifecycle::Configured;
        Ok(())
    }

    fn create_input_surface(&mut self) -> ReelResult<QueueSurface> {
        self.require(Lifecycle::Configured, "create_input_surface")?;
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| ReelError::state("openh264 encoder is not configured"))?;
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

        if !self.format_reported && self.config_queued && self.out.has_ready() {
            self.format_reported = true;
            return Ok(DequeueStatus::OutputFormatChanged);
        }
        Ok(match self.out.dequeue(info) {
            Some(index) => DequeueStatus::Buffer(index),
            None => DequeueStatus::TryAgainLater,
        })
    }

    fn output_format(&self) -> ReelResult<OutputFormat> {
        let (Some(format), Some(sps), Some(pps)) = (&self.format, &self.sps, &self.pps) else {
            return Err(ReelError::state(
                "openh264 output format is not known yet",
            ));
        };
        if !self.format_reported {
            return Err(ReelError::state(
                "openh264 output format is not known yet",
            ));
        }
        Ok(OutputFormat {
            mime: MIME_AVC.to_string(),
            width: format.width,
            height: format.height,
            frame_rate: format.frame_rate,
            codec_specific_data: vec![sps.clone(), pps.clone()],
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
        self.inner = None;
        self.out.clear();
    }
}

/// Straight RGBA8 pixels with alpha already flattened away.
struct OpaqueRgb<'a> {
    width: usize,
    height: usize,
    rgba: &'a [u8],
}

impl RGBSource for OpaqueRgb<'_> {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn pixel_f32(&self, x: usize, y: usize) -> (f32, f32, f32) {
        let i = (y * self.width + x) * 4;
        (
            f32::from(self.rgba[i]),
            f32::from(self.rgba[i + 1]),
            f32::from(self.rgba[i + 2]),
        )
    }
}

/// NAL unit type of an Annex-B unit (start code included).
fn nal_type(nal: &[u8]) -> Option<u8> {
    let payload = if nal.starts_with(&[0, 0, 0, 1]) {
        &nal[4..]
    } else if nal.starts_with(&[0, 0, 1]) {
        &nal[3..]
    } else {
        nal
    };
    payload.first().map(|b| b & 0x1f)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/openh264.rs"]
mod tests;
