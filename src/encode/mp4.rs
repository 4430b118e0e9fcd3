use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mp4::{
    AvcConfig, FourCC, MediaConfig, Mp4Config, Mp4Sample, Mp4Writer, TrackConfig, TrackType,
};

use crate::encode::codec::{BufferFlags, BufferInfo, OutputFormat};
use crate::encode::config::{MIME_AVC, ensure_parent_dir};
use crate::encode::container::ContainerWriter;
use crate::foundation::error::{ReelError, ReelResult};

/// Movie and track timescale, so presentation times in microseconds map one to one.
const MOVIE_TIMESCALE: u32 = 1_000_000;
const TRACK_TIMESCALE: u32 = MOVIE_TIMESCALE;
/// mp4 track ids are 1-based.
const MP4_TRACK_ID: u32 = 1;

/// Sample waiting for its successor, which determines its duration.
struct PendingSample {
    start_us: u64,
    is_sync: bool,
    bytes: Vec<u8>,
}

enum WriterState {
    /// File created, no mp4 header written yet.
    Idle(BufWriter<File>),
    Running(Mp4Writer<BufWriter<File>>),
    Stopped,
    Released,
}

/// Single-track H.264 MP4 container writer.
///
/// Accepts Annex-B access units (start-code delimited NAL units) and stores them length-prefixed.
/// The track's SPS/PPS come from [`OutputFormat::codec_specific_data`]. Sample durations are the
/// gaps between consecutive presentation times. The last sample has zero duration, so the track
/// and movie durations equal the last presentation time relative to the first.
pub struct Mp4ContainerWriter {
    path: PathBuf,
    state: WriterState,
    track: Option<TrackConfig>,
    pending: Option<PendingSample>,
    samples_written: u64,
}

impl Mp4ContainerWriter {
    /// Create (or truncate) the output file, creating missing parent directories.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>) -> ReelResult<Self> {
        use anyhow::Context as _;

        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let file = File::create(path)
            .with_context(|| format!("failed to create '{}'", path.display()))?;
        tracing::debug!("created mp4 output file");

        Ok(Self {
            path: path.to_path_buf(),
            state: WriterState::Idle(BufWriter::new(file)),
            track: None,
            pending: None,
            samples_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples handed to the mp4 writer so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    fn flush_pending(&mut self, duration_us: u32) -> ReelResult<()> {
        let Some(sample) = self.pending.take() else {
            return Ok(());
        };
        let WriterState::Running(mp4) = &mut self.state else {
            return Err(ReelError::state("mp4 writer is not running"));
        };
        mp4.write_sample(
            MP4_TRACK_ID,
            &Mp4Sample {
                start_time: sample.start_us,
                duration: duration_us,
                rendering_offset: 0,
                is_sync: sample.is_sync,
                bytes: sample.bytes.into(),
            },
        )
        .map_err(mp4_error("failed to write mp4 sample"))?;
        self.samples_written += 1;
        Ok(())
    }
}

impl ContainerWriter for Mp4ContainerWriter {
    fn add_track(&mut self, format: &OutputFormat) -> ReelResult<usize> {
        if !matches!(self.state, WriterState::Idle(_)) {
            return Err(ReelError::protocol("add_track called after start"));
        }
        if self.track.is_some() {
            return Err(ReelError::protocol("mp4 writer supports a single video track"));
        }
        if format.mime != MIME_AVC {
            return Err(ReelError::container(format!(
                "mp4 writer cannot store '{}' streams",
                format.mime
            )));
        }
        let [sps, pps, ..] = format.codec_specific_data.as_slice() else {
            return Err(ReelError::container(
                "avc output format is missing its SPS/PPS",
            ));
        };
        if format.frame_rate == 0 {
            return Err(ReelError::container("output format has a zero frame rate"));
        }

        let dim = |v: u32, what: &str| {
            u16::try_from(v)
                .map_err(|_| ReelError::container(format!("{what} {v} does not fit an mp4 track")))
        };
        self.track = Some(TrackConfig {
            track_type: TrackType::Video,
            timescale: TRACK_TIMESCALE,
            language: "und".to_string(),
            media_conf: MediaConfig::AvcConfig(AvcConfig {
                width: dim(format.width, "width")?,
                height: dim(format.height, "height")?,
                seq_param_set: strip_start_code(sps).to_vec(),
                pic_param_set: strip_start_code(pps).to_vec(),
            }),
        });
        Ok(0)
    }

    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    fn start(&mut self) -> ReelResult<()> {
        let Some(track) = self.track.as_ref() else {
            return Err(ReelError::protocol("container started without tracks"));
        };
        let writer = match std::mem::replace(&mut self.state, WriterState::Released) {
            WriterState::Idle(writer) => writer,
            other => {
                self.state = other;
                return Err(ReelError::state("mp4 writer already started"));
            }
        };

        let mut mp4 = Mp4Writer::write_start(
            writer,
            &Mp4Config {
                major_brand: brand("isom")?,
                minor_version: 512,
                compatible_brands: vec![
                    brand("isom")?,
                    brand("iso2")?,
                    brand("avc1")?,
                    brand("mp41")?,
                ],
                timescale: MOVIE_TIMESCALE,
            },
        )
        .map_err(mp4_error("failed to write mp4 header"))?;
        mp4.add_track(track)
            .map_err(mp4_error("failed to add mp4 track"))?;

        self.state = WriterState::Running(mp4);
        tracing::debug!("mp4 writer started");
        Ok(())
    }

    fn write_sample_data(
        &mut self,
        track: usize,
        data: &[u8],
        info: &BufferInfo,
    ) -> ReelResult<()> {
        if !matches!(self.state, WriterState::Running(_)) {
            return Err(ReelError::protocol(
                "sample written while container is not running",
            ));
        }
        if track != 0 {
            return Err(ReelError::protocol(format!("unknown track index {track}")));
        }

        let bytes = annex_b_to_avcc(data);
        if bytes.is_empty() {
            return Err(ReelError::container("sample holds no NAL units"));
        }

        if let Some(prev_us) = self.pending.as_ref().map(|p| p.start_us) {
            let gap = info
                .presentation_time_us
                .checked_sub(prev_us)
                .filter(|&gap| gap > 0)
                .ok_or_else(|| {
                    ReelError::protocol(format!(
                        "presentation time {} does not follow {prev_us}",
                        info.presentation_time_us
                    ))
                })?;
            let gap = u32::try_from(gap)
                .map_err(|_| ReelError::container(format!("sample gap of {gap}us is too long")))?;
            self.flush_pending(gap)?;
        }
        self.pending = Some(PendingSample {
            start_us: info.presentation_time_us,
            is_sync: info.flags.contains(BufferFlags::KEY_FRAME),
            bytes,
        });
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    fn stop(&mut self) -> ReelResult<()> {
        if !matches!(self.state, WriterState::Running(_)) {
            return Err(ReelError::state("container stopped while not running"));
        }
        self.flush_pending(0)?;

        let WriterState::Running(mut mp4) = std::mem::replace(&mut self.state, WriterState::Stopped)
        else {
            return Err(ReelError::state("container stopped while not running"));
        };
        mp4.write_end()
            .map_err(mp4_error("failed to finalize mp4"))?;
        mp4.into_writer().flush().map_err(|e| {
            ReelError::container(format!("failed to flush '{}': {e}", self.path.display()))
        })?;

        tracing::info!(samples = self.samples_written, "mp4 finalized");
        Ok(())
    }

    fn release(&mut self) {
        if let WriterState::Idle(_) | WriterState::Running(_) = self.state {
            tracing::warn!(
                path = %self.path.display(),
                "mp4 writer released before stop; file is incomplete"
            );
        }
        self.state = WriterState::Released;
        self.pending = None;
    }
}

fn brand(code: &str) -> ReelResult<FourCC> {
    code.parse::<FourCC>()
        .map_err(|e| ReelError::container(format!("invalid brand '{code}': {e}")))
}

fn mp4_error(what: &'static str) -> impl FnOnce(mp4::Error) -> ReelError {
    move |e| ReelError::container(format!("{what}: {e}"))
}

fn strip_start_code(nal: &[u8]) -> &[u8] {
    if nal.starts_with(&[0, 0, 0, 1]) {
        &nal[4..]
    } else if nal.starts_with(&[0, 0, 1]) {
        &nal[3..]
    } else {
        nal
    }
}

/// Split an Annex-B byte stream into NAL unit payloads (start codes removed).
///
/// Data without any start code is treated as a single NAL unit.
pub(crate) fn nal_units(data: &[u8]) -> Vec<&[u8]> {
    // (start code offset, payload offset)
    let mut marks = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            let code_start = if i > 0 && data[i - 1] == 0 { i - 1 } else { i };
            marks.push((code_start, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }
    if marks.is_empty() {
        return if data.is_empty() { Vec::new() } else { vec![data] };
    }

    let mut nals = Vec::with_capacity(marks.len());
    for (k, &(_, payload)) in marks.iter().enumerate() {
        let end = marks.get(k + 1).map_or(data.len(), |&(code, _)| code);
        if payload < end {
            nals.push(&data[payload..end]);
        }
    }
    nals
}

/// Rewrite Annex-B NAL units as 4-byte big-endian length-prefixed units.
pub(crate) fn annex_b_to_avcc(data: &[u8]) -> Vec<u8> {
    let nals = nal_units(data);
    let mut out = Vec::with_capacity(data.len() + nals.len() * 4);
    for nal in nals {
        out.extend_from_slice(&(nal.len() as u32).to_be_bytes());
        out.extend_from_slice(nal);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/encode/mp4.rs"]
mod tests;
