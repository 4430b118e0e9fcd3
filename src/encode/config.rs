use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// MIME type of H.264 / AVC video.
pub const MIME_AVC: &str = "video/avc";
/// MIME type of the uncompressed pass-through stream.
pub const MIME_RAW: &str = "video/raw";

pub const DEFAULT_BIT_RATE: u32 = 4 * 1000 * 1000;
pub const DEFAULT_KEY_FRAME_INTERVAL_SECS: u32 = 5;
pub const DEFAULT_WIDTH: u32 = 720;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_FPS: u32 = 30;

/// Validated, immutable encoder settings for one recording.
///
/// Construct with [`EncoderConfig::builder`]; construction fails on zero width, height, frame
/// rate or bit rate.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "EncoderConfigBuilder", into = "EncoderConfigBuilder")]
pub struct EncoderConfig {
    mime: String,
    bit_rate: u32,
    key_frame_interval_secs: u32,
    fps: u32,
    width: u32,
    height: u32,
    out_path: PathBuf,
}

impl EncoderConfig {
    /// Builder pre-populated with the defaults (H.264, 4 Mbps, 5 s key frames, 720x720 @ 30).
    pub fn builder(out_path: impl Into<PathBuf>) -> EncoderConfigBuilder {
        EncoderConfigBuilder::new(out_path)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bit_rate(&self) -> u32 {
        self.bit_rate
    }

    pub fn key_frame_interval_secs(&self) -> u32 {
        self.key_frame_interval_secs
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Fixed presentation-time step between consecutive samples.
    pub fn frame_duration_us(&self) -> u64 {
        1_000_000 / u64::from(self.fps)
    }
}

/// Builder for [`EncoderConfig`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfigBuilder {
    pub mime: String,
    pub bit_rate: u32,
    pub key_frame_interval_secs: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub out_path: PathBuf,
}

impl Default for EncoderConfigBuilder {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

impl EncoderConfigBuilder {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            mime: MIME_AVC.to_string(),
            bit_rate: DEFAULT_BIT_RATE,
            key_frame_interval_secs: DEFAULT_KEY_FRAME_INTERVAL_SECS,
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            out_path: out_path.into(),
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn bit_rate(mut self, bit_rate: u32) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    pub fn key_frame_interval_secs(mut self, secs: u32) -> Self {
        self.key_frame_interval_secs = secs;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 {
            return Err(ReelError::config("encoder width must be positive"));
        }
        if self.height == 0 {
            return Err(ReelError::config("encoder height must be positive"));
        }
        if self.fps == 0 {
            return Err(ReelError::config(
                "encoder frames per second must be positive",
            ));
        }
        if self.bit_rate == 0 {
            return Err(ReelError::config("encoder bit rate must be positive"));
        }
        if self.mime.trim().is_empty() {
            return Err(ReelError::config("encoder codec mime type must be set"));
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(ReelError::config("encoder output path must be set"));
        }
        Ok(())
    }

    pub fn build(self) -> ReelResult<EncoderConfig> {
        self.validate()?;
        Ok(EncoderConfig {
            mime: self.mime,
            bit_rate: self.bit_rate,
            key_frame_interval_secs: self.key_frame_interval_secs,
            fps: self.fps,
            width: self.width,
            height: self.height,
            out_path: self.out_path,
        })
    }
}

impl TryFrom<EncoderConfigBuilder> for EncoderConfig {
    type Error = ReelError;

    fn try_from(builder: EncoderConfigBuilder) -> ReelResult<Self> {
        builder.build()
    }
}

impl From<EncoderConfig> for EncoderConfigBuilder {
    fn from(cfg: EncoderConfig) -> Self {
        Self {
            mime: cfg.mime,
            bit_rate: cfg.bit_rate,
            key_frame_interval_secs: cfg.key_frame_interval_secs,
            fps: cfg.fps,
            width: cfg.width,
            height: cfg.height,
            out_path: cfg.out_path,
        }
    }
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/config.rs"]
mod tests;
