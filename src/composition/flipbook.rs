use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::composition::model::{Composition, scaled_size};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::frame::raster::FrameRGBA;

// Rasters above this are almost certainly a bad scale, not a real animation.
const MAX_DIM: u32 = 16_384;

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct FlipbookManifest {
    duration_frames: u64,
    keys: Vec<KeyManifest>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyManifest {
    frame: u64,
    src: String,
}

/// Artwork shown from a key frame until the next key.
#[derive(Clone, Debug)]
pub enum KeyArt {
    /// Vector artwork, rasterized with resvg at the current scale.
    Svg(Arc<usvg::Tree>),
    /// Bitmap artwork in straight-alpha RGBA8, resampled to the current scale.
    Image(Arc<image::RgbaImage>),
}

impl KeyArt {
    /// Parse SVG bytes.
    pub fn svg(bytes: &[u8]) -> ReelResult<Self> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_data(bytes, &opts)
            .map_err(|e| ReelError::composition(format!("parse svg tree: {e}")))?;
        Ok(Self::Svg(Arc::new(tree)))
    }

    /// Decode encoded bitmap bytes (PNG, JPEG, ...).
    pub fn image(bytes: &[u8]) -> ReelResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ReelError::composition(format!("decode image: {e}")))?;
        Ok(Self::Image(Arc::new(img.to_rgba8())))
    }

    fn size(&self) -> (f64, f64) {
        match self {
            Self::Svg(tree) => (
                f64::from(tree.size().width()),
                f64::from(tree.size().height()),
            ),
            Self::Image(img) => (f64::from(img.width()), f64::from(img.height())),
        }
    }

    fn rasterize(&self, width: u32, height: u32) -> ReelResult<FrameRGBA> {
        match self {
            Self::Svg(tree) => {
                let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
                    .ok_or_else(|| ReelError::composition("failed to allocate svg pixmap"))?;
                let sx = (width as f32) / tree.size().width();
                let sy = (height as f32) / tree.size().height();
                let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
                resvg::render(tree, xform, &mut pixmap.as_mut());
                FrameRGBA::from_premul(width, height, pixmap.data().to_vec())
            }
            Self::Image(img) => {
                let src: &image::RgbaImage = img;
                let resized = if src.dimensions() == (width, height) {
                    src.clone()
                } else {
                    image::imageops::resize(
                        src,
                        width,
                        height,
                        image::imageops::FilterType::Triangle,
                    )
                };
                let mut data = resized.into_raw();
                premultiply_rgba8_in_place(&mut data);
                FrameRGBA::from_premul(width, height, data)
            }
        }
    }
}

/// A composition that holds each key's artwork until the next key frame.
///
/// Loaded from a JSON manifest:
///
/// ```json
/// { "duration_frames": 48, "keys": [{ "frame": 0, "src": "a.svg" }, { "frame": 24, "src": "b.png" }] }
/// ```
///
/// Key sources are resolved relative to the manifest; `.svg` files are parsed as vector art,
/// everything else is decoded as a bitmap. The intrinsic size is the first key's size and every
/// key is stretched to it.
pub struct Flipbook {
    duration_frames: u64,
    keys: Vec<(FrameIndex, KeyArt)>,
    intrinsic: (f64, f64),
    scale: f64,
    cache: Option<(usize, FrameRGBA)>,
}

impl Flipbook {
    /// Build from already-loaded keys. Keys must start at frame 0, be strictly increasing and
    /// lie within `0..=duration_frames`.
    pub fn new(duration_frames: u64, keys: Vec<(FrameIndex, KeyArt)>) -> ReelResult<Self> {
        let Some((first_frame, first_art)) = keys.first() else {
            return Err(ReelError::composition("flipbook needs at least one key"));
        };
        if first_frame.0 != 0 {
            return Err(ReelError::composition("flipbook first key must be at frame 0"));
        }
        for pair in keys.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(ReelError::composition(
                    "flipbook key frames must be strictly increasing",
                ));
            }
        }
        if let Some((last, _)) = keys.last()
            && last.0 > duration_frames
        {
            return Err(ReelError::composition(format!(
                "flipbook key at frame {} is past duration {duration_frames}",
                last.0
            )));
        }

        let intrinsic = first_art.size();
        if !(intrinsic.0.is_finite() && intrinsic.1.is_finite())
            || intrinsic.0 <= 0.0
            || intrinsic.1 <= 0.0
        {
            return Err(ReelError::composition("flipbook has invalid width/height"));
        }

        Ok(Self {
            duration_frames,
            keys,
            intrinsic,
            scale: 1.0,
            cache: None,
        })
    }

    /// Convenience constructor for in-memory SVG documents.
    pub fn from_svgs(
        duration_frames: u64,
        keys: impl IntoIterator<Item = (FrameIndex, Vec<u8>)>,
    ) -> ReelResult<Self> {
        let keys = keys
            .into_iter()
            .map(|(frame, bytes)| Ok((frame, KeyArt::svg(&bytes)?)))
            .collect::<ReelResult<Vec<_>>>()?;
        Self::new(duration_frames, keys)
    }

    /// Load a flipbook from its JSON manifest on disk.
    #[tracing::instrument]
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read flipbook manifest '{}'", path.display()))?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&json, root)
    }

    /// Parse a manifest, resolving key sources against `assets_root`.
    pub fn from_json_str(json: &str, assets_root: &Path) -> ReelResult<Self> {
        let manifest: FlipbookManifest = serde_json::from_str(json)
            .map_err(|e| ReelError::composition(format!("parse flipbook manifest: {e}")))?;

        let mut keys = Vec::with_capacity(manifest.keys.len());
        for key in manifest.keys {
            let path = assets_root.join(&key.src);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read flipbook key '{}'", path.display()))?;
            let is_svg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
            let art = if is_svg {
                KeyArt::svg(&bytes)?
            } else {
                KeyArt::image(&bytes)?
            };
            keys.push((FrameIndex(key.frame), art));
        }

        tracing::debug!(
            keys = keys.len(),
            duration_frames = manifest.duration_frames,
            "loaded flipbook"
        );
        Self::new(manifest.duration_frames, keys)
    }

    fn key_for(&self, frame: FrameIndex) -> usize {
        self.keys
            .partition_point(|(start, _)| *start <= frame)
            .saturating_sub(1)
    }
}

impl Composition for Flipbook {
    fn intrinsic_size(&self) -> (f64, f64) {
        self.intrinsic
    }

    fn duration_frames(&self) -> u64 {
        self.duration_frames
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn set_scale(&mut self, scale: f64) -> ReelResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ReelError::composition(format!(
                "scale must be finite and positive, got {scale}"
            )));
        }
        let (w, h) = scaled_size(self.intrinsic, scale);
        if w > MAX_DIM || h > MAX_DIM {
            return Err(ReelError::composition(format!(
                "scaled raster too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
            )));
        }
        self.scale = scale;
        self.cache = None;
        Ok(())
    }

    fn render(&mut self, frame: FrameIndex) -> ReelResult<FrameRGBA> {
        if frame.0 > self.duration_frames {
            return Err(ReelError::composition(format!(
                "frame {} is past duration {}",
                frame.0, self.duration_frames
            )));
        }

        let key = self.key_for(frame);
        if let Some((cached_key, raster)) = &self.cache
            && *cached_key == key
        {
            return Ok(raster.clone());
        }

        let (w, h) = scaled_size(self.intrinsic, self.scale);
        let raster = self.keys[key].1.rasterize(w, h)?;
        self.cache = Some((key, raster.clone()));
        Ok(raster)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/flipbook.rs"]
mod tests;
