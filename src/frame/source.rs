use crate::composition::model::Composition;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::frame::raster::FrameRGBA;

/// Output width every composition is scaled to before the first frame is rendered.
pub const TARGET_WIDTH_PX: f64 = 720.0;

/// Which end index the frame source stops at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameBounds {
    /// Render indices `0..=duration_frames`, i.e. one frame more than the nominal duration.
    /// This matches recordings produced by earlier versions of the recorder.
    #[default]
    InclusiveEnd,
    /// Render indices `0..duration_frames`.
    ExclusiveEnd,
}

/// One rendered frame, consumed immediately by the encoder.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: FrameIndex,
    pub raster: FrameRGBA,
}

/// Pulls successive frames out of a [`Composition`].
pub struct FrameSource<C> {
    comp: C,
    duration_frames: u64,
    current: FrameIndex,
    bounds: FrameBounds,
}

impl<C: Composition> FrameSource<C> {
    /// Scale `comp` so its width matches [`TARGET_WIDTH_PX`] and start at frame 0.
    pub fn new(comp: C) -> ReelResult<Self> {
        Self::with_target_width(comp, TARGET_WIDTH_PX)
    }

    /// Scale `comp` so its width matches `target_width`, preserving aspect ratio.
    pub fn with_target_width(mut comp: C, target_width: f64) -> ReelResult<Self> {
        if !target_width.is_finite() || target_width <= 0.0 {
            return Err(ReelError::config("target width must be finite and positive"));
        }
        let (intrinsic_w, _) = comp.intrinsic_size();
        if !intrinsic_w.is_finite() || intrinsic_w <= 0.0 {
            return Err(ReelError::composition(format!(
                "composition has invalid intrinsic width {intrinsic_w}"
            )));
        }
        comp.set_scale(target_width / intrinsic_w)?;

        Ok(Self {
            duration_frames: comp.duration_frames(),
            comp,
            current: FrameIndex(0),
            bounds: FrameBounds::default(),
        })
    }

    pub fn with_bounds(mut self, bounds: FrameBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn bounds(&self) -> FrameBounds {
        self.bounds
    }

    /// Number of frames this source produces in total.
    pub fn total_frames(&self) -> u64 {
        match self.bounds {
            FrameBounds::InclusiveEnd => self.duration_frames.saturating_add(1),
            FrameBounds::ExclusiveEnd => self.duration_frames,
        }
    }

    /// Index the next call to [`FrameSource::next_frame`] renders.
    pub fn position(&self) -> FrameIndex {
        self.current
    }

    pub fn has_ended(&self) -> bool {
        self.current.0 >= self.total_frames()
    }

    /// Render the current frame, then advance the cursor by one.
    pub fn next_frame(&mut self) -> ReelResult<Frame> {
        if self.has_ended() {
            return Err(ReelError::state(format!(
                "frame source exhausted after {} frames",
                self.total_frames()
            )));
        }
        let index = self.current;
        let raster = self.comp.render(index)?;
        self.current = index.next();
        Ok(Frame { index, raster })
    }

    pub fn composition(&self) -> &C {
        &self.comp
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/source.rs"]
mod tests;
