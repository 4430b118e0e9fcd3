use crate::foundation::core::FrameIndex;
use crate::foundation::error::ReelResult;
use crate::frame::raster::FrameRGBA;

/// An animation resource that can be rasterized frame by frame.
///
/// This is the boundary to the rendering engine: the recorder only ever asks for the intrinsic
/// size, the frame count, sets a scale once, and renders frames in increasing order.
pub trait Composition {
    /// Unscaled size of the animation in logical pixels.
    fn intrinsic_size(&self) -> (f64, f64);

    /// Nominal duration in frames. Valid render indices are `0..=duration_frames`.
    fn duration_frames(&self) -> u64;

    /// Current raster scale factor (1.0 renders at intrinsic size).
    fn scale(&self) -> f64;

    /// Set the raster scale factor applied to every subsequent render.
    fn set_scale(&mut self, scale: f64) -> ReelResult<()>;

    /// Render one frame as premultiplied RGBA8 at the current scale.
    fn render(&mut self, frame: FrameIndex) -> ReelResult<FrameRGBA>;
}

impl<C: Composition + ?Sized> Composition for Box<C> {
    fn intrinsic_size(&self) -> (f64, f64) {
        (**self).intrinsic_size()
    }

    fn duration_frames(&self) -> u64 {
        (**self).duration_frames()
    }

    fn scale(&self) -> f64 {
        (**self).scale()
    }

    fn set_scale(&mut self, scale: f64) -> ReelResult<()> {
        (**self).set_scale(scale)
    }

    fn render(&mut self, frame: FrameIndex) -> ReelResult<FrameRGBA> {
        (**self).render(frame)
    }
}

/// Raster size of a composition at `scale`, at least 1x1.
pub fn scaled_size(intrinsic: (f64, f64), scale: f64) -> (u32, u32) {
    let w = (intrinsic.0 * scale).round().max(1.0) as u32;
    let h = (intrinsic.1 * scale).round().max(1.0) as u32;
    (w, h)
}
