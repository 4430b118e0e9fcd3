use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::over;

/// A tightly packed row-major RGBA8 raster.
///
/// Frames produced by compositions and canvases handed out by input surfaces are premultiplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
    /// Whether `data` holds premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Allocate a fully transparent premultiplied raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Canvas { width, height }.rgba8_len()],
            premultiplied: true,
        }
    }

    /// Wrap existing premultiplied pixels, checking the size and the buffer length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> ReelResult<Self> {
        let expected = Canvas::new(width, height)
            .map_err(|_| ReelError::composition(format!("raster size {width}x{height} is empty")))?
            .rgba8_len();
        if data.len() != expected {
            return Err(ReelError::composition(format!(
                "raster buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite every pixel with `color` (no blending).
    pub fn clear(&mut self, color: Rgba8Premul) {
        let px = color.to_array();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        self.premultiplied = true;
    }

    /// Draw `src` over this raster with its top-left corner at `(x, y)`, clipped to bounds.
    pub fn draw(&mut self, src: &FrameRGBA, x: i64, y: i64) -> ReelResult<()> {
        if !self.premultiplied || !src.premultiplied {
            return Err(ReelError::composition(
                "draw requires premultiplied source and destination rasters",
            ));
        }

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (y + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return Ok(());
        }

        let dst_stride = self.width as usize * 4;
        let src_stride = src.width as usize * 4;
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            let d_row = dy as usize * dst_stride;
            let s_row = sy * src_stride;
            for dx in x0..x1 {
                let sx = (dx - x) as usize;
                let di = d_row + dx as usize * 4;
                let si = s_row + sx * 4;
                let out = over(
                    [
                        self.data[di],
                        self.data[di + 1],
                        self.data[di + 2],
                        self.data[di + 3],
                    ],
                    [
                        src.data[si],
                        src.data[si + 1],
                        src.data[si + 2],
                        src.data[si + 3],
                    ],
                );
                self.data[di..di + 4].copy_from_slice(&out);
            }
        }
        Ok(())
    }

    /// Convert to a straight-alpha [`image::RgbaImage`], e.g. for writing a PNG.
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let mut data = self.data.clone();
        if self.premultiplied {
            for px in data.chunks_exact_mut(4) {
                let a = u32::from(px[3]);
                if a == 0 || a == 255 {
                    continue;
                }
                for c in &mut px[..3] {
                    *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ReelError::composition("raster buffer does not match its dimensions"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/raster.rs"]
mod tests;
