use crate::media::VideoRef;
use anyhow::anyhow;
use glam::{Vec2, Vec3, Vec4};

/// What an empty or missing texture samples as.
pub const EMPTY_TEXEL: Vec4 = Vec4::W;

pub trait Texture {
    /// Filtered sample at `uv`, with (0, 0) at the bottom-left of the image.
    fn sample(&self, uv: Vec2) -> Vec4;
}

/// A decoded RGBA8 video frame, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> anyhow::Result<Self> {
        let want = width.saturating_mul(height).saturating_mul(4);
        if pixels.len() != want {
            return Err(anyhow!(
                "frame {width}x{height} needs {want} bytes, got {}",
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn solid(width: usize, height: usize, color: Vec3) -> Self {
        let px = to_rgba8(color.extend(1.0));
        let mut pixels = vec![0u8; width * height * 4];
        for dst in pixels.chunks_exact_mut(4) {
            dst.copy_from_slice(&px);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Vec3) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 4;
        self.pixels[i..i + 4].copy_from_slice(&to_rgba8(color.extend(1.0)));
    }

    /// Normalized texel, coordinates clamped to the edge.
    pub fn texel(&self, x: i64, y: i64) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return EMPTY_TEXEL;
        }
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width + x) * 4;
        let p = &self.pixels[i..i + 4];
        Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
    }
}

impl Texture for VideoFrame {
    // Linear filtering, clamp-to-edge wrapping.
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return EMPTY_TEXEL;
        }
        let uv = uv.clamp(Vec2::ZERO, Vec2::ONE);
        let x = uv.x * self.width as f32 - 0.5;
        let y = (1.0 - uv.y) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let top = self.texel(ix, iy).lerp(self.texel(ix + 1, iy), fx);
        let bottom = self.texel(ix, iy + 1).lerp(self.texel(ix + 1, iy + 1), fx);
        top.lerp(bottom, fy)
    }
}

/// Texture bound to a live video source; samples whatever frame is current.
#[derive(Clone, Default)]
pub struct VideoTexture {
    source: Option<VideoRef>,
}

impl VideoTexture {
    pub fn new(source: Option<VideoRef>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Option<&VideoRef> {
        self.source.as_ref()
    }
}

impl Texture for VideoTexture {
    fn sample(&self, uv: Vec2) -> Vec4 {
        let Some(source) = self.source.as_ref() else {
            return EMPTY_TEXEL;
        };
        let video = source.borrow();
        match video.frame() {
            Some(frame) => frame.sample(uv),
            None => EMPTY_TEXEL,
        }
    }
}

pub fn to_rgba8(c: Vec4) -> [u8; 4] {
    let c = (c.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}
