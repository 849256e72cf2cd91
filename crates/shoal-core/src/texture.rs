//! CPU-side sampled textures and UV transforms.
//!
//! Terrain sources, reset masks, and texture-shaped modifiers all reduce
//! to "a texture + a UV transform" before they touch a grid.

use glam::Vec2;

/// Affine UV transform: `uv' = uv * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvTransform {
    /// Per-axis scale.
    pub scale: Vec2,
    /// Offset applied after scaling.
    pub offset: Vec2,
}

impl UvTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Apply the transform to a UV coordinate.
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }

    /// Compose `self` after `inner`.
    pub fn then(&self, inner: &UvTransform) -> UvTransform {
        UvTransform {
            scale: inner.scale * self.scale,
            offset: inner.offset * self.scale + self.offset,
        }
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A row-major, multi-channel `f32` texture.
///
/// Row 0 is `v = 0`. Texel centres sit at `(i + 0.5) / width`.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
}

impl Texture {
    /// Create a zero-filled texture. Zero dimensions are raised to one.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let (width, height, channels) = (width.max(1), height.max(1), channels.max(1));
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![0.0; len],
        }
    }

    /// Wrap existing data. Returns `None` if the length does not match.
    pub fn from_data(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Option<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected || width == 0 || height == 0 || channels == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build a single-channel texture by evaluating `f(u, v)` at texel centres.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut tex = Self::new(width, height, 1);
        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let v = (y as f32 + 0.5) / height as f32;
                tex.data[(y * width + x) as usize] = f(u, v);
            }
        }
        tex
    }

    /// Texture width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Texture height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per texel.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Raw texel data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw texel data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Read one texel channel. Coordinates are clamped to the edge.
    pub fn texel(&self, x: i64, y: i64, channel: u32) -> f32 {
        let cx = x.clamp(0, i64::from(self.width) - 1) as usize;
        let cy = y.clamp(0, i64::from(self.height) - 1) as usize;
        let ch = channel.min(self.channels - 1) as usize;
        self.data[(cy * self.width as usize + cx) * self.channels as usize + ch]
    }

    /// Write one texel channel. Out-of-range writes are ignored.
    pub fn set_texel(&mut self, x: u32, y: u32, channel: u32, value: f32) {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return;
        }
        let idx = ((y * self.width + x) * self.channels + channel) as usize;
        self.data[idx] = value;
    }

    /// Bilinear sample with clamp-to-edge addressing.
    pub fn sample(&self, uv: Vec2, channel: u32) -> f32 {
        let fx = uv.x * self.width as f32 - 0.5;
        let fy = uv.y * self.height as f32 - 0.5;
        if !fx.is_finite() || !fy.is_finite() {
            return 0.0;
        }
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let a = self.texel(x0, y0, channel);
        let b = self.texel(x0 + 1, y0, channel);
        let c = self.texel(x0, y0 + 1, channel);
        let d = self.texel(x0 + 1, y0 + 1, channel);
        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        top + (bottom - top) * ty
    }

    /// Nearest-texel sample with clamp-to-edge addressing.
    pub fn sample_nearest(&self, uv: Vec2, channel: u32) -> f32 {
        let x = (uv.x * self.width as f32).floor();
        let y = (uv.y * self.height as f32).floor();
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        self.texel(x as i64, y as i64, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_data_rejects_wrong_length() {
        assert!(Texture::from_data(2, 2, 1, vec![0.0; 3]).is_none());
        assert!(Texture::from_data(2, 2, 1, vec![0.0; 4]).is_some());
    }

    #[test]
    fn bilinear_interpolates_between_centres() {
        let tex = Texture::from_data(2, 1, 1, vec![0.0, 10.0]).unwrap();
        assert_eq!(tex.sample(Vec2::new(0.25, 0.5), 0), 0.0);
        assert_eq!(tex.sample(Vec2::new(0.75, 0.5), 0), 10.0);
        assert_eq!(tex.sample(Vec2::new(0.5, 0.5), 0), 5.0);
    }

    #[test]
    fn sampling_clamps_outside_unit_square() {
        let tex = Texture::from_data(2, 1, 1, vec![1.0, 3.0]).unwrap();
        assert_eq!(tex.sample(Vec2::new(-4.0, 0.5), 0), 1.0);
        assert_eq!(tex.sample(Vec2::new(9.0, 0.5), 0), 3.0);
        assert_eq!(tex.sample_nearest(Vec2::new(0.9, 0.1), 0), 3.0);
    }

    #[test]
    fn non_finite_uv_samples_zero() {
        let tex = Texture::from_data(1, 1, 1, vec![5.0]).unwrap();
        assert_eq!(tex.sample(Vec2::new(f32::NAN, 0.0), 0), 0.0);
    }

    #[test]
    fn from_fn_evaluates_texel_centres() {
        let tex = Texture::from_fn(4, 1, |u, _| u);
        assert_eq!(tex.texel(0, 0, 0), 0.125);
        assert_eq!(tex.texel(3, 0, 0), 0.875);
    }

    #[test]
    fn transform_composition() {
        let a = UvTransform {
            scale: Vec2::splat(2.0),
            offset: Vec2::new(1.0, 0.0),
        };
        let b = UvTransform {
            scale: Vec2::splat(0.5),
            offset: Vec2::new(0.0, 1.0),
        };
        let uv = Vec2::new(0.25, 0.75);
        assert_eq!(a.then(&b).apply(uv), a.apply(b.apply(uv)));
    }
}
