//! CPU-side HDR render target and tone mapping.

/// Linear RGBA with unbounded colour channels.
pub type Rgba = [f32; 4];

/// A floating point image, row-major, origin at the top left.
#[derive(Clone, Debug, PartialEq)]
pub struct HdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl HdrImage {
    /// Create a fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Rgba) {
        let i = self.index(x, y);
        self.pixels[i] = value;
    }

    /// Read with coordinates clamped to the edge.
    pub fn get_clamped(&self, x: i64, y: i64) -> Rgba {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }

    /// Bilinear sample at normalized coordinates, clamped to the edge.
    pub fn sample(&self, u: f32, v: f32) -> Rgba {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let a = self.get_clamped(x0, y0);
        let b = self.get_clamped(x0 + 1, y0);
        let c = self.get_clamped(x0, y0 + 1);
        let d = self.get_clamped(x0 + 1, y0 + 1);
        std::array::from_fn(|i| {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            top + (bottom - top) * ty
        })
    }

    pub fn clear(&mut self, value: Rgba) {
        self.pixels.fill(value);
    }

    /// Apply the ACES filmic curve after scaling by `exposure`. Alpha is kept.
    pub fn tonemapped(&self, exposure: f32) -> HdrImage {
        let pixels = self
            .pixels
            .iter()
            .map(|px| {
                [
                    aces_filmic(px[0] * exposure),
                    aces_filmic(px[1] * exposure),
                    aces_filmic(px[2] * exposure),
                    px[3],
                ]
            })
            .collect();
        HdrImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Encode to 8-bit sRGB RGBA with straight alpha.
    pub fn to_srgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            for c in &px[..3] {
                out.push(to_unorm8(linear_to_srgb(c.clamp(0.0, 1.0))));
            }
            out.push(to_unorm8(px[3]));
        }
        out
    }
}

/// Narkowicz ACES approximation, output clamped to [0, 1].
pub fn aces_filmic(x: f32) -> f32 {
    let x = x.max(0.0);
    let (a, b, c, d, e) = (2.51, 0.03, 2.43, 0.59, 0.14);
    ((x * (a * x + b)) / (x * (c * x + d) + e)).clamp(0.0, 1.0)
}

/// sRGB transfer decode; inverse of [`linear_to_srgb`].
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Rec. 709 luminance.
pub fn luminance(rgb: &[f32]) -> f32 {
    rgb[0] * 0.2126 + rgb[1] * 0.7152 + rgb[2] * 0.0722
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_transparent() {
        let img = HdrImage::new(4, 3);
        assert_eq!(img.pixels().len(), 12);
        assert!(img.pixels().iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn test_aces_is_monotonic_and_bounded() {
        let mut prev = aces_filmic(0.0);
        assert_eq!(prev, 0.0);
        for i in 1..200 {
            let v = aces_filmic(i as f32 * 0.1);
            assert!(v >= prev);
            assert!(v <= 1.0);
            prev = v;
        }
    }

    #[test]
    fn test_tonemap_and_encode_preserve_alpha() {
        let mut img = HdrImage::new(1, 1);
        img.set(0, 0, [4.0, 0.0, 0.0, 0.5]);
        let mapped = img.tonemapped(0.5);
        assert_eq!(mapped.get(0, 0)[3], 0.5);
        let bytes = mapped.to_srgba8();
        assert_eq!(bytes.len(), 4);
        assert_eq!(bytes[3], 128);
        assert!(bytes[0] > 200);
        assert_eq!(bytes[1], 0);
    }

    #[test]
    fn test_sample_center_of_texel_returns_texel() {
        let mut img = HdrImage::new(2, 2);
        img.set(1, 0, [1.0, 2.0, 3.0, 1.0]);
        let s = img.sample(0.75, 0.25);
        assert!((s[0] - 1.0).abs() < 1e-5);
        assert!((s[2] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_get_clamped_edges() {
        let mut img = HdrImage::new(2, 1);
        img.set(0, 0, [1.0; 4]);
        assert_eq!(img.get_clamped(-5, 0), [1.0; 4]);
        assert_eq!(img.get_clamped(10, 3), [0.0; 4]);
    }
}
