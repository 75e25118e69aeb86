//! Square key image in the device's native RGB565 format.

use image::RgbImage;

use crate::color::unpack_rgb565;

/// A `size` x `size` buffer of packed RGB565 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuffer {
    size: u32,
    pixels: Vec<u16>,
}

impl KeyBuffer {
    /// Buffer filled with a single packed color.
    pub fn solid(size: u32, color: u16) -> Self {
        Self {
            size,
            pixels: vec![color; (size * size) as usize],
        }
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u16 {
        self.pixels[(y * self.size + x) as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: u16) {
        self.pixels[(y * self.size + x) as usize] = value;
    }

    /// Wire form: two little-endian bytes per pixel.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    /// Expand back to 8-bit RGB (for previews).
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.size, self.size, |x, y| {
            let c = unpack_rgb565(self.pixel(x, y));
            image::Rgb([c.r, c.g, c.b])
        })
    }
}
