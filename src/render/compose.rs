//! Alpha compositing of an RGBA icon onto a key buffer.

use image::RgbaImage;

use super::KeyBuffer;
use crate::color::{Rgb, rgb565};

/// Blend one channel: `icon * a + bg * (1 - a)`, rounded.
fn blend(icon: u8, bg: u8, alpha: f32) -> u8 {
    (f32::from(icon) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8
}

/// Composite `icon` centered onto `buffer`, blending against `background`.
///
/// Fully transparent icon pixels are skipped, leaving the buffer as it was.
/// Icon pixels that fall outside the key are clipped.
pub fn composite_centered(buffer: &mut KeyBuffer, icon: &RgbaImage, background: Rgb) {
    let size = i64::from(buffer.size());
    let x0 = (size - i64::from(icon.width())).div_euclid(2);
    let y0 = (size - i64::from(icon.height())).div_euclid(2);

    for (x, y, px) in icon.enumerate_pixels() {
        let dx = x0 + i64::from(x);
        let dy = y0 + i64::from(y);
        if dx < 0 || dy < 0 || dx >= size || dy >= size {
            continue;
        }
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        let alpha = f32::from(a) / 255.0;
        let packed = rgb565(
            blend(r, background.r, alpha),
            blend(g, background.g, alpha),
            blend(b, background.b, alpha),
        );
        buffer.set_pixel(dx as u32, dy as u32, packed);
    }
}
