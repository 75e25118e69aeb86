//! Image processing operations.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{LdError, Result};

/// Edge length uploaded icons are scaled to fit before they are stored.
pub const UPLOAD_MAX_SIZE: u32 = 128;

const UPLOAD_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

/// Decode any supported image format into RGBA.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| LdError::ImageProcessing(e.to_string()))
}

/// Load an image file into RGBA.
pub fn open_rgba(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| LdError::ImageProcessing(format!("{}: {e}", path.display())))
}

/// Scale so the image fits a `max` x `max` box, keeping aspect ratio.
///
/// Small images are scaled up as well as large ones down.
pub fn scale_to_fit(img: &RgbaImage, max: u32, filter: FilterType) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let factor = (f64::from(max) / f64::from(w)).min(f64::from(max) / f64::from(h));
    let nw = ((f64::from(w) * factor).round() as u32).max(1);
    let nh = ((f64::from(h) * factor).round() as u32).max(1);
    if (nw, nh) == (w, h) {
        return img.clone();
    }
    imageops::resize(img, nw, nh, filter)
}

/// Fit an OS-extracted application icon into `max`.
///
/// These icons are often 32 px; they are first blown up by an integer factor
/// with nearest-neighbour so they stay crisp, then shrunk to fit if needed.
pub fn fit_app_icon(img: &RgbaImage, max: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let src_max = w.max(h);
    let mut out = img.clone();
    if src_max > 0 && src_max < max {
        let factor = ((f64::from(max) * 0.9) / f64::from(src_max)).ceil().max(1.0) as u32;
        if factor > 1 {
            out = imageops::resize(&out, w * factor, h * factor, FilterType::Nearest);
        }
    }
    if out.width() > max || out.height() > max {
        out = scale_to_fit(&out, max, FilterType::Nearest);
    }
    out
}

/// Decode a `data:image/<type>;base64,<payload>` upload.
///
/// Only png, jpeg and webp payloads are accepted.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| LdError::InvalidIcon("expected a data URL".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| LdError::InvalidIcon("expected a base64 data URL".to_string()))?;
    let mime = mime.to_ascii_lowercase();
    if !UPLOAD_MIME_TYPES.contains(&mime.as_str()) {
        return Err(LdError::InvalidIcon(format!("unsupported image type '{mime}'")));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| LdError::InvalidIcon(format!("bad base64 payload: {e}")))?;
    image::load_from_memory(&bytes).map_err(|e| LdError::InvalidIcon(e.to_string()))
}

/// Encode as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| LdError::ImageProcessing(e.to_string()))?;
    Ok(bytes)
}

/// Scale an upload to fit the stored icon size.
pub fn prepare_upload(img: &DynamicImage) -> RgbaImage {
    scale_to_fit(&img.to_rgba8(), UPLOAD_MAX_SIZE, FilterType::Triangle)
}
