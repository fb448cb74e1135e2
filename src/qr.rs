//! QR code rendering for verification stamps.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{Error, Result};

/// Output edge length in pixels.
pub const QR_SIZE: u32 = 300;

/// Quiet-zone width in modules on each side.
const QUIET_ZONE: u32 = 4;

/// Render `data` as a QR code and return PNG bytes, `QR_SIZE` square.
pub fn qr_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(data, EcLevel::M)
        .map_err(|e| Error::Qr(format!("QR encode: {}", e)))?;

    let width = code.width() as u32;
    let total = width + 2 * QUIET_ZONE;
    let mut img = GrayImage::from_pixel(total, total, Luma([255u8]));
    for (i, color) in code.to_colors().iter().enumerate() {
        if *color == qrcode::Color::Dark {
            let x = QUIET_ZONE + (i as u32 % width);
            let y = QUIET_ZONE + (i as u32 / width);
            img.put_pixel(x, y, Luma([0u8]));
        }
    }

    let scaled = image::imageops::resize(&img, QR_SIZE, QR_SIZE, FilterType::Nearest);
    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(scaled)
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| Error::Image(format!("PNG encode: {}", e)))?;
    Ok(png.into_inner())
}
