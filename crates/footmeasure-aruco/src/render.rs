//! Rendering dictionary markers to printable images.

use crate::{ArucoError, Dictionary};
use image::{GrayImage, Luma};

/// Largest rendered side in pixels.
pub const MAX_RENDER_SIDE: u32 = 1 << 15;

/// Render marker `id` as black-on-white.
///
/// Each bit becomes a `cell_px × cell_px` block; the black frame is
/// `border_bits` cells wide and the white quiet zone around it
/// `quiet_zone` cells wide. Sizes whose side would exceed
/// [`MAX_RENDER_SIDE`] are rejected.
pub fn render_marker(
    dict: &Dictionary,
    id: u32,
    cell_px: u32,
    border_bits: u32,
    quiet_zone: u32,
) -> Result<GrayImage, ArucoError> {
    let code = dict.code(id).ok_or(ArucoError::UnknownMarkerId {
        id,
        dictionary: dict.name,
        len: dict.len(),
    })?;
    if cell_px == 0 {
        return Err(ArucoError::InvalidParams("cell_px must be > 0".into()));
    }

    let n = dict.marker_size as u32;
    let too_large =
        || ArucoError::InvalidParams(format!("marker image side exceeds {MAX_RENDER_SIDE} px"));
    let cells = border_bits
        .checked_mul(2)
        .and_then(|b| b.checked_add(n))
        .ok_or_else(too_large)?;
    let side = quiet_zone
        .checked_mul(2)
        .and_then(|q| q.checked_add(cells))
        .and_then(|c| c.checked_mul(cell_px))
        .filter(|&side| side <= MAX_RENDER_SIDE)
        .ok_or_else(too_large)?;
    let mut img = GrayImage::from_pixel(side, side, Luma([255]));

    for cy in 0..cells {
        for cx in 0..cells {
            let inner = cx >= border_bits
                && cy >= border_bits
                && cx < border_bits + n
                && cy < border_bits + n;
            let black = if inner {
                let idx = (cy - border_bits) * n + (cx - border_bits);
                (code >> idx) & 1 == 1
            } else {
                true
            };
            if !black {
                continue;
            }

            let x0 = (quiet_zone + cx) * cell_px;
            let y0 = (quiet_zone + cy) * cell_px;
            for y in y0..y0 + cell_px {
                for x in x0..x0 + cell_px {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
    }

    Ok(img)
}
