//! RGB24 to YUYV conversion.
//!
//! Uses the BT.601 limited-range coefficients in 8.8 fixed point, the
//! matrix most webcam consumers assume for SD and HD YUYV.  Each pair of
//! horizontal pixels shares one U and one V sample, the average of the two
//! pixels' chroma.

use image::RgbImage;

#[inline]
fn luma(r: i32, g: i32, b: i32) -> u8 {
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16).clamp(0, 255) as u8
}

#[inline]
fn chroma_u(r: i32, g: i32, b: i32) -> i32 {
    ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128
}

#[inline]
fn chroma_v(r: i32, g: i32, b: i32) -> i32 {
    ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128
}

/// Converts a packed RGB image to packed YUYV (`Y0 U Y1 V` per pixel pair).
///
/// For odd widths the last pixel of each row is paired with itself, so the
/// output holds `ceil(width / 2) * 4` bytes per row.
pub fn rgb_to_yuyv(image: &RgbImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let pairs_per_row = width.div_ceil(2) as usize;
    let mut out = Vec::with_capacity(pairs_per_row * 4 * height as usize);

    for y in 0..height {
        let mut x = 0;
        while x < width {
            let [r0, g0, b0] = image.get_pixel(x, y).0.map(i32::from);
            let [r1, g1, b1] = if x + 1 < width {
                image.get_pixel(x + 1, y).0.map(i32::from)
            } else {
                [r0, g0, b0]
            };

            let u = (chroma_u(r0, g0, b0) + chroma_u(r1, g1, b1)) / 2;
            let v = (chroma_v(r0, g0, b0) + chroma_v(r1, g1, b1)) / 2;

            out.push(luma(r0, g0, b0));
            out.push(u.clamp(0, 255) as u8);
            out.push(luma(r1, g1, b1));
            out.push(v.clamp(0, 255) as u8);
            x += 2;
        }
    }
    out
}
