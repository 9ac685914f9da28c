//! Alpha-mask helpers shared by segmenter implementations.

use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};

const BLUR_SIGMA: f32 = 2.0;
const THRESHOLD: u8 = 127;

/// Cross-shaped 3x3 structuring element.
const CROSS: [(i64, i64); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Scale raw model logits/probabilities into a 0..=255 mask.
///
/// A flat prediction (max == min) carries no foreground signal and yields an
/// all-zero mask.
pub fn normalize_prediction(values: &[f32], width: u32, height: u32) -> Option<GrayImage> {
    let expected = (width as usize).checked_mul(height as usize)?;
    if values.len() != expected {
        return None;
    }

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let pixels = values
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                // Truncates toward zero.
                (((v - min) / range) * 255.0).clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();

    GrayImage::from_raw(width, height, pixels)
}

/// Clean up a soft mask: morphological opening removes speckles, a Gaussian
/// blur smooths the outline and a threshold makes the result binary.
pub fn post_process(mask: &GrayImage) -> GrayImage {
    let opened = dilate(&erode(mask));
    let blurred = imageops::blur(&opened, BLUR_SIGMA);
    GrayImage::from_fn(blurred.width(), blurred.height(), |x, y| {
        if blurred.get_pixel(x, y).0[0] >= THRESHOLD {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Combine an RGBA image with a same-sized mask, writing the mask into the
/// alpha channel. Fully transparent pixels are zeroed so that identical
/// masks always produce identical bytes.
pub fn apply_alpha(image: &RgbaImage, mask: &GrayImage) -> Option<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return None;
    }

    Some(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let alpha = mask.get_pixel(x, y).0[0];
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
        Rgba([r, g, b, alpha])
    }))
}

fn erode(mask: &GrayImage) -> GrayImage {
    morph(mask, u8::MAX, u8::min)
}

fn dilate(mask: &GrayImage) -> GrayImage {
    morph(mask, u8::MIN, u8::max)
}

fn morph(mask: &GrayImage, init: u8, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = CROSS
            .iter()
            .filter_map(|&(dx, dy)| {
                let nx = u32::try_from(i64::from(x) + dx).ok()?;
                let ny = u32::try_from(i64::from(y) + dy).ok()?;
                (nx < width && ny < height).then(|| mask.get_pixel(nx, ny).0[0])
            })
            .fold(init, pick);
        Luma([value])
    })
}
