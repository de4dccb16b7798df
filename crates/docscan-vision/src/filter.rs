// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colour filter pipeline — saturation, contrast and brightness adjustments
// followed by one stylistic filter.
//
// The neutral configuration is an exact identity. Adjustments are done in
// floating point and rounded once per channel, so saturation 1 / contrast 1 /
// brightness 0 reproduces every input byte.

use docscan_core::{FilterConfig, FilterKind};
use image::{Rgba, RgbaImage};
use tracing::{debug, instrument};

/// Saturation boost applied by [`FilterKind::ColorEnhance`] before its
/// adaptive contrast stretch.
const COLOR_ENHANCE_SATURATION: f32 = 1.2;

/// Apply `config` to `image`, returning a new buffer. Alpha is preserved.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn apply_filter(image: &RgbaImage, config: &FilterConfig) -> RgbaImage {
    if config.is_identity() {
        return image.clone();
    }

    let adjusted = if config.adjustments_are_neutral() {
        image.clone()
    } else {
        map_pixels(image, |rgb| {
            adjust(rgb, config.saturation, config.contrast, config.brightness)
        })
    };

    let output = match config.kind {
        FilterKind::None => adjusted,
        FilterKind::Greyscale => map_pixels(&adjusted, |rgb| {
            let y = luma(rgb);
            [y, y, y]
        }),
        FilterKind::BlackAndWhite => black_and_white(&adjusted),
        FilterKind::Sepia => map_pixels(&adjusted, sepia),
        FilterKind::ColorEnhance => color_enhance(&adjusted),
    };

    debug!(kind = ?config.kind, "Filter applied");
    output
}

// -- Stylistic filters --------------------------------------------------------

/// Greyscale with a contrast stretch that adapts to the frame's brightness.
fn black_and_white(image: &RgbaImage) -> RgbaImage {
    let (alpha, beta) = adaptive_gain(mean_luma(image));
    map_pixels(image, |rgb| {
        let y = luma(rgb) * alpha + beta;
        [y, y, y]
    })
}

/// Mild saturation boost plus the adaptive contrast stretch per channel.
fn color_enhance(image: &RgbaImage) -> RgbaImage {
    let saturated = map_pixels(image, |rgb| adjust(rgb, COLOR_ENHANCE_SATURATION, 1.0, 0.0));
    let (alpha, beta) = adaptive_gain(mean_luma(&saturated));
    map_pixels(&saturated, |[r, g, b]| {
        [r * alpha + beta, g * alpha + beta, b * alpha + beta]
    })
}

fn sepia([r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        0.393 * r + 0.769 * g + 0.189 * b,
        0.349 * r + 0.686 * g + 0.168 * b,
        0.272 * r + 0.534 * g + 0.131 * b,
    ]
}

/// Gain and offset for the adaptive stretch. Dark frames get a steeper gain,
/// bright frames a gentler one; the offset pulls the mean down so paper stays
/// white while ink gets darker.
fn adaptive_gain(mean: f32) -> (f32, f32) {
    let alpha = (2.8 - 0.0045 * mean).max(1.0);
    let beta = -1.15 * mean;
    (alpha, beta)
}

// -- Helpers ------------------------------------------------------------------

/// Saturation around luma, contrast around mid-grey, then brightness offset.
fn adjust(rgb: [f32; 3], saturation: f32, contrast: f32, brightness: f32) -> [f32; 3] {
    let y = luma(rgb);
    let offset = brightness * 255.0;
    rgb.map(|c| {
        let saturated = y + saturation * (c - y);
        (saturated - 128.0) * contrast + 128.0 + offset
    })
}

/// Rec. 601 luma.
fn luma([r, g, b]: [f32; 3]) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn mean_luma(image: &RgbaImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = image
        .pixels()
        .map(|p| luma([p[0] as f32, p[1] as f32, p[2] as f32]) as f64)
        .sum();
    (sum / count as f64) as f32
}

/// Run `f` over the colour channels of every pixel, rounding and clamping the
/// result back to bytes.
fn map_pixels(image: &RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> RgbaImage {
    let mut output = RgbaImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(output.pixels_mut()) {
        let [r, g, b] = f([src[0] as f32, src[1] as f32, src[2] as f32]);
        *dst = Rgba([to_byte(r), to_byte(g), to_byte(b), src[3]]);
    }
    output
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
