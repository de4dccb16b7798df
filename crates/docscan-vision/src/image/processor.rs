// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — orientation normalisation, downscaling, filtering and
// encoding of camera frames. Operates on in-memory RGBA buffers using the
// `image` crate.

use docscan_core::error::{Result, ScanError};
use docscan_core::{CaptureResult, EncodedCapture, FilterConfig, ResolvedOrientation, Rotation};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use tracing::{debug, info, instrument};

use crate::filter::apply_filter;

/// Image processing pipeline operating on a single RGBA buffer.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_rgba(frame)
///     .orient(resolved)
///     .filter(&config)
///     .to_jpeg_bytes(80)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            ScanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self {
            image: img.to_rgba8(),
        })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            ScanError::ImageError(format!("failed to decode image: {}", err))
        })?;
        Ok(Self {
            image: img.to_rgba8(),
        })
    }

    /// Wrap an already-decoded RGBA buffer.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying buffer.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the processor and return the underlying buffer.
    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    /// Luma copy of the current image.
    pub fn to_luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate clockwise by a quarter-turn multiple.
    pub fn rotate(self, rotation: Rotation) -> Self {
        let image = match rotation {
            Rotation::Deg0 => self.image,
            Rotation::Deg90 => imageops::rotate90(&self.image),
            Rotation::Deg180 => imageops::rotate180(&self.image),
            Rotation::Deg270 => imageops::rotate270(&self.image),
        };
        Self { image }
    }

    /// Mirror left-to-right.
    pub fn mirror(self) -> Self {
        Self {
            image: imageops::flip_horizontal(&self.image),
        }
    }

    /// Bring a raw camera buffer upright: rotate first, then mirror.
    pub fn orient(self, orientation: ResolvedOrientation) -> Self {
        let rotated = self.rotate(orientation.rotation);
        if orientation.mirrored {
            rotated.mirror()
        } else {
            rotated
        }
    }

    /// Shrink so the larger side is at most `max_dimension`, preserving aspect
    /// ratio. Returns the processor and the applied scale factor (1.0 when the
    /// image already fits).
    pub fn downscale(self, max_dimension: u32) -> (Self, f32) {
        let (w, h) = self.image.dimensions();
        let largest = w.max(h);
        if largest <= max_dimension || max_dimension == 0 {
            return (self, 1.0);
        }

        let scale = max_dimension as f32 / largest as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(1);
        let new_h = ((h as f32 * scale).round() as u32).max(1);
        debug!(from_w = w, from_h = h, new_w, new_h, "Downscaling for detection");

        let resized = imageops::resize(&self.image, new_w, new_h, FilterType::Triangle);
        let effective = new_w as f32 / w as f32;
        (Self { image: resized }, effective)
    }

    /// Apply colour adjustments and the stylistic filter.
    pub fn filter(self, config: &FilterConfig) -> Self {
        if config.is_identity() {
            return self;
        }
        Self {
            image: apply_filter(&self.image, config),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ScanError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| ScanError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

        // JPEG has no alpha channel.
        let saved = if is_jpeg {
            DynamicImage::ImageRgba8(self.image.clone()).to_rgb8().save(path)
        } else {
            self.image.save(path)
        };
        saved.map_err(|err| {
            ScanError::ImageError(format!("failed to save image to {}: {}", path.display(), err))
        })
    }
}

/// Encode both images of a capture as JPEG at `quality` (1-100).
#[instrument(skip(result), fields(id = %result.id))]
pub fn encode_capture(result: &CaptureResult, quality: u8) -> Result<EncodedCapture> {
    let corrected = ImageProcessor::from_rgba(result.corrected.clone()).to_jpeg_bytes(quality)?;
    let original = ImageProcessor::from_rgba(result.original.clone()).to_jpeg_bytes(quality)?;
    debug!(
        corrected_bytes = corrected.len(),
        original_bytes = original.len(),
        "Capture encoded"
    );
    Ok(EncodedCapture {
        id: result.id,
        corrected,
        original,
    })
}
