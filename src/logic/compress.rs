// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Client-side image compression for document uploads.
//!
//! An image above its size budget is decoded, downscaled to fit the configured
//! bounds and re-encoded as JPEG at decreasing quality until it fits or the
//! quality floor is reached. Files already within budget pass through untouched.
//!
//! Per call: `Decoding → (Skipped) → Downscaling → Encoding@q → … → Done | Failed`.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageError, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::upload::{FileRole, JPEG_MIME, UploadFile};
use crate::utils::{format_bytes, mb_to_bytes};

/// Quality never drops below this factor.
pub const MIN_QUALITY: f32 = 0.1;
/// Quality decrement between attempts.
pub const QUALITY_STEP: f32 = 0.1;
/// Upload ceiling enforced by the backend.
pub const DEFAULT_UPLOAD_LIMIT_MB: f64 = 5.0;
/// Name given to compressed output whose source had none.
pub const FALLBACK_OUTPUT_NAME: &str = "imagem.jpg";

/// Device capability class chosen by the caller (viewport, explicit flag, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceClass {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mobile" => Some(Self::Mobile),
            "desktop" => Some(Self::Desktop),
            _ => None,
        }
    }

    /// Longest side allowed after downscaling.
    pub fn max_dimension(&self) -> u32 {
        match self {
            DeviceClass::Mobile => 1024,
            DeviceClass::Desktop => 1536,
        }
    }

    /// First quality tried; mobile starts lower to need fewer retries.
    pub fn initial_quality(&self) -> f32 {
        match self {
            DeviceClass::Mobile => 0.6,
            DeviceClass::Desktop => 0.8,
        }
    }

    /// Size budget ceiling regardless of what the caller asks for.
    pub fn target_cap_mb(&self) -> f64 {
        match self {
            DeviceClass::Mobile => 1.5,
            DeviceClass::Desktop => 3.0,
        }
    }
}

/// Knobs for a single compression call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub initial_quality: f32,
    #[serde(default = "default_min_quality")]
    pub min_quality: f32,
    #[serde(default = "default_quality_step")]
    pub quality_step: f32,
    pub target_size_bytes: u64,
}

fn default_min_quality() -> f32 {
    MIN_QUALITY
}

fn default_quality_step() -> f32 {
    QUALITY_STEP
}

impl CompressionOptions {
    /// Square cap and start quality from the device class; the budget is the
    /// smaller of `target_mb` and the device ceiling.
    pub fn for_device(device: DeviceClass, target_mb: f64) -> Self {
        let cap = device.max_dimension();
        Self {
            max_width: cap,
            max_height: cap,
            initial_quality: device.initial_quality(),
            min_quality: MIN_QUALITY,
            quality_step: QUALITY_STEP,
            target_size_bytes: mb_to_bytes(target_mb.min(device.target_cap_mb())),
        }
    }

    /// Per-slot presets tuned for document photos, selfies and residence proofs.
    pub fn for_role(role: FileRole) -> Self {
        let (max_width, max_height, initial_quality, max_kb) = match role {
            FileRole::DocumentFront | FileRole::DocumentBack => (1000, 1400, 0.65, 600),
            FileRole::Selfie => (700, 1000, 0.7, 400),
            FileRole::ResidenceProof => (1200, 1600, 0.75, 800),
        };
        Self {
            max_width,
            max_height,
            initial_quality,
            min_quality: MIN_QUALITY,
            quality_step: QUALITY_STEP,
            target_size_bytes: max_kb * 1024,
        }
    }

    /// Load options from a JSON document; quality floor and step are optional.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON does not describe compression options.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        serde_json::from_str(json).context("Failed to parse compression options JSON")
    }
}

/// Where a compression call currently is; emitted with each tracing event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionStage {
    Decoding,
    Skipped,
    Downscaling { from: (u32, u32), to: (u32, u32) },
    Encoding { quality: u8 },
    Done,
    Failed,
}

/// Hard failures; the quality loop never retries these.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("Failed to encode JPEG at quality {quality}: {source}")]
    Encode {
        quality: u8,
        #[source]
        source: ImageError,
    },
}

/// What happened during a compression call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionReport {
    pub original_size: u64,
    pub final_size: u64,
    pub original_dimensions: Option<(u32, u32)>,
    pub final_dimensions: Option<(u32, u32)>,
    /// Quality percent of the accepted encode, `None` when skipped.
    pub quality: Option<u8>,
    pub attempts: u32,
    pub skipped: bool,
    /// Every encode came out larger than the source, so the source was returned.
    pub kept_original: bool,
}

impl CompressionReport {
    /// Size reduction in whole percent.
    pub fn reduction_percent(&self) -> i64 {
        if self.original_size == 0 {
            return 0;
        }
        let ratio = self.final_size as f64 / self.original_size as f64;
        ((1.0 - ratio) * 100.0).round() as i64
    }
}

/// Compressed file plus its report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compressed {
    pub file: UploadFile,
    pub report: CompressionReport,
}

/// JPEG encoding seam so the quality loop can run against a scripted encoder.
pub trait JpegEncode {
    /// Encode `image` at `quality` percent (1–100).
    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError>;
}

/// Production encoder backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageJpegEncoder;

impl JpegEncode for ImageJpegEncoder {
    fn encode(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
        Ok(buf)
    }
}

/// Scale `(width, height)` down to fit `max_width × max_height`, keeping aspect ratio.
///
/// Dimensions already within bounds are returned unchanged; results never drop below 1 px.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let ratio = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let scaled_w = (f64::from(width) * ratio).round() as u32;
    let scaled_h = (f64::from(height) * ratio).round() as u32;
    (scaled_w.clamp(1, max_width.max(1)), scaled_h.clamp(1, max_height.max(1)))
}

fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Compress `file` with the production JPEG encoder.
///
/// # Errors
///
/// [`CompressError::Decode`] when the bytes are not a decodable image,
/// [`CompressError::Encode`] when JPEG encoding fails.
///
/// # Examples
///
/// ```rust,ignore
/// let opts = CompressionOptions::for_device(DeviceClass::Mobile, 3.0);
/// let out = compress_image(&photo, &opts)?;
/// assert_eq!(out.file.mime, "image/jpeg");
/// ```
pub fn compress_image(
    file: &UploadFile,
    options: &CompressionOptions,
) -> Result<Compressed, CompressError> {
    compress_image_with(file, options, &ImageJpegEncoder)
}

/// Compress `file` using the given encoder.
pub fn compress_image_with(
    file: &UploadFile,
    options: &CompressionOptions,
    encoder: &dyn JpegEncode,
) -> Result<Compressed, CompressError> {
    let original_size = file.size();
    let target = options.target_size_bytes;

    if original_size <= target {
        debug!(
            stage = ?CompressionStage::Skipped,
            name = %file.name,
            size = original_size,
            target_bytes = target,
            "image already within budget"
        );
        return Ok(Compressed {
            file: file.clone(),
            report: CompressionReport {
                original_size,
                final_size: original_size,
                original_dimensions: None,
                final_dimensions: None,
                quality: None,
                attempts: 0,
                skipped: true,
                kept_original: false,
            },
        });
    }

    debug!(stage = ?CompressionStage::Decoding, name = %file.name, size = original_size);
    let decoded = image::load_from_memory(&file.bytes).map_err(|err| {
        warn!(
            stage = ?CompressionStage::Failed,
            name = %file.name,
            error = %err,
            "image decode failed"
        );
        CompressError::Decode(err)
    })?;

    let from = decoded.dimensions();
    let to = fit_within(from.0, from.1, options.max_width, options.max_height);
    let pixels = if to == from {
        decoded.to_rgb8()
    } else {
        let stage = CompressionStage::Downscaling { from, to };
        debug!(stage = ?stage, "downscaling");
        decoded.resize_exact(to.0, to.1, FilterType::Lanczos3).to_rgb8()
    };

    let floor = quality_percent(options.min_quality);
    let step = quality_percent(options.quality_step).max(1);
    let mut quality = quality_percent(options.initial_quality).max(floor);
    let mut attempts = 0;

    let payload = loop {
        attempts += 1;
        let bytes = encoder.encode(&pixels, quality).map_err(|source| {
            warn!(
                stage = ?CompressionStage::Failed,
                quality,
                error = %source,
                "JPEG encode failed"
            );
            CompressError::Encode { quality, source }
        })?;
        let size = bytes.len() as u64;
        let stage = CompressionStage::Encoding { quality };
        debug!(
            stage = ?stage,
            size = %format_bytes(size),
            target_bytes = %format_bytes(target),
            "encoded attempt"
        );
        if size <= target || quality <= floor {
            break bytes;
        }
        quality = quality.saturating_sub(step).max(floor);
    };

    if payload.len() as u64 > original_size {
        warn!(
            stage = ?CompressionStage::Done,
            name = %file.name,
            original = %format_bytes(original_size),
            smallest = %format_bytes(payload.len() as u64),
            quality,
            "JPEG output larger than source, keeping original"
        );
        return Ok(Compressed {
            file: file.clone(),
            report: CompressionReport {
                original_size,
                final_size: original_size,
                original_dimensions: Some(from),
                final_dimensions: Some(from),
                quality: None,
                attempts,
                skipped: false,
                kept_original: true,
            },
        });
    }

    let name = if file.name.trim().is_empty() {
        FALLBACK_OUTPUT_NAME.to_string()
    } else {
        file.name.clone()
    };
    let output = UploadFile::new(name, JPEG_MIME, payload);
    let report = CompressionReport {
        original_size,
        final_size: output.size(),
        original_dimensions: Some(from),
        final_dimensions: Some(to),
        quality: Some(quality),
        attempts,
        skipped: false,
        kept_original: false,
    };
    info!(
        stage = ?CompressionStage::Done,
        name = %output.name,
        original = %format_bytes(original_size),
        compressed = %format_bytes(report.final_size),
        reduction = report.reduction_percent(),
        quality,
        attempts,
        "image compressed"
    );

    Ok(Compressed {
        file: output,
        report,
    })
}

/// Compress with the preset for `role`, keeping the original on any failure.
///
/// Non-image files (e.g. PDF residence proofs) are returned as-is.
pub fn compress_for_role(file: &UploadFile, role: FileRole) -> UploadFile {
    if !file.is_image() {
        debug!(name = %file.name, mime = %file.mime, "non-image upload kept as-is");
        return file.clone();
    }
    match compress_image(file, &CompressionOptions::for_role(role)) {
        Ok(compressed) => compressed.file,
        Err(err) => {
            warn!(
                role = role.field_name(),
                error = %err,
                "compression failed, using original file"
            );
            file.clone()
        }
    }
}

/// True when `file` fits under `max_mb` megabytes.
pub fn fits_upload_limit(file: &UploadFile, max_mb: f64) -> bool {
    file.size() <= mb_to_bytes(max_mb)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

    use super::*;

    /// Pseudo-random pixels so neither PNG nor JPEG can squeeze them much.
    fn noisy_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            let mut v = (y * width + x).wrapping_mul(2_654_435_761) | 1;
            v ^= v << 13;
            v ^= v >> 17;
            v ^= v << 5;
            let [r, g, b, _] = v.to_le_bytes();
            Rgb([r, g, b])
        })
    }

    fn png_upload(image: &RgbImage, name: &str) -> UploadFile {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        UploadFile::new(name, "image/png", buf.into_inner())
    }

    fn options(max: u32, initial: f32, target: u64) -> CompressionOptions {
        CompressionOptions {
            max_width: max,
            max_height: max,
            initial_quality: initial,
            min_quality: MIN_QUALITY,
            quality_step: QUALITY_STEP,
            target_size_bytes: target,
        }
    }

    /// Encoder whose output size depends only on quality; records every call.
    struct ScriptedEncoder {
        bytes_per_quality: usize,
        calls: RefCell<Vec<u8>>,
    }

    impl JpegEncode for ScriptedEncoder {
        fn encode(&self, _image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
            self.calls.borrow_mut().push(quality);
            Ok(vec![0; usize::from(quality) * self.bytes_per_quality])
        }
    }

    struct FailingEncoder;

    impl JpegEncode for FailingEncoder {
        fn encode(&self, _image: &RgbImage, _quality: u8) -> Result<Vec<u8>, ImageError> {
            Err(ImageError::IoError(std::io::Error::other("encoder exploded")))
        }
    }

    #[test]
    fn small_file_is_returned_unchanged() {
        let file = UploadFile::new("doc.png", "image/png", vec![1, 2, 3]);
        let out = compress_image(&file, &options(1024, 0.8, 10)).unwrap();

        assert_eq!(out.file, file);
        assert!(out.report.skipped);
        assert_eq!(out.report.attempts, 0);
    }

    #[test]
    fn quality_steps_down_until_target_met() {
        let file = png_upload(&noisy_image(16, 16), "selfie.png");
        let encoder = ScriptedEncoder {
            bytes_per_quality: 10,
            calls: RefCell::new(Vec::new()),
        };
        // 80 -> 800 bytes, 70 -> 700, 60 -> 600, 50 -> 500 fits.
        let out = compress_image_with(&file, &options(1024, 0.8, 500), &encoder).unwrap();

        assert_eq!(*encoder.calls.borrow(), vec![80, 70, 60, 50]);
        assert_eq!(out.report.quality, Some(50));
        assert_eq!(out.report.attempts, 4);
        assert_eq!(out.file.size(), 500);
        assert_eq!(out.file.mime, "image/jpeg");
        assert_eq!(out.file.name, "selfie.png");
    }

    #[test]
    fn quality_floor_ends_the_loop() {
        let file = png_upload(&noisy_image(16, 16), "big.png");
        assert!(file.size() > 100);
        let encoder = ScriptedEncoder {
            bytes_per_quality: 1,
            calls: RefCell::new(Vec::new()),
        };
        let out = compress_image_with(&file, &options(1024, 0.8, 1), &encoder).unwrap();

        assert_eq!(
            *encoder.calls.borrow(),
            vec![80, 70, 60, 50, 40, 30, 20, 10]
        );
        assert_eq!(out.report.quality, Some(10));
        assert_eq!(out.report.final_size, 10, "floor accepts an over-target result");
        assert!(!out.report.kept_original);
    }

    #[test]
    fn output_larger_than_source_keeps_original() {
        let file = png_upload(&noisy_image(16, 16), "big.png");
        let encoder = ScriptedEncoder {
            bytes_per_quality: 1000,
            calls: RefCell::new(Vec::new()),
        };
        let out = compress_image_with(&file, &options(1024, 0.8, 1), &encoder).unwrap();

        assert_eq!(out.file, file);
        assert!(out.report.kept_original);
        assert_eq!(out.report.final_size, file.size());
        assert_eq!(out.report.attempts, 8);
    }

    #[test]
    fn flat_colour_png_never_grows() {
        let flat: RgbImage = ImageBuffer::from_pixel(1000, 1000, Rgb([40, 90, 160]));
        let file = png_upload(&flat, "flat.png");
        let out = compress_image(&file, &options(2000, 0.8, 1024)).unwrap();

        assert!(out.file.size() <= file.size());
        if out.report.kept_original {
            assert_eq!(out.file, file);
        }
    }

    #[test]
    fn mobile_preset_needs_fewer_attempts() {
        let file = png_upload(&noisy_image(16, 16), "big.png");
        let encoder = ScriptedEncoder {
            bytes_per_quality: 1000,
            calls: RefCell::new(Vec::new()),
        };
        let mut opts = CompressionOptions::for_device(DeviceClass::Mobile, 3.0);
        opts.target_size_bytes = 1;
        compress_image_with(&file, &opts, &encoder).unwrap();

        assert_eq!(*encoder.calls.borrow(), vec![60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn real_encoder_shrinks_and_caps_dimensions() {
        let source = noisy_image(600, 300);
        let file = png_upload(&source, "front.png");
        assert!(file.size() > 20 * 1024);
        let out = compress_image(&file, &options(200, 0.8, 20 * 1024)).unwrap();

        assert_eq!(out.report.final_dimensions, Some((200, 100)));
        let decoded = image::load_from_memory(&out.file.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 100));
        assert_eq!(
            image::guess_format(&out.file.bytes).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(
            out.file.size() <= 20 * 1024 || out.report.quality == Some(10),
            "size bound or quality floor must hold"
        );
        assert!(out.file.size() < file.size());
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let file = UploadFile::new("fake.png", "image/png", vec![0xAB; 64]);
        let err = compress_image(&file, &options(100, 0.8, 1)).unwrap_err();
        assert!(matches!(err, CompressError::Decode(_)));
    }

    #[test]
    fn encoder_failure_is_distinct_from_decode_failure() {
        let file = png_upload(&noisy_image(8, 8), "x.png");
        let err = compress_image_with(&file, &options(100, 0.8, 1), &FailingEncoder).unwrap_err();
        assert!(matches!(err, CompressError::Encode { quality: 80, .. }));
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(800, 600, 1536, 1536), (800, 600));
        assert_eq!(fit_within(3000, 2000, 1536, 1536), (1536, 1024));
        assert_eq!(fit_within(2000, 4000, 1024, 1024), (512, 1024));
        assert_eq!(fit_within(5000, 10, 1000, 1000), (1000, 2));
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
        // Rectangular bounds pick the tighter ratio.
        assert_eq!(fit_within(2000, 2000, 1000, 1400), (1000, 1000));
    }

    #[test]
    fn device_presets_cap_the_target() {
        let mobile = CompressionOptions::for_device(DeviceClass::Mobile, 3.0);
        assert_eq!(mobile.max_width, 1024);
        assert_eq!(mobile.target_size_bytes, mb_to_bytes(1.5));

        let desktop = CompressionOptions::for_device(DeviceClass::Desktop, 2.0);
        assert_eq!(desktop.max_height, 1536);
        assert_eq!(desktop.target_size_bytes, mb_to_bytes(2.0));
        assert!((desktop.initial_quality - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn role_presets_follow_slot() {
        let selfie = CompressionOptions::for_role(FileRole::Selfie);
        assert_eq!((selfie.max_width, selfie.max_height), (700, 1000));
        assert_eq!(selfie.target_size_bytes, 400 * 1024);
        let proof = CompressionOptions::for_role(FileRole::ResidenceProof);
        assert_eq!(proof.target_size_bytes, 800 * 1024);
    }

    #[test]
    fn options_parse_from_json_with_defaults() {
        let json = concat!(
            r#"{"max_width":800,"max_height":600,"#,
            r#""initial_quality":0.7,"target_size_bytes":1024}"#,
        );
        let opts = CompressionOptions::from_json(json).unwrap();
        assert_eq!(opts.max_width, 800);
        assert!((opts.min_quality - MIN_QUALITY).abs() < f32::EPSILON);
        assert!(CompressionOptions::from_json("{}").is_err());
    }

    #[test]
    fn compress_for_role_passes_pdfs_and_falls_back_on_errors() {
        let pdf = UploadFile::new("conta.pdf", "application/pdf", vec![7; 2_000_000]);
        assert_eq!(compress_for_role(&pdf, FileRole::ResidenceProof), pdf);

        let broken = UploadFile::new("broken.jpg", "image/jpeg", vec![0xAB; 2_000_000]);
        assert_eq!(compress_for_role(&broken, FileRole::DocumentFront), broken);
    }

    #[test]
    fn upload_limit_uses_megabytes() {
        let file = UploadFile::new("a.jpg", "image/jpeg", vec![0; 1024 * 1024]);
        assert!(fits_upload_limit(&file, 1.0));
        assert!(!fits_upload_limit(&file, 0.5));
    }

    #[test]
    fn report_reduction_percent() {
        let report = CompressionReport {
            original_size: 1000,
            final_size: 250,
            original_dimensions: None,
            final_dimensions: None,
            quality: Some(70),
            attempts: 2,
            skipped: false,
            kept_original: false,
        };
        assert_eq!(report.reduction_percent(), 75);
    }
}
