//! Frames and Frame Encoding
//!
//! Raw captures come from the render thread as RGBA rows with a bottom-left
//! origin. Encoding samples them nearest-neighbour into a top-left-origin
//! RGB image at the target size and compresses it to JPEG.

use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use serde::{Serialize, Deserialize};

// =============================================================================
// FRAME CONFIG
// =============================================================================

/// Smallest accepted target dimension.
pub const MIN_DIMENSION: u32 = 1;

/// Largest accepted target dimension.
pub const MAX_DIMENSION: u32 = 4096;

/// Largest accepted decimation factor.
pub const MAX_CAPTURE_EVERY: u32 = 1000;

/// Capture and encode settings.
///
/// Fields are clamped on construction and on decode; see [`FrameConfig::clamped`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "FrameConfigWire", into = "FrameConfigWire")]
pub struct FrameConfig {
    /// Capture enabled.
    pub enabled: bool,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Capture every Nth render frame.
    pub capture_every: u32,
    /// Compression quality in [0, 1].
    pub quality: f32,
}

impl FrameConfig {
    /// Build a config, clamping every field.
    pub fn new(enabled: bool, width: i64, height: i64, capture_every: i64, quality: f32) -> Self {
        Self {
            enabled,
            width: clamp_dimension(width),
            height: clamp_dimension(height),
            capture_every: capture_every.clamp(1, MAX_CAPTURE_EVERY as i64) as u32,
            quality: clamp_quality(quality),
        }
    }

    /// Re-clamp fields that may have been written directly.
    pub fn clamped(self) -> Self {
        Self::new(
            self.enabled,
            self.width as i64,
            self.height as i64,
            self.capture_every as i64,
            self.quality,
        )
    }

    /// JPEG quality as the encoder's 1..=100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        quality_to_jpeg(self.quality)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new(true, 384, 216, 6, 0.5)
    }
}

fn clamp_dimension(value: i64) -> u32 {
    value.clamp(MIN_DIMENSION as i64, MAX_DIMENSION as i64) as u32
}

fn clamp_quality(value: f32) -> f32 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Map [0, 1] quality onto the JPEG encoder's 1..=100 scale.
pub fn quality_to_jpeg(quality: f32) -> u8 {
    (clamp_quality(quality) * 100.0).round().clamp(1.0, 100.0) as u8
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FrameConfigWire {
    enabled: bool,
    width: i64,
    height: i64,
    #[serde(rename = "captureEveryNFrames")]
    capture_every_n_frames: i64,
    #[serde(rename = "jpegQuality")]
    jpeg_quality: f32,
}

impl From<FrameConfigWire> for FrameConfig {
    fn from(wire: FrameConfigWire) -> Self {
        FrameConfig::new(
            wire.enabled,
            wire.width,
            wire.height,
            wire.capture_every_n_frames,
            wire.jpeg_quality,
        )
    }
}

impl From<FrameConfig> for FrameConfigWire {
    fn from(config: FrameConfig) -> Self {
        FrameConfigWire {
            enabled: config.enabled,
            width: config.width as i64,
            height: config.height as i64,
            capture_every_n_frames: config.capture_every as i64,
            jpeg_quality: config.quality,
        }
    }
}

// =============================================================================
// RAW + ENCODED FRAMES
// =============================================================================

/// Errors reading the framebuffer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// Window reports a zero-sized framebuffer.
    #[error("Framebuffer has no area ({width}x{height})")]
    EmptyFramebuffer {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },

    /// The source failed to read pixels.
    #[error("Pixel read failed: {0}")]
    ReadFailed(String),
}

/// Errors turning a raw capture into an image.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Pixel buffer shorter than `width * height * 4`.
    #[error("Pixel buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer {
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// JPEG encoder failure.
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Render-thread framebuffer access.
pub trait FrameSource {
    /// Current framebuffer size.
    fn dimensions(&self) -> (u32, u32);

    /// Read RGBA pixels, bottom row first, into `buf` (resized as needed).
    fn read_pixels(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError>;
}

/// One framebuffer read, owned by the encoder once handed off.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Monotonic capture index within the pipeline.
    pub capture_index: u64,
    /// Source width.
    pub width: u32,
    /// Source height.
    pub height: u32,
    /// RGBA bytes, bottom-left origin.
    pub rgba: Vec<u8>,
    /// Settings in effect when captured.
    pub config: FrameConfig,
    /// When the read finished.
    pub captured_at: Instant,
    /// Time spent reading pixels (ms).
    pub capture_ms: f64,
}

/// A compressed frame ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Strictly increasing within one pipeline.
    pub sequence: u32,
    /// Wall-clock milliseconds truncated to 32 bits.
    pub timestamp_ms: u32,
    /// JPEG bytes.
    pub payload: Vec<u8>,
}

/// Current wall-clock time in ms, truncated to 32 bits.
pub fn truncated_timestamp_ms() -> u32 {
    (chrono::Utc::now().timestamp_millis() as u64 & 0xFFFF_FFFF) as u32
}

// =============================================================================
// SCALE + ENCODE
// =============================================================================

/// Nearest-neighbour resample with vertical flip.
///
/// Source rows are bottom-up (GL convention); the output is top-down.
pub fn scale_flip_nearest(
    rgba: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Result<RgbImage, EncodeError> {
    let expected = src_width as usize * src_height as usize * 4;
    if rgba.len() < expected || expected == 0 {
        return Err(EncodeError::ShortBuffer {
            expected,
            actual: rgba.len(),
        });
    }

    let scale_x = src_width as f32 / dst_width as f32;
    let scale_y = src_height as f32 / dst_height as f32;
    let max_x = src_width as i64 - 1;
    let max_y = src_height as i64 - 1;

    let mut image = RgbImage::new(dst_width, dst_height);
    for y in 0..dst_height {
        let src_y = (max_y - (y as f32 * scale_y) as i64).clamp(0, max_y) as usize;
        let row = src_y * src_width as usize;
        for x in 0..dst_width {
            let src_x = ((x as f32 * scale_x) as i64).clamp(0, max_x) as usize;
            let idx = (row + src_x) * 4;
            image.put_pixel(x, y, Rgb([rgba[idx], rgba[idx + 1], rgba[idx + 2]]));
        }
    }

    Ok(image)
}

/// Compress an RGB image to JPEG at quality in [0, 1].
pub fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(image.as_raw().len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality_to_jpeg(quality));
    encoder.encode_image(image)?;
    Ok(out)
}

/// Scale and compress a raw capture using the config it was captured with.
pub fn encode_raw(raw: &RawFrame) -> Result<Vec<u8>, EncodeError> {
    let image = scale_flip_nearest(
        &raw.rgba,
        raw.width,
        raw.height,
        raw.config.width,
        raw.config.height,
    )?;
    encode_jpeg(&image, raw.config.quality)
}
