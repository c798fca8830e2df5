//! Image encoding: rendered surface → PNG bytes, plus output naming.
//!
//! PNG is lossless, so "maximum quality" here means maximum compression
//! effort: `CompressionType::Best` with adaptive per-row filtering. The
//! pixels are identical at any setting; only the file size changes.

use crate::error::{describe_panic, Pdf2ImgError};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub const PNG_MIME_TYPE: &str = "image/png";

static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Derive the PNG file name from the PDF's name.
///
/// A trailing `.pdf` in any case is replaced by `.png`; any other name
/// simply gains a `.png` suffix.
///
/// ```rust
/// use pdf2img::output_file_name;
///
/// assert_eq!(output_file_name("REPORT.PDF"), "REPORT.png");
/// assert_eq!(output_file_name("notes.txt"), "notes.txt.png");
/// ```
pub fn output_file_name(input_name: &str) -> String {
    format!("{}.png", RE_PDF_SUFFIX.replace(input_name, ""))
}

/// Encode an RGBA image as PNG.
///
/// An encoder error and an empty output are both [`Pdf2ImgError::Encode`].
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Pdf2ImgError> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| Pdf2ImgError::Encode(e.to_string()))?;

    if buf.is_empty() {
        return Err(Pdf2ImgError::Encode("encoder produced no output".into()));
    }
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        image.width(),
        image.height(),
        buf.len()
    );
    Ok(buf)
}

/// [`encode_png`] on the blocking pool; a panicking encoder is an encode failure.
pub async fn encode_png_blocking(image: RgbaImage) -> Result<Vec<u8>, Pdf2ImgError> {
    tokio::task::spawn_blocking(move || encode_png(&image))
        .await
        .map_err(|e| {
            if e.is_panic() {
                Pdf2ImgError::Encode(describe_panic(e.into_panic()))
            } else {
                Pdf2ImgError::Internal(format!("Encode task failed: {e}"))
            }
        })?
}
