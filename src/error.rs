//! Error type for the pdf2img library.
//!
//! [`Pdf2ImgError`] is internal currency: the public conversion entry points
//! never return it. Every failure is folded into a
//! [`crate::output::ConversionResult`] with its `error` field set, using
//! [`Pdf2ImgError::result_message`] to pick the wording.
//!
//! The type is `Clone` because a failed library load is handed to every
//! caller that was waiting on the same in-flight load.

use std::path::PathBuf;
use thiserror::Error;

/// Message reported when PNG encoding yields nothing.
pub const ENCODE_FAILED_MESSAGE: &str = "Failed to create image blob";

/// Prefix for every other failure message.
pub const CONVERT_FAILED_PREFIX: &str = "Failed to convert PDF: ";

/// All failures that can occur while turning a PDF into a PNG.
#[derive(Debug, Clone, Error)]
pub enum Pdf2ImgError {
    // ── Library ───────────────────────────────────────────────────────────
    /// The rendering library could not be located, fetched or bound.
    #[error(
        "Failed to load the PDF rendering library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    LibraryLoad(String),

    // ── Input ─────────────────────────────────────────────────────────────
    /// The value handed across an untyped boundary is not a file.
    #[error("convert_pdf_to_image received a non-file value: {received}")]
    TypeValidation { received: String },

    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The bytes are not a parseable PDF.
    #[error("Invalid PDF '{name}': {detail}")]
    Decode { name: String, detail: String },

    #[error("PDF '{name}' has no pages")]
    EmptyDocument { name: String },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// No pixel surface of the requested size can be allocated.
    #[error("Failed to allocate a {width}x{height} drawing surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("Rendering page 1 failed: {0}")]
    RenderFailed(String),

    // ── Output ────────────────────────────────────────────────────────────
    /// PNG encoding failed or there was no image to encode.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Text placed in `ConversionResult::error` for this failure.
    pub fn result_message(&self) -> String {
        match self {
            Pdf2ImgError::Encode(_) => ENCODE_FAILED_MESSAGE.to_string(),
            other => format!("{CONVERT_FAILED_PREFIX}{other}"),
        }
    }
}

/// Describe a panic payload caught from a blocking task.
///
/// String payloads are used verbatim; any other payload is opaque and
/// reported with a fixed message.
pub(crate) fn describe_panic(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_failure_has_its_own_message() {
        let e = Pdf2ImgError::Encode("empty output".into());
        assert_eq!(e.result_message(), "Failed to create image blob");
    }

    #[test]
    fn other_failures_are_prefixed() {
        let e = Pdf2ImgError::Decode {
            name: "a.pdf".into(),
            detail: "missing %PDF header".into(),
        };
        let msg = e.result_message();
        assert!(msg.starts_with("Failed to convert PDF: "), "got: {msg}");
        assert!(msg.contains("missing %PDF header"));
    }

    #[test]
    fn type_validation_names_received_type() {
        let e = Pdf2ImgError::TypeValidation {
            received: "object".into(),
        };
        assert!(e.result_message().contains("non-file value: object"));
    }

    #[test]
    fn surface_display() {
        let e = Pdf2ImgError::SurfaceUnavailable { width: 0, height: 10 };
        assert!(e.to_string().contains("0x10"));
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(describe_panic(Box::new("boom")), "boom");
        assert_eq!(describe_panic(Box::new(String::from("bang"))), "bang");
        assert_eq!(describe_panic(Box::new(42_u32)), "panic with a non-string payload");
    }
}
