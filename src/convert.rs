//! Conversion entry points.
//!
//! [`Converter`] ties a [`LibraryLoader`] to the pipeline stages. The free
//! functions [`convert_pdf_to_image`] and [`convert_json_value`] use the
//! process-wide PDFium loader, so the library is bound once no matter how
//! many conversions run or how many start at the same moment.
//!
//! None of these functions return `Err` or panic on bad input: every
//! failure is reported through [`ConversionResult::error`].

use crate::error::Pdf2ImgError;
use crate::loader::LibraryLoader;
use crate::object_url::create_object_url;
use crate::output::{ConversionResult, ImageFile};
use crate::pdfium::{init_shared_loader, shared_loader, PdfiumBackend};
use crate::pipeline::input::InputFile;
use crate::pipeline::render::RenderBackend;
use crate::pipeline::{encode, render};
use crate::progress::{ProgressCallback, Stage};
use crate::LoaderConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts PDFs with a particular rendering backend.
pub struct Converter<B: RenderBackend> {
    loader: Arc<LibraryLoader<B>>,
    progress: Option<ProgressCallback>,
}

impl<B: RenderBackend> Clone for Converter<B> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            progress: self.progress.clone(),
        }
    }
}

impl Converter<PdfiumBackend> {
    /// Converter backed by the process-wide PDFium loader.
    pub fn shared() -> Self {
        Self::new(shared_loader())
    }

    /// Converter backed by the process-wide PDFium loader, configuring it
    /// with `config` if nothing has configured it yet.
    pub fn pdfium(config: LoaderConfig) -> Self {
        Self::new(init_shared_loader(config))
    }
}

impl<B: RenderBackend> Converter<B> {
    pub fn new(loader: Arc<LibraryLoader<B>>) -> Self {
        Self {
            loader,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn loader(&self) -> &Arc<LibraryLoader<B>> {
        &self.loader
    }

    /// Rasterise page 1 of `input` into a PNG.
    pub async fn convert(&self, input: &InputFile) -> ConversionResult {
        let start = Instant::now();
        info!("convert_pdf_to_image called with: {}", input.name());

        let result = match self.try_convert(input).await {
            Ok(result) => {
                info!(
                    "Converted {} in {}ms",
                    input.name(),
                    start.elapsed().as_millis()
                );
                result
            }
            Err(e) => {
                warn!("Conversion of {} failed: {e}", input.name());
                ConversionResult::from_error(&e)
            }
        };

        if let Some(cb) = &self.progress {
            cb.on_conversion_complete(result.is_success());
        }
        result
    }

    /// Convert a loosely typed value, e.g. a JSON request body.
    ///
    /// The value must be `{"name": string, "data": base64 string}`.
    pub async fn convert_value(&self, value: &Value) -> ConversionResult {
        match InputFile::from_json(value) {
            Ok(input) => self.convert(&input).await,
            Err(e) => {
                warn!("Rejected input: {e}");
                if let Some(cb) = &self.progress {
                    cb.on_conversion_complete(false);
                }
                ConversionResult::from_error(&e)
            }
        }
    }

    async fn try_convert(&self, input: &InputFile) -> Result<ConversionResult, Pdf2ImgError> {
        // ── Step 1: Library ──────────────────────────────────────────────
        let backend = match self.loader.get() {
            Some(backend) => backend,
            None => {
                if let Some(cb) = &self.progress {
                    cb.on_library_loading();
                }
                let backend = self.loader.ensure_loaded().await?;
                if let Some(cb) = &self.progress {
                    cb.on_library_ready();
                }
                backend
            }
        };

        // ── Step 2: Read ─────────────────────────────────────────────────
        self.stage(Stage::Reading);
        let bytes = input.read().await?;
        debug!("Read {} bytes of {}", bytes.len(), input.name());

        // ── Steps 3–9: Decode, size, render ──────────────────────────────
        let rendered = render::render_first_page(
            backend,
            input.name().to_string(),
            bytes,
            self.progress.clone(),
        )
        .await?;
        let (width, height) = rendered.image.dimensions();

        // ── Step 10: Encode ──────────────────────────────────────────────
        self.stage(Stage::Encoding);
        let png: Arc<[u8]> = encode::encode_png_blocking(rendered.image).await?.into();

        // ── Step 11: Package ─────────────────────────────────────────────
        let file = ImageFile::png(
            encode::output_file_name(input.name()),
            width,
            height,
            Arc::clone(&png),
        );
        let image_url = create_object_url(png);
        debug!("{} → {} ({} bytes)", input.name(), file.name, file.len());

        Ok(ConversionResult::success(image_url, file))
    }

    fn stage(&self, stage: Stage) {
        if let Some(cb) = &self.progress {
            cb.on_stage(stage);
        }
    }
}

/// Rasterise page 1 of `input` using the shared PDFium loader.
///
/// ```rust,no_run
/// use pdf2img::{convert_pdf_to_image, revoke_object_url, InputFile};
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = convert_pdf_to_image(&InputFile::from_path("report.pdf")).await;
/// match (&result.file, &result.error) {
///     (Some(file), None) => println!("{} ({} bytes)", file.name, file.len()),
///     (_, err) => eprintln!("{}", err.as_deref().unwrap_or("unknown error")),
/// }
/// revoke_object_url(&result.image_url);
/// # }
/// ```
pub async fn convert_pdf_to_image(input: &InputFile) -> ConversionResult {
    Converter::shared().convert(input).await
}

/// [`Converter::convert_value`] with the shared PDFium loader.
pub async fn convert_json_value(value: &Value) -> ConversionResult {
    Converter::shared().convert_value(value).await
}

/// Synchronous wrapper around [`convert_pdf_to_image`].
///
/// Creates a temporary tokio runtime internally. Called from async code it
/// returns a failed result instead of blocking the runtime.
pub fn convert_pdf_to_image_sync(input: &InputFile) -> ConversionResult {
    if tokio::runtime::Handle::try_current().is_ok() {
        return ConversionResult::from_error(&Pdf2ImgError::Internal(
            "convert_pdf_to_image_sync called inside an async runtime; \
use convert_pdf_to_image"
                .into(),
        ));
    }
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(convert_pdf_to_image(input)),
        Err(e) => ConversionResult::from_error(&Pdf2ImgError::Internal(format!(
            "Failed to create tokio runtime: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sync_wrapper_inside_runtime_fails_without_panicking() {
        let input = InputFile::from_bytes("a.pdf", b"%PDF-1.7".to_vec());
        let result = convert_pdf_to_image_sync(&input);
        assert!(result.file.is_none());
        let err = result.error.unwrap();
        assert!(err.starts_with("Failed to convert PDF: "), "got: {err}");
        assert!(err.contains("inside an async runtime"), "got: {err}");
    }
}
