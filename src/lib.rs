//! # pdf2img
//!
//! Rasterise the first page of a PDF into a PNG.
//!
//! PDFium (via `pdfium-render`) is loaded lazily on the first conversion and
//! shared by every conversion after it. Page 1 is rendered at 4× its native
//! size with high-quality smoothing and encoded as PNG at maximum
//! compression effort. Each result carries the PNG as an [`ImageFile`] plus
//! a reference URL that resolves to the same bytes until revoked.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 0. Load    bind PDFium once per process (shared in-flight load)
//!  ├─ 1. Read    bytes from memory or disk
//!  ├─ 2. Render  decode, page 1, 4× viewport, paint surface (spawn_blocking)
//!  ├─ 3. Encode  PNG, CompressionType::Best
//!  └─ 4. Output  ImageFile + blob:pdf2img/<uuid> reference URL
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2img::{convert_pdf_to_image, InputFile};
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = convert_pdf_to_image(&InputFile::from_path("report.pdf")).await;
//!     if let Some(err) = &result.error {
//!         eprintln!("{err}");
//!         return;
//!     }
//!     if let Some(file) = &result.file {
//!         println!("{} → {}", file.name, result.image_url);
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## PDFium
//!
//! The library is looked up at `PDFIUM_LIB_PATH`, then at the well-known
//! cache location, and downloaded there on first use unless
//! `PDF2IMG_NO_DOWNLOAD=1`. See [`LoaderConfig`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod loader;
pub mod object_url;
pub mod output;
pub mod pdfium;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LoaderConfig, LoaderConfigBuilder};
pub use convert::{convert_json_value, convert_pdf_to_image, convert_pdf_to_image_sync, Converter};
pub use error::Pdf2ImgError;
pub use loader::LibraryLoader;
pub use object_url::{create_object_url, live_object_urls, resolve_object_url, revoke_object_url};
pub use output::{ConversionResult, ImageFile};
pub use pdfium::{init_shared_loader, shared_loader, PdfiumBackend};
pub use pipeline::encode::output_file_name;
pub use pipeline::input::InputFile;
pub use pipeline::render::{
    PageSize, RenderBackend, RenderDocument, RenderPage, Smoothing, Surface, Viewport,
    RENDER_SCALE,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
