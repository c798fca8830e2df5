//! PDFium implementation of the render backend.
//!
//! Loading means finding the PDFium shared library at its well-known
//! location (downloading it there on first use unless disabled) and binding
//! `pdfium-render` to it. The process keeps a single loader, so PDFium is
//! bound at most once; see [`shared_loader`] and [`init_shared_loader`].

use crate::config::LoaderConfig;
use crate::error::Pdf2ImgError;
use crate::loader::LibraryLoader;
use crate::pipeline::render::{
    PageSize, RenderBackend, RenderDocument, RenderPage, Surface, Viewport,
};
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A bound PDFium library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
    library_path: PathBuf,
}

impl PdfiumBackend {
    /// Locate (or fetch) and bind PDFium. Blocking.
    fn load(config: &LoaderConfig) -> Result<Self, Pdf2ImgError> {
        let library_path = resolve_library(config)?;
        info!("Binding PDFium from {}", library_path.display());

        let pdfium = pdfium_fetch::bind_library(&library_path)
            .map_err(|e| Pdf2ImgError::LibraryLoad(e.to_string()))?;
        Ok(Self {
            pdfium,
            library_path,
        })
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }
}

fn resolve_library(config: &LoaderConfig) -> Result<PathBuf, Pdf2ImgError> {
    if let Some(path) = &config.library_path {
        if path.is_file() {
            return Ok(path.clone());
        }
        return Err(Pdf2ImgError::LibraryLoad(format!(
            "configured library '{}' does not exist",
            path.display()
        )));
    }

    let found = if config.allow_download {
        pdfium_fetch::fetch_library(config.download_timeout())
    } else {
        pdfium_fetch::require_library()
    };
    found.map_err(|e| Pdf2ImgError::LibraryLoad(e.to_string()))
}

impl LibraryLoader<PdfiumBackend> {
    /// A loader that binds PDFium according to `config`.
    fn pdfium(config: LoaderConfig) -> Self {
        LibraryLoader::blocking(move || PdfiumBackend::load(&config))
    }
}

// Dropping a `Pdfium` tears down the library's global state, so the process
// holds exactly one binding.
static SHARED: OnceCell<Arc<LibraryLoader<PdfiumBackend>>> = OnceCell::new();

/// The process-wide PDFium loader.
///
/// The first of [`init_shared_loader`] and [`shared_loader`] to run decides
/// its configuration; [`shared_loader`] uses [`LoaderConfig::from_env`].
pub fn shared_loader() -> Arc<LibraryLoader<PdfiumBackend>> {
    Arc::clone(SHARED.get_or_init(|| Arc::new(LibraryLoader::pdfium(LoaderConfig::from_env()))))
}

/// Configure the process-wide PDFium loader and return it.
///
/// Only the first configuration takes effect. Later calls get the existing
/// loader back, with a warning when their configuration differs.
pub fn init_shared_loader(config: LoaderConfig) -> Arc<LibraryLoader<PdfiumBackend>> {
    let mut installed = false;
    let loader = SHARED.get_or_init(|| {
        installed = true;
        Arc::new(LibraryLoader::pdfium(config.clone()))
    });
    if !installed {
        warn!("PDFium loader already configured; ignoring {config:?}");
    }
    Arc::clone(loader)
}

impl RenderBackend for PdfiumBackend {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn open(
        &self,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<Box<dyn RenderDocument + '_>, Pdf2ImgError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| Pdf2ImgError::Decode {
                name: name.to_string(),
                detail: format!("{e:?}"),
            })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RenderDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<Box<dyn RenderPage + '_>, Pdf2ImgError> {
        let index = u16::try_from(index)
            .map_err(|_| Pdf2ImgError::RenderFailed(format!("page index {index} out of range")))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| Pdf2ImgError::RenderFailed(format!("{e:?}")))?;
        Ok(Box::new(PdfiumPage { page }))
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
}

impl RenderPage for PdfiumPage<'_> {
    fn size(&self) -> PageSize {
        PageSize {
            width: self.page.width().value,
            height: self.page.height().value,
        }
    }

    fn render(&self, _viewport: &Viewport, surface: &mut Surface) -> Result<(), Pdf2ImgError> {
        let too_large = || Pdf2ImgError::SurfaceUnavailable {
            width: surface.width(),
            height: surface.height(),
        };
        let width = i32::try_from(surface.width()).map_err(|_| too_large())?;
        let height = i32::try_from(surface.height()).map_err(|_| too_large())?;
        let smooth = surface.smoothing().enabled();

        let config = PdfRenderConfig::new()
            .set_target_size(width, height)
            .set_text_smoothing(smooth)
            .set_image_smoothing(smooth)
            .set_path_smoothing(smooth)
            .render_form_data(true);

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| Pdf2ImgError::RenderFailed(format!("{e:?}")))?;
        let image = bitmap.as_image().into_rgba8();
        debug!("PDFium produced {}x{} px", image.width(), image.height());

        surface.blit(&image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_point_shares_one_loader() {
        let config = LoaderConfig::builder()
            .library_path("/nonexistent/libpdfium.so")
            .allow_download(false)
            .build()
            .unwrap();

        let a = init_shared_loader(config.clone());
        let b = init_shared_loader(LoaderConfig::default());
        let c = shared_loader();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(a.load_attempts(), 0);
    }
}
