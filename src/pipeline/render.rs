//! Page rasterisation: decode a PDF and paint page 1 onto a pixel surface.
//!
//! ## Why spawn_blocking?
//!
//! PDFium is a synchronous C++ library. Decoding and rendering at 4× can
//! take hundreds of milliseconds, so [`render_first_page`] moves the work
//! onto tokio's blocking pool and the async executor keeps serving other
//! conversions meanwhile.
//!
//! ## Backends
//!
//! The pipeline talks to the renderer through [`RenderBackend`],
//! [`RenderDocument`] and [`RenderPage`]. [`crate::pdfium::PdfiumBackend`]
//! is the production implementation.
//!
//! ## Memory
//!
//! The scale is fixed at [`RENDER_SCALE`] and not bounded: an A0 poster
//! (2384 × 3370 pt) becomes a 9536 × 13480 px surface, roughly 500 MB of
//! RGBA. Allocation failure is reported as
//! [`Pdf2ImgError::SurfaceUnavailable`] rather than aborting the process.
//! A page that scales to zero pixels in either direction has nothing to
//! encode and is reported as [`Pdf2ImgError::Encode`].

use crate::error::{describe_panic, Pdf2ImgError};
use crate::pipeline::input::check_pdf_header;
use crate::progress::{ProgressCallback, Stage};
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info};

/// Upscale factor applied to the page's native size.
pub const RENDER_SCALE: f32 = 4.0;

/// Native page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Target dimensions for rendering a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    /// Scaled width in pixels, before truncation.
    pub width: f32,
    /// Scaled height in pixels, before truncation.
    pub height: f32,
}

impl Viewport {
    pub fn new(page: PageSize, scale: f32) -> Self {
        Self {
            scale,
            width: page.width * scale,
            height: page.height * scale,
        }
    }

    /// Surface width; fractional pixels are dropped.
    pub fn pixel_width(&self) -> u32 {
        to_pixels(self.width)
    }

    pub fn pixel_height(&self) -> u32 {
        to_pixels(self.height)
    }
}

fn to_pixels(v: f32) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.min(u32::MAX as f32) as u32
    } else {
        0
    }
}

/// Interpolation quality the renderer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Smoothing {
    Off,
    /// Anti-alias text, paths and scaled images.
    #[default]
    High,
}

impl Smoothing {
    pub fn enabled(self) -> bool {
        self == Smoothing::High
    }
}

/// An RGBA pixel buffer the page is painted onto.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    smoothing: Smoothing,
}

impl Surface {
    /// Allocate a transparent surface of the viewport's pixel size.
    pub fn allocate(viewport: &Viewport) -> Result<Self, Pdf2ImgError> {
        let (width, height) = (viewport.pixel_width(), viewport.pixel_height());
        let unavailable = || Pdf2ImgError::SurfaceUnavailable { width, height };

        if width == 0 || height == 0 {
            return Err(unavailable());
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(unavailable)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| unavailable())?;
        buf.resize(len, 0);

        let pixels = RgbaImage::from_raw(width, height, buf).ok_or_else(unavailable)?;
        Ok(Self {
            pixels,
            smoothing: Smoothing::Off,
        })
    }

    pub fn set_smoothing(&mut self, smoothing: Smoothing) {
        self.smoothing = smoothing;
    }

    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Copy `image` onto the surface at the origin, clipping what overhangs.
    pub fn blit(&mut self, image: &RgbaImage) {
        image::imageops::replace(&mut self.pixels, image, 0, 0);
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

/// A loaded rendering library able to open documents.
pub trait RenderBackend: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Decode a document. `name` is only used for error messages.
    fn open(&self, name: &str, bytes: Vec<u8>)
        -> Result<Box<dyn RenderDocument + '_>, Pdf2ImgError>;
}

/// A decoded document.
pub trait RenderDocument {
    fn page_count(&self) -> usize;

    /// Fetch a page by 0-based index.
    fn page(&self, index: usize) -> Result<Box<dyn RenderPage + '_>, Pdf2ImgError>;
}

/// A single page ready to be painted.
pub trait RenderPage {
    fn size(&self) -> PageSize;

    /// Paint the page scaled to `viewport` onto `surface`, honouring
    /// [`Surface::smoothing`].
    fn render(&self, viewport: &Viewport, surface: &mut Surface) -> Result<(), Pdf2ImgError>;
}

/// Outcome of rasterising page 1.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_count: usize,
    pub page_size: PageSize,
    pub viewport: Viewport,
    pub image: RgbaImage,
}

/// Rasterise page 1 on the blocking pool.
///
/// A panic inside the backend is caught and reported as
/// [`Pdf2ImgError::RenderFailed`] carrying the panic message.
pub async fn render_first_page<B: RenderBackend>(
    backend: Arc<B>,
    name: String,
    bytes: Vec<u8>,
    progress: Option<ProgressCallback>,
) -> Result<RenderedPage, Pdf2ImgError> {
    tokio::task::spawn_blocking(move || {
        rasterize_first_page(backend.as_ref(), &name, bytes, progress.as_ref())
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            Pdf2ImgError::RenderFailed(describe_panic(e.into_panic()))
        } else {
            Pdf2ImgError::Internal(format!("Render task failed: {e}"))
        }
    })?
}

/// Blocking implementation of [`render_first_page`].
pub fn rasterize_first_page<B: RenderBackend + ?Sized>(
    backend: &B,
    name: &str,
    bytes: Vec<u8>,
    progress: Option<&ProgressCallback>,
) -> Result<RenderedPage, Pdf2ImgError> {
    if let Some(cb) = progress {
        cb.on_stage(Stage::Decoding);
    }
    check_pdf_header(name, &bytes)?;
    let document = backend.open(name, bytes)?;

    let page_count = document.page_count();
    info!("PDF loaded ({}), total pages: {}", backend.name(), page_count);
    if page_count == 0 {
        return Err(Pdf2ImgError::EmptyDocument {
            name: name.to_string(),
        });
    }

    let page = document.page(0)?;
    let page_size = page.size();
    let viewport = Viewport::new(page_size, RENDER_SCALE);
    debug!(
        "Viewport: {}x{} ({}x{} pt at {}x)",
        viewport.width, viewport.height, page_size.width, page_size.height, viewport.scale
    );

    // A canvas of zero width or height still renders, but yields no image.
    if viewport.pixel_width() == 0 || viewport.pixel_height() == 0 {
        return Err(Pdf2ImgError::Encode(format!(
            "page 1 renders to an empty {}x{} image",
            viewport.pixel_width(),
            viewport.pixel_height()
        )));
    }

    let mut surface = Surface::allocate(&viewport)?;
    surface.set_smoothing(Smoothing::High);

    if let Some(cb) = progress {
        cb.on_stage(Stage::Rendering);
    }
    page.render(&viewport, &mut surface)?;
    debug!("Rendered page 1 → {}x{} px", surface.width(), surface.height());

    Ok(RenderedPage {
        page_count,
        page_size,
        viewport,
        image: surface.into_image(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_scales_native_size() {
        let vp = Viewport::new(PageSize { width: 612.0, height: 792.0 }, RENDER_SCALE);
        assert_eq!(vp.width, 2448.0);
        assert_eq!(vp.height, 3168.0);
        assert_eq!((vp.pixel_width(), vp.pixel_height()), (2448, 3168));
    }

    #[test]
    fn fractional_pixels_are_truncated() {
        let vp = Viewport::new(PageSize { width: 10.3, height: 0.6 }, RENDER_SCALE);
        assert_eq!(vp.pixel_width(), 41);
        assert_eq!(vp.pixel_height(), 2);
    }

    #[test]
    fn surface_matches_viewport() {
        let vp = Viewport::new(PageSize { width: 3.0, height: 2.0 }, RENDER_SCALE);
        let surface = Surface::allocate(&vp).unwrap();
        assert_eq!((surface.width(), surface.height()), (12, 8));
        assert_eq!(surface.smoothing(), Smoothing::Off);
        assert!(surface.pixels().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn empty_surface_is_unavailable() {
        let vp = Viewport::new(PageSize { width: 0.0, height: 100.0 }, RENDER_SCALE);
        let err = Surface::allocate(&vp).unwrap_err();
        assert!(matches!(
            err,
            Pdf2ImgError::SurfaceUnavailable { width: 0, height: 400 }
        ));
    }

    #[test]
    fn nan_page_size_is_unavailable() {
        let vp = Viewport::new(PageSize { width: f32::NAN, height: 1.0 }, RENDER_SCALE);
        assert!(Surface::allocate(&vp).is_err());
    }

    #[test]
    fn blit_clips_to_surface() {
        let vp = Viewport::new(PageSize { width: 1.0, height: 1.0 }, RENDER_SCALE);
        let mut surface = Surface::allocate(&vp).unwrap();
        let big = RgbaImage::from_pixel(10, 10, image::Rgba([1, 2, 3, 255]));
        surface.blit(&big);
        assert_eq!(surface.width(), 4);
        assert_eq!(surface.pixels().get_pixel(3, 3).0, [1, 2, 3, 255]);
    }
}
