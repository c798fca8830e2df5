//! Configuration for locating the PDF rendering library.
//!
//! The conversion itself takes no options: page 1, 4× scale and PNG output
//! are fixed. What varies between deployments is where PDFium lives and
//! whether it may be downloaded, so that is all [`LoaderConfig`] carries.

use crate::error::Pdf2ImgError;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable disabling the PDFium download.
pub const NO_DOWNLOAD_ENV: &str = "PDF2IMG_NO_DOWNLOAD";

/// Environment variable setting the download timeout in seconds.
pub const DOWNLOAD_TIMEOUT_ENV: &str = "PDF2IMG_DOWNLOAD_TIMEOUT";

/// How the PDFium library is found.
///
/// ```rust
/// use pdf2img::LoaderConfig;
///
/// let config = LoaderConfig::builder()
///     .library_path("/opt/pdfium/lib/libpdfium.so")
///     .allow_download(false)
///     .build()
///     .unwrap();
/// assert!(!config.allow_download);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Explicit library file. When `None` the well-known location from
    /// [`pdfium_fetch::well_known_library_path`] is used.
    pub library_path: Option<PathBuf>,

    /// Download the library when it is not found locally. Default: true.
    pub allow_download: bool,

    /// Timeout for the one-off library download in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            allow_download: true,
            download_timeout_secs: 120,
        }
    }
}

impl LoaderConfig {
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with `PDFIUM_LIB_PATH`, `PDF2IMG_NO_DOWNLOAD` and
    /// `PDF2IMG_DOWNLOAD_TIMEOUT`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(p) = std::env::var(pdfium_fetch::LIB_PATH_ENV) {
            if !p.is_empty() {
                config.library_path = Some(PathBuf::from(p));
            }
        }
        if let Ok(v) = std::env::var(NO_DOWNLOAD_ENV) {
            config.allow_download = !flag_enabled(&v);
        }
        if let Some(secs) = std::env::var(DOWNLOAD_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            config.download_timeout_secs = secs;
        }

        config
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Whether a boolean environment value is set.
///
/// Matches clap's `FalseyValueParser`, which the CLI uses for the same
/// variables: empty, `0`, `n`, `no`, `f`, `false` and `off` (any case) are
/// false, everything else is true.
pub fn flag_enabled(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "0" | "n" | "no" | "f" | "false" | "off"
    )
}

/// Builder for [`LoaderConfig`].
#[derive(Debug)]
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_path = Some(path.into());
        self
    }

    pub fn allow_download(mut self, v: bool) -> Self {
        self.config.allow_download = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LoaderConfig, Pdf2ImgError> {
        if self.config.download_timeout_secs == 0 {
            return Err(Pdf2ImgError::Internal(
                "Invalid configuration: download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
