//! # pdfium-fetch
//!
//! Find the [PDFium](https://pdfium.googlesource.com/pdfium/) shared library
//! at its well-known location, downloading it from
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! when it is missing, and bind `pdfium-render` to it.
//!
//! Resolution order:
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. `{library_dir()}/{platform library name}`.
//! 3. Download the platform archive, extract the library into (2).
//!
//! The cache directory defaults to `{cache_dir}/pdf2img/pdfium-{VERSION}/`
//! and can be moved with `PDFIUM_FETCH_CACHE_DIR`.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! let path = pdfium_fetch::fetch_library(Duration::from_secs(120))?;
//! let pdfium = pdfium_fetch::bind_library(&path)?;
//! # Ok::<(), pdfium_fetch::FetchError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag (`chromium/{PDFIUM_VERSION}`).
pub const PDFIUM_VERSION: &str = "7690";

/// Environment variable naming an existing pdfium library.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PDFIUM_FETCH_CACHE_DIR";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Errors raised while locating, downloading or binding pdfium.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// Downloads are disabled and nothing was found locally.
    #[error("PDFium library not found at '{path}' and downloading is disabled")]
    NotFound { path: PathBuf },

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Release asset layout for one OS/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Asset name in the GitHub release.
    pub archive: &'static str,
    /// Path of the library inside the archive.
    pub member: &'static str,
    /// File name written to the cache directory.
    pub file_name: &'static str,
}

const PLATFORMS: &[(&str, &str, Platform)] = &[
    ("macos", "aarch64", Platform { archive: "pdfium-mac-arm64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" }),
    ("macos", "x86_64", Platform { archive: "pdfium-mac-x64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" }),
    ("linux", "x86_64", Platform { archive: "pdfium-linux-x64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" }),
    ("linux", "aarch64", Platform { archive: "pdfium-linux-arm64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" }),
    ("windows", "x86_64", Platform { archive: "pdfium-win-x64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" }),
    ("windows", "aarch64", Platform { archive: "pdfium-win-arm64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" }),
    ("windows", "x86", Platform { archive: "pdfium-win-x86.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" }),
];

impl Platform {
    /// Look up the layout for an explicit OS/architecture pair.
    pub fn lookup(os: &str, arch: &str) -> Result<Platform, FetchError> {
        PLATFORMS
            .iter()
            .find(|(o, a, _)| *o == os && *a == arch)
            .map(|(_, _, p)| *p)
            .ok_or_else(|| FetchError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
    }

    /// Layout for the running host.
    pub fn current() -> Result<Platform, FetchError> {
        Self::lookup(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Download URL of this platform's archive.
    pub fn archive_url(&self) -> String {
        format!("{RELEASES_URL}/chromium%2F{PDFIUM_VERSION}/{}", self.archive)
    }
}

/// Directory the library is cached in.
pub fn library_dir() -> PathBuf {
    if let Ok(root) = std::env::var(CACHE_DIR_ENV) {
        if !root.is_empty() {
            return PathBuf::from(root).join(format!("pdfium-{PDFIUM_VERSION}"));
        }
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdf2img")
        .join(format!("pdfium-{PDFIUM_VERSION}"))
}

/// The fixed location the library is expected at on this host.
pub fn well_known_library_path() -> Result<PathBuf, FetchError> {
    Ok(library_dir().join(Platform::current()?.file_name))
}

/// Find an already-present library without touching the network.
pub fn locate_library() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(LIB_PATH_ENV) {
        let p = PathBuf::from(p);
        if p.is_file() {
            return Some(p);
        }
        warn!("{LIB_PATH_ENV}='{}' does not exist; ignoring", p.display());
    }

    well_known_library_path().ok().filter(|p| p.is_file())
}

static FETCHED: OnceLock<PathBuf> = OnceLock::new();

/// Return the library path, downloading the archive on first use.
///
/// The resolved path is remembered for the rest of the process.
pub fn fetch_library(timeout: Duration) -> Result<PathBuf, FetchError> {
    if let Some(path) = FETCHED.get() {
        return Ok(path.clone());
    }

    let path = match locate_library() {
        Some(path) => path,
        None => download_library(timeout)?,
    };
    debug!("PDFium library resolved: {}", path.display());

    Ok(FETCHED.get_or_init(|| path).clone())
}

/// Like [`fetch_library`] but never downloads.
pub fn require_library() -> Result<PathBuf, FetchError> {
    locate_library().ok_or_else(|| FetchError::NotFound {
        path: well_known_library_path().unwrap_or_else(|_| library_dir()),
    })
}

/// Bind `pdfium-render` to the library at `path`.
pub fn bind_library(path: &Path) -> Result<Pdfium, FetchError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| FetchError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download_library(timeout: Duration) -> Result<PathBuf, FetchError> {
    let platform = Platform::current()?;
    let dir = library_dir();
    std::fs::create_dir_all(&dir).map_err(FetchError::CacheDir)?;

    let url = platform.archive_url();
    info!("Downloading PDFium {PDFIUM_VERSION} from {url}");
    let archive = download(&url, timeout)?;
    debug!("Downloaded {} bytes", archive.len());

    let dest = dir.join(platform.file_name);
    extract_member(&archive, platform.member, &dest)?;
    info!("PDFium cached at {}", dest.display());
    Ok(dest)
}

fn download(url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-fetch/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| FetchError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(FetchError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| FetchError::Download(format!("reading body of {url}: {e}")))
}

/// Unpack `member` from a `.tgz` archive to `dest`.
///
/// The file is written beside `dest` first and renamed into place, so a
/// concurrent reader never sees a partial library.
fn extract_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), FetchError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(archive));
    let entries = archive
        .entries()
        .map_err(|e| FetchError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| FetchError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map_err(|e| FetchError::Extract(e.to_string()))?
            .to_string_lossy()
            == member;
        if !matches {
            continue;
        }

        let partial = dest.with_extension("partial");
        entry
            .unpack(&partial)
            .map_err(|e| FetchError::Extract(format!("unpack {member}: {e}")))?;
        std::fs::rename(&partial, dest).map_err(FetchError::CacheDir)?;
        return Ok(());
    }

    Err(FetchError::Extract(format!("'{member}' not found in archive")))
}
