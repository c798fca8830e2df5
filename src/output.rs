//! Conversion output types.

use crate::error::Pdf2ImgError;
use crate::pipeline::encode::PNG_MIME_TYPE;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The rendered PNG of page 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Serialised as its byte length.
    #[serde(rename = "size", serialize_with = "serialize_len")]
    pub bytes: Arc<[u8]>,
}

fn serialize_len<S: Serializer>(bytes: &Arc<[u8]>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(bytes.len() as u64)
}

impl ImageFile {
    pub fn png(name: String, width: u32, height: u32, bytes: Arc<[u8]>) -> Self {
        Self {
            name,
            mime_type: PNG_MIME_TYPE.to_string(),
            width,
            height,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the image into `dir` under its own name.
    ///
    /// The bytes go to a temporary file in `dir` which is then renamed, so
    /// readers never observe a half-written PNG.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.name);
        self.write_to(&path)?;
        Ok(path)
    }

    /// Atomically write the image to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Result of one conversion.
///
/// On success `file` is set, `error` is `None` and `image_url` resolves via
/// [`crate::resolve_object_url`]. On failure `file` is `None`, `image_url`
/// is empty and `error` explains what went wrong. Callers must check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub image_url: String,
    pub file: Option<ImageFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn success(image_url: String, file: ImageFile) -> Self {
        Self {
            image_url,
            file: Some(file),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            image_url: String::new(),
            file: None,
            error: Some(message.into()),
        }
    }

    pub fn from_error(err: &Pdf2ImgError) -> Self {
        Self::failure(err.result_message())
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.file.is_some()
    }

    /// Convert into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<(String, ImageFile), String> {
        match (self.file, self.error) {
            (Some(file), None) => Ok((self.image_url, file)),
            (_, Some(err)) => Err(err),
            (None, None) => Err("conversion produced no file".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageFile {
        ImageFile::png("a.png".into(), 2, 3, Arc::from(&b"\x89PNG"[..]))
    }

    #[test]
    fn failure_shape() {
        let r = ConversionResult::failure("Failed to create image blob");
        assert!(!r.is_success());
        assert!(r.image_url.is_empty());
        assert!(r.file.is_none());
        assert_eq!(r.into_result().unwrap_err(), "Failed to create image blob");
    }

    #[test]
    fn json_shape() {
        let ok = ConversionResult::success("blob:pdf2img/1".into(), sample());
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["imageUrl"], "blob:pdf2img/1");
        assert_eq!(v["file"]["name"], "a.png");
        assert_eq!(v["file"]["mimeType"], "image/png");
        assert_eq!(v["file"]["size"], 4);
        assert!(v.get("error").is_none());

        let err = serde_json::to_value(ConversionResult::failure("boom")).unwrap();
        assert_eq!(err["file"], serde_json::Value::Null);
        assert_eq!(err["error"], "boom");
    }

    #[test]
    fn write_is_atomic_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample().write_to_dir(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "a.png");
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
