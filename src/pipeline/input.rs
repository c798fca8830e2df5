//! Input handling: the PDF handed to the converter and its validation.
//!
//! An [`InputFile`] is either bytes already in memory or a path that is read
//! when the conversion starts. Callers that only hold loosely typed data
//! (JSON from a web request, a scripting bridge) go through
//! [`InputFile::from_json`], which is the one place the "is this actually a
//! file?" check happens.

use crate::error::Pdf2ImgError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// PDF readers accept the header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Clone)]
enum Source {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

/// A PDF to convert: its display name plus its content.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    source: Source,
}

impl InputFile {
    /// In-memory PDF content.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            source: Source::Memory(Arc::from(bytes)),
        }
    }

    /// A PDF on disk, named after its final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            source: Source::Path(path),
        }
    }

    /// Accept a JSON value shaped like `{"name": "...", "data": "<base64>"}`.
    ///
    /// Anything else is rejected with [`Pdf2ImgError::TypeValidation`]
    /// naming the JSON type that was received.
    pub fn from_json(value: &Value) -> Result<Self, Pdf2ImgError> {
        let fields = value.as_object().and_then(|obj| {
            let name = obj.get("name")?.as_str()?;
            let data = obj.get("data")?.as_str()?;
            Some((name, data))
        });
        let Some((name, data)) = fields else {
            return Err(Pdf2ImgError::TypeValidation {
                received: json_type_name(value).to_string(),
            });
        };

        let bytes = STANDARD.decode(data).map_err(|e| Pdf2ImgError::Decode {
            name: name.to_string(),
            detail: format!("file data is not valid base64: {e}"),
        })?;
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the complete content.
    pub async fn read(&self) -> Result<Vec<u8>, Pdf2ImgError> {
        match &self.source {
            Source::Memory(bytes) => Ok(bytes.to_vec()),
            Source::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => Pdf2ImgError::FileNotFound { path: path.clone() },
                    std::io::ErrorKind::PermissionDenied => {
                        Pdf2ImgError::PermissionDenied { path: path.clone() }
                    }
                    _ => Pdf2ImgError::Internal(format!("Failed to read '{}': {e}", path.display())),
                })?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
        }
    }
}

/// Fail with [`Pdf2ImgError::Decode`] unless `bytes` carries a `%PDF-` header.
pub fn check_pdf_header(name: &str, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(Pdf2ImgError::Decode {
        name: name.to_string(),
        detail: if bytes.is_empty() {
            "file is empty".to_string()
        } else {
            format!("missing %PDF header (first bytes: {magic:?})")
        },
    })
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_at_start() {
        assert!(check_pdf_header("a.pdf", b"%PDF-1.7\n...").is_ok());
    }

    #[test]
    fn header_after_junk() {
        let mut bytes = vec![b' '; 100];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(check_pdf_header("a.pdf", &bytes).is_ok());
    }

    #[test]
    fn not_a_pdf() {
        let err = check_pdf_header("a.png", b"\x89PNG\r\n").unwrap_err();
        assert!(matches!(err, Pdf2ImgError::Decode { .. }));
        assert!(err.to_string().contains("missing %PDF header"));
    }

    #[test]
    fn empty_file() {
        let err = check_pdf_header("a.pdf", b"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn from_path_uses_file_name() {
        let f = InputFile::from_path("/some/dir/report.pdf");
        assert_eq!(f.name(), "report.pdf");
    }

    #[test]
    fn json_file_object() {
        let v = json!({ "name": "x.pdf", "data": STANDARD.encode(b"%PDF-1.7") });
        let f = InputFile::from_json(&v).unwrap();
        assert_eq!(f.name(), "x.pdf");
    }

    #[test]
    fn json_plain_mapping_is_rejected() {
        let err = InputFile::from_json(&json!({ "foo": 1 })).unwrap_err();
        assert!(err.to_string().contains("object"), "got: {err}");
    }

    #[test]
    fn json_scalars_name_their_type() {
        for (v, ty) in [
            (json!(null), "null"),
            (json!(3), "number"),
            (json!("report.pdf"), "string"),
            (json!([1, 2]), "array"),
            (json!(true), "boolean"),
        ] {
            let err = InputFile::from_json(&v).unwrap_err();
            assert!(err.to_string().ends_with(ty), "{v} → {err}");
        }
    }

    #[test]
    fn json_bad_base64() {
        let err = InputFile::from_json(&json!({ "name": "x.pdf", "data": "!!!" })).unwrap_err();
        assert!(matches!(err, Pdf2ImgError::Decode { .. }));
    }

    #[tokio::test]
    async fn read_memory() {
        let f = InputFile::from_bytes("x.pdf", b"%PDF-1.7".to_vec());
        assert_eq!(f.read().await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn read_missing_path() {
        let f = InputFile::from_path("/definitely/not/here.pdf");
        let err = f.read().await.unwrap_err();
        assert!(matches!(err, Pdf2ImgError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();
        let f = InputFile::from_path(&path);
        assert_eq!(f.read().await.unwrap(), b"%PDF-1.4 body");
    }
}
