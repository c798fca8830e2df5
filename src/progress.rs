//! Progress-callback trait for conversion events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::Converter::with_progress`] to follow a conversion through its
//! stages. The CLI uses it to drive a spinner; a server could forward the
//! events to a websocket.
//!
//! # Example
//!
//! ```rust
//! use pdf2img::{ConversionProgressCallback, Stage};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Log(Mutex<Vec<Stage>>);
//!
//! impl ConversionProgressCallback for Log {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Pipeline stage reported to [`ConversionProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Reading,
    Decoding,
    Rendering,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Reading => "Reading PDF",
            Stage::Decoding => "Decoding",
            Stage::Rendering => "Rendering page 1",
            Stage::Encoding => "Encoding PNG",
        })
    }
}

/// Receives conversion events. All methods default to no-ops.
///
/// Stage events for decoding and rendering fire on a blocking-pool thread,
/// hence `Send + Sync`.
pub trait ConversionProgressCallback: Send + Sync {
    /// The rendering library is not loaded yet and this conversion is
    /// waiting for it (possibly behind another caller's load).
    fn on_library_loading(&self) {}

    fn on_library_ready(&self) {}

    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once per conversion, after the result is built.
    fn on_conversion_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared callback handle.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_library_loading();
        cb.on_library_ready();
        cb.on_stage(Stage::Rendering);
        cb.on_conversion_complete(true);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Encoding.to_string(), "Encoding PNG");
        assert_eq!(serde_json::to_string(&Stage::Decoding).unwrap(), "\"decoding\"");
    }
}
