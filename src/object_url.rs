//! Reference URLs for in-memory image bytes.
//!
//! Every successful conversion registers its PNG under a fresh
//! `blob:pdf2img/<uuid>` URL, so converting the same PDF twice yields two
//! distinct URLs for equal bytes. URLs stay resolvable until the owner calls
//! [`revoke_object_url`]; the converter never revokes on its own.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Prefix shared by every URL this module issues.
pub const OBJECT_URL_PREFIX: &str = "blob:pdf2img/";

static REGISTRY: Lazy<Mutex<HashMap<String, Arc<[u8]>>>> = Lazy::new(Default::default);

fn registry() -> MutexGuard<'static, HashMap<String, Arc<[u8]>>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register `bytes` and return a new URL addressing them.
pub fn create_object_url(bytes: Arc<[u8]>) -> String {
    let url = format!("{OBJECT_URL_PREFIX}{}", Uuid::new_v4());
    registry().insert(url.clone(), bytes);
    url
}

/// Bytes behind `url`, unless it was revoked or never issued.
pub fn resolve_object_url(url: &str) -> Option<Arc<[u8]>> {
    registry().get(url).cloned()
}

/// Release `url`. Returns whether it was live.
pub fn revoke_object_url(url: &str) -> bool {
    registry().remove(url).is_some()
}

/// Number of URLs not yet revoked.
pub fn live_object_urls() -> usize {
    registry().len()
}
