//! Pipeline stages for PDF-to-PNG conversion.
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (bytes)   (page 1)   (PNG)
//! ```
//!
//! 1. [`input`]  — read the PDF bytes; validate untyped inputs
//! 2. [`render`] — decode, size the viewport, paint page 1 on a surface;
//!    runs in `spawn_blocking`
//! 3. [`encode`] — PNG-encode the surface and name the output file

pub mod encode;
pub mod input;
pub mod render;
