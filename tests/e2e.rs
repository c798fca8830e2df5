//! End-to-end tests against a real pdfium library.
//!
//! Gated so they do not run in CI unless a pdfium copy is available:
//!
//!   PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! or, to let the loader download pdfium into its cache:
//!
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! All tests run in one process and share its single PDFium binding.

use pdf2img::{
    convert_pdf_to_image, init_shared_loader, resolve_object_url, revoke_object_url,
    shared_loader, Converter, InputFile, LoaderConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless pdfium is reachable; yields a loader config.
macro_rules! e2e_skip_unless_ready {
    () => {{
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pdf2img=debug,pdfium_fetch=debug")
            .with_test_writer()
            .try_init();
        let lib = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
        if lib.is_none() && std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set PDFIUM_LIB_PATH or E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let mut builder = LoaderConfig::builder().allow_download(lib.is_none());
        if let Some(lib) = lib {
            builder = builder.library_path(lib);
        }
        builder.build().expect("valid loader config")
    }};
}

/// Build a well-formed PDF with one page per `(width, height)` in points.
/// Each page gets a filled red rectangle so the render is not blank.
fn minimal_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let n = pages.len();
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {n} >>",
        kids.join(" ")
    ));

    for (i, (w, h)) in pages.iter().enumerate() {
        let content = format!("1 0 0 rg 10 10 {} {} re f", w / 2, h / 2);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Contents {} 0 R >>",
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_renders_page_one_at_four_times_size() {
    let config = e2e_skip_unless_ready!();
    let converter = Converter::pdfium(config);

    let input = InputFile::from_bytes("banner.pdf", minimal_pdf(&[(200, 100), (50, 50)]));
    let result = converter.convert(&input).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let file = result.file.as_ref().unwrap();
    assert_eq!(file.name, "banner.png");
    assert_eq!((file.width, file.height), (800, 400));

    let png = image::load_from_memory(&file.bytes).unwrap().into_rgba8();
    assert_eq!(png.dimensions(), (800, 400));
    // The rectangle starts 10pt in from the bottom-left corner.
    let inside = png.get_pixel(100, 350).0;
    assert!(inside[0] > 200 && inside[1] < 50, "expected red, got {inside:?}");

    assert_eq!(resolve_object_url(&result.image_url).as_deref(), Some(&*file.bytes));
    revoke_object_url(&result.image_url);
}

#[tokio::test]
async fn e2e_rejects_non_pdf() {
    let config = e2e_skip_unless_ready!();
    let converter = Converter::pdfium(config);

    let input = InputFile::from_bytes("notes.pdf", b"just some text".to_vec());
    let result = converter.convert(&input).await;
    assert!(result.file.is_none());
    assert!(result.error.unwrap().starts_with("Failed to convert PDF: "));
}

#[tokio::test]
async fn e2e_rejects_truncated_pdf() {
    let config = e2e_skip_unless_ready!();
    let converter = Converter::pdfium(config);

    let mut bytes = minimal_pdf(&[(200, 100)]);
    bytes.truncate(40);
    let result = converter.convert(&InputFile::from_bytes("cut.pdf", bytes)).await;
    assert!(result.file.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn e2e_output_is_deterministic() {
    let config = e2e_skip_unless_ready!();
    let converter = Converter::pdfium(config);

    let input = InputFile::from_bytes("same.pdf", minimal_pdf(&[(72, 72)]));
    let a = converter.convert(&input).await;
    let b = converter.convert(&input).await;
    assert_eq!(a.file.unwrap().bytes, b.file.unwrap().bytes);
    assert_ne!(a.image_url, b.image_url);
    revoke_object_url(&a.image_url);
    revoke_object_url(&b.image_url);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_shared_loader_binds_once() {
    let config = e2e_skip_unless_ready!();
    let loader = init_shared_loader(config.clone());
    assert!(Arc::ptr_eq(&loader, Converter::pdfium(config).loader()));

    let inputs: Vec<InputFile> = (0..6)
        .map(|i| InputFile::from_bytes(format!("doc{i}.pdf"), minimal_pdf(&[(100, 100)])))
        .collect();
    let results = futures::future::join_all(inputs.iter().map(convert_pdf_to_image)).await;

    for r in &results {
        assert!(r.is_success(), "{:?}", r.error);
        revoke_object_url(&r.image_url);
    }
    assert!(Arc::ptr_eq(&loader, &shared_loader()));
    assert_eq!(loader.load_attempts(), 1);
}
