//! CLI binary for pdf2img.
//!
//! A thin shim over the library crate: converts page 1 of one PDF and
//! writes the PNG to disk.

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2img::{
    revoke_object_url, ConversionProgressCallback, Converter, InputFile, LoaderConfig, Stage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner driven by conversion events ─────────────────────────────────────

struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("pdf2img");
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_library_loading(&self) {
        self.bar
            .set_message("Loading PDF engine (first run downloads ~30 MB)…");
    }

    fn on_library_ready(&self) {
        self.bar.println(format!("  {} PDF engine ready", green("✓")));
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_conversion_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Write report.png next to report.pdf
  pdf2img report.pdf

  # Write into a directory, or to an explicit file
  pdf2img report.pdf -o previews/
  pdf2img report.pdf -o cover.png

  # Machine-readable result
  pdf2img --json report.pdf

  # Use an existing pdfium copy and never download
  pdf2img --library /opt/pdfium/lib/libpdfium.so --no-download report.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH           Path to an existing libpdfium — skips auto-download
  PDFIUM_FETCH_CACHE_DIR    Override the pdfium cache directory
  PDF2IMG_NO_DOWNLOAD       Never download pdfium (any value but 0/false/no/off)
  PDF2IMG_DOWNLOAD_TIMEOUT  Download timeout in seconds
  RUST_LOG                  tracing filter, e.g. pdf2img=debug

NOTES:
  Only page 1 is rendered, at 4x the page's native size. An A4 page becomes
  a 2381x3367 px PNG; very large pages need proportionally more memory.
"#;

/// Render the first page of a PDF to a PNG.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render the first page of a PDF to a PNG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Output directory or .png file. Default: beside the input.
    #[arg(short, long, env = "PDF2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    library: Option<PathBuf>,

    /// Fail instead of downloading pdfium when it is missing.
    #[arg(long, env = "PDF2IMG_NO_DOWNLOAD", value_parser = FalseyValueParser::new())]
    no_download: bool,

    /// pdfium download timeout in seconds.
    #[arg(long, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    download_timeout: u64,

    /// Print the conversion result as JSON.
    #[arg(long, env = "PDF2IMG_JSON", value_parser = FalseyValueParser::new())]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS", value_parser = FalseyValueParser::new())]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE", value_parser = FalseyValueParser::new())]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET", value_parser = FalseyValueParser::new())]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose brings everything back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build converter ──────────────────────────────────────────────────
    let mut builder = LoaderConfig::builder()
        .allow_download(!cli.no_download)
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref lib) = cli.library {
        builder = builder.library_path(lib);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut converter = Converter::pdfium(config);
    if show_progress {
        converter = converter.with_progress(CliProgressCallback::new());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = converter.convert(&InputFile::from_path(&cli.input)).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    }

    let image_url = result.image_url.clone();
    let (_, file) = match result.into_result() {
        Ok(ok) => ok,
        Err(message) => {
            if !cli.json {
                eprintln!("{} {}", red("✘"), message);
            }
            anyhow::bail!("{message}");
        }
    };

    let dest = destination(cli.output.as_deref(), &cli.input, &file.name);
    file.write_to(&dest)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    revoke_object_url(&image_url);

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}  {}",
            green("✔"),
            bold(&dest.display().to_string()),
            dim(&format!("{}x{} px", file.width, file.height)),
            dim(&format!("{} bytes", file.len())),
        );
    }

    Ok(())
}

/// Where to write the PNG.
///
/// `-o` naming an existing directory (or ending in a separator) receives the
/// derived file name; any other `-o` is used as the file path. Without `-o`
/// the PNG lands beside the input.
fn destination(output: Option<&Path>, input: &Path, file_name: &str) -> PathBuf {
    match output {
        Some(out) if out.is_dir() || out.as_os_str().to_string_lossy().ends_with(['/', '\\']) => {
            out.join(file_name)
        }
        Some(out) => out.to_path_buf(),
        None => input
            .parent()
            .map(|dir| dir.join(file_name))
            .unwrap_or_else(|| PathBuf::from(file_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_beside_input() {
        let d = destination(None, Path::new("docs/report.pdf"), "report.png");
        assert_eq!(d, PathBuf::from("docs/report.png"));
    }

    #[test]
    fn destination_bare_input() {
        let d = destination(None, Path::new("report.pdf"), "report.png");
        assert_eq!(d, PathBuf::from("report.png"));
    }

    #[test]
    fn destination_directory() {
        let dir = tempfile::tempdir().unwrap();
        let d = destination(Some(dir.path()), Path::new("report.pdf"), "report.png");
        assert_eq!(d, dir.path().join("report.png"));

        let d = destination(Some(Path::new("out/")), Path::new("report.pdf"), "report.png");
        assert_eq!(d, PathBuf::from("out/report.png"));
    }

    #[test]
    fn destination_explicit_file() {
        let d = destination(Some(Path::new("cover.png")), Path::new("report.pdf"), "report.png");
        assert_eq!(d, PathBuf::from("cover.png"));
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["pdf2img", "a.pdf", "-o", "out", "--no-download"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("a.pdf"));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.no_download);
        assert_eq!(cli.download_timeout, 120);
    }

    #[test]
    fn boolean_env_vars_accept_numbers_and_words() {
        std::env::set_var("PDF2IMG_NO_DOWNLOAD", "1");
        std::env::set_var("PDF2IMG_NO_PROGRESS", "off");
        let cli = Cli::try_parse_from(["pdf2img", "a.pdf"]);
        std::env::remove_var("PDF2IMG_NO_DOWNLOAD");
        std::env::remove_var("PDF2IMG_NO_PROGRESS");

        let cli = cli.unwrap();
        assert!(cli.no_download);
        assert!(!cli.no_progress);
    }
}
