//! CLI binary for catalog-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use catalog_extract::{
    extract, save_artifacts, BackendKind, ErrorKind, ExtractError, ExtractionConfig,
    ExtractionProgressCallback, PageSelection, PipelineResult, PipelineStage, ProgressCallback,
    RemoteConfig, RenderTarget, SaveSummary,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose prefix tracks the pipeline
/// stage and whose message carries the stage's status line.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, source: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {source}"))
        ));
    }

    fn on_stage(&self, stage: PipelineStage, message: &str) {
        match stage {
            PipelineStage::Completed | PipelineStage::Failed => self.bar.finish_and_clear(),
            _ => {
                self.bar.set_prefix(stage.to_string());
                self.bar.set_message(message.to_string());
            }
        }
    }

    fn on_run_complete(&self, labels_found: usize, paired: usize) {
        let mark = if paired == labels_found {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{} {} artifacts from {} labels",
            mark,
            bold(&paired.to_string()),
            labels_found
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List what would be extracted
  catalog-extract catalog.pdf

  # Save one image per catalog entry
  catalog-extract catalog.pdf -o images/

  # Embedded pictures instead of whole pages, pages 3-40 only
  catalog-extract --target images --pages 3-40 catalog.pdf -o images/

  # Force poppler from a custom install
  catalog-extract --backend process --poppler-dir /opt/poppler/bin catalog.pdf

  # Remote rendering service
  catalog-extract --backend remote --target images \
    --remote-endpoint https://render.example.com \
    --remote-client-id ID --remote-client-secret SECRET catalog.pdf -o out/

  # Machine-readable result (artifact bytes as base64)
  catalog-extract --json catalog.pdf > result.json

BACKENDS:
  library   libpdfium, in process       pages, images
  process   poppler-utils executables   pages, images
  remote    HTTP rendering service      images
  auto      first available of library, process, remote (default)

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH                       Path to libpdfium (file or directory)
  CATALOG_EXTRACT_POPPLER_DIR           Directory holding pdftoppm/pdfimages/pdftotext
  CATALOG_EXTRACT_REMOTE_ENDPOINT       Remote rendering service base URL
  CATALOG_EXTRACT_REMOTE_CLIENT_ID      Remote client id
  CATALOG_EXTRACT_REMOTE_CLIENT_SECRET  Remote client secret
  RUST_LOG                              Override log filtering (e.g. catalog_extract=debug)
"#;

/// Extract labelled images from catalog PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "catalog-extract",
    version,
    about = "Extract labelled images from catalog PDFs",
    long_about = "Find accession-number labels in a catalog PDF, render its pages or embedded \
pictures, and pair each label with its image. Rendering uses libpdfium, poppler-utils, or a \
remote rendering service, whichever is available first.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to extract from.
    input: PathBuf,

    /// Save artifacts into this directory.
    #[arg(short, long, env = "CATALOG_EXTRACT_OUTPUT")]
    output: Option<PathBuf>,

    /// Render backend to use.
    #[arg(long, env = "CATALOG_EXTRACT_BACKEND", value_enum, default_value = "auto")]
    backend: BackendArg,

    /// Render whole pages or the pictures embedded in them.
    #[arg(long, env = "CATALOG_EXTRACT_TARGET", value_enum, default_value = "pages")]
    target: TargetArg,

    /// Page selection: all, 5, or 3-15.
    #[arg(long, env = "CATALOG_EXTRACT_PAGES", default_value = "all")]
    pages: String,

    /// Rendering DPI for page renders (72–600).
    #[arg(long, env = "CATALOG_EXTRACT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Cap on the longer side of a rendered page, in pixels.
    #[arg(long, env = "CATALOG_EXTRACT_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=20_000))]
    max_pixels: u32,

    /// Path to libpdfium, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Directory holding the poppler executables (default: PATH).
    #[arg(long, env = "CATALOG_EXTRACT_POPPLER_DIR")]
    poppler_dir: Option<PathBuf>,

    /// Remote rendering service base URL.
    #[arg(long, env = "CATALOG_EXTRACT_REMOTE_ENDPOINT")]
    remote_endpoint: Option<String>,

    /// Remote rendering client id.
    #[arg(long, env = "CATALOG_EXTRACT_REMOTE_CLIENT_ID", default_value = "")]
    remote_client_id: String,

    /// Remote rendering client secret.
    #[arg(long, env = "CATALOG_EXTRACT_REMOTE_CLIENT_SECRET", default_value = "",
          hide_env_values = true)]
    remote_client_secret: String,

    /// Wall-clock limit for poppler processes, in seconds.
    #[arg(long, env = "CATALOG_EXTRACT_PROCESS_TIMEOUT", default_value_t = 300)]
    process_timeout: u64,

    /// Wall-clock limit for the remote exchange, in seconds.
    #[arg(long, env = "CATALOG_EXTRACT_REMOTE_TIMEOUT", default_value_t = 600)]
    remote_timeout: u64,

    /// Create per-run workspaces under this directory (default: system temp).
    #[arg(long, env = "CATALOG_EXTRACT_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Print the PipelineResult (or ErrorReport) as JSON on stdout.
    #[arg(long, env = "CATALOG_EXTRACT_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CATALOG_EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CATALOG_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CATALOG_EXTRACT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Auto,
    Library,
    Process,
    Remote,
}

impl BackendArg {
    fn order(self) -> Vec<BackendKind> {
        match self {
            BackendArg::Auto => BackendKind::ALL.to_vec(),
            BackendArg::Library => vec![BackendKind::Library],
            BackendArg::Process => vec![BackendKind::Process],
            BackendArg::Remote => vec![BackendKind::Remote],
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TargetArg {
    Pages,
    Images,
}

impl From<TargetArg> for RenderTarget {
    fn from(v: TargetArg) -> Self {
        match v {
            TargetArg::Pages => RenderTarget::Pages,
            TargetArg::Images => RenderTarget::EmbeddedImages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active;
    // it shows the stage transitions already.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let result = match extract(&cli.input, &config).await {
        Ok(result) => result,
        Err(e) if cli.json => {
            print_error_json(&e)?;
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    let summary = match cli.output {
        Some(ref dest) => Some(
            save_artifacts(&result.artifacts, dest)
                .await
                .with_context(|| format!("Failed to save artifacts to {}", dest.display()))?,
        ),
        None => None,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet {
        print_result(&result, show_progress);
    }

    if let (Some(summary), Some(dest)) = (&summary, &cli.output) {
        if !cli.quiet {
            print_save_summary(summary, dest);
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .pages(pages)
        .target(cli.target.into())
        .backend_order(cli.backend.order())
        .process_timeout_secs(cli.process_timeout)
        .remote_timeout_secs(cli.remote_timeout);

    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(ref dir) = cli.poppler_dir {
        builder = builder.poppler_dir(dir);
    }
    if let Some(ref endpoint) = cli.remote_endpoint {
        builder = builder.remote(RemoteConfig::new(
            endpoint.as_str(),
            cli.remote_client_id.as_str(),
            cli.remote_client_secret.as_str(),
        ));
    }
    if let Some(ref root) = cli.workspace_root {
        builder = builder.workspace_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

fn print_error_json(e: &ExtractError) -> Result<()> {
    let json = serde_json::to_string_pretty(&e.report()).context("Failed to serialise error")?;
    println!("{json}");
    Ok(())
}

fn print_result(result: &PipelineResult, progress_shown: bool) {
    for artifact in &result.artifacts {
        println!(
            "  {}  {}  {}",
            green("✓"),
            artifact.name,
            dim(&format!("← {} ({} bytes)", artifact.source_file, artifact.data.len())),
        );
    }
    for label in result.unpaired_labels() {
        println!("  {}  {}  {}", red("✗"), label, dim("no image"));
    }

    let counts = &result.counts;
    // The spinner's completion line already covers the headline numbers.
    if !progress_shown {
        eprintln!(
            "{} labels, {} files rendered, {} paired ({} backend, {}ms)",
            counts.labels_found,
            counts.files_rendered,
            counts.paired,
            result.backend,
            result.stats.total_duration_ms
        );
    } else {
        eprintln!(
            "   {} files rendered by {} in {}ms",
            dim(&counts.files_rendered.to_string()),
            result.backend,
            result.stats.total_duration_ms
        );
    }
}

fn print_save_summary(summary: &SaveSummary, dest: &std::path::Path) {
    for failure in &summary.failed {
        eprintln!("  {} {}", red("✗"), failure);
    }

    let mark = match summary.kind() {
        None => green("✔"),
        Some(ErrorKind::PartialSaveFailure) => cyan("⚠"),
        Some(_) => red("✗"),
    };
    eprintln!(
        "{}  {}/{} saved  →  {}",
        mark,
        summary.written.len(),
        summary.written.len() + summary.failed.len(),
        bold(&dest.display().to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_accepts_all_single_and_range() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" ALL ").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("5").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-3").is_err());
        assert!(parse_pages("1,3").is_err());
        assert!(parse_pages("abc").is_err());
    }

    #[test]
    fn backend_flag_maps_to_order() {
        assert_eq!(BackendArg::Auto.order(), BackendKind::ALL.to_vec());
        assert_eq!(BackendArg::Process.order(), vec![BackendKind::Process]);
    }

    #[test]
    fn cli_flags_build_a_valid_config() {
        let cli = Cli::try_parse_from([
            "catalog-extract",
            "--backend",
            "remote",
            "--target",
            "images",
            "--pages",
            "2-4",
            "--remote-endpoint",
            "https://render.example.com",
            "--remote-client-id",
            "id",
            "--remote-client-secret",
            "secret",
            "catalog.pdf",
        ])
        .unwrap();

        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.target, RenderTarget::EmbeddedImages);
        assert_eq!(config.pages, PageSelection::Range(2, 4));
        assert_eq!(config.renderer.backend_order, vec![BackendKind::Remote]);
        assert!(config.renderer.remote.is_some());
    }
}
