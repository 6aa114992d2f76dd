//! CLI binary for pdf-splitmerge.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ProcessConfig` and writes artifacts to disk.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_splitmerge::{
    page_count, process, resolve_input, rotate, split_single_page, write_artifacts, FailurePolicy,
    ImageFormat, ProcessConfig, ProcessProgressCallback, ProgressCallback, SinglePagePolicy,
};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over merge groups and split pages. Each finished unit also
/// prints its own log line above the bar.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ProcessProgressCallback for CliProgressCallback {
    fn on_process_start(&self, merge_groups: usize, split_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} artifacts  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length((merge_groups + split_pages) as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Processing");
        self.bar.println(format!(
            "{} {} merge groups, {} split pages",
            bold("◆"),
            merge_groups,
            split_pages
        ));
    }

    fn on_artifact_complete(&self, unit: &str, filename: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} {:<24} → {}  {}",
            green("✓"),
            unit,
            filename,
            dim(&format!("{bytes} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_artifact_error(&self, unit: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!("  {} {:<24} {}", red("✗"), unit, red(&msg)));
        self.bar.inc(1);
    }

    fn on_process_complete(&self, artifacts: usize, failures: usize) {
        self.bar.finish_and_clear();
        if failures == 0 {
            eprintln!("{} {} artifacts produced", green("✔"), bold(&artifacts.to_string()));
        } else {
            eprintln!(
                "{} {} artifacts produced  ({} failed)",
                red("⚠"),
                bold(&artifacts.to_string()),
                red(&failures.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Page count
  pdfsplit count scan.pdf

  # Stitch pages 1-4 and 7-8 into images; every other page becomes its own PDF
  pdfsplit process scan.pdf --directive "1-4,7-8" -o out/

  # Treat a bare number as a one-page image instead of a split page
  pdfsplit process scan.pdf --directive "1-3,9" --single-page merge

  # Keep going when a unit fails and report the failures at the end
  pdfsplit process scan.pdf --directive "1-3" --collect-errors

  # Extract page 5
  pdfsplit extract scan.pdf --page 5 -o out/

  # Rotate (stored rotation = angle + 90)
  pdfsplit rotate scan.pdf --angle 0

DIRECTIVE:
  Comma-separated tokens; each is N or N-M (1-based, inclusive).
  "8-1" is the same as "1-8". Pages not covered by any range are split.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter
"#;

/// Merge PDF page ranges into images and split the remaining pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Merge PDF page ranges into stitched images and split the rest into single-page PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory to write artifacts into.
    #[arg(short, long, global = true, env = "PDFSPLIT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print a JSON manifest on stdout.
    #[arg(long, global = true, env = "PDFSPLIT_JSON")]
    json: bool,

    /// Path to libpdfium (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDFSPLIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSPLIT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the number of pages.
    Count {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },

    /// Copy one page into its own PDF.
    Extract {
        input: String,

        /// 1-based page number.
        #[arg(short, long)]
        page: usize,
    },

    /// Rotate every page.
    Rotate {
        input: String,

        /// Quarter-turn angle; the stored rotation is (angle + 90) mod 360.
        #[arg(short, long, allow_negative_numbers = true)]
        angle: i32,
    },

    /// Apply a merge/split directive.
    Process {
        input: String,

        /// Ranges to stitch, e.g. "1-4,7-8,9".
        #[arg(short, long, env = "PDFSPLIT_DIRECTIVE", default_value = "")]
        directive: String,

        /// Render scale for merged pages (0.1–8.0).
        #[arg(long, env = "PDFSPLIT_SCALE", default_value_t = 1.5)]
        scale: f32,

        /// Image format for merged pages.
        #[arg(long, env = "PDFSPLIT_FORMAT", value_enum, default_value = "jpeg")]
        format: FormatArg,

        /// JPEG quality (1–100).
        #[arg(long, env = "PDFSPLIT_QUALITY", default_value_t = 90)]
        quality: u8,

        /// Meaning of a bare page number in the directive.
        #[arg(long, env = "PDFSPLIT_SINGLE_PAGE", value_enum, default_value = "split")]
        single_page: SinglePageArg,

        /// Maximum units processed at once.
        #[arg(short, long, env = "PDFSPLIT_CONCURRENCY", default_value_t = 8)]
        concurrency: usize,

        /// Report failed units instead of aborting on the first one.
        #[arg(long, env = "PDFSPLIT_COLLECT_ERRORS")]
        collect_errors: bool,

        /// Deadline per merge group or split page, in seconds.
        #[arg(long, env = "PDFSPLIT_UNIT_TIMEOUT")]
        unit_timeout: Option<u64>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SinglePageArg {
    Split,
    Merge,
}

impl From<SinglePageArg> for SinglePagePolicy {
    fn from(v: SinglePageArg) -> Self {
        match v {
            SinglePageArg::Split => SinglePagePolicy::Split,
            SinglePageArg::Merge => SinglePagePolicy::Merge,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them back.
    let show_progress = !common.quiet && !common.no_progress && !common.json;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
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

    match &cli.command {
        Command::Count { input } => {
            let config = base_config(common).build().context("Invalid configuration")?;
            let doc = resolve_input(input, common.download_timeout)
                .await
                .context("Failed to read input")?;
            let pages = page_count(&doc.bytes, &config)
                .await
                .context("Failed to count pages")?;

            if common.json {
                println!("{}", json!({ "file": doc.file_name, "pages": pages }));
            } else {
                println!("{pages}");
            }
        }

        Command::Extract { input, page } => {
            let config = base_config(common).build().context("Invalid configuration")?;
            let doc = resolve_input(input, common.download_timeout)
                .await
                .context("Failed to read input")?;
            let artifact = split_single_page(&doc.bytes, &doc.base_name(), *page, &config)
                .await
                .with_context(|| format!("Failed to extract page {page}"))?;
            let paths = write_artifacts(std::slice::from_ref(&artifact), &common.output_dir)
                .await
                .context("Failed to write output")?;

            report(common, &paths, json!({ "page": page, "files": paths }));
        }

        Command::Rotate { input, angle } => {
            let config = base_config(common).build().context("Invalid configuration")?;
            let doc = resolve_input(input, common.download_timeout)
                .await
                .context("Failed to read input")?;
            let rotated = rotate(&doc.bytes, &doc.base_name(), *angle, &config)
                .await
                .context("Rotation failed")?;

            let path = common.output_dir.join(&rotated.filename);
            tokio::fs::create_dir_all(&common.output_dir)
                .await
                .with_context(|| format!("Failed to create {}", common.output_dir.display()))?;
            let tmp = path.with_extension("pdf.tmp");
            tokio::fs::write(&tmp, &rotated.bytes)
                .await
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            report(
                common,
                std::slice::from_ref(&path),
                json!({ "effective_angle": rotated.effective_angle, "files": [path] }),
            );
            if !common.quiet && !common.json {
                eprintln!("   rotation now {}°", rotated.effective_angle);
            }
        }

        Command::Process {
            input,
            directive,
            scale,
            format,
            quality,
            single_page,
            concurrency,
            collect_errors,
            unit_timeout,
        } => {
            let progress_cb: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn ProcessProgressCallback>)
            } else {
                None
            };

            let mut builder = base_config(common)
                .scale(*scale)
                .image_format((*format).into())
                .jpeg_quality(*quality)
                .single_page_policy((*single_page).into())
                .concurrency(*concurrency)
                .failure_policy(if *collect_errors {
                    FailurePolicy::CollectErrors
                } else {
                    FailurePolicy::FailFast
                });
            if let Some(secs) = unit_timeout {
                builder = builder.unit_timeout_secs(*secs);
            }
            if let Some(cb) = progress_cb {
                builder = builder.progress_callback(cb);
            }
            let config = builder.build().context("Invalid configuration")?;

            let doc = resolve_input(input, common.download_timeout)
                .await
                .context("Failed to read input")?;
            let output = process(&doc.bytes, &doc.base_name(), directive, &config)
                .await
                .context("Processing failed")?;
            let paths = write_artifacts(&output.artifacts, &common.output_dir)
                .await
                .context("Failed to write output")?;

            let failures: Vec<_> = output
                .failures
                .iter()
                .map(|f| json!({ "unit": f.unit, "error": f.error.to_string() }))
                .collect();
            let artifacts: Vec<_> = output
                .artifacts
                .iter()
                .zip(&paths)
                .map(|(a, p)| json!({ "path": p, "mime_type": a.mime_type, "source": a.source }))
                .collect();
            report(
                common,
                &paths,
                json!({ "artifacts": artifacts, "failures": failures, "stats": output.stats }),
            );

            if !output.failures.is_empty() {
                anyhow::bail!(
                    "{} of {} units failed",
                    output.failures.len(),
                    output.failures.len() + output.artifacts.len()
                );
            }
        }
    }

    Ok(())
}

/// Config fields shared by every subcommand.
fn base_config(common: &CommonArgs) -> pdf_splitmerge::ProcessConfigBuilder {
    let builder = ProcessConfig::builder().download_timeout_secs(common.download_timeout);
    match common.pdfium_lib {
        Some(ref path) => builder.pdfium_lib_path(path.clone()),
        None => builder,
    }
}

/// Print written paths, or the JSON manifest with `--json`.
fn report(common: &CommonArgs, paths: &[PathBuf], manifest: serde_json::Value) {
    if common.json {
        println!("{manifest:#}");
    } else if !common.quiet {
        for path in paths {
            eprintln!("{} {}", green("→"), path.display());
        }
    }
}
