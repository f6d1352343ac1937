//! CLI binary for iwb-convert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use iwb_convert::{
    convert_to_pdf, extract_to_dir, inspect, AssemblyConfig, ConversionConfig,
    ConversionProgressCallback, EnginePreference, ImageMode, PageSizing, ProgressCallback,
    RunSummary, TransformConfig,
};
use std::io;
use std::path::{Path, PathBuf};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening board…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }

    fn on_page_start(&self, index: usize, _total_pages: usize) {
        self.bar.set_message(format!("page_{index}"));
    }

    fn on_page_complete(&self, index: usize, total_pages: usize, output_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total_pages,
            dim(&format!("{output_len:>8} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, index: usize, total_pages: usize, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        let msg: String = if reason.chars().count() > 80 {
            let mut s: String = reason.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total_pages,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _attempted: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One SVG per page into ./out
  iwbconv svg board.iwb -o out/

  # Keep images as separate files next to the pages
  iwbconv svg --images copy board.iwb -o out/

  # Merge into one PDF, all pages the same size
  iwbconv pdf --uniform-size board.iwb -o board.pdf

  # Never shell out to Inkscape
  iwbconv pdf --use-svglib board.iwb -o board.pdf

  # List pages without converting
  iwbconv inspect board.iwb --json

ENVIRONMENT VARIABLES:
  INKSCAPE_PATH   Inkscape executable used by the external PDF engine
  RUST_LOG        Log filter (overrides -v / -q)
"#;

/// Extract SVG pages from Newline IWB whiteboard files and merge them into PDF.
#[derive(Parser, Debug)]
#[command(
    name = "iwbconv",
    version,
    about = "Extract SVG pages from Newline IWB whiteboard files and merge them into PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the run summary as JSON on stdout.
    #[arg(long, global = true, env = "IWBCONV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "IWBCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IWBCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IWBCONV_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one SVG file per page.
    Svg {
        /// Input .iwb file.
        input: PathBuf,

        /// Output directory.
        #[arg(short, long, env = "IWBCONV_OUTPUT_DIR", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,

        /// How image references are handled.
        #[arg(long, value_enum, default_value = "embed")]
        images: ImagesArg,
    },

    /// Merge every page into one PDF.
    Pdf {
        /// Input .iwb file.
        input: PathBuf,

        /// Output PDF. Defaults to the input name with a .pdf extension.
        #[arg(short, long, env = "IWBCONV_OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        transform: TransformArgs,

        /// Give every page the largest width and height of any page.
        #[arg(long, overrides_with = "independent_size")]
        uniform_size: bool,

        /// Keep each page's own size (default).
        #[arg(long, overrides_with = "uniform_size")]
        independent_size: bool,

        /// Require Inkscape (falls back to svg2pdf if it is missing).
        #[arg(long, conflicts_with = "use_svglib")]
        use_inkscape: bool,

        /// Use the in-process svg2pdf engine only.
        #[arg(long)]
        use_svglib: bool,

        /// Explicit Inkscape executable.
        #[arg(long, env = "INKSCAPE_PATH")]
        inkscape: Option<PathBuf>,

        /// Seconds one Inkscape run may take before it is killed.
        #[arg(long, env = "IWBCONV_INKSCAPE_TIMEOUT", default_value_t = 60,
              value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,
    },

    /// List the pages of a board without converting them.
    Inspect {
        /// Input .iwb file.
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TransformArgs {
    /// Remove fills from shapes (default).
    #[arg(long, overrides_with = "no_fix_fills")]
    fix_fills: bool,

    /// Keep shape fills as stored.
    #[arg(long, overrides_with = "fix_fills")]
    no_fix_fills: bool,

    /// Grow the canvas to contain all content (default).
    #[arg(long, overrides_with = "no_fix_size")]
    fix_size: bool,

    /// Keep the declared canvas size.
    #[arg(long, overrides_with = "fix_size")]
    no_fix_size: bool,

    /// Remove full-canvas background images.
    #[arg(long)]
    delete_background: bool,
}

impl TransformArgs {
    fn builder(&self) -> iwb_convert::TransformConfigBuilder {
        TransformConfig::builder()
            .remove_fill(!self.no_fix_fills)
            .fix_size(!self.no_fix_size)
            .delete_background(self.delete_background)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImagesArg {
    /// Leave references untouched.
    Keep,
    /// Copy images next to the pages.
    Copy,
    /// Inline images as data URIs.
    Embed,
}

impl From<ImagesArg> for ImageMode {
    fn from(v: ImagesArg) -> Self {
        match v {
            ImagesArg::Keep => ImageMode::KeepReference,
            ImagesArg::Copy => ImageMode::CopyAssets,
            ImagesArg::Embed => ImageMode::EmbedDataUri,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let is_inspect = matches!(cli.command, Command::Inspect { .. });
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !is_inspect;
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

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Inspect { input } => {
            let pages = inspect(input)
                .await
                .with_context(|| format!("Failed to inspect {}", input.display()))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&pages).context("Failed to serialise pages")?
                );
            } else {
                println!("File:   {}", input.display());
                println!("Pages:  {}", pages.len());
                for p in &pages {
                    let size = format!(
                        "{} × {}",
                        p.declared_width.as_deref().unwrap_or("?"),
                        p.declared_height.as_deref().unwrap_or("?")
                    );
                    match &p.skipped {
                        Some(s) => println!("  page_{:<4} {}", p.index, red(&s.detail)),
                        None => println!(
                            "  page_{:<4} {:<20} {} images",
                            p.index,
                            size,
                            p.image_refs.len()
                        ),
                    }
                }
            }
            Ok(())
        }

        Command::Svg {
            input,
            output,
            transform,
            images,
        } => {
            let transform = transform
                .builder()
                .image_mode((*images).into())
                .build()
                .context("Invalid configuration")?;
            let config = build_config(transform, AssemblyConfig::default(), progress)?;
            let summary = extract_to_dir(input, output, &config)
                .await
                .context("Extraction failed")?;
            report(&cli, &summary, output)
        }

        Command::Pdf {
            input,
            output,
            transform,
            uniform_size,
            independent_size: _,
            use_inkscape,
            use_svglib,
            inkscape,
            timeout,
        } => {
            let transform = transform.builder().build().context("Invalid configuration")?;
            let engine = if *use_svglib {
                EnginePreference::ForceInProcess
            } else if *use_inkscape {
                EnginePreference::ForceExternal
            } else {
                EnginePreference::AutoDetect
            };
            let mut assembly = AssemblyConfig::builder()
                .page_sizing(if *uniform_size {
                    PageSizing::Uniform
                } else {
                    PageSizing::Independent
                })
                .engine(engine)
                .external_timeout_secs(*timeout);
            if let Some(path) = inkscape {
                assembly = assembly.inkscape_path(path);
            }
            let assembly = assembly.build().context("Invalid configuration")?;
            let config = build_config(transform, assembly, progress)?;

            let output = output
                .clone()
                .unwrap_or_else(|| input.with_extension("pdf"));
            let summary = convert_to_pdf(input, &output, &config)
                .await
                .context("Conversion failed")?;
            report(&cli, &summary, &output)
        }
    }
}

fn build_config(
    transform: TransformConfig,
    assembly: AssemblyConfig,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .transform(transform)
        .assembly(assembly);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// Print the summary: JSON on stdout, or a short human report on stderr.
fn report(cli: &Cli, summary: &RunSummary, target: &Path) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    if let Some(engine) = &summary.engine {
        if engine.substituted {
            eprintln!(
                "{} Inkscape unavailable, used svg2pdf instead{}",
                cyan("⚠"),
                engine
                    .note
                    .as_deref()
                    .map(|n| format!(": {}", dim(n)))
                    .unwrap_or_default()
            );
        }
    }
    if cli.no_progress {
        for s in &summary.skipped {
            eprintln!("  {} page_{}  {}", red("✗"), s.index, s.detail);
        }
    }
    for w in &summary.warnings {
        eprintln!("  {} page_{}  {:?}: {}", dim("·"), w.page, w.step, dim(&w.detail));
    }
    eprintln!(
        "{}  {}/{} pages  {}ms  →  {}",
        if summary.skipped.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        summary.succeeded,
        summary.attempted,
        summary.duration_ms,
        bold(&target.display().to_string()),
    );
    Ok(())
}
