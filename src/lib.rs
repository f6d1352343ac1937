//! # iwb-convert
//!
//! Extract per-page SVG from Newline `.iwb` whiteboard files and, optionally,
//! merge the pages into one PDF.
//!
//! ## Why this crate?
//!
//! An `.iwb` file is a ZIP archive holding one XML manifest with every page
//! of the board plus the images those pages reference. The pages are SVG in
//! all but name, yet general viewers render them badly: pen strokes are
//! stored as filled outlines, the declared canvas often clips the ink, and
//! images point into the archive. This crate splits the manifest into
//! standalone SVG documents and fixes those three problems on the way out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .iwb
//!  │
//!  ├─ 1. Archive    open the ZIP container, locate the manifest
//!  ├─ 2. Manifest   one standalone <svg> per <page>, in manifest order
//!  ├─ 3. Transform  background → images → fills → canvas size
//!  └─ 4. Output     page_{i}.svg files, or
//!                   render each page (Inkscape | svg2pdf) and merge with lopdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iwb_convert::{convert_to_pdf, extract_to_dir, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!
//!     let summary = extract_to_dir("board.iwb", "out/", &config).await?;
//!     eprintln!("{}/{} pages written", summary.succeeded, summary.attempted);
//!
//!     let summary = convert_to_pdf("board.iwb", "board.pdf", &config).await?;
//!     for skipped in &summary.skipped {
//!         eprintln!("page {} skipped: {}", skipped.index, skipped.detail);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `iwbconv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! iwb-convert = { version = "0.2", default-features = false }
//! ```
//!
//! ## Rendering Engines
//!
//! | Engine   | Needs            | Notes |
//! |----------|------------------|-------|
//! | Inkscape | `inkscape` on the host (`INKSCAPE_PATH` overrides) | Closest to what the whiteboard shows |
//! | svg2pdf  | nothing          | In process, always available; used as the fallback |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AssemblyConfig, AssemblyConfigBuilder, ConversionConfig, ConversionConfigBuilder,
    EnginePreference, ImageMode, PageSizing, TransformConfig, TransformConfigBuilder,
};
pub use convert::{
    convert_to_pdf, convert_to_pdf_sync, extract_pages, extract_to_dir, extract_to_dir_sync,
    inspect,
};
pub use engine::EngineKind;
pub use error::{ConvertError, EntryError, PageError, RenderError};
pub use output::{
    AssetCopy, EngineReport, Extraction, NormalizedPage, PageInfo, RunSummary, SkippedPage,
    TransformStep, TransformWarning,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
