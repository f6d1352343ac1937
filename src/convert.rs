//! Top-level entry points.
//!
//! Every run has the same shape: open the container, parse the manifest,
//! then push each page through the transformer into a sink (memory, an
//! output directory, or the PDF assembler). Fatal input errors are returned
//! before anything is written, and the output directory only appears once a
//! page is written. Per-page failures end up in the [`RunSummary`].
//!
//! The pipeline itself is synchronous. The async functions run it on a
//! blocking worker via `spawn_blocking`; the `*_sync` variants wrap them in
//! a private runtime for callers without one.

use crate::config::{ConversionConfig, ImageMode, TransformConfig};
use crate::engine::select_engine;
use crate::error::{ConvertError, PageError};
use crate::output::{Extraction, NormalizedPage, PageInfo, RunSummary, SkippedPage};
use crate::pipeline::archive::{Archive, AssetSource};
use crate::pipeline::assemble::Assembler;
use crate::pipeline::emit::emit_page;
use crate::pipeline::manifest::{self, ParseResult};
use crate::pipeline::transform::transform_page;
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract and transform every page into memory.
///
/// # Errors
/// Returns `Err(ConvertError)` only for fatal errors: the container is
/// missing or unreadable, the manifest is missing, malformed or has no
/// pages, or every page failed.
pub async fn extract_pages(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<Extraction, ConvertError> {
    let input = input.as_ref().to_path_buf();
    let config = config.clone();
    run_blocking(move || extract_pages_blocking(&input, &config)).await
}

/// Extract every page to `output_dir/page_{index}.svg`.
///
/// Under [`ImageMode::CopyAssets`] the referenced images are copied next to
/// the pages, keeping their archive-relative paths.
pub async fn extract_to_dir(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<RunSummary, ConvertError> {
    let input = input.as_ref().to_path_buf();
    let output_dir = output_dir.as_ref().to_path_buf();
    let config = config.clone();
    run_blocking(move || extract_to_dir_blocking(&input, &output_dir, &config)).await
}

/// Synchronous wrapper around [`extract_to_dir`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_to_dir_sync(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<RunSummary, ConvertError> {
    runtime()?.block_on(extract_to_dir(input, output_dir, config))
}

/// Convert every page and merge them into one PDF at `output_pdf`.
///
/// Images are always embedded as data URIs in this mode, whatever
/// `config.transform.image_mode` says, because a rendered page cannot follow
/// references into the container. The PDF is written atomically (temp file +
/// rename).
pub async fn convert_to_pdf(
    input: impl AsRef<Path>,
    output_pdf: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<RunSummary, ConvertError> {
    let input = input.as_ref().to_path_buf();
    let path = output_pdf.as_ref().to_path_buf();
    let config = config.clone();
    let (pdf, mut summary) = run_blocking(move || convert_to_pdf_blocking(&input, &config)).await?;

    let write_err = |source| ConvertError::OutputWriteFailed {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    tokio::fs::write(&tmp_path, &pdf).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), pdf.len());
    summary.outputs.push(path);
    Ok(summary)
}

/// Synchronous wrapper around [`convert_to_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_to_pdf_sync(
    input: impl AsRef<Path>,
    output_pdf: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<RunSummary, ConvertError> {
    runtime()?.block_on(convert_to_pdf(input, output_pdf, config))
}

/// List the pages of a container without transforming them.
pub async fn inspect(input: impl AsRef<Path>) -> Result<Vec<PageInfo>, ConvertError> {
    let input = input.as_ref().to_path_buf();
    run_blocking(move || inspect_blocking(&input)).await
}

// ── Blocking implementations ─────────────────────────────────────────────

fn extract_pages_blocking(input: &Path, config: &ConversionConfig) -> Result<Extraction, ConvertError> {
    let start = Instant::now();
    let (archive, parsed) = open_pages(input)?;
    let mut pages = Vec::new();
    let mut summary = drive(
        parsed,
        &config.transform,
        &archive,
        config.progress_callback.as_ref(),
        |page| {
            let len = page.markup.len();
            pages.push(page);
            Ok(Ok(len))
        },
    )?;
    summary.duration_ms = start.elapsed().as_millis() as u64;
    Ok(Extraction { pages, summary })
}

fn extract_to_dir_blocking(
    input: &Path,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<RunSummary, ConvertError> {
    let start = Instant::now();
    let (archive, parsed) = open_pages(input)?;

    // `emit_page` creates the directory with the first file it writes.
    let mut outputs = Vec::new();
    let mut summary = drive(
        parsed,
        &config.transform,
        &archive,
        config.progress_callback.as_ref(),
        |page| {
            let path = emit_page(&page, output_dir, &archive)?;
            outputs.push(path);
            Ok(Ok(page.markup.len()))
        },
    )?;
    summary.outputs = outputs;
    summary.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extracted {}/{} pages to {}",
        summary.succeeded,
        summary.attempted,
        output_dir.display()
    );
    Ok(summary)
}

fn convert_to_pdf_blocking(
    input: &Path,
    config: &ConversionConfig,
) -> Result<(Vec<u8>, RunSummary), ConvertError> {
    let start = Instant::now();
    let (archive, parsed) = open_pages(input)?;

    let transform = TransformConfig {
        image_mode: ImageMode::EmbedDataUri,
        ..config.transform.clone()
    };
    let selection = select_engine(&config.assembly);
    let mut assembler = Assembler::new(selection.engine.as_ref(), config.assembly.page_sizing);

    let mut summary = drive(
        parsed,
        &transform,
        &archive,
        config.progress_callback.as_ref(),
        |page| Ok(assembler.add_page(&page)),
    )?;
    summary.engine = Some(selection.report());

    let pdf = assembler.finish()?;
    summary.duration_ms = start.elapsed().as_millis() as u64;
    Ok((pdf, summary))
}

fn inspect_blocking(input: &Path) -> Result<Vec<PageInfo>, ConvertError> {
    let (_archive, parsed) = open_pages(input)?;
    Ok(parsed
        .into_iter()
        .map(|result| match result {
            ParseResult::Page(p) => PageInfo {
                index: p.index,
                declared_width: p.declared_width,
                declared_height: p.declared_height,
                image_refs: p.image_refs.into_iter().map(|r| r.href).collect(),
                skipped: None,
            },
            ParseResult::Skipped(e) => PageInfo {
                index: e.page(),
                declared_width: None,
                declared_height: None,
                image_refs: Vec::new(),
                skipped: Some(SkippedPage::from(&e)),
            },
        })
        .collect())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Open the container and split its manifest into pages.
fn open_pages(input: &Path) -> Result<(Archive, Vec<ParseResult>), ConvertError> {
    info!("Opening {}", input.display());
    let archive = Archive::open(input)?;
    let entry = archive
        .find_manifest()
        .ok_or_else(|| ConvertError::ManifestMissing {
            path: input.to_path_buf(),
        })?;
    let bytes = archive
        .read_entry(&entry)
        .map_err(|e| ConvertError::MalformedManifest {
            entry: entry.clone(),
            detail: e.to_string(),
        })?;
    let parsed = manifest::parse_manifest(&entry, &bytes, &archive)?;
    info!("Manifest '{}': {} pages", entry, parsed.len());
    Ok((archive, parsed))
}

/// Run every page through the transformer into `sink`.
///
/// The sink returns `Ok(Ok(output_len))` for a page it accepted,
/// `Ok(Err(page_error))` for a page it could not handle, and `Err` to abort
/// the whole run.
fn drive(
    parsed: Vec<ParseResult>,
    transform: &TransformConfig,
    assets: &dyn AssetSource,
    progress: Option<&ProgressCallback>,
    mut sink: impl FnMut(NormalizedPage) -> Result<Result<usize, PageError>, ConvertError>,
) -> Result<RunSummary, ConvertError> {
    let total = parsed.len();
    let mut summary = RunSummary::new(total);
    if let Some(cb) = progress {
        cb.on_run_start(total);
    }

    for result in parsed {
        let index = result.index();
        if let Some(cb) = progress {
            cb.on_page_start(index, total);
        }

        let outcome = match result {
            ParseResult::Skipped(e) => Err(e),
            ParseResult::Page(page) => {
                let normalized = transform_page(&page, transform, assets);
                summary.warnings.extend(normalized.warnings.iter().cloned());
                sink(normalized)?
            }
        };

        match outcome {
            Ok(len) => {
                summary.succeeded += 1;
                debug!("Page {} done ({} bytes)", index, len);
                if let Some(cb) = progress {
                    cb.on_page_complete(index, total, len);
                }
            }
            Err(e) => {
                warn!("Skipping page {}: {}", index, e);
                if let Some(cb) = progress {
                    cb.on_page_skipped(index, total, &e.to_string());
                }
                summary.skip(&e);
            }
        }
    }

    if let Some(cb) = progress {
        cb.on_run_complete(total, summary.succeeded);
    }

    if summary.succeeded == 0 {
        let first_error = summary
            .skipped
            .first()
            .map(|s| s.detail.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ConvertError::AllPagesFailed { total, first_error });
    }

    info!(
        "Converted {}/{} pages ({} skipped, {} warnings)",
        summary.succeeded,
        total,
        summary.skipped.len(),
        summary.warnings.len()
    );
    Ok(summary)
}

async fn run_blocking<T, F>(f: F) -> Result<T, ConvertError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("worker task failed: {e}")))?
}

fn runtime() -> Result<tokio::runtime::Runtime, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))
}
