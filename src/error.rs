//! Error types for the iwb-convert library.
//!
//! Distinct error types reflect distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal**: the run cannot proceed at all (input
//!   missing, not a ZIP container, manifest unparsable, nothing to convert).
//!   Returned as `Err(ConvertError)` from the top-level entry points, before
//!   any output is written.
//!
//! * [`PageError`]: **Non-fatal**: a single page could not be extracted or
//!   rendered, but its siblings are fine. Collected into
//!   [`crate::output::RunSummary`] so callers can tell "converted 8 of 10
//!   pages" apart from "found nothing to convert".
//!
//! * [`EntryError`] and [`RenderError`]: soft failures of the collaborators
//!   (archive lookups, rendering engines). They never abort a run on their
//!   own; the pipeline turns them into warnings or [`PageError`]s.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the iwb-convert library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::RunSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("IWB file not found: '{path}'\nCheck the path exists and is readable.")]
    ArchiveNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a ZIP container.
    #[error("File is not an IWB container: '{path}': {detail}")]
    NotAContainer { path: PathBuf, detail: String },

    /// The ZIP structure was recognised but could not be read.
    #[error("IWB container '{path}' is corrupt: {detail}")]
    CorruptArchive { path: PathBuf, detail: String },

    // ── Manifest errors ───────────────────────────────────────────────────
    /// No `.xml` manifest entry exists in the container.
    #[error("No XML manifest found in '{path}'")]
    ManifestMissing { path: PathBuf },

    /// The manifest exists but is not well-formed XML.
    #[error("Manifest '{entry}' is malformed: {detail}")]
    MalformedManifest { entry: String, detail: String },

    /// The manifest parsed but contains no `<svg:page>` elements.
    #[error("Manifest '{entry}' contains no <svg:page> elements")]
    NoPages { entry: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Every page failed; a merged document would be empty.
    #[error("All {total} pages failed; nothing to assemble.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// Some pages succeeded but at least one was skipped.
    ///
    /// Returned by [`crate::output::RunSummary::into_result`] when the caller
    /// wants to treat any skipped page as an error.
    #[error("{skipped}/{attempted} pages skipped during conversion")]
    PartialFailure {
        succeeded: usize,
        skipped: usize,
        attempted: usize,
    },

    /// lopdf could not merge the rendered pages.
    #[error("PDF assembly failed: {0}")]
    PdfAssembly(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed lookup of one archive entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntryError {
    /// No entry with this name exists in the container.
    #[error("entry '{name}' not found in container")]
    Missing { name: String },

    /// The entry exists but its bytes could not be decompressed.
    #[error("entry '{name}' could not be read: {detail}")]
    Unreadable { name: String, detail: String },
}

/// A failure of one rendering engine on one page.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderError {
    /// The engine rejected the page markup.
    #[error("invalid markup: {0}")]
    InvalidMarkup(String),

    /// The engine is not installed or could not be started.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine started but crashed, hung past its timeout, or produced
    /// no output.
    #[error("engine crashed: {0}")]
    EngineCrashed(String),
}

impl RenderError {
    /// Short machine-readable tag for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::InvalidMarkup(_) => "invalidMarkup",
            RenderError::EngineUnavailable(_) => "engineUnavailable",
            RenderError::EngineCrashed(_) => "engineCrashed",
        }
    }
}

/// A non-fatal error for a single page.
///
/// The run continues with the remaining pages; the page is listed as skipped
/// in the [`crate::output::RunSummary`].
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum PageError {
    /// The page's vector markup could not be parsed.
    #[error("Page {page}: malformed XML: {detail}")]
    MalformedXml { page: usize, detail: String },

    /// The page references an archive entry that does not exist.
    #[error("Page {page}: referenced entry '{name}' is missing")]
    MissingEntry { page: usize, name: String },

    /// The rendering engine failed on this page.
    #[error("Page {page}: render failed: {error}")]
    RenderFailed { page: usize, error: RenderError },
}

impl PageError {
    /// 0-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::MalformedXml { page, .. }
            | PageError::MissingEntry { page, .. }
            | PageError::RenderFailed { page, .. } => *page,
        }
    }

    /// Short machine-readable reason tag for summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            PageError::MalformedXml { .. } => "malformedXml",
            PageError::MissingEntry { .. } => "missingEntry",
            PageError::RenderFailed { error, .. } => error.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = ConvertError::PartialFailure {
            succeeded: 8,
            skipped: 2,
            attempted: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("2/10"), "got: {msg}");
    }

    #[test]
    fn page_error_reason_tags() {
        let e = PageError::MalformedXml {
            page: 1,
            detail: "unexpected end".into(),
        };
        assert_eq!(e.reason(), "malformedXml");
        assert_eq!(e.page(), 1);

        let e = PageError::RenderFailed {
            page: 4,
            error: RenderError::EngineCrashed("timeout".into()),
        };
        assert_eq!(e.reason(), "engineCrashed");
        assert!(e.to_string().contains("Page 4"));
    }

    #[test]
    fn entry_error_display() {
        let e = EntryError::Missing {
            name: "images/a.png".into(),
        };
        assert!(e.to_string().contains("images/a.png"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::MissingEntry {
            page: 2,
            name: "pages/p2.svg".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("MissingEntry"));
        let back: PageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
