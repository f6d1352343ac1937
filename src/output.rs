//! Result types produced by the pipeline.
//!
//! [`NormalizedPage`] is the per-page product of the transformer;
//! [`RunSummary`] is the end-of-run report that collects every soft failure
//! so that callers can distinguish partial success from "nothing to convert".

use crate::config::EnginePreference;
use crate::engine::EngineKind;
use crate::error::{ConvertError, PageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One page after all enabled transforms have run.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPage {
    /// 0-based manifest position.
    pub index: usize,
    /// Serialised `<svg>` document (no XML declaration).
    pub markup: String,
    /// Final canvas width in user units, when known.
    pub width: Option<f64>,
    /// Final canvas height in user units, when known.
    pub height: Option<f64>,
    /// Assets to copy next to the emitted page (only under `CopyAssets`).
    pub assets: Vec<AssetCopy>,
    /// Soft failures hit while transforming this page.
    pub warnings: Vec<TransformWarning>,
}

/// Pages extracted into memory together with the run report.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub pages: Vec<NormalizedPage>,
    pub summary: RunSummary,
}

/// An archive entry that must be written alongside an emitted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCopy {
    /// Entry name inside the container.
    pub entry: String,
    /// Path relative to the output directory; also the rewritten reference.
    pub relative_path: String,
}

/// The transform step a warning originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformStep {
    BackgroundDeletion,
    ImageResolution,
    FillRemoval,
    SizeCorrection,
}

/// A fragment one transform step could not process.
///
/// The step skipped that fragment only; the page was still emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformWarning {
    pub page: usize,
    pub step: TransformStep,
    pub detail: String,
}

/// A page that was not emitted, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPage {
    /// 0-based manifest position.
    pub index: usize,
    /// Machine-readable tag, e.g. `malformedXml`, `engineCrashed`.
    pub reason: String,
    /// Human-readable detail.
    pub detail: String,
}

impl From<&PageError> for SkippedPage {
    fn from(e: &PageError) -> Self {
        Self {
            index: e.page(),
            reason: e.reason().to_string(),
            detail: e.to_string(),
        }
    }
}

/// Which engine produced the merged PDF, and whether it was a substitute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineReport {
    pub requested: EnginePreference,
    pub used: EngineKind,
    /// True when the requested engine was unavailable and another was used.
    pub substituted: bool,
    /// Why the substitution happened, when it did.
    pub note: Option<String>,
}

/// End-of-run report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pages found in the manifest.
    pub attempted: usize,
    /// Pages written (SVG mode) or merged (PDF mode).
    pub succeeded: usize,
    /// Pages left out, in manifest order.
    pub skipped: Vec<SkippedPage>,
    /// Per-fragment transform failures on pages that were still emitted.
    pub warnings: Vec<TransformWarning>,
    /// Written files: one per page in SVG mode, the merged PDF in PDF mode.
    pub outputs: Vec<PathBuf>,
    /// Engine selection (PDF mode only).
    pub engine: Option<EngineReport>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl RunSummary {
    pub(crate) fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Self::default()
        }
    }

    pub(crate) fn skip(&mut self, error: &PageError) {
        self.skipped.push(SkippedPage::from(error));
    }

    /// True when every attempted page made it into the output.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.succeeded == self.attempted
    }

    /// Treat any skipped page as an error.
    pub fn into_result(self) -> Result<RunSummary, ConvertError> {
        if self.skipped.is_empty() {
            Ok(self)
        } else {
            Err(ConvertError::PartialFailure {
                succeeded: self.succeeded,
                skipped: self.skipped.len(),
                attempted: self.attempted,
            })
        }
    }
}

/// One manifest page as reported by [`crate::convert::inspect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub index: usize,
    /// Declared width as written in the manifest, if any.
    pub declared_width: Option<String>,
    /// Declared height as written in the manifest, if any.
    pub declared_height: Option<String>,
    /// Image references in document order.
    pub image_refs: Vec<String>,
    /// Set when the page would be skipped.
    pub skipped: Option<SkippedPage>,
}
