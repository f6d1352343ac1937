//! Configuration types for IWB extraction and PDF assembly.
//!
//! Two immutable bundles drive a run:
//!
//! * [`TransformConfig`]: what happens to each page's markup (fill removal,
//!   image policy, background deletion, size correction).
//! * [`AssemblyConfig`]: how normalised pages are merged into one PDF
//!   (page-sizing policy, engine preference).
//!
//! Both are built once, via their builders or `Default`, and passed by
//! reference through every call boundary. [`ConversionConfig`] bundles the
//! two together with an optional progress callback for the top-level entry
//! points in [`crate::convert`].

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ── Transform configuration ──────────────────────────────────────────────

/// Per-page markup transforms.
///
/// Defaults mirror the whiteboard converter's own defaults: fills removed,
/// size fixed, images embedded as data URIs, background kept.
///
/// # Example
/// ```rust
/// use iwb_convert::{ImageMode, TransformConfig};
///
/// let config = TransformConfig::builder()
///     .remove_fill(false)
///     .image_mode(ImageMode::CopyAssets)
///     .delete_background(true)
///     .build()
///     .unwrap();
/// assert!(config.fix_size);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Strip fill from shape elements so ink strokes render as outlines. Default: true.
    ///
    /// The whiteboard stores pen strokes as filled outlines that general SVG
    /// viewers render as opaque blobs.
    pub remove_fill: bool,

    /// Grow the canvas to contain all geometry. Default: true.
    pub fix_size: bool,

    /// How `<image>` references into the archive are handled. Default: [`ImageMode::EmbedDataUri`].
    pub image_mode: ImageMode,

    /// Remove full-canvas background images. Default: false.
    pub delete_background: bool,

    /// Tolerance (user units) when matching an image's placement against the
    /// declared canvas for background detection. Default: 0.5.
    pub background_tolerance: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            remove_fill: true,
            fix_size: true,
            image_mode: ImageMode::default(),
            delete_background: false,
            background_tolerance: 0.5,
        }
    }
}

impl TransformConfig {
    /// Create a new builder for `TransformConfig`.
    pub fn builder() -> TransformConfigBuilder {
        TransformConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TransformConfig`].
#[derive(Debug)]
pub struct TransformConfigBuilder {
    config: TransformConfig,
}

impl TransformConfigBuilder {
    pub fn remove_fill(mut self, v: bool) -> Self {
        self.config.remove_fill = v;
        self
    }

    pub fn fix_size(mut self, v: bool) -> Self {
        self.config.fix_size = v;
        self
    }

    pub fn image_mode(mut self, mode: ImageMode) -> Self {
        self.config.image_mode = mode;
        self
    }

    pub fn delete_background(mut self, v: bool) -> Self {
        self.config.delete_background = v;
        self
    }

    pub fn background_tolerance(mut self, tol: f64) -> Self {
        self.config.background_tolerance = tol;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TransformConfig, ConvertError> {
        let tol = self.config.background_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "background tolerance must be a non-negative number, got {tol}"
            )));
        }
        Ok(self.config)
    }
}

// ── Assembly configuration ───────────────────────────────────────────────

/// Multi-page PDF assembly options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Page-sizing policy across the merged document. Default: [`PageSizing::Independent`].
    pub page_sizing: PageSizing,

    /// Which rendering engine to use. Default: [`EnginePreference::AutoDetect`].
    pub engine: EnginePreference,

    /// Upper bound on one Inkscape invocation, in seconds. Default: 60.
    ///
    /// A page that exceeds it is killed and counted as an engine crash.
    pub external_timeout_secs: u64,

    /// Explicit Inkscape executable. If None, it is located on the host.
    pub inkscape_path: Option<PathBuf>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            page_sizing: PageSizing::default(),
            engine: EnginePreference::default(),
            external_timeout_secs: 60,
            inkscape_path: None,
        }
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AssemblyConfig`].
#[derive(Debug)]
pub struct AssemblyConfigBuilder {
    config: AssemblyConfig,
}

impl AssemblyConfigBuilder {
    pub fn page_sizing(mut self, sizing: PageSizing) -> Self {
        self.config.page_sizing = sizing;
        self
    }

    pub fn engine(mut self, engine: EnginePreference) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn external_timeout_secs(mut self, secs: u64) -> Self {
        self.config.external_timeout_secs = secs;
        self
    }

    pub fn inkscape_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.inkscape_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, ConvertError> {
        if self.config.external_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "external engine timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Run configuration ────────────────────────────────────────────────────

/// Everything a top-level conversion needs.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
#[derive(Clone, Default)]
pub struct ConversionConfig {
    /// Per-page transforms.
    pub transform: TransformConfig,

    /// PDF assembly options (ignored by SVG extraction).
    pub assembly: AssemblyConfig,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("transform", &self.transform)
            .field("assembly", &self.assembly)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn transform(mut self, transform: TransformConfig) -> Self {
        self.config.transform = transform;
        self
    }

    pub fn assembly(mut self, assembly: AssemblyConfig) -> Self {
        self.config.assembly = assembly;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How `<image>` references into the archive's `images/` namespace are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageMode {
    /// Leave the reference exactly as written.
    KeepReference,
    /// Copy referenced assets next to the emitted page and point at the copy.
    CopyAssets,
    /// Inline the asset bytes as a base64 `data:` URI. (default)
    #[default]
    EmbedDataUri,
}

/// Page-sizing policy for the merged PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSizing {
    /// Each page keeps its own canvas size. (default)
    #[default]
    Independent,
    /// Every page uses the largest width and largest height of any rendered
    /// page; content stays anchored at the top-left.
    Uniform,
}

/// Rendering engine preference for PDF assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnginePreference {
    /// Use Inkscape when installed, otherwise the in-process engine. (default)
    #[default]
    AutoDetect,
    /// Use Inkscape; fall back to the in-process engine if it is missing.
    ForceExternal,
    /// Always use the in-process engine.
    ForceInProcess,
}
