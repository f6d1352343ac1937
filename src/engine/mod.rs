//! Rendering engines: turn one page's SVG into a single-page PDF.
//!
//! Two interchangeable implementations sit behind [`RenderEngine`]:
//!
//! * [`inkscape::InkscapeEngine`]: shells out to an installed Inkscape.
//! * [`native::NativeEngine`]: `svg2pdf` in process, always available.
//!
//! Which one a run uses is decided up front by [`select_engine`]. An
//! external engine that was found but then cannot be started is swapped for
//! the in-process one on the first page that notices, and stays swapped for
//! the rest of the run. Neither engine knows about the other.

pub mod inkscape;
pub mod native;

use crate::config::{AssemblyConfig, EnginePreference};
use crate::error::RenderError;
use crate::output::EngineReport;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

/// The two engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// Inkscape subprocess.
    External,
    /// `svg2pdf`.
    InProcess,
}

/// Converts one page of SVG markup into a single-page PDF.
pub trait RenderEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    fn kind(&self) -> EngineKind;

    /// Render `svg` (a complete document) to PDF bytes.
    fn render_page(&self, svg: &str) -> Result<Vec<u8>, RenderError>;
}

/// The engine chosen for a run and how it was chosen.
pub struct EngineSelection {
    pub engine: Box<dyn RenderEngine>,
    report: EngineReport,
    /// Set by [`FallbackEngine`] once it has switched to the in-process engine.
    switched: Option<Arc<OnceLock<String>>>,
}

impl EngineSelection {
    /// How the run's pages were rendered, as of now.
    ///
    /// Reflects a mid-run switch to the in-process engine when the external
    /// one turned out to be unusable.
    pub fn report(&self) -> EngineReport {
        let mut report = self.report.clone();
        if let Some(reason) = self.switched.as_ref().and_then(|s| s.get()) {
            report.used = EngineKind::InProcess;
            report.substituted = report.requested == EnginePreference::ForceExternal;
            report.note = Some(reason.clone());
        }
        report
    }
}

impl std::fmt::Debug for EngineSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSelection")
            .field("engine", &self.engine.name())
            .field("report", &self.report())
            .finish()
    }
}

/// Wraps the external engine and falls back to `svg2pdf` for good the first
/// time the external engine reports [`RenderError::EngineUnavailable`].
pub struct FallbackEngine {
    primary: Box<dyn RenderEngine>,
    fallback: OnceLock<native::NativeEngine>,
    switched: Arc<OnceLock<String>>,
}

impl FallbackEngine {
    pub fn new(primary: Box<dyn RenderEngine>) -> Self {
        Self {
            primary,
            fallback: OnceLock::new(),
            switched: Arc::new(OnceLock::new()),
        }
    }

    fn native(&self) -> &native::NativeEngine {
        self.fallback.get_or_init(native::NativeEngine::new)
    }
}

impl RenderEngine for FallbackEngine {
    fn name(&self) -> &str {
        if self.switched.get().is_some() {
            self.native().name()
        } else {
            self.primary.name()
        }
    }

    fn kind(&self) -> EngineKind {
        if self.switched.get().is_some() {
            EngineKind::InProcess
        } else {
            self.primary.kind()
        }
    }

    fn render_page(&self, svg: &str) -> Result<Vec<u8>, RenderError> {
        if self.switched.get().is_none() {
            match self.primary.render_page(svg) {
                Err(RenderError::EngineUnavailable(reason)) => {
                    warn!(
                        "{} cannot be started ({}); switching to in-process engine",
                        self.primary.name(),
                        reason
                    );
                    let _ = self.switched.set(reason);
                }
                other => return other,
            }
        }
        self.native().render_page(svg)
    }
}

/// Pick the engine for `config.engine`.
///
/// | preference       | Inkscape found | Inkscape missing              |
/// |------------------|----------------|-------------------------------|
/// | `AutoDetect`     | external       | in-process                    |
/// | `ForceExternal`  | external       | in-process, marked substituted |
/// | `ForceInProcess` | in-process     | in-process                    |
///
/// A found Inkscape that fails to start is treated like a missing one from
/// that page on.
pub fn select_engine(config: &AssemblyConfig) -> EngineSelection {
    let requested = config.engine;
    let timeout = Duration::from_secs(config.external_timeout_secs);

    let in_process = |substituted: bool, note: Option<String>| EngineSelection {
        engine: Box::new(native::NativeEngine::new()),
        report: EngineReport {
            requested,
            used: EngineKind::InProcess,
            substituted,
            note,
        },
        switched: None,
    };

    if requested == EnginePreference::ForceInProcess {
        info!("Using in-process PDF engine");
        return in_process(false, None);
    }

    match inkscape::InkscapeEngine::locate(config.inkscape_path.as_deref(), timeout) {
        Ok(engine) => {
            info!("Using Inkscape at {}", engine.executable().display());
            let engine = FallbackEngine::new(Box::new(engine));
            let switched = Arc::clone(&engine.switched);
            EngineSelection {
                engine: Box::new(engine),
                report: EngineReport {
                    requested,
                    used: EngineKind::External,
                    substituted: false,
                    note: None,
                },
                switched: Some(switched),
            }
        }
        Err(e) if requested == EnginePreference::ForceExternal => {
            warn!("Inkscape requested but unavailable ({}); falling back to in-process engine", e);
            in_process(true, Some(e.to_string()))
        }
        Err(e) => {
            info!("Inkscape not available ({}); using in-process PDF engine", e);
            in_process(false, Some(e.to_string()))
        }
    }
}
