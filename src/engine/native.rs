//! In-process engine built on `svg2pdf` (and the `usvg` it re-exports).

use super::{EngineKind, RenderEngine};
use crate::error::RenderError;
use std::sync::Arc;
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};
use tracing::debug;

/// Renders pages without any external program.
///
/// System fonts are loaded once when the engine is built and shared by
/// every page it renders.
pub struct NativeEngine {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl NativeEngine {
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!("svg2pdf engine loaded {} font faces", db.len());
        Self {
            fontdb: Arc::new(db),
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for NativeEngine {
    fn name(&self) -> &str {
        "svg2pdf"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::InProcess
    }

    fn render_page(&self, svg: &str) -> Result<Vec<u8>, RenderError> {
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|e| RenderError::InvalidMarkup(e.to_string()))?;
        svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
            .map_err(|e| RenderError::EngineCrashed(e.to_string()))
    }
}
