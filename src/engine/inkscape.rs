//! External engine: `inkscape <in.svg> --export-type=pdf --export-filename=<out.pdf>`.
//!
//! Each page gets its own temporary directory holding the input SVG, the
//! output PDF and Inkscape's stderr. The child is polled against a deadline
//! and killed when it overruns.

use super::{EngineKind, RenderEngine};
use crate::error::RenderError;
use inkscape_locate::{locate_inkscape_with, LocateError};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Characters of stderr kept in an error message.
const STDERR_TAIL: usize = 400;

#[derive(Debug, Clone)]
pub struct InkscapeEngine {
    exe: PathBuf,
    timeout: Duration,
}

impl InkscapeEngine {
    pub fn new(exe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            exe: exe.into(),
            timeout,
        }
    }

    /// Find Inkscape (explicit path first, then the usual search).
    pub fn locate(explicit: Option<&Path>, timeout: Duration) -> Result<Self, LocateError> {
        Ok(Self::new(locate_inkscape_with(explicit)?, timeout))
    }

    pub fn executable(&self) -> &Path {
        &self.exe
    }
}

impl RenderEngine for InkscapeEngine {
    fn name(&self) -> &str {
        "inkscape"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::External
    }

    fn render_page(&self, svg: &str) -> Result<Vec<u8>, RenderError> {
        let crashed = |what: &str, e: std::io::Error| RenderError::EngineCrashed(format!("{what}: {e}"));

        let dir = tempfile::tempdir().map_err(|e| crashed("temp dir", e))?;
        let input = dir.path().join("page.svg");
        let output = dir.path().join("page.pdf");
        let log = dir.path().join("stderr.log");
        fs::write(&input, svg).map_err(|e| crashed("write input", e))?;
        let stderr = File::create(&log).map_err(|e| crashed("stderr log", e))?;

        let mut child = Command::new(&self.exe)
            .arg(&input)
            .arg("--export-type=pdf")
            .arg(format!("--export-filename={}", output.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => RenderError::EngineUnavailable(
                    format!("cannot start {}: {e}", self.exe.display()),
                ),
                _ => crashed("spawn", e),
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::EngineCrashed(format!(
                        "timed out after {:.1}s",
                        self.timeout.as_secs_f64()
                    )));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(crashed("wait", e));
                }
            }
        };

        if !status.success() {
            let tail = stderr_tail(&log);
            return Err(RenderError::EngineCrashed(if tail.is_empty() {
                format!("inkscape exited with {status}")
            } else {
                format!("inkscape exited with {status}: {tail}")
            }));
        }

        let pdf = match fs::read(&output) {
            Ok(pdf) => pdf,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(crashed("read output", e)),
        };
        if pdf.is_empty() {
            return Err(RenderError::EngineCrashed(
                "inkscape produced no output".into(),
            ));
        }
        debug!("inkscape rendered {} bytes", pdf.len());
        Ok(pdf)
    }
}

fn stderr_tail(log: &Path) -> String {
    let text = fs::read_to_string(log).unwrap_or_default();
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_TAIL);
    text.chars().skip(skip).collect()
}
