//! # inkscape-locate
//!
//! Find an installed [Inkscape](https://inkscape.org/) executable so that
//! callers can shell out to it for SVG → PDF export.
//!
//! ## Search order
//!
//! On first call to [`locate_inkscape`]:
//!
//! 1. `INKSCAPE_PATH`: an explicit path to the executable. If set but the
//!    file does not exist, the search fails with
//!    [`LocateError::OverrideMissing`] rather than silently picking another
//!    copy.
//! 2. Every directory on `PATH`.
//! 3. Well-known install locations for the current platform (see
//!    [`install_candidates`]).
//!
//! A successful lookup is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use inkscape_locate::{is_inkscape_available, locate_inkscape};
//!
//! if is_inkscape_available() {
//!     let exe = locate_inkscape().expect("checked above");
//!     println!("Inkscape at {}", exe.display());
//! }
//! ```
//!
//! ## Platform support
//!
//! | OS      | Executable       | Extra locations searched                         |
//! |---------|------------------|--------------------------------------------------|
//! | macOS   | `inkscape`       | `/Applications/Inkscape.app`, Homebrew, `~/Applications` |
//! | Linux   | `inkscape`       | `/usr/bin`, `/usr/local/bin`, `/snap/bin`, `~/.local/bin` |
//! | Windows | `inkscape.exe`   | `Program Files` / `Program Files (x86)`          |

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit path to the Inkscape executable.
pub const ENV_OVERRIDE: &str = "INKSCAPE_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by inkscape-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// `INKSCAPE_PATH` is set but does not point at an existing file.
    #[error("{ENV_OVERRIDE} is set to '{path}' but no file exists there")]
    OverrideMissing { path: PathBuf },

    /// No executable was found on `PATH` or in any known install location.
    #[error("Inkscape not found (searched PATH and {} install locations)", searched.len())]
    NotFound { searched: Vec<PathBuf> },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "inkscape.exe"
    } else {
        "inkscape"
    }
}

/// Well-known install locations for the current platform, in search order.
pub fn install_candidates() -> Vec<PathBuf> {
    let home = dirs::home_dir();

    match std::env::consts::OS {
        "windows" => vec![
            PathBuf::from(r"C:\Program Files\Inkscape\bin\inkscape.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Inkscape\bin\inkscape.exe"),
            PathBuf::from(r"C:\Program Files\Inkscape\inkscape.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Inkscape\inkscape.exe"),
        ],
        "macos" => {
            let mut paths = vec![
                PathBuf::from("/Applications/Inkscape.app/Contents/MacOS/inkscape"),
                PathBuf::from("/usr/local/bin/inkscape"),
                PathBuf::from("/opt/homebrew/bin/inkscape"),
            ];
            if let Some(h) = home {
                paths.push(h.join("Applications/Inkscape.app/Contents/MacOS/inkscape"));
            }
            paths
        }
        _ => {
            let mut paths = vec![
                PathBuf::from("/usr/bin/inkscape"),
                PathBuf::from("/usr/local/bin/inkscape"),
                PathBuf::from("/snap/bin/inkscape"),
            ];
            if let Some(h) = home {
                paths.push(h.join(".local/bin/inkscape"));
            }
            paths
        }
    }
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Search every directory of the `PATH` environment variable for `program`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable_file(candidate))
}

/// Locate Inkscape, caching the first successful result.
///
/// See the crate docs for the search order.
pub fn locate_inkscape() -> Result<PathBuf, LocateError> {
    // Fast path: already resolved in this process.
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = search()?;

    // Best-effort cache in the OnceLock (ignore race; both will succeed).
    let _ = RESOLVED_PATH.set(path.clone());

    Ok(path)
}

/// Locate Inkscape, honouring an explicit path first.
///
/// An explicit path that does not exist is reported as
/// [`LocateError::OverrideMissing`]; no fallback search happens.
pub fn locate_inkscape_with(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    match explicit {
        Some(p) if is_executable_file(p) => Ok(p.to_path_buf()),
        Some(p) => Err(LocateError::OverrideMissing {
            path: p.to_path_buf(),
        }),
        None => locate_inkscape(),
    }
}

/// Returns `true` if [`locate_inkscape`] would succeed.
pub fn is_inkscape_available() -> bool {
    locate_inkscape().is_ok()
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn search() -> Result<PathBuf, LocateError> {
    // 1. Environment variable override.
    if let Some(env_path) = std::env::var_os(ENV_OVERRIDE) {
        let p = PathBuf::from(env_path);
        if is_executable_file(&p) {
            return Ok(p);
        }
        return Err(LocateError::OverrideMissing { path: p });
    }

    // 2. PATH.
    if let Some(p) = find_on_path(executable_name()) {
        return Ok(p);
    }

    // 3. Known install locations.
    let candidates = install_candidates();
    candidates
        .iter()
        .find(|p| is_executable_file(p))
        .cloned()
        .ok_or(LocateError::NotFound {
            searched: candidates,
        })
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_candidates_nonempty() {
        let c = install_candidates();
        assert!(!c.is_empty());
        assert!(c.iter().all(|p| p.to_string_lossy().contains("nkscape")));
    }

    #[test]
    fn explicit_missing_path_is_reported() {
        let err = locate_inkscape_with(Some(Path::new("/definitely/not/inkscape")))
            .expect_err("missing file must not resolve");
        assert!(matches!(err, LocateError::OverrideMissing { .. }));
        assert!(err.to_string().contains("/definitely/not/inkscape"));
    }

    #[test]
    fn find_on_path_misses_unknown_program() {
        assert!(find_on_path("surely-no-such-program-iwb-test").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn explicit_executable_is_accepted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("inkscape-locate-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let exe = dir.join("inkscape");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = locate_inkscape_with(Some(&exe)).expect("executable should resolve");
        assert_eq!(found, exe);

        std::fs::remove_dir_all(&dir).ok();
    }
}
