//! Container reader: open an `.iwb` file and read its entries.
//!
//! An IWB file is a plain ZIP archive holding one XML manifest and the
//! image assets it references (under `images/`). We validate the ZIP
//! signature before handing the file to the `zip` crate so callers get
//! "not an IWB container" rather than an opaque central-directory error for
//! files that are obviously something else.
//!
//! The open file handle is owned by [`Archive`] and released when it is
//! dropped, which covers success, early `?` returns and panics alike.

use crate::error::{ConvertError, EntryError};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Local-file-header and empty-archive signatures.
const ZIP_MAGIC: [&[u8; 4]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// Upper bound on the buffer reserved up front from an entry's declared size.
/// The declared size comes from the archive and is not trusted beyond this.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

fn initial_capacity(declared: u64) -> usize {
    declared.min(PREALLOC_LIMIT) as usize
}

/// Read access to named binary entries.
///
/// Implemented by [`Archive`] and by an in-memory map, so transforms can be
/// exercised without a container on disk.
pub trait AssetSource {
    /// Return the full contents of entry `name`.
    fn read_entry(&self, name: &str) -> Result<Vec<u8>, EntryError>;
}

impl AssetSource for BTreeMap<String, Vec<u8>> {
    fn read_entry(&self, name: &str) -> Result<Vec<u8>, EntryError> {
        self.get(name).cloned().ok_or_else(|| EntryError::Missing {
            name: name.to_string(),
        })
    }
}

/// An opened IWB container.
pub struct Archive {
    path: PathBuf,
    zip: RefCell<ZipArchive<BufReader<File>>>,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("entries", &self.zip.borrow().len())
            .finish()
    }
}

impl Archive {
    /// Open `path`, validating that it is a readable ZIP container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ConvertError::ArchiveNotFound { path });
        }

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ConvertError::PermissionDenied { path });
            }
            Err(_) => return Err(ConvertError::ArchiveNotFound { path }),
        };

        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_err() || !ZIP_MAGIC.iter().any(|m| **m == magic) {
            return Err(ConvertError::NotAContainer {
                path,
                detail: format!("missing ZIP signature (first bytes: {magic:?})"),
            });
        }
        file.rewind().map_err(|e| ConvertError::CorruptArchive {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| match e {
            ZipError::UnsupportedArchive(detail) => ConvertError::NotAContainer {
                path: path.clone(),
                detail: detail.to_string(),
            },
            other => ConvertError::CorruptArchive {
                path: path.clone(),
                detail: other.to_string(),
            },
        })?;

        debug!("Opened container {} ({} entries)", path.display(), zip.len());
        Ok(Self {
            path,
            zip: RefCell::new(zip),
        })
    }

    /// Path the container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all entries (directories included).
    pub fn entry_names(&self) -> BTreeSet<String> {
        self.zip
            .borrow()
            .file_names()
            .map(str::to_owned)
            .collect()
    }

    /// Find the manifest: the first `.xml` entry, preferring the archive root.
    pub fn find_manifest(&self) -> Option<String> {
        let zip = self.zip.borrow();
        let xml: Vec<&str> = zip
            .file_names()
            .filter(|n| !n.ends_with('/') && n.to_ascii_lowercase().ends_with(".xml"))
            .collect();
        xml.iter()
            .find(|n| !n.contains('/'))
            .or_else(|| xml.first())
            .map(|n| n.to_string())
    }
}

impl AssetSource for Archive {
    fn read_entry(&self, name: &str) -> Result<Vec<u8>, EntryError> {
        let mut zip = self.zip.borrow_mut();
        let mut entry = zip.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => EntryError::Missing {
                name: name.to_string(),
            },
            other => EntryError::Unreadable {
                name: name.to_string(),
                detail: other.to_string(),
            },
        })?;

        let mut buf = Vec::with_capacity(initial_capacity(entry.size()));
        entry
            .read_to_end(&mut buf)
            .map_err(|e| EntryError::Unreadable {
                name: name.to_string(),
                detail: e.to_string(),
            })?;
        Ok(buf)
    }
}
