//! Page emitter: write normalised pages and their copied assets to disk.

use super::archive::AssetSource;
use crate::error::ConvertError;
use crate::output::NormalizedPage;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>\n";

/// File name for page `index`.
pub fn page_file_name(index: usize) -> String {
    format!("page_{index}.svg")
}

/// Write `bytes` to `path` via a sibling temp file and a rename, so a reader
/// never sees a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let fail = |source| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(fail)?;
    fs::rename(&tmp, path).map_err(fail)
}

/// Write `page` as `output_dir/page_{index}.svg` and copy its assets.
///
/// Returns the path of the written page.
pub fn emit_page(
    page: &NormalizedPage,
    output_dir: &Path,
    assets: &dyn AssetSource,
) -> Result<PathBuf, ConvertError> {
    for asset in &page.assets {
        let target = output_dir.join(safe_relative(&asset.relative_path)?);
        if target.exists() {
            continue;
        }
        // The entry was read successfully during resolution.
        let bytes = assets
            .read_entry(&asset.entry)
            .map_err(|e| ConvertError::Internal(e.to_string()))?;
        write_atomic(&target, &bytes)?;
        debug!("Copied asset {} -> {}", asset.entry, target.display());
    }

    let path = output_dir.join(page_file_name(page.index));
    let mut doc = String::with_capacity(XML_DECLARATION.len() + page.markup.len() + 1);
    doc.push_str(XML_DECLARATION);
    doc.push_str(&page.markup);
    doc.push('\n');
    write_atomic(&path, doc.as_bytes())?;
    debug!("Saved {}", path.display());
    Ok(path)
}

/// Reject asset paths that would escape the output directory.
fn safe_relative(rel: &str) -> Result<PathBuf, ConvertError> {
    let p = Path::new(rel);
    if p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        Ok(p.to_path_buf())
    } else {
        Err(ConvertError::Internal(format!(
            "asset path '{rel}' escapes the output directory"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AssetCopy;
    use std::collections::BTreeMap;

    fn page(index: usize, assets: Vec<AssetCopy>) -> NormalizedPage {
        NormalizedPage {
            index,
            markup: r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#.into(),
            width: None,
            height: None,
            assets,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn writes_declaration_and_index_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = emit_page(&page(7, vec![]), dir.path(), &BTreeMap::new()).unwrap();
        assert_eq!(path.file_name().unwrap(), "page_7.svg");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml version='1.0' encoding='utf-8'?>\n<svg"));
        assert!(!dir.path().join("page_7.svg.tmp").exists());
    }

    #[test]
    fn copies_assets_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let mut assets = BTreeMap::new();
        assets.insert("images/a.png".to_string(), b"png".to_vec());
        let p = page(
            0,
            vec![AssetCopy {
                entry: "images/a.png".into(),
                relative_path: "images/a.png".into(),
            }],
        );
        emit_page(&p, dir.path(), &assets).unwrap();
        assert_eq!(fs::read(dir.path().join("images/a.png")).unwrap(), b"png");
    }

    #[test]
    fn rejects_escaping_asset_paths() {
        assert!(safe_relative("../etc/passwd").is_err());
        assert!(safe_relative("/abs").is_err());
        assert!(safe_relative("images/x.png").is_ok());
    }
}
