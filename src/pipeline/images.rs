//! Image reference resolution: keep, copy out, or inline as `data:` URIs.

use super::archive::AssetSource;
use super::manifest::normalize_entry_name;
use super::markup::Element;
use crate::config::ImageMode;
use crate::output::AssetCopy;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, warn};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Result of resolving the references of one page.
#[derive(Debug, Default)]
pub struct ImageResolution {
    pub assets: Vec<AssetCopy>,
    pub warnings: Vec<String>,
    /// References rewritten (copied or embedded).
    pub rewritten: usize,
}

/// True for references that point outside the archive.
pub fn is_external(href: &str) -> bool {
    let h = href.trim();
    let lower = h.to_ascii_lowercase();
    h.is_empty()
        || h.starts_with('#')
        || lower.starts_with("data:")
        || lower.starts_with("http://")
        || lower.starts_with("https://")
}

/// MIME type for an asset: by extension, then by sniffing the bytes.
pub fn mime_type(name: &str, bytes: &[u8]) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(ext) = ext.as_deref() {
        if ext == "svg" {
            return "image/svg+xml";
        }
        if let Some(fmt) = ImageFormat::from_extension(ext) {
            return fmt.to_mime_type();
        }
    }
    if let Ok(fmt) = image::guess_format(bytes) {
        return fmt.to_mime_type();
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    if head.contains("<svg") {
        return "image/svg+xml";
    }
    FALLBACK_MIME
}

/// Build a base64 `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Resolve every `<image>` reference under `root` according to `mode`.
pub fn resolve_images(root: &mut Element, mode: ImageMode, assets: &dyn AssetSource) -> ImageResolution {
    let mut res = ImageResolution::default();
    if mode == ImageMode::KeepReference {
        return res;
    }

    root.walk_mut(&mut |el| {
        if el.local_name() != "image" {
            return;
        }
        let Some(href) = el.get_local("href").map(|h| h.into_owned()) else {
            return;
        };
        if is_external(&href) {
            return;
        }
        let entry = normalize_entry_name(&href);

        let bytes = match assets.read_entry(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!("Image reference left unresolved: {}", e);
                res.warnings.push(e.to_string());
                return;
            }
        };

        match mode {
            ImageMode::EmbedDataUri => {
                let mime = mime_type(&entry, &bytes);
                el.set_local("href", &data_uri(mime, &bytes));
                debug!("Embedded '{}' as {} ({} bytes)", entry, mime, bytes.len());
            }
            ImageMode::CopyAssets => {
                if href != entry {
                    el.set_local("href", &entry);
                }
                if !res.assets.iter().any(|a| a.entry == entry) {
                    res.assets.push(AssetCopy {
                        entry: entry.clone(),
                        relative_path: entry.clone(),
                    });
                }
            }
            ImageMode::KeepReference => return,
        }
        res.rewritten += 1;
    });
    res
}
