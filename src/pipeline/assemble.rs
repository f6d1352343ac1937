//! Document assembler: render normalised pages one by one and merge the
//! single-page PDFs into one document with `lopdf`.
//!
//! Pages are merged in the order they were added. A page the engine cannot
//! render is left out and the following pages move up, so the merged
//! document has no gaps. The page-sizing policy works on each page's
//! `MediaBox` after rendering, which keeps it independent of the engine.

use crate::config::PageSizing;
use crate::engine::RenderEngine;
use crate::error::{ConvertError, PageError, RenderError};
use crate::output::NormalizedPage;
use lopdf::{dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId};
use tracing::{debug, info};

/// Page box used when a rendered page carries none (US Letter).
const FALLBACK_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Keys a page may inherit from its ancestors in the page tree.
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

fn lopdf_err(err: lopdf::Error) -> ConvertError {
    ConvertError::PdfAssembly(err.to_string())
}

/// A rendered page waiting to be merged.
#[derive(Debug, Clone)]
struct RenderedPage {
    index: usize,
    pdf: Vec<u8>,
}

/// Collects rendered pages and merges them on [`finish`](Self::finish).
pub struct Assembler<'a> {
    engine: &'a dyn RenderEngine,
    sizing: PageSizing,
    rendered: Vec<RenderedPage>,
}

impl<'a> Assembler<'a> {
    pub fn new(engine: &'a dyn RenderEngine, sizing: PageSizing) -> Self {
        Self {
            engine,
            sizing,
            rendered: Vec::new(),
        }
    }

    /// Render one page. On success returns the size of its single-page PDF.
    ///
    /// Output the merger could not load is rejected here, so it costs only
    /// this page.
    pub fn add_page(&mut self, page: &NormalizedPage) -> Result<usize, PageError> {
        let failed = |error| PageError::RenderFailed {
            page: page.index,
            error,
        };
        let pdf = self.engine.render_page(&page.markup).map_err(failed)?;
        check_rendered(&pdf).map_err(failed)?;
        debug!(
            "Page {} rendered by {} ({} bytes)",
            page.index,
            self.engine.name(),
            pdf.len()
        );
        let len = pdf.len();
        self.rendered.push(RenderedPage {
            index: page.index,
            pdf,
        });
        Ok(len)
    }

    /// Number of pages rendered so far.
    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Merge everything rendered so far into one PDF.
    pub fn finish(self) -> Result<Vec<u8>, ConvertError> {
        merge_pdfs(
            self.rendered.iter().map(|p| (p.index, p.pdf.as_slice())),
            self.sizing,
        )
    }
}

/// The engine's output must load and must not be encrypted.
fn check_rendered(pdf: &[u8]) -> Result<(), RenderError> {
    let doc = LoDocument::load_mem(pdf)
        .map_err(|e| RenderError::EngineCrashed(format!("unreadable PDF output: {e}")))?;
    if doc.is_encrypted() {
        return Err(RenderError::EngineCrashed("encrypted PDF output".into()));
    }
    if doc.get_pages().is_empty() {
        return Err(RenderError::EngineCrashed("PDF output has no pages".into()));
    }
    Ok(())
}

/// Merge single-page (or multi-page) PDFs in order into one document.
///
/// `pages` yields `(page index, pdf bytes)`; the index is only used in
/// error messages.
pub fn merge_pdfs<'p>(
    pages: impl IntoIterator<Item = (usize, &'p [u8])>,
    sizing: PageSizing,
) -> Result<Vec<u8>, ConvertError> {
    let mut merged = LoDocument::with_version("1.7");
    let mut page_ids: Vec<LoObjectId> = Vec::new();

    for (index, bytes) in pages {
        let src = LoDocument::load_mem(bytes)
            .map_err(|e| ConvertError::PdfAssembly(format!("page {index}: {e}")))?;
        if src.is_encrypted() {
            return Err(ConvertError::PdfAssembly(format!(
                "page {index}: rendered PDF is encrypted"
            )));
        }
        page_ids.extend(import_pages(&mut merged, src));
    }

    if page_ids.is_empty() {
        return Err(ConvertError::PdfAssembly("no pages to merge".into()));
    }

    // Resolve inherited attributes before the old page trees are dropped.
    let mut boxes = Vec::with_capacity(page_ids.len());
    for &id in &page_ids {
        let inherited: Vec<(Vec<u8>, LoObject)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited_attr(&merged, id, key).map(|v| (key.to_vec(), v)))
            .collect();
        let page = merged
            .get_object_mut(id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        for (key, value) in inherited {
            if !page.has(&key) {
                page.set(key, value);
            }
        }
        boxes.push(media_box(page));
    }

    if sizing == PageSizing::Uniform {
        let max_w = boxes.iter().map(|b| b[2] - b[0]).fold(0.0f32, f32::max);
        let max_h = boxes.iter().map(|b| b[3] - b[1]).fold(0.0f32, f32::max);
        info!("Uniform page size {} x {} pt", max_w, max_h);
        for (&id, b) in page_ids.iter().zip(&boxes) {
            // Keep the top-left corner fixed; PDF y grows upwards.
            let (llx, ury) = (b[0], b[3]);
            let page = merged
                .get_object_mut(id)
                .and_then(LoObject::as_dict_mut)
                .map_err(lopdf_err)?;
            page.set("MediaBox", box_object([llx, ury - max_h, llx + max_w, ury]));
            page.remove(b"CropBox");
        }
    }

    let pages_id = merged.new_object_id();
    for &id in &page_ids {
        let page = merged
            .get_object_mut(id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Parent", pages_id);
    }
    let kids: Vec<LoObject> = page_ids.iter().map(|&id| LoObject::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    let mut out = Vec::new();
    merged.save_to(&mut out).map_err(|e| ConvertError::PdfAssembly(e.to_string()))?;
    info!("Merged {} pages ({} bytes)", page_ids.len(), out.len());
    Ok(out)
}

/// Move all objects of `src` into `dst`; returns `src`'s pages in order.
fn import_pages(dst: &mut LoDocument, mut src: LoDocument) -> Vec<LoObjectId> {
    src.renumber_objects_with(dst.max_id + 1);
    let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    page_ids
}

/// Look `key` up on the page, then on its ancestors.
fn inherited_attr(doc: &LoDocument, page: LoObjectId, key: &[u8]) -> Option<LoObject> {
    let mut current = doc.get_dictionary(page).ok()?;
    // Bounded so a cyclic Parent chain terminates.
    for _ in 0..32 {
        if let Ok(v) = current.get(key) {
            return Some(match v {
                LoObject::Reference(id) => doc.get_object(*id).ok()?.clone(),
                other => other.clone(),
            });
        }
        let parent = current.get(b"Parent").and_then(LoObject::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box(page: &lopdf::Dictionary) -> [f32; 4] {
    let Ok(arr) = page.get(b"MediaBox").and_then(LoObject::as_array) else {
        return FALLBACK_BOX;
    };
    let nums: Vec<f32> = arr.iter().filter_map(|o| o.as_float().ok()).collect();
    match nums.as_slice() {
        [a, b, c, d] => [a.min(*c), b.min(*d), a.max(*c), b.max(*d)],
        _ => FALLBACK_BOX,
    }
}

fn box_object(b: [f32; 4]) -> LoObject {
    LoObject::Array(b.iter().map(|v| LoObject::Real(*v)).collect())
}

/// Width and height of every page of `pdf`, in points, in page order.
pub fn page_sizes(pdf: &[u8]) -> Result<Vec<(f32, f32)>, ConvertError> {
    let doc = LoDocument::load_mem(pdf).map_err(lopdf_err)?;
    doc.get_pages()
        .values()
        .map(|&id| {
            let b = match inherited_attr(&doc, id, b"MediaBox") {
                Some(LoObject::Array(arr)) => {
                    let mut page = lopdf::Dictionary::new();
                    page.set("MediaBox", LoObject::Array(arr));
                    media_box(&page)
                }
                _ => FALLBACK_BOX,
            };
            Ok((b[2] - b[0], b[3] - b[1]))
        })
        .collect()
}
