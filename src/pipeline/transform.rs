//! Per-page transforms, applied in a fixed order:
//!
//! 1. background deletion
//! 2. image resolution
//! 3. fill removal
//! 4. size correction
//!
//! Every step works on the page's own copy of the tree. A fragment one step
//! cannot handle is recorded as a [`TransformWarning`] and skipped; the page
//! itself is always produced.

use super::archive::AssetSource;
use super::geometry::{self, coord, parse_length, parse_numbers, CanvasChange};
use super::images::resolve_images;
use super::manifest::PageDescriptor;
use super::markup::Element;
use crate::config::TransformConfig;
use crate::output::{NormalizedPage, TransformStep, TransformWarning};
use kurbo::Rect;
use tracing::{debug, warn};

/// Shape elements whose fill is removed. Text and images are never touched.
const SHAPES: &[&str] = &[
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
];

/// Id prefix the whiteboard gives its own background images.
const BACKGROUND_ID_PREFIX: &str = "backgroundImage";

/// Apply every enabled transform to one page.
pub fn transform_page(
    page: &PageDescriptor,
    config: &TransformConfig,
    assets: &dyn AssetSource,
) -> NormalizedPage {
    let mut root = page.document.clone();
    let mut warnings = Vec::new();
    let mut record = |step: TransformStep, detail: String| {
        warn!("Page {}: {:?}: {}", page.index, step, detail);
        warnings.push(TransformWarning {
            page: page.index,
            step,
            detail,
        });
    };

    if config.delete_background {
        let removed = delete_background(&mut root, declared_canvas(page), config.background_tolerance);
        debug!("Page {}: removed {} background elements", page.index, removed);
    }

    let images = resolve_images(&mut root, config.image_mode, assets);
    for w in images.warnings {
        record(TransformStep::ImageResolution, w);
    }

    if config.remove_fill {
        let n = remove_fills(&mut root);
        debug!("Page {}: cleared fill on {} shapes", page.index, n);
    }

    if config.fix_size {
        let mut geo_warnings = Vec::new();
        let bounds = geometry::content_bounds(&root, &mut geo_warnings);
        for w in geo_warnings {
            record(TransformStep::SizeCorrection, w);
        }
        if let Some(b) = bounds {
            if let CanvasChange::Grown { width, height } = geometry::grow_canvas(&mut root, b) {
                debug!("Page {}: canvas grown to {} x {}", page.index, width, height);
            }
        }
    }

    let extent = |name: &str| root.get(name).as_deref().and_then(parse_length);
    let (width, height) = (extent("width"), extent("height"));

    NormalizedPage {
        index: page.index,
        markup: root.to_xml(),
        width,
        height,
        assets: images.assets,
        warnings,
    }
}

/// The canvas a background must cover, in user units: the viewBox when
/// there is one, otherwise the declared size at the origin.
fn declared_canvas(page: &PageDescriptor) -> Option<Rect> {
    if let Some(vb) = page.document.get("viewBox") {
        let n = parse_numbers(&vb);
        if n.len() == 4 && n[2] > 0.0 && n[3] > 0.0 {
            return Some(Rect::new(n[0], n[1], n[0] + n[2], n[1] + n[3]));
        }
    }
    Some(Rect::new(0.0, 0.0, page.width?, page.height?))
}

fn is_background(el: &Element, canvas: Option<Rect>, tolerance: f64) -> bool {
    if el.local_name() != "image" {
        return false;
    }
    if el
        .get("id")
        .is_some_and(|id| id.starts_with(BACKGROUND_ID_PREFIX))
    {
        return true;
    }
    let Some(c) = canvas else {
        return false;
    };
    let near = |a: f64, b: f64| (a - b).abs() <= tolerance;
    near(coord(el, "x"), c.x0)
        && near(coord(el, "y"), c.y0)
        && near(coord(el, "width"), c.width())
        && near(coord(el, "height"), c.height())
}

/// Remove background images and any `<use>` pointing at them.
///
/// Returns the number of elements removed.
pub fn delete_background(root: &mut Element, canvas: Option<Rect>, tolerance: f64) -> usize {
    let removed = root.remove_where(&mut |el| is_background(el, canvas, tolerance));
    let ids: Vec<String> = removed
        .iter()
        .filter_map(|el| el.get("id").map(|id| format!("#{id}")))
        .collect();
    let uses = if ids.is_empty() {
        Vec::new()
    } else {
        root.remove_where(&mut |el| {
            el.local_name() == "use"
                && el
                    .get_local("href")
                    .is_some_and(|h| ids.iter().any(|id| *id == h.trim()))
        })
    };
    removed.len() + uses.len()
}

/// Set `fill="none"` on every shape and drop `fill` from its inline style.
///
/// Returns the number of shapes visited. Running it twice changes nothing.
pub fn remove_fills(root: &mut Element) -> usize {
    let mut count = 0;
    root.walk_mut(&mut |el| {
        if !SHAPES.contains(&el.local_name()) {
            return;
        }
        count += 1;
        el.set("fill", "none");

        let Some(style) = el.get("style").map(|s| s.into_owned()) else {
            return;
        };
        let decls: Vec<&str> = style
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        let kept: Vec<&str> = decls
            .iter()
            .copied()
            .filter(|d| d.split_once(':').map_or(true, |(k, _)| k.trim() != "fill"))
            .collect();
        if kept.len() == decls.len() {
            return;
        }
        if kept.is_empty() {
            el.remove("style");
        } else {
            el.set("style", &kept.join(";"));
        }
    });
    count
}
