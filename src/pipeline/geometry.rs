//! Geometry for size correction: lengths, transform lists, the bounding box
//! of everything a page draws, and growing the canvas to contain it.
//!
//! Bounding boxes are computed with `kurbo`. Path data goes through
//! `BezPath::from_svg`; basic shapes are converted to paths first so that one
//! code path applies transforms. Text has no font metrics available here and
//! is approximated from its anchor point, font size and character count.

use super::markup::{Element, Node};
use kurbo::{Affine, BezPath, Circle, Ellipse, Line, Rect, Shape};
use once_cell::sync::Lazy;
use regex::Regex;

/// Flattening tolerance used when converting shapes to paths.
const PATH_TOLERANCE: f64 = 0.01;

/// Below this, two canvas extents are considered equal.
const EPSILON: f64 = 1e-6;

const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Average advance of one glyph relative to the font size.
const GLYPH_ADVANCE: f64 = 0.6;

static RE_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(px|pt|pc|mm|cm|in|%|em|ex)?\s*$")
        .unwrap()
});

static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

static RE_TRANSFORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([A-Za-z]+)\s*\(([^)]*)\)\s*,?").unwrap());

/// Elements whose subtree is never rendered directly.
const NON_RENDERED: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "pattern",
    "symbol",
    "marker",
    "metadata",
    "title",
    "desc",
    "style",
    "script",
    "linearGradient",
    "radialGradient",
    "filter",
];

/// A length split into its number and unit, e.g. `"10mm"` → `(10, "mm")`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length<'a> {
    pub value: f64,
    pub unit: &'a str,
}

impl Length<'_> {
    /// User units (CSS px) per one of this length's unit; `None` for
    /// relative units.
    pub fn unit_factor(&self) -> Option<f64> {
        match self.unit {
            "" | "px" => Some(1.0),
            "pt" => Some(4.0 / 3.0),
            "pc" => Some(16.0),
            "mm" => Some(96.0 / 25.4),
            "cm" => Some(96.0 / 2.54),
            "in" => Some(96.0),
            _ => None,
        }
    }

    /// The length in user units, if absolute.
    pub fn to_user(&self) -> Option<f64> {
        self.unit_factor().map(|f| self.value * f)
    }
}

/// Split `s` into number and unit; `None` if it is not a length at all.
pub fn split_length(s: &str) -> Option<Length<'_>> {
    let caps = RE_LENGTH.captures(s)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map_or("", |m| m.as_str());
    value.is_finite().then_some(Length { value, unit })
}

/// Parse an absolute length into user units.
///
/// Percentages, font-relative units and malformed values yield `None`.
pub fn parse_length(s: &str) -> Option<f64> {
    split_length(s)?.to_user()
}

/// Every number in `s`, in order (viewBox, points, transform arguments).
pub fn parse_numbers(s: &str) -> Vec<f64> {
    RE_NUMBER
        .find_iter(s)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Shortest decimal form with at most three fractional digits.
pub fn format_number(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Parse an SVG `transform` attribute into one affine map.
pub fn parse_transform(s: &str) -> Result<Affine, String> {
    let mut result = Affine::IDENTITY;
    let mut consumed = 0;
    for caps in RE_TRANSFORM.captures_iter(s) {
        let whole = caps.get(0).ok_or("empty match")?;
        if whole.start() != consumed {
            return Err(format!("unexpected text in transform '{s}'"));
        }
        consumed = whole.end();

        let name = &caps[1];
        let args = parse_numbers(&caps[2]);
        let t = match (name, args.as_slice()) {
            ("matrix", [a, b, c, d, e, f]) => Affine::new([*a, *b, *c, *d, *e, *f]),
            ("translate", [tx]) => Affine::translate((*tx, 0.0)),
            ("translate", [tx, ty]) => Affine::translate((*tx, *ty)),
            ("scale", [s]) => Affine::scale(*s),
            ("scale", [sx, sy]) => Affine::scale_non_uniform(*sx, *sy),
            ("rotate", [a]) => Affine::rotate(a.to_radians()),
            ("rotate", [a, cx, cy]) => {
                Affine::translate((*cx, *cy))
                    * Affine::rotate(a.to_radians())
                    * Affine::translate((-cx, -cy))
            }
            ("skewX", [a]) => Affine::new([1.0, 0.0, a.to_radians().tan(), 1.0, 0.0, 0.0]),
            ("skewY", [a]) => Affine::new([1.0, a.to_radians().tan(), 0.0, 1.0, 0.0, 0.0]),
            _ => return Err(format!("unsupported transform '{}'", caps[0].trim())),
        };
        result = result * t;
    }
    if s[consumed..].trim().is_empty() {
        Ok(result)
    } else {
        Err(format!("unexpected text in transform '{s}'"))
    }
}

/// Value of a presentation property: inline `style` wins over the attribute.
pub fn style_property(el: &Element, name: &str) -> Option<String> {
    if let Some(style) = el.get("style") {
        for decl in style.split(';') {
            if let Some((k, v)) = decl.split_once(':') {
                if k.trim() == name {
                    return Some(v.trim().to_string());
                }
            }
        }
    }
    el.get(name).map(|v| v.trim().to_string())
}

/// Inherited state while walking the tree.
#[derive(Debug, Clone)]
struct Context {
    ctm: Affine,
    stroke: bool,
    stroke_width: f64,
    visible: bool,
    font_size: f64,
}

impl Context {
    fn root() -> Self {
        Self {
            ctm: Affine::IDENTITY,
            stroke: false,
            stroke_width: 1.0,
            visible: true,
            font_size: DEFAULT_FONT_SIZE,
        }
    }

    fn enter(&self, el: &Element, warnings: &mut Vec<String>) -> Self {
        let mut next = self.clone();
        if let Some(t) = el.get("transform") {
            match parse_transform(&t) {
                Ok(a) => next.ctm = self.ctm * a,
                Err(e) => warnings.push(format!("<{}>: {e}", el.local_name())),
            }
        }
        if let Some(s) = style_property(el, "stroke") {
            next.stroke = !(s == "none" || s == "transparent");
        }
        if let Some(w) = style_property(el, "stroke-width").as_deref().and_then(parse_length) {
            next.stroke_width = w.max(0.0);
        }
        if let Some(v) = style_property(el, "visibility") {
            next.visible = !(v == "hidden" || v == "collapse");
        }
        if let Some(fs) = style_property(el, "font-size").as_deref().and_then(parse_length) {
            next.font_size = fs;
        }
        next
    }
}

/// Absolute length attribute in user units, `0` when absent.
pub(crate) fn coord(el: &Element, name: &str) -> f64 {
    el.get(name).as_deref().and_then(parse_length).unwrap_or(0.0)
}

/// Bounding box of everything `root` draws, in `root`'s user space.
///
/// Fragments that cannot be measured (bad path data, bad transforms) are
/// described in `warnings` and left out of the box.
pub fn content_bounds(root: &Element, warnings: &mut Vec<String>) -> Option<Rect> {
    let mut acc = None;
    for child in root.elements() {
        visit(child, &Context::root(), &mut acc, warnings);
    }
    acc
}

fn visit(el: &Element, parent: &Context, acc: &mut Option<Rect>, warnings: &mut Vec<String>) {
    let name = el.local_name();
    if NON_RENDERED.contains(&name) {
        return;
    }
    if style_property(el, "display").as_deref() == Some("none") {
        return;
    }
    let mut ctx = parent.enter(el, warnings);

    let (shape, strokable) = match name {
        "g" | "a" | "switch" => {
            for child in el.elements() {
                visit(child, &ctx, acc, warnings);
            }
            return;
        }
        "svg" => {
            ctx.ctm = ctx.ctm * Affine::translate((coord(el, "x"), coord(el, "y")));
            for child in el.elements() {
                visit(child, &ctx, acc, warnings);
            }
            return;
        }
        "rect" | "image" => {
            let (w, h) = (coord(el, "width"), coord(el, "height"));
            if w <= 0.0 || h <= 0.0 {
                return;
            }
            let (x, y) = (coord(el, "x"), coord(el, "y"));
            (
                Rect::new(x, y, x + w, y + h).to_path(PATH_TOLERANCE),
                name == "rect",
            )
        }
        "circle" => {
            let r = coord(el, "r");
            if r <= 0.0 {
                return;
            }
            let c = Circle::new((coord(el, "cx"), coord(el, "cy")), r);
            (c.to_path(PATH_TOLERANCE), true)
        }
        "ellipse" => {
            let (rx, ry) = (coord(el, "rx"), coord(el, "ry"));
            if rx <= 0.0 || ry <= 0.0 {
                return;
            }
            let e = Ellipse::new((coord(el, "cx"), coord(el, "cy")), (rx, ry), 0.0);
            (e.to_path(PATH_TOLERANCE), true)
        }
        "line" => {
            let l = Line::new(
                (coord(el, "x1"), coord(el, "y1")),
                (coord(el, "x2"), coord(el, "y2")),
            );
            (l.to_path(PATH_TOLERANCE), true)
        }
        "polyline" | "polygon" => {
            let pts = parse_numbers(el.get("points").as_deref().unwrap_or(""));
            let mut path = BezPath::new();
            for (i, xy) in pts.chunks_exact(2).enumerate() {
                if i == 0 {
                    path.move_to((xy[0], xy[1]));
                } else {
                    path.line_to((xy[0], xy[1]));
                }
            }
            if path.elements().is_empty() {
                return;
            }
            (path, true)
        }
        "path" => {
            let d = el.get("d").unwrap_or_default();
            if d.trim().is_empty() {
                return;
            }
            match BezPath::from_svg(&d) {
                Ok(p) => (p, true),
                Err(e) => {
                    warnings.push(format!(
                        "<path{}>: unparsable path data: {e}",
                        el.get("id").map(|id| format!(" id=\"{id}\"")).unwrap_or_default()
                    ));
                    return;
                }
            }
        }
        "text" => match text_box(el, &ctx) {
            Some(r) => (r.to_path(PATH_TOLERANCE), false),
            None => return,
        },
        _ => return,
    };

    if !ctx.visible {
        return;
    }
    let mut path = shape;
    path.apply_affine(ctx.ctm);
    let mut bbox = path.bounding_box();
    if strokable && ctx.stroke && ctx.stroke_width > 0.0 {
        let scale = ctx.ctm.determinant().abs().sqrt();
        let half = ctx.stroke_width * scale / 2.0;
        bbox = bbox.inflate(half, half);
    }
    *acc = Some(match acc {
        Some(r) => r.union(bbox),
        None => bbox,
    });
}

fn text_box(el: &Element, ctx: &Context) -> Option<Rect> {
    let mut content = String::new();
    collect_text(el, &mut content);
    let chars = content.trim().chars().count();
    if chars == 0 {
        return None;
    }
    let x = parse_numbers(el.get("x").as_deref().unwrap_or("")).first().copied().unwrap_or(0.0);
    let y = parse_numbers(el.get("y").as_deref().unwrap_or("")).first().copied().unwrap_or(0.0);
    let fs = ctx.font_size;
    Some(Rect::new(x, y - fs, x + chars as f64 * GLYPH_ADVANCE * fs, y))
}

fn collect_text(el: &Element, out: &mut String) {
    out.push_str(&el.text_content());
    for child in &el.children {
        if let Node::Element(e) = child {
            collect_text(e, out);
        }
    }
}

/// What [`grow_canvas`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasChange {
    Unchanged,
    Grown { width: f64, height: f64 },
}

/// Grow `root`'s width/height (and viewBox, when it has or needs one) so
/// that `bounds` fits. Never shrinks. Only the axes that grow are rewritten;
/// the other axis keeps its attribute text exactly. When the content already
/// fits, the root is left untouched.
pub fn grow_canvas(root: &mut Element, bounds: Rect) -> CanvasChange {
    let width_attr = root.get("width").map(|v| v.into_owned());
    let height_attr = root.get("height").map(|v| v.into_owned());
    let width = width_attr.as_deref().and_then(split_length).filter(|l| l.to_user().is_some());
    let height = height_attr.as_deref().and_then(split_length).filter(|l| l.to_user().is_some());

    let vb_attr = root.get("viewBox").map(|v| v.into_owned());
    let vb_tokens: Vec<&str> = vb_attr
        .as_deref()
        .map(|v| RE_NUMBER.find_iter(v).map(|m| m.as_str()).collect())
        .unwrap_or_default();
    let view_box = Some(vb_tokens.iter().filter_map(|t| t.parse::<f64>().ok()).collect::<Vec<_>>())
        .filter(|n| n.len() == 4 && vb_tokens.len() == 4 && n[2] > 0.0 && n[3] > 0.0)
        .map(|n| Rect::new(n[0], n[1], n[0] + n[2], n[1] + n[3]));

    if let Some(vb) = view_box {
        let gx = grow_axis(vb.x0, vb.x1, bounds.x0, bounds.x1);
        let gy = grow_axis(vb.y0, vb.y1, bounds.y0, bounds.y1);
        if gx.is_none() && gy.is_none() && width.is_some() && height.is_some() {
            return CanvasChange::Unchanged;
        }
        if gx.is_some() || gy.is_some() {
            let mut parts: Vec<String> = vb_tokens.iter().map(|t| t.to_string()).collect();
            if let Some((min, size)) = gx {
                parts[0] = format_number(min);
                parts[2] = format_number(size);
            }
            if let Some((min, size)) = gy {
                parts[1] = format_number(min);
                parts[3] = format_number(size);
            }
            root.set("viewBox", &parts.join(" "));
        }
        // Viewport scale per user unit stays the same on each axis.
        scale_extent(root, "width", width, gx, vb.width());
        scale_extent(root, "height", height, gy, vb.height());
        return grown(root);
    }

    // No viewBox: user space is the viewport, anchored at the origin.
    let cur_w = width.and_then(|l| l.to_user());
    let cur_h = height.and_then(|l| l.to_user());
    let canvas = Rect::new(
        0.0,
        0.0,
        cur_w.unwrap_or_else(|| bounds.x1.max(0.0)),
        cur_h.unwrap_or_else(|| bounds.y1.max(0.0)),
    );
    let union = canvas.union(bounds);
    if contains(canvas, union) && cur_w.is_some() && cur_h.is_some() {
        return CanvasChange::Unchanged;
    }

    if union.x0 < -EPSILON || union.y0 < -EPSILON {
        let gx = grow_axis(canvas.x0, canvas.x1, bounds.x0, bounds.x1);
        let gy = grow_axis(canvas.y0, canvas.y1, bounds.y0, bounds.y1);
        let axis = |g: Option<(f64, f64)>, extent: f64| match g {
            Some((min, size)) => (format_number(min), format_number(size)),
            None => ("0".to_string(), format_exact(extent)),
        };
        let (mx, sx) = axis(gx, canvas.width());
        let (my, sy) = axis(gy, canvas.height());
        root.set("viewBox", &format!("{mx} {my} {sx} {sy}"));
        if gx.is_some() || cur_w.is_none() {
            write_extent(root, "width", width, gx.map_or(canvas.width(), |g| g.1));
        }
        if gy.is_some() || cur_h.is_none() {
            write_extent(root, "height", height, gy.map_or(canvas.height(), |g| g.1));
        }
    } else {
        if cur_w.is_none() || union.x1 > canvas.x1 + EPSILON {
            write_extent(root, "width", width, union.x1);
        }
        if cur_h.is_none() || union.y1 > canvas.y1 + EPSILON {
            write_extent(root, "height", height, union.y1);
        }
    }
    grown(root)
}

/// New `(min, size)` for one axis of `lo..hi` so that it covers
/// `b_lo..b_hi`, or `None` when it already does. Rounded outwards.
fn grow_axis(lo: f64, hi: f64, b_lo: f64, b_hi: f64) -> Option<(f64, f64)> {
    if b_lo >= lo - EPSILON && b_hi <= hi + EPSILON {
        return None;
    }
    let min = floor3(lo.min(b_lo));
    Some((min, ceil3(hi.max(b_hi) - min)))
}

/// Rescale a declared extent after its viewBox axis grew to `grow`.
fn scale_extent(
    root: &mut Element,
    attr: &str,
    declared: Option<Length<'_>>,
    grow: Option<(f64, f64)>,
    vb_size: f64,
) {
    match (declared, grow) {
        (Some(_), None) => {}
        (Some(l), Some((_, size))) => root.set(attr, &with_unit(ceil3(l.value * size / vb_size), l.unit)),
        (None, g) => root.set(attr, &format_number(ceil3(g.map_or(vb_size, |(_, size)| size)))),
    }
}

/// Write a user-unit extent back in the unit it was declared with.
fn write_extent(root: &mut Element, attr: &str, declared: Option<Length<'_>>, user: f64) {
    match declared {
        Some(l) => {
            let factor = l.unit_factor().unwrap_or(1.0);
            root.set(attr, &with_unit(ceil3(user / factor), l.unit));
        }
        None => root.set(attr, &format_number(ceil3(user))),
    }
}

/// Round up to three decimals, ignoring float noise below that.
fn ceil3(v: f64) -> f64 {
    (v * 1000.0 - EPSILON).ceil() / 1000.0
}

/// Round down to three decimals, ignoring float noise below that.
fn floor3(v: f64) -> f64 {
    (v * 1000.0 + EPSILON).floor() / 1000.0
}

/// Full-precision number text for values that must not be rounded.
fn format_exact(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else {
        v.to_string()
    }
}

fn grown(root: &Element) -> CanvasChange {
    let user = |name: &str| root.get(name).as_deref().and_then(parse_length).unwrap_or(0.0);
    CanvasChange::Grown {
        width: user("width"),
        height: user("height"),
    }
}

fn contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 - EPSILON
        && inner.y0 >= outer.y0 - EPSILON
        && inner.x1 <= outer.x1 + EPSILON
        && inner.y1 <= outer.y1 + EPSILON
}

fn with_unit(v: f64, unit: &str) -> String {
    format!("{}{unit}", format_number(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::markup::parse;
    use kurbo::Point;

    fn bounds(svg: &str) -> (Option<Rect>, Vec<String>) {
        let root = parse(svg).unwrap();
        let mut warnings = Vec::new();
        (content_bounds(&root, &mut warnings), warnings)
    }

    #[test]
    fn lengths() {
        assert_eq!(parse_length("100"), Some(100.0));
        assert_eq!(parse_length(" 12px "), Some(12.0));
        assert_eq!(parse_length("1in"), Some(96.0));
        assert_eq!(parse_length("100%"), None);
        assert_eq!(parse_length("wide"), None);
        assert!((parse_length("25.4mm").unwrap() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333");
        assert_eq!(format_number(-0.0001), "0");
    }

    #[test]
    fn transform_lists_compose_left_to_right() {
        let a = parse_transform("translate(10,0) scale(2)").unwrap();
        assert_eq!(a * Point::new(1.0, 1.0), Point::new(12.0, 2.0));
        let r = parse_transform("rotate(90 5 5)").unwrap();
        let p = r * Point::new(10.0, 5.0);
        assert!((p.x - 5.0).abs() < 1e-9 && (p.y - 10.0).abs() < 1e-9);
        assert!(parse_transform("wobble(3)").is_err());
        assert!(parse_transform("translate(1) junk").is_err());
    }

    #[test]
    fn rect_and_path_bounds() {
        let (b, w) = bounds(
            r#"<svg><rect x="10" y="10" width="20" height="5"/><path d="M0 0 L5 40"/></svg>"#,
        );
        assert!(w.is_empty());
        assert_eq!(b, Some(Rect::new(0.0, 0.0, 30.0, 40.0)));
    }

    #[test]
    fn stroke_inflates_only_when_painted() {
        let (b, _) = bounds(r#"<svg><line x1="0" y1="10" x2="10" y2="10" stroke-width="4"/></svg>"#);
        assert_eq!(b, Some(Rect::new(0.0, 10.0, 10.0, 10.0)));
        let (b, _) = bounds(
            r#"<svg><line x1="0" y1="10" x2="10" y2="10" style="stroke:#000;stroke-width:4"/></svg>"#,
        );
        assert_eq!(b, Some(Rect::new(-2.0, 8.0, 12.0, 12.0)));
    }

    #[test]
    fn group_transform_applies_to_children() {
        let (b, _) = bounds(
            r#"<svg><g transform="translate(100,50)"><rect width="10" height="10"/></g></svg>"#,
        );
        assert_eq!(b, Some(Rect::new(100.0, 50.0, 110.0, 60.0)));
    }

    #[test]
    fn hidden_and_defs_are_skipped() {
        let (b, _) = bounds(
            r#"<svg><defs><rect width="500" height="500"/></defs><rect width="500" height="500" display="none"/><g style="visibility:hidden"><rect width="500" height="500"/></g><rect width="1" height="1"/></svg>"#,
        );
        assert_eq!(b, Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn bad_path_data_is_a_warning() {
        let (b, w) = bounds(r#"<svg><path id="p1" d="M 0 0 Q"/><rect width="2" height="2"/></svg>"#);
        assert_eq!(b, Some(Rect::new(0.0, 0.0, 2.0, 2.0)));
        assert_eq!(w.len(), 1);
        assert!(w[0].contains("p1"));
    }

    #[test]
    fn grows_height_only() {
        let mut root = parse(r#"<svg width="100" height="100"/>"#).unwrap();
        let change = grow_canvas(&mut root, Rect::new(0.0, 0.0, 100.0, 150.0));
        assert_eq!(
            change,
            CanvasChange::Grown {
                width: 100.0,
                height: 150.0
            }
        );
        assert_eq!(root.to_xml(), r#"<svg width="100" height="150"/>"#);
    }

    #[test]
    fn content_inside_leaves_canvas_untouched() {
        let src = r#"<svg width="100.0" height="100" viewBox="0 0 100 100"/>"#;
        let mut root = parse(src).unwrap();
        let change = grow_canvas(&mut root, Rect::new(5.0, 5.0, 95.0, 95.0));
        assert_eq!(change, CanvasChange::Unchanged);
        assert_eq!(root.to_xml(), src);
    }

    #[test]
    fn negative_content_introduces_view_box() {
        let mut root = parse(r#"<svg width="100" height="100"/>"#).unwrap();
        grow_canvas(&mut root, Rect::new(-10.0, 0.0, 50.0, 50.0));
        assert_eq!(root.get("viewBox").as_deref(), Some("-10 0 110 100"));
        assert_eq!(root.get("width").as_deref(), Some("110"));
        assert_eq!(root.get("height").as_deref(), Some("100"));
    }

    #[test]
    fn view_box_scale_is_preserved() {
        let mut root = parse(r#"<svg width="200mm" height="100mm" viewBox="0 0 100 50"/>"#).unwrap();
        grow_canvas(&mut root, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(root.get("viewBox").as_deref(), Some("0 0 100 100"));
        assert_eq!(root.get("width").as_deref(), Some("200mm"));
        assert_eq!(root.get("height").as_deref(), Some("200mm"));
    }

    #[test]
    fn unknown_size_adopts_bounds() {
        let mut root = parse(r#"<svg width="100%" height="100%"/>"#).unwrap();
        let change = grow_canvas(&mut root, Rect::new(10.0, 10.0, 300.0, 200.0));
        assert_eq!(
            change,
            CanvasChange::Grown {
                width: 300.0,
                height: 200.0
            }
        );
    }

    #[test]
    fn untouched_axis_keeps_its_precision() {
        let mut root =
            parse(r#"<svg width="100.12345" height="100" viewBox="0 0 100.12345 100"/>"#).unwrap();
        grow_canvas(&mut root, Rect::new(0.0, 0.0, 50.0, 150.0004));
        assert_eq!(root.get("width").as_deref(), Some("100.12345"));
        assert_eq!(root.get("viewBox").as_deref(), Some("0 0 100.12345 150.001"));
        assert_eq!(root.get("height").as_deref(), Some("150.001"));
    }

    #[test]
    fn grown_extent_rounds_up_past_content() {
        let mut root = parse(r#"<svg width="100" height="100"/>"#).unwrap();
        let change = grow_canvas(&mut root, Rect::new(0.0, 0.0, 100.0, 150.0004));
        assert_eq!(root.get("width").as_deref(), Some("100"));
        assert_eq!(root.get("height").as_deref(), Some("150.001"));
        match change {
            CanvasChange::Grown { height, .. } => assert!(height >= 150.0004),
            other => panic!("expected growth, got {other:?}"),
        }
    }

    #[test]
    fn negative_growth_rounds_outwards() {
        let mut root = parse(r#"<svg width="100" height="100"/>"#).unwrap();
        grow_canvas(&mut root, Rect::new(-10.0004, 0.0, 50.0, 50.0));
        assert_eq!(root.get("viewBox").as_deref(), Some("-10.001 0 110.001 100"));
        assert_eq!(root.get("height").as_deref(), Some("100"));
    }
}
