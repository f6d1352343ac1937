//! Manifest parsing: turn the container's XML manifest into one standalone
//! SVG document per `<svg:page>`.
//!
//! The manifest itself must be well-formed; if it is not, nothing can be
//! converted and the error is fatal. Each page after that is an independent
//! unit: a page whose content is held in a missing entry or in unparsable
//! embedded markup is reported as skipped and its siblings carry on.

use super::archive::AssetSource;
use super::geometry::parse_length;
use super::markup::{self, Element, Node};
use crate::error::{ConvertError, EntryError, PageError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Size used for a page that declares none.
const DEFAULT_EXTENT: &str = "100%";

/// One `<image>` reference found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub href: String,
    pub element_id: Option<String>,
}

/// A page ready for the transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDescriptor {
    /// 0-based manifest position.
    pub index: usize,
    /// The page as a standalone `<svg>` root.
    pub document: Element,
    /// Width as written, if declared.
    pub declared_width: Option<String>,
    /// Height as written, if declared.
    pub declared_height: Option<String>,
    /// Declared width in user units; `None` when absent, relative or malformed.
    pub width: Option<f64>,
    /// Declared height in user units; `None` when absent, relative or malformed.
    pub height: Option<f64>,
    /// `<image>` references in document order.
    pub image_refs: Vec<ImageReference>,
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Page(PageDescriptor),
    Skipped(PageError),
}

impl ParseResult {
    pub fn index(&self) -> usize {
        match self {
            ParseResult::Page(p) => p.index,
            ParseResult::Skipped(e) => e.page(),
        }
    }
}

/// Prefix → namespace URI; the default namespace has key `None`.
type NsScope = BTreeMap<Option<String>, String>;

fn extend_scope(parent: &NsScope, el: &Element) -> NsScope {
    let decls = el.namespace_decls();
    if decls.is_empty() {
        return parent.clone();
    }
    let mut scope = parent.clone();
    scope.extend(decls);
    scope
}

fn namespace_of<'a>(el: &Element, scope: &'a NsScope) -> Option<&'a str> {
    scope
        .get(&el.prefix().map(str::to_string))
        .map(String::as_str)
}

/// Parse manifest `entry` (its bytes already read) into per-page results.
///
/// `assets` resolves pages that hold their content in a separate entry.
pub fn parse_manifest(
    entry: &str,
    bytes: &[u8],
    assets: &dyn AssetSource,
) -> Result<Vec<ParseResult>, ConvertError> {
    let malformed = |detail: String| ConvertError::MalformedManifest {
        entry: entry.to_string(),
        detail,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    let text = text.trim_start_matches('\u{feff}');
    let root = markup::parse(text).map_err(|e| malformed(e.to_string()))?;

    let mut found = Vec::new();
    collect_pages(&root, &NsScope::new(), &mut found);
    if found.is_empty() {
        return Err(ConvertError::NoPages {
            entry: entry.to_string(),
        });
    }
    debug!("Manifest '{}' declares {} pages", entry, found.len());

    Ok(found
        .into_iter()
        .enumerate()
        .map(|(index, (page, scope))| match build_page(index, page, &scope, assets) {
            Ok(p) => ParseResult::Page(p),
            Err(e) => {
                warn!("{}", e);
                ParseResult::Skipped(e)
            }
        })
        .collect())
}

fn collect_pages<'a>(el: &'a Element, parent: &NsScope, out: &mut Vec<(&'a Element, NsScope)>) {
    let scope = extend_scope(parent, el);
    if el.local_name() == "page" && namespace_of(el, &scope) == Some(SVG_NS) {
        out.push((el, scope));
        return;
    }
    for child in el.elements() {
        collect_pages(child, &scope, out);
    }
}

fn build_page(
    index: usize,
    page: &Element,
    scope: &NsScope,
    assets: &dyn AssetSource,
) -> Result<PageDescriptor, PageError> {
    let has_elements = page.elements().next().is_some();
    let reference = page.get_local("href").or_else(|| page.get_local("src"));

    // Where the drawing lives: inline children, another entry, or escaped text.
    // `unwrap` is true when `source` is a root whose children are the content.
    let (source, source_scope, unwrap) = if has_elements {
        (page.clone(), scope.clone(), true)
    } else if let Some(name) = reference {
        let name = normalize_entry_name(&name);
        let bytes = assets.read_entry(&name).map_err(|e| match e {
            EntryError::Missing { name } => PageError::MissingEntry { page: index, name },
            EntryError::Unreadable { name, detail } => PageError::MalformedXml {
                page: index,
                detail: format!("{name}: {detail}"),
            },
        })?;
        let doc = parse_fragment(index, &String::from_utf8_lossy(&bytes))?;
        let doc_scope = extend_scope(&NsScope::new(), &doc);
        let unwrap = doc.local_name() == "svg";
        (doc, doc_scope, unwrap)
    } else {
        let text = page.text_content();
        if text.trim().is_empty() {
            (page.clone(), scope.clone(), true)
        } else {
            let doc = parse_fragment(index, &text)?;
            let doc_scope = extend_scope(scope, &doc);
            let unwrap = doc.local_name() == "svg";
            (doc, doc_scope, unwrap)
        }
    };

    let inherit = |name: &str| {
        page.get(name)
            .or_else(|| (!has_elements).then(|| source.get(name)).flatten())
            .map(|v| v.into_owned())
    };
    let declared_width = inherit("width");
    let declared_height = inherit("height");
    let view_box = inherit("viewBox");

    let mut document = Element::new("svg");
    document.set("xmlns", SVG_NS);
    document.set("xmlns:xlink", XLINK_NS);
    for (prefix, uri) in scope.iter().chain(source_scope.iter()) {
        if let Some(p) = prefix {
            if p != "xlink" && uri != SVG_NS && document.get(&format!("xmlns:{p}")).is_none() {
                document.set(&format!("xmlns:{p}"), uri);
            }
        }
    }
    document.set("version", "1.1");
    document.set("width", declared_width.as_deref().unwrap_or(DEFAULT_EXTENT));
    document.set("height", declared_height.as_deref().unwrap_or(DEFAULT_EXTENT));
    if let Some(vb) = &view_box {
        document.set("viewBox", vb);
    }

    if unwrap {
        for node in &source.children {
            document.children.push(adopt(node, &source_scope, SVG_NS));
        }
    } else {
        // A single non-svg element embedded as text becomes the page content.
        document
            .children
            .push(adopt(&Node::Element(source.clone()), &source_scope, SVG_NS));
    }
    // Leading/trailing whitespace from the page element is not content.
    trim_whitespace(&mut document);

    let image_refs = collect_image_refs(&document);
    let width = declared_width.as_deref().and_then(parse_length);
    let height = declared_height.as_deref().and_then(parse_length);

    debug!(
        "Page {}: {} x {}, {} image references",
        index,
        declared_width.as_deref().unwrap_or(DEFAULT_EXTENT),
        declared_height.as_deref().unwrap_or(DEFAULT_EXTENT),
        image_refs.len()
    );

    Ok(PageDescriptor {
        index,
        document,
        declared_width,
        declared_height,
        width,
        height,
        image_refs,
    })
}

fn parse_fragment(index: usize, text: &str) -> Result<Element, PageError> {
    markup::parse(text.trim_start_matches('\u{feff}')).map_err(|e| PageError::MalformedXml {
        page: index,
        detail: e.to_string(),
    })
}

/// Copy `node` into the page document, dropping prefixes bound to the SVG
/// namespace. `out_default` is the default namespace in effect at the
/// insertion point of the output tree.
fn adopt(node: &Node, parent: &NsScope, out_default: &str) -> Node {
    let Node::Element(el) = node else {
        return node.clone();
    };
    let scope = extend_scope(parent, el);
    let ns = namespace_of(el, &scope).unwrap_or("");

    let mut out = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: Vec::new(),
    };
    if el.prefix().is_some() && ns == SVG_NS {
        out.name = el.local_name().to_string();
    }
    let mut default = out_default.to_string();
    if out.prefix().is_none() && !ns.is_empty() {
        // Unprefixed content in no namespace at all is treated as SVG.
        if ns != SVG_NS && ns != out_default && out.get("xmlns").is_none() {
            out.set("xmlns", ns);
        }
        default = ns.to_string();
    } else if let Some(d) = out.get("xmlns") {
        default = d.into_owned();
    }

    out.children = el
        .children
        .iter()
        .map(|c| adopt(c, &scope, &default))
        .collect();
    Node::Element(out)
}

fn trim_whitespace(el: &mut Element) {
    while matches!(el.children.first(), Some(Node::Text(t)) if t.trim().is_empty()) {
        el.children.remove(0);
    }
    while matches!(el.children.last(), Some(Node::Text(t)) if t.trim().is_empty()) {
        el.children.pop();
    }
}

/// Every `<image>` href in document order.
pub fn collect_image_refs(root: &Element) -> Vec<ImageReference> {
    let mut refs = Vec::new();
    root.walk(&mut |el| {
        if el.local_name() == "image" {
            if let Some(href) = el.get_local("href") {
                refs.push(ImageReference {
                    href: href.into_owned(),
                    element_id: el.get("id").map(|v| v.into_owned()),
                });
            }
        }
    });
    refs
}

/// Archive-relative form of a reference: no leading `./` or `/`.
pub fn normalize_entry_name(href: &str) -> String {
    let mut name = href.trim();
    loop {
        if let Some(rest) = name.strip_prefix("./") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('/') {
            name = rest;
        } else {
            break;
        }
    }
    name.to_string()
}
