//! A small mutable XML element tree on top of `quick-xml`.
//!
//! The transforms need to delete elements, rewrite attributes and then write
//! the document back out. Text and attribute values are kept in their raw,
//! still-escaped form, so anything a transform does not touch is written back
//! exactly as it was read; values are only unescaped on [`Element::get`] and
//! escaped again on [`Element::set`].

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use thiserror::Error;

/// The document could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct MarkupError {
    pub position: u64,
    pub message: String,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Raw (escaped) character data.
    Text(String),
    CData(String),
    Comment(String),
}

/// One attribute with its raw (escaped) value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub raw: String,
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written, e.g. `svg:path`.
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

/// Strip the prefix from a qualified name.
pub fn local_part(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix, if the name has one.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    /// Unescaped value of the attribute named exactly `name`.
    pub fn get(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| unescape_lossy(&a.raw))
    }

    /// Unescaped value of the first attribute whose local name is `local`
    /// (`href` matches both `href` and `xlink:href`).
    pub fn get_local(&self, local: &str) -> Option<Cow<'_, str>> {
        self.attrs
            .iter()
            .find(|a| local_part(&a.name) == local && !a.name.starts_with("xmlns"))
            .map(|a| unescape_lossy(&a.raw))
    }

    /// Set attribute `name` (escaping `value`), replacing it in place if present.
    pub fn set(&mut self, name: &str, value: &str) {
        let raw = escape(value).into_owned();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(a) => a.raw = raw,
            None => self.attrs.push(Attr {
                name: name.to_string(),
                raw,
            }),
        }
    }

    /// Overwrite the first attribute whose local name is `local`.
    ///
    /// Returns false when there is no such attribute.
    pub fn set_local(&mut self, local: &str, value: &str) -> bool {
        match self
            .attrs
            .iter_mut()
            .find(|a| local_part(&a.name) == local && !a.name.starts_with("xmlns"))
        {
            Some(a) => {
                a.raw = escape(value).into_owned();
                true
            }
            None => false,
        }
    }

    /// Remove attribute `name`; returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| a.name != name);
        before != self.attrs.len()
    }

    /// Namespace declarations on this element as `(prefix, uri)`;
    /// the default namespace has prefix `None`.
    pub fn namespace_decls(&self) -> Vec<(Option<String>, String)> {
        self.attrs
            .iter()
            .filter_map(|a| {
                if a.name == "xmlns" {
                    Some((None, unescape_lossy(&a.raw).into_owned()))
                } else {
                    a.name
                        .strip_prefix("xmlns:")
                        .map(|p| (Some(p.to_string()), unescape_lossy(&a.raw).into_owned()))
                }
            })
            .collect()
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Visit this element and every descendant, pre-order.
    pub fn walk(&self, f: &mut dyn FnMut(&Element)) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    /// Visit this element and every descendant mutably, pre-order.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }

    /// Remove every descendant for which `pred` holds (not descending into
    /// removed subtrees) and return the removed elements in document order.
    pub fn remove_where(&mut self, pred: &mut dyn FnMut(&Element) -> bool) -> Vec<Element> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in std::mem::take(&mut self.children) {
            match node {
                Node::Element(e) if pred(&e) => removed.push(e),
                Node::Element(mut e) => {
                    removed.extend(e.remove_where(pred));
                    kept.push(Node::Element(e));
                }
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    /// Character content of the direct children: text unescaped, CDATA verbatim.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => out.push_str(&unescape_lossy(raw)),
                Node::CData(s) => out.push_str(s),
                _ => {}
            }
        }
        out
    }

    /// Serialise this element and its subtree.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for a in &self.attrs {
            let quote = if a.raw.contains('"') { '\'' } else { '"' };
            out.push(' ');
            out.push_str(&a.name);
            out.push('=');
            out.push(quote);
            out.push_str(&a.raw);
            out.push(quote);
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(e) => e.write_into(out),
                Node::Text(raw) => out.push_str(raw),
                Node::CData(s) => {
                    out.push_str("<![CDATA[");
                    out.push_str(s);
                    out.push_str("]]>");
                }
                Node::Comment(s) => {
                    out.push_str("<!--");
                    out.push_str(s);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Parse `text` into its root element.
///
/// The XML declaration, doctype, processing instructions and comments outside
/// the root are dropped. Unbalanced tags, multiple roots and text outside the
/// root are errors.
pub fn parse(text: &str) -> Result<Element, MarkupError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let fail = |message: String| MarkupError { position, message };

        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&reader, &e).map_err(fail)?),
            Ok(Event::Empty(e)) => {
                let el = start_element(&reader, &e).map_err(fail)?;
                attach(&mut stack, &mut root, el).map_err(fail)?;
            }
            Ok(Event::End(e)) => {
                let name = decode(&reader, e.name().as_ref()).map_err(fail)?;
                let Some(el) = stack.pop() else {
                    return Err(fail(format!("unexpected closing tag </{name}>")));
                };
                if el.name != name {
                    return Err(fail(format!(
                        "expected </{}>, found </{name}>",
                        el.name
                    )));
                }
                attach(&mut stack, &mut root, el).map_err(fail)?;
            }
            Ok(Event::Text(e)) => {
                let raw = e.decode().map_err(|err| fail(err.to_string()))?;
                push_text(&mut stack, &raw).map_err(fail)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().map_err(|err| fail(err.to_string()))?;
                push_text(&mut stack, &format!("&{name};")).map_err(fail)?;
            }
            Ok(Event::CData(e)) => {
                let s = decode(&reader, &e).map_err(fail)?;
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::CData(s));
                } else {
                    return Err(fail("CDATA outside the root element".into()));
                }
            }
            Ok(Event::Comment(e)) => {
                if let Some(top) = stack.last_mut() {
                    let s = e.decode().map_err(|err| fail(err.to_string()))?;
                    top.children.push(Node::Comment(s.into_owned()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(fail(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element <{}>", open.name),
        });
    }
    root.ok_or(MarkupError {
        position: 0,
        message: "document has no root element".into(),
    })
}

fn decode(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, String> {
    reader
        .decoder()
        .decode(raw)
        .map(Cow::into_owned)
        .map_err(|e| e.to_string())
}

fn start_element(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<Element, String> {
    let mut el = Element::new(decode(reader, e.name().as_ref())?);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        el.attrs.push(Attr {
            name: decode(reader, attr.key.as_ref())?,
            raw: decode(reader, &attr.value)?,
        });
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        Ok(())
    } else if root.is_some() {
        Err(format!("second root element <{}>", el.name))
    } else {
        *root = Some(el);
        Ok(())
    }
}

fn push_text(stack: &mut [Element], raw: &str) -> Result<(), String> {
    let Some(top) = stack.last_mut() else {
        if raw.trim().is_empty() {
            return Ok(());
        }
        return Err("text outside the root element".into());
    };
    if let Some(Node::Text(prev)) = top.children.last_mut() {
        prev.push_str(raw);
    } else {
        top.children.push(Node::Text(raw.to_string()));
    }
    Ok(())
}
