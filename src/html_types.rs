//! Tolerant HTML tree shared by the repair, validation and extraction stages.
//!
//! Serialization is canonical: attributes are always double-quoted, void
//! elements are self-closed and text is escaped, so parsing the output of
//! `to_string()` yields the same tree again.

use nom_supreme::final_parser::Location;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::document::{
    DETAIL_LIST_CLASS, ITEM_NUMBER_CLASS, NUMBERED_ITEM_CLASS, ROOT_CLASS, SECTION_TITLE_CLASS,
};

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

pub const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

pub const INLINE_ELEMENTS: &[&str] = &[
    "span", "strong", "b", "em", "i", "a", "u", "code", "small", "mark", "sup", "sub",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Whitespace-only (or empty) text node.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text(t) => t.clone(),
        }
    }
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.set_attr("class", class);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map_or(false, |c| c.split_whitespace().any(|c| c == class))
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_inline(&self) -> bool {
        INLINE_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_heading(&self) -> bool {
        is_heading_name(&self.name)
    }

    /// Any heading level, or anything the model tagged with the section-title class.
    pub fn is_section_title(&self) -> bool {
        self.is_heading() || self.has_class(SECTION_TITLE_CLASS)
    }

    pub fn is_numbered_item(&self) -> bool {
        self.has_class(NUMBERED_ITEM_CLASS) && !self.is_list()
    }

    pub fn is_item_number(&self) -> bool {
        self.has_class(ITEM_NUMBER_CLASS)
    }

    pub fn is_list(&self) -> bool {
        self.name == "ul" || self.name == "ol"
    }

    pub fn is_detail_list(&self) -> bool {
        self.name == "ul" && self.has_class(DETAIL_LIST_CLASS)
    }

    pub fn is_root_container(&self) -> bool {
        self.has_class(ROOT_CLASS)
    }

    /// Concatenation of every descendant text node, entities left as written.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Pre-order search over descendants (not including `self`).
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(el) = child {
                if pred(el) {
                    return Some(el);
                }
                if let Some(found) = el.find(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }
}

pub fn is_heading_name(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape `<`, `>` and any `&` that does not already start an entity.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !ENTITY_RE.is_match(&raw[i..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (k, v) in &self.attrs {
            write!(f, " {}=\"{}\"", k, escape_attr(v))?;
        }
        if self.is_void() {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(el) => write!(f, "{}", el),
            Node::Text(text) => f.write_str(&escape_text(text)),
        }
    }
}

/// Problems the tolerant parser recovered from. None of them stop parsing.
#[derive(Debug, Clone)]
pub enum HtmlError {
    UnterminatedTag { fragment: String, location: Location },
    StrayCloser { name: String, location: Location },
    UnclosedAtEof { name: String },
    /// Nesting reached the parser's depth limit; deeper opens close their parent first.
    TooDeep { name: String, location: Location },
    NotWellFormed(String),
}

impl fmt::Display for HtmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlError::UnterminatedTag { fragment, location } => write!(
                f,
                "unterminated tag {:?} at line {}, column {}",
                fragment, location.line, location.column
            ),
            HtmlError::StrayCloser { name, location } => write!(
                f,
                "closing </{}> with nothing open at line {}, column {}",
                name, location.line, location.column
            ),
            HtmlError::UnclosedAtEof { name } => write!(f, "<{}> still open at end of input", name),
            HtmlError::TooDeep { name, location } => write!(
                f,
                "<{}> nested too deep at line {}, column {}",
                name, location.line, location.column
            ),
            HtmlError::NotWellFormed(msg) => write!(f, "not well-formed: {}", msg),
        }
    }
}

impl std::error::Error for HtmlError {}
