//! Fragment extractor: salvages section titles, numbered items and their
//! detail bullets from a response too damaged to pass validation.

use log::debug;
use std::ptr;
use strsim::normalized_damerau_levenshtein;

use crate::config::RepairConfig;
use crate::document::{Mode, KEY_INSIGHTS, RECOMMENDATIONS, RESPONSE, SUMMARY};
use crate::html_types::{squash_whitespace, Element, Node};
use crate::tag_stack_parser;

/// Longest `Category` accepted when an item has no bold label and is split at its colon.
const MAX_COLON_CATEGORY: usize = 60;

const SKIPPED: &[&str] = &["script", "style", "head", "title", "template"];

#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Number the source wrote, if any. Never trusted for output.
    pub number: Option<usize>,
    pub category: String,
    pub description: String,
    pub details: Vec<String>,
}

/// Content between one header and the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// `None` for content before the first header.
    pub heading: Option<String>,
    pub canonical: Option<&'static str>,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub scopes: Vec<Scope>,
}

impl Scope {
    fn new(heading: Option<String>, canonical: Option<&'static str>) -> Self {
        Scope {
            heading,
            canonical,
            items: Vec::new(),
        }
    }
}

impl Extraction {
    /// Canonical titles in first-seen order, without duplicates.
    pub fn titles(&self) -> Vec<&'static str> {
        let mut titles: Vec<&'static str> = Vec::new();
        for title in self.scopes.iter().filter_map(|s| s.canonical) {
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        titles
    }

    pub fn item_count(&self) -> usize {
        self.scopes.iter().map(|s| s.items.len()).sum()
    }

    pub fn preamble(&self) -> Option<&Scope> {
        self.scopes.first().filter(|s| s.heading.is_none())
    }

    /// Items of every scope mapped to `title`, in document order.
    pub fn items_for(&self, title: &str) -> impl Iterator<Item = &RawItem> + '_ {
        let title = title.to_string();
        self.scopes
            .iter()
            .filter(move |s| s.canonical == Some(title.as_str()))
            .flat_map(|s| s.items.iter())
    }
}

/// Map a header as the model wrote it to one of the canonical titles.
pub fn canonical_title(text: &str, config: &RepairConfig) -> Option<&'static str> {
    let cleaned = squash_whitespace(text);
    let lower = cleaned.trim_end_matches(':').trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let all = Mode::ALL.iter().flat_map(|m| m.titles().iter().copied());
    if let Some(title) = all.clone().find(|t| t.to_lowercase() == lower) {
        return Some(title);
    }

    if lower.contains("recommend") {
        return Some(RECOMMENDATIONS);
    }
    if lower.contains("insight") {
        return Some(KEY_INSIGHTS);
    }
    if lower.contains("your question") {
        return Some(RESPONSE);
    }
    if lower.contains("summary") {
        return Some(SUMMARY);
    }

    all.map(|t| (t, normalized_damerau_levenshtein(&lower, &t.to_lowercase())))
        .filter(|(_, score)| *score >= config.title_similarity)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// Drop the `1.` / `1)` marker from the start of a marker span's text.
fn strip_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    let rest = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .unwrap_or(rest)
}

/// Text of an item, minus its marker digits and its bold label.
fn item_text(el: &Element, label: Option<&Element>, in_marker: bool, out: &mut String) {
    for (idx, child) in el.children.iter().enumerate() {
        match child {
            Node::Text(t) if in_marker && idx == 0 => out.push_str(strip_marker(t)),
            Node::Text(t) => out.push_str(t),
            Node::Element(inner) if label.map_or(false, |l| ptr::eq(l, inner)) => {
                out.push(' ')
            }
            Node::Element(inner) => {
                item_text(inner, label, inner.is_item_number(), out);
            }
        }
    }
}

fn leading_number(el: &Element) -> Option<usize> {
    let span = el.find(&|e| e.is_item_number())?;
    let text = span.text_content();
    let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Number, bold category and description of a numbered-item block.
pub fn parse_item(el: &Element) -> Option<RawItem> {
    let label = el.find(&|e| e.name == "strong" || e.name == "b");
    let mut text = String::new();
    item_text(el, label, false, &mut text);
    let rest = squash_whitespace(&text);

    let (category, description) = match label {
        Some(label) => {
            let description = rest.strip_prefix(':').unwrap_or(&rest).trim().to_string();
            (squash_whitespace(&label.text_content()), description)
        }
        None => match rest.split_once(':') {
            Some((cat, desc)) if !cat.trim().is_empty() && cat.len() <= MAX_COLON_CATEGORY => {
                (cat.trim().to_string(), desc.trim().to_string())
            }
            _ => (String::new(), rest),
        },
    };

    if category.is_empty() && description.is_empty() {
        return None;
    }
    Some(RawItem {
        number: leading_number(el),
        category,
        description,
        details: Vec::new(),
    })
}

struct Walker<'c> {
    config: &'c RepairConfig,
    scopes: Vec<Scope>,
    dropped_bullets: usize,
}

impl<'c> Walker<'c> {
    fn current(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new(None, None));
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn visit(&mut self, nodes: &[Node]) {
        for node in nodes {
            let Node::Element(el) = node else {
                continue;
            };
            if SKIPPED.contains(&el.name.as_str()) {
                continue;
            }
            if el.is_section_title() {
                let heading = squash_whitespace(&el.text_content());
                let canonical = canonical_title(&heading, self.config);
                self.scopes.push(Scope::new(Some(heading), canonical));
            } else if el.is_numbered_item() {
                if let Some(item) = parse_item(el) {
                    self.current().items.push(item);
                }
            } else if el.name == "li" {
                self.bullet(el);
            } else {
                self.visit(&el.children);
            }
        }
    }

    fn bullet(&mut self, li: &Element) {
        let text = squash_whitespace(&li.text_content());
        if text.is_empty() || text == self.config.repair_placeholder {
            return;
        }
        match self.current().items.last_mut() {
            Some(item) => item.details.push(text),
            None => self.dropped_bullets += 1,
        }
    }
}

/// Walk the tolerant tree of `normalized` in document order.
pub fn extract(normalized: &str, config: &RepairConfig) -> Extraction {
    let outcome = tag_stack_parser::parse(normalized);
    let mut walker = Walker {
        config,
        scopes: vec![Scope::new(None, None)],
        dropped_bullets: 0,
    };
    walker.visit(&outcome.nodes);

    let extraction = Extraction {
        scopes: walker.scopes,
    };
    debug!(
        "[extract] {} scope(s), {} item(s), {} bullet(s) with no item",
        extraction.scopes.len(),
        extraction.item_count(),
        walker.dropped_bullets
    );
    extraction
}
