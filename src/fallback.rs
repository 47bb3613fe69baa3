use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RepairConfig;
use crate::document::{Document, Mode, SUMMARY};
use crate::html_types::{squash_whitespace, Node};
use crate::tag_stack_parser;

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^.!?]+[.!?])").unwrap());

const SKIPPED: &[&str] = &["script", "style", "head", "title", "template"];

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) if SKIPPED.contains(&el.name.as_str()) => {}
            Node::Element(el) => {
                // element boundaries separate words
                out.push(' ');
                collect_text(&el.children, out);
                out.push(' ');
            }
        }
    }
}

/// Plain text of `raw` with every tag removed and whitespace squashed.
pub fn strip_markup(raw: &str) -> String {
    let mut out = String::new();
    collect_text(&tag_stack_parser::parse(raw).nodes, &mut out);
    squash_whitespace(&out)
}

/// Text up to and including the first `.`, `!` or `?`; otherwise the first
/// `sentence_fallback_chars` characters followed by `...`.
pub fn leading_sentence(text: &str, config: &RepairConfig) -> String {
    let text = text.trim();
    if text.is_empty() {
        return config.empty_content_summary.clone();
    }
    match SENTENCE_RE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => {
            let head: String = text.chars().take(config.sentence_fallback_chars).collect();
            format!("{}...", head.trim_end())
        }
    }
}

/// Minimal single-item summary document echoing the first sentence of `raw`.
pub fn build(raw: &str, config: &RepairConfig) -> Document {
    let sentence = leading_sentence(&strip_markup(raw), config);
    summary_document("Overview", &sentence, &config.fallback_detail)
}

/// Fixed document for payloads that are neither text nor a known JSON shape.
pub fn could_not_process(config: &RepairConfig) -> Document {
    summary_document("Overview", &config.unprocessable_summary, &config.fallback_detail)
}

fn summary_document(category: &str, description: &str, detail: &str) -> Document {
    let mut doc = Document::new(Mode::Summary);
    if let Some(section) = doc.section_mut(SUMMARY) {
        section.push(category, description, vec![detail.to_string()]);
    }
    doc
}
