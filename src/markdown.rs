//! Models sometimes ignore the HTML instructions and answer in markdown.
//! This adapter turns that shape into the canonical tag vocabulary so the
//! rest of the pipeline only ever sees one input language.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{ITEM_NUMBER_CLASS, NUMBERED_ITEM_CLASS, ROOT_CLASS, SECTION_TITLE_CLASS};
use crate::html_types::{Element, Node};

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z/!]").unwrap());
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)[\s#]*$").unwrap());
static BOLD_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)[.)]\s+\*\*(.+?)\*\*\s*:?\s*(.*)$").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*•]\s+(.*)$").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// No tags at all, but markdown headings or bold numbered items.
pub fn looks_like_markdown(raw: &str) -> bool {
    !MARKUP_RE.is_match(raw)
        && raw
            .lines()
            .any(|line| HEADING_RE.is_match(line) || BOLD_ITEM_RE.is_match(line))
}

fn inline(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last = 0;
    for caps in BOLD_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            nodes.push(Node::text(&text[last..whole.start()]));
        }
        nodes.push(Node::Element(Element::new("strong").with_text(&caps[1])));
        last = whole.end();
    }
    if last < text.len() {
        nodes.push(Node::text(&text[last..]));
    }
    nodes
}

fn with_inline(mut el: Element, text: &str) -> Element {
    el.children.extend(inline(text));
    el
}

/// Convert markdown-shaped output line by line. Bullets come out as bare
/// `<li>`s; wrapping them is the structural repairer's job.
pub fn to_html(raw: &str) -> String {
    let mut root = Element::new("div").with_class(ROOT_CLASS);

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let node = if let Some(caps) = HEADING_RE.captures(line) {
            Element::new("h3")
                .with_class(SECTION_TITLE_CLASS)
                .with_text(caps[1].replace("**", "").trim())
        } else if let Some(caps) = BOLD_ITEM_RE.captures(line) {
            let mut item = Element::new("div")
                .with_class(NUMBERED_ITEM_CLASS)
                .with_child(Node::Element(
                    Element::new("span")
                        .with_class(ITEM_NUMBER_CLASS)
                        .with_text(format!("{}.", &caps[1])),
                ))
                .with_text(" ")
                .with_child(Node::Element(
                    Element::new("strong").with_text(caps[2].trim()),
                ));
            let description = caps[3].trim();
            if !description.is_empty() {
                item = with_inline(item.with_text(": "), description);
            }
            item
        } else if let Some(caps) = BULLET_RE.captures(line) {
            with_inline(Element::new("li"), caps[1].trim())
        } else {
            with_inline(Element::new("p"), line.trim())
        };
        root.children.push(Node::Element(node));
    }

    root.to_string()
}
