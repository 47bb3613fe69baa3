//! Structural repairer.
//!
//! Works on the tolerant tree rather than on the raw string: the tag-stack
//! parser already balances tags and closes unterminated items, so the passes
//! here only deal with shape (one root, canonical headers, numbered markers,
//! bullets inside lists, one detail list after every item, one section per
//! title). The passes never look at what the text says.

use log::debug;
use std::mem;

use crate::config::RepairConfig;
use crate::document::{DETAIL_LIST_CLASS, ROOT_CLASS, SECTION_TITLE_CLASS};
use crate::html_types::{squash_whitespace, Element, HtmlError, Node};
use crate::tag_stack_parser;

/// Elements that only group content; at the root they are replaced by their children.
const WRAPPERS: &[&str] = &[
    "div", "section", "article", "main", "body", "html", "header", "footer", "aside", "center",
    "blockquote", "figure", "nav", "form", "fieldset",
];

/// Elements whose content is never shown.
const DROPPED: &[&str] = &["script", "style", "head", "title", "template"];

#[derive(Debug, Default)]
pub struct RepairReport {
    pub diagnostics: Vec<HtmlError>,
    pub closers_synthesized: usize,
    pub nodes_hoisted: usize,
    pub headings_canonicalized: usize,
    pub markers_fixed: usize,
    pub bullets_wrapped: usize,
    pub lists_merged: usize,
    pub sections_merged: usize,
    pub placeholders_inserted: usize,
}

impl RepairReport {
    pub fn total_fixes(&self) -> usize {
        self.closers_synthesized
            + self.nodes_hoisted
            + self.headings_canonicalized
            + self.markers_fixed
            + self.bullets_wrapped
            + self.lists_merged
            + self.sections_merged
            + self.placeholders_inserted
    }
}

/// Repair `normalized` and serialize the result.
pub fn repair(normalized: &str, config: &RepairConfig) -> (String, RepairReport) {
    let (root, report) = repair_tree(normalized, config);
    (root.to_string(), report)
}

/// Run every pass and hand back the repaired root container.
pub fn repair_tree(normalized: &str, config: &RepairConfig) -> (Element, RepairReport) {
    let outcome = tag_stack_parser::parse(normalized);
    let mut report = RepairReport {
        closers_synthesized: outcome.implicit_closes,
        diagnostics: outcome.diagnostics,
        ..RepairReport::default()
    };

    let mut root = into_single_root(outcome.nodes, &mut report);
    flatten_nested_roots(&mut root);
    unwrap_wrappers(&mut root);
    canonicalize_headings(&mut root, &mut report);
    fix_item_markers(&mut root, &mut report);
    wrap_bare_bullets(&mut root, &mut report);
    coalesce_text(&mut root);
    prune_blank_text(&mut root, true);
    merge_duplicate_sections(&mut root, &mut report);
    attach_detail_lists(&mut root, config, &mut report);
    merge_adjacent_lists(&mut root, &mut report);

    if report.total_fixes() > 0 {
        debug!("[repair] applied fixes: {:?}", report);
    }
    (root, report)
}

/// Keep the first root container and move everything around it inside.
fn into_single_root(nodes: Vec<Node>, report: &mut RepairReport) -> Element {
    let mut root: Option<Element> = None;
    let mut before = Vec::new();
    let mut after = Vec::new();

    for node in nodes {
        match node {
            Node::Element(el) if root.is_none() && el.is_root_container() => root = Some(el),
            other if root.is_none() => before.push(other),
            other => after.push(other),
        }
    }

    report.nodes_hoisted += before.iter().chain(after.iter()).filter(|n| !n.is_blank()).count();

    let inner = root.map(|r| r.children).unwrap_or_default();
    let mut root = Element::new("div").with_class(ROOT_CLASS);
    root.children = before;
    root.children.extend(inner);
    root.children.extend(after);
    root
}

fn flatten_nested_roots(el: &mut Element) {
    for child in mem::take(&mut el.children) {
        match child {
            Node::Element(mut inner) if inner.is_root_container() => {
                flatten_nested_roots(&mut inner);
                el.children.extend(inner.children);
            }
            Node::Element(mut inner) => {
                flatten_nested_roots(&mut inner);
                el.children.push(Node::Element(inner));
            }
            text => el.children.push(text),
        }
    }
}

fn unwrap_wrappers(root: &mut Element) {
    loop {
        let mut changed = false;
        for child in mem::take(&mut root.children) {
            match child {
                Node::Element(el) if DROPPED.contains(&el.name.as_str()) => changed = true,
                Node::Element(el)
                    if WRAPPERS.contains(&el.name.as_str())
                        && !el.is_numbered_item()
                        && !el.is_section_title() =>
                {
                    root.children.extend(el.children);
                    changed = true;
                }
                other => root.children.push(other),
            }
        }
        if !changed {
            break;
        }
    }
}

fn canonical_heading(el: &Element) -> Element {
    let mut heading = Element::new("h3").with_class(SECTION_TITLE_CLASS);
    let title = squash_whitespace(&el.text_content());
    if !title.is_empty() {
        heading.children.push(Node::Text(title));
    }
    heading
}

/// Rule 1: every heading-like element becomes `<h3 class="section-title">`.
fn canonicalize_headings(el: &mut Element, report: &mut RepairReport) {
    for child in el.children.iter_mut() {
        if let Node::Element(inner) = child {
            if inner.is_section_title() {
                let canonical = canonical_heading(inner);
                if *inner != canonical {
                    report.headings_canonicalized += 1;
                    *inner = canonical;
                }
            } else {
                canonicalize_headings(inner, report);
            }
        }
    }
}

/// Rewrite a marker span to exactly `N.`; returns whatever else the span held.
fn normalize_marker(span: &mut Element) -> Option<Vec<Node>> {
    let lead = match span.children.first() {
        Some(Node::Text(t)) => t.clone(),
        _ => return None,
    };
    let trimmed = lead.trim_start();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let tail = &trimmed[digits.len()..];
    let tail = tail
        .strip_prefix('.')
        .or_else(|| tail.strip_prefix(')'))
        .unwrap_or(tail);

    let mut spilled = Vec::new();
    if !tail.trim().is_empty() {
        spilled.push(Node::Text(tail.to_string()));
    }
    spilled.extend(span.children.drain(1..));
    span.children = vec![Node::Text(format!("{}.", digits))];
    Some(spilled)
}

/// Rule 2: numbered markers end with their punctuation, and content an
/// unclosed marker span swallowed is moved back into the item.
fn fix_item_markers(el: &mut Element, report: &mut RepairReport) {
    for child in el.children.iter_mut() {
        if let Node::Element(inner) = child {
            fix_item_markers(inner, report);
        }
    }
    if !el.is_numbered_item() {
        return;
    }

    let Some(idx) = el
        .children
        .iter()
        .position(|n| n.as_element().map_or(false, Element::is_item_number))
    else {
        return;
    };

    let Some(span) = el.children[idx].as_element_mut() else {
        return;
    };
    let before = span.clone();
    let Some(spilled) = normalize_marker(span) else {
        return;
    };
    let changed = *span != before;

    if !spilled.is_empty() {
        let mut insert = Vec::with_capacity(spilled.len() + 1);
        if !matches!(spilled.first(), Some(Node::Text(t)) if t.starts_with(char::is_whitespace)) {
            insert.push(Node::text(" "));
        }
        insert.extend(spilled);
        el.children.splice(idx + 1..idx + 1, insert);
    }
    if changed {
        report.markers_fixed += 1;
    }
}

/// Rule 5: runs of `<li>` outside any list get a detail list around them.
fn wrap_bare_bullets(el: &mut Element, report: &mut RepairReport) {
    for child in el.children.iter_mut() {
        if let Node::Element(inner) = child {
            wrap_bare_bullets(inner, report);
        }
    }
    if el.is_list()
        || !el
            .children
            .iter()
            .any(|n| matches!(n, Node::Element(e) if e.name == "li"))
    {
        return;
    }

    let mut out = Vec::with_capacity(el.children.len());
    let mut run: Option<Element> = None;
    for child in mem::take(&mut el.children) {
        match child {
            Node::Element(li) if li.name == "li" => run
                .get_or_insert_with(|| Element::new("ul").with_class(DETAIL_LIST_CLASS))
                .children
                .push(Node::Element(li)),
            blank if blank.is_blank() && run.is_some() => {}
            other => {
                if let Some(ul) = run.take() {
                    report.bullets_wrapped += 1;
                    out.push(Node::Element(ul));
                }
                out.push(other);
            }
        }
    }
    if let Some(ul) = run.take() {
        report.bullets_wrapped += 1;
        out.push(Node::Element(ul));
    }
    el.children = out;
}

fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Merge neighbouring text nodes (left behind by dropped comments or split
/// literal `<`s) and keep whitespace single-spaced.
fn coalesce_text(el: &mut Element) {
    let mut out: Vec<Node> = Vec::with_capacity(el.children.len());
    for child in mem::take(&mut el.children) {
        match child {
            Node::Text(t) => {
                if let Some(Node::Text(prev)) = out.last_mut() {
                    prev.push_str(&t);
                } else {
                    out.push(Node::Text(t));
                }
            }
            Node::Element(mut inner) => {
                coalesce_text(&mut inner);
                out.push(Node::Element(inner));
            }
        }
    }
    el.children = out
        .into_iter()
        .filter_map(|n| match n {
            Node::Text(t) if t.is_empty() => None,
            Node::Text(t) => Some(Node::Text(collapse_runs(&t))),
            other => Some(other),
        })
        .collect();
}

/// Whitespace between blocks carries no content.
fn prune_blank_text(el: &mut Element, is_root: bool) {
    if is_root || el.is_list() {
        el.children.retain(|n| !n.is_blank());
    }
    for child in el.children.iter_mut() {
        if let Node::Element(inner) = child {
            prune_blank_text(inner, false);
        }
    }
}

/// One section per title: content under a repeated header is appended to
/// the first section with that title, in the order it was seen.
fn merge_duplicate_sections(root: &mut Element, report: &mut RepairReport) {
    let mut preamble = Vec::new();
    let mut sections: Vec<(String, Vec<Node>)> = Vec::new();
    let mut current: Option<usize> = None;

    for child in mem::take(&mut root.children) {
        if let Node::Element(el) = &child {
            if el.is_section_title() {
                let title = squash_whitespace(&el.text_content());
                match sections.iter().position(|(t, _)| *t == title) {
                    Some(idx) => {
                        report.sections_merged += 1;
                        current = Some(idx);
                    }
                    None => {
                        sections.push((title, vec![child]));
                        current = Some(sections.len() - 1);
                    }
                }
                continue;
            }
        }
        match current {
            Some(idx) => sections[idx].1.push(child),
            None => preamble.push(child),
        }
    }

    root.children = preamble;
    for (_, nodes) in sections {
        root.children.extend(nodes);
    }
}

fn placeholder_bullet(config: &RepairConfig) -> Node {
    Node::Element(Element::new("li").with_text(config.repair_placeholder.clone()))
}

/// Rule 4: every item is immediately followed by a detail list holding at
/// least one bullet; a placeholder is fabricated when there is none.
fn attach_detail_lists(root: &mut Element, config: &RepairConfig, report: &mut RepairReport) {
    let mut out = Vec::with_capacity(root.children.len());
    let mut children = mem::take(&mut root.children).into_iter().peekable();

    while let Some(child) = children.next() {
        let is_item = child.as_element().map_or(false, Element::is_numbered_item);
        out.push(child);
        if !is_item {
            continue;
        }

        let next_is_list = children
            .peek()
            .and_then(Node::as_element)
            .map_or(false, Element::is_list);

        if next_is_list {
            if let Some(Node::Element(mut list)) = children.next() {
                list.name = "ul".to_string();
                list.set_attr("class", DETAIL_LIST_CLASS);
                if !list.children.iter().any(|n| matches!(n, Node::Element(e) if e.name == "li")) {
                    list.children.push(placeholder_bullet(config));
                    report.placeholders_inserted += 1;
                }
                out.push(Node::Element(list));
            }
        } else {
            out.push(Node::Element(
                Element::new("ul")
                    .with_class(DETAIL_LIST_CLASS)
                    .with_child(placeholder_bullet(config)),
            ));
            report.placeholders_inserted += 1;
        }
    }

    root.children = out;
}

/// Neighbouring detail lists become one.
fn merge_adjacent_lists(root: &mut Element, report: &mut RepairReport) {
    let mut out: Vec<Node> = Vec::with_capacity(root.children.len());
    for child in mem::take(&mut root.children) {
        match child {
            Node::Element(list) if list.is_detail_list() => {
                if let Some(Node::Element(prev)) = out.last_mut() {
                    if prev.is_detail_list() {
                        prev.children.extend(list.children);
                        report.lists_merged += 1;
                        continue;
                    }
                }
                out.push(Node::Element(list));
            }
            other => out.push(other),
        }
    }
    root.children = out;
}

#[cfg(test)]
mod tests;
