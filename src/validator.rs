//! Validator: landmark presence plus the residual defect signatures that
//! send a repaired document to deep reconstruction.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use xml::{Event, Parser};

use crate::config::RepairConfig;
use crate::document::{
    Mode, DETAIL_LIST_OPEN, ITEM_NUMBER_OPEN, NUMBERED_ITEM_OPEN, ROOT_OPEN, SECTION_HEADER_OPEN,
};
use crate::html_types::{escape_text, squash_whitespace, Element, Node};
use crate::tag_stack_parser;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="item-number">\d+\.</span>"#).unwrap());
static BULLET_AFTER_LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</ul>\s*<li>").unwrap());
static MARKER_AT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="item-number">[^<]*$"#).unwrap());
static BULLET_AT_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<li>[^<]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    RootContainer,
    SectionHeader,
    NumberedItem,
    DetailList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Defect {
    /// Repair had to fabricate a bullet.
    PlaceholderContent,
    TooManyHeaders(usize),
    UnexpectedTitles(Vec<String>),
    MalformedItemMarker,
    BulletOutsideList,
    UnclosedMarkerAtEnd,
    UnclosedBulletAtEnd,
    NonContiguousNumbering { section: String, found: Vec<usize> },
    ItemWithoutDetails { marker: String },
    OrphanDetailList,
    /// Numbered items nested below the root container's children.
    NestedItems(usize),
    NotWellFormed(String),
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Landmark::RootContainer => "root container",
            Landmark::SectionHeader => "section header",
            Landmark::NumberedItem => "numbered item",
            Landmark::DetailList => "detail list",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::PlaceholderContent => write!(f, "placeholder bullet present"),
            Defect::TooManyHeaders(n) => write!(f, "{} section headers", n),
            Defect::UnexpectedTitles(titles) => write!(f, "unexpected section titles {:?}", titles),
            Defect::MalformedItemMarker => write!(f, "item marker without a proper closing span"),
            Defect::BulletOutsideList => write!(f, "bullet after a closed list"),
            Defect::UnclosedMarkerAtEnd => write!(f, "item marker unclosed at end of input"),
            Defect::UnclosedBulletAtEnd => write!(f, "bullet unclosed at end of input"),
            Defect::NonContiguousNumbering { section, found } => {
                write!(f, "numbering {:?} in '{}' is not 1..N", found, section)
            }
            Defect::ItemWithoutDetails { marker } => {
                write!(f, "item {} has no detail list after it", marker)
            }
            Defect::OrphanDetailList => write!(f, "detail list with no item before it"),
            Defect::NestedItems(n) => write!(f, "{} numbered item(s) nested inside other blocks", n),
            Defect::NotWellFormed(msg) => write!(f, "not well-formed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Validation {
    pub missing: Vec<Landmark>,
    pub defects: Vec<Defect>,
    /// Mode whose title list the document matches exactly.
    pub mode: Option<Mode>,
}

impl Validation {
    /// Every landmark is present.
    pub fn passes_basic(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.defects.is_empty()
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("valid");
        }
        let missing = self.missing.iter().map(|l| format!("missing {}", l));
        let defects = self.defects.iter().map(|d| d.to_string());
        let parts: Vec<String> = missing.chain(defects).collect();
        f.write_str(&parts.join("; "))
    }
}

fn missing_landmarks(html: &str) -> Vec<Landmark> {
    let has_all = |needles: &[&str]| needles.iter().all(|n| html.contains(n));
    let mut missing = Vec::new();
    if !has_all(&[ROOT_OPEN, "</div>"]) {
        missing.push(Landmark::RootContainer);
    }
    if !has_all(&[SECTION_HEADER_OPEN, "</h3>"]) {
        missing.push(Landmark::SectionHeader);
    }
    if !has_all(&[NUMBERED_ITEM_OPEN, ITEM_NUMBER_OPEN, "</div>"]) {
        missing.push(Landmark::NumberedItem);
    }
    if !has_all(&[DETAIL_LIST_OPEN, "<li>", "</ul>"]) {
        missing.push(Landmark::DetailList);
    }
    missing
}

fn signature_defects(html: &str, config: &RepairConfig) -> Vec<Defect> {
    let mut defects = Vec::new();
    let placeholder = format!("<li>{}</li>", escape_text(&config.repair_placeholder));
    if html.contains(&placeholder) {
        defects.push(Defect::PlaceholderContent);
    }
    let headers = html.matches(SECTION_HEADER_OPEN).count();
    if headers > 2 {
        defects.push(Defect::TooManyHeaders(headers));
    }
    if html.matches(ITEM_NUMBER_OPEN).count() != MARKER_RE.find_iter(html).count() {
        defects.push(Defect::MalformedItemMarker);
    }
    if BULLET_AFTER_LIST_RE.is_match(html) {
        defects.push(Defect::BulletOutsideList);
    }
    if MARKER_AT_END_RE.is_match(html) {
        defects.push(Defect::UnclosedMarkerAtEnd);
    }
    if BULLET_AT_END_RE.is_match(html) {
        defects.push(Defect::UnclosedBulletAtEnd);
    }
    defects
}

fn marker_number(item: &Element) -> Option<usize> {
    let span = item.find(&|e| e.is_item_number())?;
    let text = span.text_content();
    let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn has_bullet(list: &Element) -> bool {
    list.child_elements().any(|e| e.name == "li")
}

/// Walk the root container's children: titles, numbering, item/list adjacency.
fn structural_defects(root: &Element, defects: &mut Vec<Defect>) -> Option<Mode> {
    let blocks: Vec<&Element> = root.child_elements().collect();

    let mut titles: Vec<String> = Vec::new();
    let mut numbering: Vec<(String, Vec<usize>)> = vec![(String::new(), Vec::new())];

    for (idx, el) in blocks.iter().enumerate() {
        if el.is_section_title() {
            let title = squash_whitespace(&el.text_content());
            titles.push(title.clone());
            numbering.push((title, Vec::new()));
        } else if el.is_numbered_item() {
            let number = marker_number(el);
            match (number, numbering.last_mut()) {
                (Some(n), Some((_, found))) => found.push(n),
                // no marker, or one whose digits do not fit
                (None, _) if !defects.contains(&Defect::MalformedItemMarker) => {
                    defects.push(Defect::MalformedItemMarker)
                }
                _ => {}
            }
            let followed = blocks
                .get(idx + 1)
                .map_or(false, |next| next.is_detail_list() && has_bullet(next));
            if !followed {
                defects.push(Defect::ItemWithoutDetails {
                    marker: number.map_or_else(|| "?".to_string(), |n| format!("{}.", n)),
                });
            }
        } else if el.is_list() {
            let attached = idx > 0 && blocks[idx - 1].is_numbered_item();
            if !attached {
                defects.push(Defect::OrphanDetailList);
            }
        }
    }

    for (section, found) in numbering {
        let contiguous = found.iter().enumerate().all(|(i, n)| *n == i + 1);
        if !contiguous {
            defects.push(Defect::NonContiguousNumbering { section, found });
        }
    }

    let nested = count_items(root) - blocks.iter().filter(|el| el.is_numbered_item()).count();
    if nested > 0 {
        defects.push(Defect::NestedItems(nested));
    }

    let mode = Mode::matching_titles(&titles);
    if mode.is_none() {
        defects.push(Defect::UnexpectedTitles(titles));
    }
    mode
}

fn count_items(el: &Element) -> usize {
    el.child_elements()
        .map(|child| usize::from(child.is_numbered_item()) + count_items(child))
        .sum()
}

/// Strict XML check: every element closed, properly nested.
fn check_well_formed(html: &str) -> Result<(), String> {
    let mut parser = Parser::new();
    parser.feed_str(html);
    let mut depth: usize = 0;
    for event in parser {
        match event.map_err(|e| e.to_string())? {
            Event::ElementStart(_) => depth += 1,
            Event::ElementEnd(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(format!("{} element(s) left open", depth))
    }
}

/// Check `html` for every landmark and defect signature. Never fails; the
/// result says what is wrong.
pub fn validate(html: &str, config: &RepairConfig) -> Validation {
    let mut validation = Validation {
        missing: missing_landmarks(html),
        defects: signature_defects(html, config),
        mode: None,
    };

    let outcome = tag_stack_parser::parse(html);
    let root = outcome
        .nodes
        .iter()
        .filter_map(Node::as_element)
        .find(|el| el.is_root_container());
    if let Some(root) = root {
        validation.mode = structural_defects(root, &mut validation.defects);
    }

    if let Err(msg) = check_well_formed(html) {
        validation.defects.push(Defect::NotWellFormed(msg));
    }
    validation
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_REVIEW: &str = concat!(
        r#"<div class="analysis-content">"#,
        r#"<h3 class="section-title">Key Insights</h3>"#,
        r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Tone</strong>: Friendly</div>"#,
        r#"<ul class="insight-list"><li>Warm wording</li></ul>"#,
        r#"<div class="numbered-item"><span class="item-number">2.</span> <strong>Color</strong>: Bright</div>"#,
        r#"<ul class="insight-list"><li>High contrast</li></ul>"#,
        r#"<h3 class="section-title">Recommendations for Improvement</h3>"#,
        r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Copy</strong>: Shorter</div>"#,
        r#"<ul class="insight-list"><li>Cut the tagline</li></ul>"#,
        r#"</div>"#
    );

    fn check(html: &str) -> Validation {
        validate(html, &RepairConfig::default())
    }

    #[test]
    fn test_valid_review_passes() {
        let v = check(VALID_REVIEW);
        assert!(v.is_valid(), "{}", v);
        assert_eq!(v.mode, Some(Mode::InitialReview));
    }

    #[test]
    fn test_missing_landmarks_are_reported() {
        let v = check(r#"<div class="analysis-content"><p>hello</p></div>"#);
        assert!(!v.passes_basic());
        assert_eq!(
            v.missing,
            vec![Landmark::SectionHeader, Landmark::NumberedItem, Landmark::DetailList]
        );
    }

    #[test]
    fn test_placeholder_is_a_defect() {
        let html = VALID_REVIEW.replace("Cut the tagline", "Details not provided");
        let v = check(&html);
        assert!(v.passes_basic());
        assert!(v.defects.contains(&Defect::PlaceholderContent));
    }

    #[test]
    fn test_duplicate_titles_are_defects() {
        let html = VALID_REVIEW.replace("Recommendations for Improvement", "Key Insights");
        let v = check(&html);
        assert!(v
            .defects
            .iter()
            .any(|d| matches!(d, Defect::UnexpectedTitles(t) if t.len() == 2)));
        assert_eq!(v.mode, None);
    }

    #[test]
    fn test_gap_in_numbering() {
        let html = VALID_REVIEW.replace(
            r#"<span class="item-number">2.</span>"#,
            r#"<span class="item-number">3.</span>"#,
        );
        let v = check(&html);
        assert!(v.defects.contains(&Defect::NonContiguousNumbering {
            section: "Key Insights".to_string(),
            found: vec![1, 3],
        }));
    }

    #[test]
    fn test_marker_without_punctuation() {
        let html = VALID_REVIEW.replace(
            r#"<span class="item-number">1.</span> <strong>Copy"#,
            r#"<span class="item-number">1</span> <strong>Copy"#,
        );
        assert!(check(&html).defects.contains(&Defect::MalformedItemMarker));
    }

    #[test]
    fn test_item_without_marker_span() {
        let html = VALID_REVIEW.replace(
            r#"<span class="item-number">2.</span> <strong>Color"#,
            r#"<strong>Color"#,
        );
        let v = check(&html);
        assert!(v.defects.contains(&Defect::MalformedItemMarker), "{}", v);
        assert!(!v.is_valid());
    }

    #[test]
    fn test_marker_number_too_large() {
        let html = VALID_REVIEW.replacen(
            r#"<span class="item-number">1.</span>"#,
            r#"<span class="item-number">99999999999999999999999.</span>"#,
            1,
        );
        let v = check(&html);
        assert_eq!(
            v.defects
                .iter()
                .filter(|d| **d == Defect::MalformedItemMarker)
                .count(),
            1
        );
    }

    #[test]
    fn test_item_without_list_and_orphan_list() {
        let html = VALID_REVIEW.replace(
            r#"<ul class="insight-list"><li>Warm wording</li></ul><div class="numbered-item"><span class="item-number">2.</span> <strong>Color</strong>: Bright</div>"#,
            r#"<div class="numbered-item"><span class="item-number">2.</span> <strong>Color</strong>: Bright</div><ul class="insight-list"><li>Warm wording</li></ul>"#,
        );
        let v = check(&html);
        assert!(v.defects.contains(&Defect::ItemWithoutDetails {
            marker: "1.".to_string()
        }));
        assert!(v.defects.contains(&Defect::OrphanDetailList));
    }

    #[test]
    fn test_bullet_after_closed_list() {
        let html = VALID_REVIEW.replace("</ul><h3", "</ul><li>stray</li><h3");
        assert!(check(&html).defects.contains(&Defect::BulletOutsideList));
    }

    #[test]
    fn test_truncated_output() {
        let v = check(r#"<div class="analysis-content"><h3 class="section-title">Key Insights</h3><div class="numbered-item"><span class="item-number">1"#);
        assert!(v.defects.contains(&Defect::UnclosedMarkerAtEnd));
        assert!(v
            .defects
            .iter()
            .any(|d| matches!(d, Defect::NotWellFormed(_))));
    }

    #[test]
    fn test_items_must_sit_at_root() {
        let html = VALID_REVIEW.replace(
            r#"<h3 class="section-title">Recommendations for Improvement</h3>"#,
            r#"<h3 class="section-title">Recommendations for Improvement</h3><blockquote><div class="numbered-item"><span class="item-number">9.</span> <strong>X</strong></div></blockquote>"#,
        );
        assert!(check(&html).defects.contains(&Defect::NestedItems(1)));
    }

    #[test]
    fn test_too_many_headers() {
        let html = VALID_REVIEW.replace(
            r#"<h3 class="section-title">Recommendations"#,
            r#"<h3 class="section-title">Extra</h3><h3 class="section-title">Recommendations"#,
        );
        let v = check(&html);
        assert!(v.defects.contains(&Defect::TooManyHeaders(3)));
        assert_eq!(v.mode, None);
    }
}
