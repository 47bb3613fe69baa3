//! Typed document model and the template emitter.
//!
//! The class names and titles below are the contract with the rendering
//! layer, which styles output by keying off these exact strings.

use std::fmt;

use crate::html_types::{squash_whitespace, Element, Node};

pub const ROOT_CLASS: &str = "analysis-content";
pub const SECTION_TITLE_CLASS: &str = "section-title";
pub const NUMBERED_ITEM_CLASS: &str = "numbered-item";
pub const ITEM_NUMBER_CLASS: &str = "item-number";
pub const DETAIL_LIST_CLASS: &str = "insight-list";

pub const ROOT_OPEN: &str = r#"<div class="analysis-content">"#;
pub const SECTION_HEADER_OPEN: &str = r#"<h3 class="section-title">"#;
pub const NUMBERED_ITEM_OPEN: &str = r#"<div class="numbered-item">"#;
pub const ITEM_NUMBER_OPEN: &str = r#"<span class="item-number">"#;
pub const DETAIL_LIST_OPEN: &str = r#"<ul class="insight-list">"#;

pub const KEY_INSIGHTS: &str = "Key Insights";
pub const RECOMMENDATIONS: &str = "Recommendations for Improvement";
pub const RESPONSE: &str = "Response to Your Question";
pub const SUMMARY: &str = "Analysis Summary";

const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// First review of an uploaded ad.
    InitialReview,
    /// Answer to a follow-up chat question.
    ChatResponse,
    /// Minimal documents built when nothing structured survived.
    Summary,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::InitialReview, Mode::ChatResponse, Mode::Summary];

    pub fn titles(&self) -> &'static [&'static str] {
        match self {
            Mode::InitialReview => &[KEY_INSIGHTS, RECOMMENDATIONS],
            Mode::ChatResponse => &[RESPONSE],
            Mode::Summary => &[SUMMARY],
        }
    }

    /// The mode whose title list is exactly `titles`, in order.
    pub fn matching_titles<S: AsRef<str>>(titles: &[S]) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| {
            let expected = mode.titles();
            expected.len() == titles.len()
                && expected.iter().zip(titles).all(|(e, t)| *e == t.as_ref())
        })
    }

    /// Infer the mode from canonical titles found in a response.
    pub fn from_canonical_titles<S: AsRef<str>>(titles: &[S]) -> Option<Mode> {
        let has = |title: &str| titles.iter().any(|t| t.as_ref() == title);
        if has(KEY_INSIGHTS) || has(RECOMMENDATIONS) {
            Some(Mode::InitialReview)
        } else if has(RESPONSE) {
            Some(Mode::ChatResponse)
        } else if has(SUMMARY) {
            Some(Mode::Summary)
        } else {
            None
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "review" | "initial-review" | "initial_review" => Ok(Mode::InitialReview),
            "chat" | "chat-response" | "chat_response" => Ok(Mode::ChatResponse),
            "summary" => Ok(Mode::Summary),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// 1-based, contiguous within the owning section.
    pub number: usize,
    pub category: String,
    pub description: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub mode: Mode,
    sections: Vec<Section>,
}

/// Bullet used when an item has no details of its own.
pub fn detail_placeholder(section_title: &str, category: &str) -> String {
    let subject = category.to_lowercase();
    if section_title == RECOMMENDATIONS {
        format!("Implementation suggestion for {}", subject)
    } else {
        format!("Further details about {}", subject)
    }
}

impl Section {
    pub fn new(title: &str) -> Self {
        Section {
            title: title.to_string(),
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Append an item; its sequence number is assigned here so numbering
    /// is always 1..N regardless of what the source said.
    pub fn push(&mut self, category: &str, description: &str, details: Vec<String>) {
        let category = match squash_whitespace(category) {
            c if c.is_empty() => DEFAULT_CATEGORY.to_string(),
            c => c,
        };
        let details = details
            .iter()
            .map(|d| squash_whitespace(d))
            .filter(|d| !d.is_empty())
            .collect();
        self.items.push(Item {
            number: self.items.len() + 1,
            category,
            description: squash_whitespace(description),
            details,
        });
    }

    fn to_nodes(&self) -> Vec<Node> {
        let mut nodes = vec![Node::Element(
            Element::new("h3")
                .with_class(SECTION_TITLE_CLASS)
                .with_text(self.title.clone()),
        )];
        for item in &self.items {
            nodes.push(Node::Element(item.marker_block()));
            let details = if item.details.is_empty() {
                vec![detail_placeholder(&self.title, &item.category)]
            } else {
                item.details.clone()
            };
            let list = details.into_iter().fold(
                Element::new("ul").with_class(DETAIL_LIST_CLASS),
                |ul, d| ul.with_child(Node::Element(Element::new("li").with_text(d))),
            );
            nodes.push(Node::Element(list));
        }
        nodes
    }
}

impl Item {
    fn marker_block(&self) -> Element {
        let mut block = Element::new("div")
            .with_class(NUMBERED_ITEM_CLASS)
            .with_child(Node::Element(
                Element::new("span")
                    .with_class(ITEM_NUMBER_CLASS)
                    .with_text(format!("{}.", self.number)),
            ))
            .with_text(" ")
            .with_child(Node::Element(
                Element::new("strong").with_text(self.category.clone()),
            ));
        if !self.description.is_empty() {
            block = block.with_text(format!(": {}", self.description));
        }
        block
    }

    /// `Category: description`, the one-line form used in prompts and summaries.
    pub fn summary_line(&self) -> String {
        if self.description.is_empty() {
            self.category.clone()
        } else {
            format!("{}: {}", self.category, self.description)
        }
    }
}

impl Document {
    /// Empty document holding one empty section per title of `mode`.
    pub fn new(mode: Mode) -> Self {
        Document {
            mode,
            sections: mode.titles().iter().map(|t| Section::new(t)).collect(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn section_mut(&mut self, title: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.title == title)
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn to_element(&self) -> Element {
        let mut root = Element::new("div").with_class(ROOT_CLASS);
        for section in &self.sections {
            root.children.extend(section.to_nodes());
        }
        root
    }

    /// Plain text of every item, one per line; what the scoring heuristics read.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for section in &self.sections {
            lines.push(section.title.clone());
            for item in &section.items {
                lines.push(item.summary_line());
                lines.extend(item.details.iter().cloned());
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_contract_markup() {
        let mut doc = Document::new(Mode::ChatResponse);
        doc.section_mut(RESPONSE)
            .unwrap()
            .push("Tone", "Friendly", vec!["Warm wording".into()]);
        assert_eq!(
            doc.to_string(),
            concat!(
                r#"<div class="analysis-content">"#,
                r#"<h3 class="section-title">Response to Your Question</h3>"#,
                r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Tone</strong>: Friendly</div>"#,
                r#"<ul class="insight-list"><li>Warm wording</li></ul>"#,
                r#"</div>"#
            )
        );
    }

    #[test]
    fn test_numbers_are_assigned_in_order() {
        let mut section = Section::new(KEY_INSIGHTS);
        section.push("A", "a", vec![]);
        section.push("B", "b", vec![]);
        section.push("C", "c", vec![]);
        let numbers: Vec<usize> = section.items().iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_details_render_placeholder() {
        let mut doc = Document::new(Mode::InitialReview);
        doc.section_mut(RECOMMENDATIONS)
            .unwrap()
            .push("Message Clarity", "Shorter copy", vec![]);
        let html = doc.to_string();
        assert!(html.contains(
            r#"<ul class="insight-list"><li>Implementation suggestion for message clarity</li></ul>"#
        ));
        // an empty section still renders its header
        assert!(html.contains(r#"<h3 class="section-title">Key Insights</h3><h3"#));
    }

    #[test]
    fn test_blank_category_and_whitespace_are_normalized() {
        let mut section = Section::new(KEY_INSIGHTS);
        section.push("  ", " spaced \n out ", vec!["  ".into(), " kept\tdetail ".into()]);
        let item = &section.items()[0];
        assert_eq!(item.category, "General");
        assert_eq!(item.description, "spaced out");
        assert_eq!(item.details, vec!["kept detail".to_string()]);
    }

    #[test]
    fn test_mode_title_matching() {
        assert_eq!(
            Mode::matching_titles(&[KEY_INSIGHTS, RECOMMENDATIONS]),
            Some(Mode::InitialReview)
        );
        assert_eq!(Mode::matching_titles(&[RECOMMENDATIONS, KEY_INSIGHTS]), None);
        assert_eq!(Mode::matching_titles(&[KEY_INSIGHTS, KEY_INSIGHTS]), None);
        assert_eq!(Mode::from_canonical_titles(&[RECOMMENDATIONS]), Some(Mode::InitialReview));
        assert_eq!(Mode::from_canonical_titles::<&str>(&[]), None);
        assert_eq!("chat".parse::<Mode>(), Ok(Mode::ChatResponse));
    }
}
