use nom_supreme::final_parser::Location;

use crate::html_tok::{tokenize, Spanned, Token};
use crate::html_types::{is_heading_name, Element, HtmlError, Node};

/// Deepest element nesting the parser builds. Every later pass walks the
/// tree recursively, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

/// Forest of top-level nodes plus everything the parser had to work around.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<HtmlError>,
    /// Elements closed without their own closing tag (implied or at end of input).
    pub implicit_closes: usize,
}

/// Tag-stack tree builder. Open elements live on `stack`; an element is
/// attached to its parent only when it is closed, explicitly or not.
#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a str,
    stack: Vec<Element>,
    out: Vec<Node>,
    diagnostics: Vec<HtmlError>,
    implicit_closes: usize,
    depth_reported: bool,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            stack: Vec::new(),
            out: Vec::new(),
            diagnostics: Vec::new(),
            implicit_closes: 0,
            depth_reported: false,
        }
    }

    pub fn parse(mut self) -> ParseOutcome {
        for Spanned { token, offset } in tokenize(self.input) {
            match token {
                Token::Open {
                    name,
                    attrs,
                    self_closing,
                } => self.open(name, attrs, self_closing, offset),
                Token::Close { name } => self.close(&name, offset),
                Token::Text(text) => self.append(Node::Text(text)),
                Token::Ignored => {}
                Token::Broken(fragment) => {
                    let location = self.locate(offset);
                    self.diagnostics.push(HtmlError::UnterminatedTag {
                        fragment: fragment.chars().take(40).collect(),
                        location,
                    });
                }
            }
        }

        // end of input closes whatever is still open
        while let Some(name) = self.stack.last().map(|el| el.name.clone()) {
            self.diagnostics.push(HtmlError::UnclosedAtEof { name });
            self.pop();
            self.implicit_closes += 1;
        }

        ParseOutcome {
            nodes: self.out,
            diagnostics: self.diagnostics,
            implicit_closes: self.implicit_closes,
        }
    }

    fn locate(&self, offset: usize) -> Location {
        Location::locate_tail(self.input, &self.input[offset..])
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(top) => top.children.push(node),
            None => self.out.push(node),
        }
    }

    fn pop(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.append(Node::Element(el));
        }
    }

    fn open(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
        offset: usize,
    ) {
        let el = Element {
            name,
            attrs,
            children: Vec::new(),
        };
        self.close_implied_by(&el);
        if self_closing || el.is_void() {
            self.append(Node::Element(el));
            return;
        }
        if self.stack.len() >= MAX_DEPTH {
            if !self.depth_reported {
                let location = self.locate(offset);
                self.diagnostics.push(HtmlError::TooDeep {
                    name: el.name.clone(),
                    location,
                });
                self.depth_reported = true;
            }
            self.pop();
            self.implicit_closes += 1;
        }
        self.stack.push(el);
    }

    /// Close the open elements `incoming` cannot nest inside.
    fn close_implied_by(&mut self, incoming: &Element) {
        while let Some(top) = self.stack.last() {
            let phrasing = top.is_inline() || top.name == "p";
            let closes = if incoming.is_section_title() || incoming.is_numbered_item() {
                phrasing
                    || top.is_section_title()
                    || top.is_numbered_item()
                    || top.name == "li"
                    || top.is_list()
            } else if incoming.is_list() || incoming.name == "li" {
                phrasing || top.is_section_title() || top.is_numbered_item()
            } else if incoming.is_inline() {
                false
            } else {
                phrasing
            };
            if !closes {
                break;
            }
            self.pop();
            self.implicit_closes += 1;
        }

        // sibling list items
        if incoming.name == "li" && self.stack.last().map_or(false, |top| top.name == "li") {
            self.pop();
            self.implicit_closes += 1;
        }
    }

    fn close(&mut self, name: &str, offset: usize) {
        let heading = is_heading_name(name);
        let found = self
            .stack
            .iter()
            .rposition(|el| if heading { el.is_heading() } else { el.name == name });

        match found {
            Some(idx) => {
                while self.stack.len() > idx + 1 {
                    self.pop();
                    self.implicit_closes += 1;
                }
                self.pop();
            }
            None => {
                let location = self.locate(offset);
                self.diagnostics.push(HtmlError::StrayCloser {
                    name: name.to_string(),
                    location,
                });
            }
        }
    }
}

/// Parse `input` into a tolerant forest. Never fails.
pub fn parse(input: &str) -> ParseOutcome {
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(outcome: &ParseOutcome) -> &Element {
        outcome.nodes[0].as_element().expect("element")
    }

    #[test]
    fn test_well_formed_round_trip() {
        let input = r#"<div class="analysis-content"><h3 class="section-title">Key Insights</h3><div class="numbered-item"><span class="item-number">1.</span> <strong>Tone</strong>: Friendly</div><ul class="insight-list"><li>Warm wording</li></ul></div>"#;
        let outcome = parse(input);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.implicit_closes, 0);
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.nodes[0].to_string(), input);
    }

    #[test]
    fn test_unclosed_marker_span_is_closed_by_item_closer() {
        let outcome = parse(
            r#"<div class="numbered-item"><span class="item-number">1<strong>Visual</strong>: Good</div>"#,
        );
        let item = first_element(&outcome);
        assert!(item.is_numbered_item());
        let span = item.child_elements().next().unwrap();
        assert!(span.is_item_number());
        assert_eq!(span.text_content(), "1Visual: Good");
        assert_eq!(outcome.implicit_closes, 1);
    }

    #[test]
    fn test_sibling_list_items_close_each_other() {
        let outcome = parse("<ul><li>a<li>b<li>c</ul>");
        let ul = first_element(&outcome);
        let texts: Vec<String> = ul.child_elements().map(|li| li.text_content()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nested_list_stays_inside_item() {
        let outcome = parse("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>");
        let ul = first_element(&outcome);
        assert_eq!(ul.child_elements().count(), 2);
        let first = ul.child_elements().next().unwrap();
        assert!(first.child_elements().any(|e| e.name == "ul"));
    }

    #[test]
    fn test_item_closed_before_next_item_and_header() {
        let outcome = parse(
            r#"<div class="numbered-item">one<div class="numbered-item">two<h3>Next</h3>"#,
        );
        assert_eq!(outcome.nodes.len(), 3);
        assert!(first_element(&outcome).is_numbered_item());
        assert_eq!(outcome.nodes[1].text_content(), "two");
        assert!(outcome.nodes[2].as_element().unwrap().is_heading());
    }

    #[test]
    fn test_list_closes_open_item() {
        let outcome =
            parse(r#"<div class="numbered-item"><strong>A</strong>: b<ul><li>x</li></ul></div>"#);
        assert_eq!(outcome.nodes.len(), 2);
        assert!(outcome.nodes[1].as_element().unwrap().is_list());
        // the trailing </div> had nothing left to close
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, HtmlError::StrayCloser { name, .. } if name == "div")));
    }

    #[test]
    fn test_mismatched_heading_levels_close() {
        let outcome = parse("<h2>Key Insights</h3><p>x</p>");
        assert_eq!(outcome.nodes.len(), 2);
        assert_eq!(outcome.nodes[0].text_content(), "Key Insights");
    }

    #[test]
    fn test_eof_closes_everything() {
        let outcome = parse(r#"<div class="analysis-content"><ul><li>dangling"#);
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(
            outcome.nodes[0].to_string(),
            r#"<div class="analysis-content"><ul><li>dangling</li></ul></div>"#
        );
        let unclosed = outcome
            .diagnostics
            .iter()
            .filter(|d| matches!(d, HtmlError::UnclosedAtEof { .. }))
            .count();
        assert_eq!(unclosed, 3);
    }

    fn depth(el: &Element) -> usize {
        1 + el.child_elements().map(depth).max().unwrap_or(0)
    }

    #[test]
    fn test_unclosed_inline_run_is_depth_limited() {
        let outcome = parse(&"<b>".repeat(10_000));
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(depth(first_element(&outcome)), MAX_DEPTH);
        let too_deep: Vec<&HtmlError> = outcome
            .diagnostics
            .iter()
            .filter(|d| matches!(d, HtmlError::TooDeep { .. }))
            .collect();
        assert_eq!(too_deep.len(), 1);
        match too_deep[0] {
            HtmlError::TooDeep { name, location } => {
                assert_eq!(name, "b");
                assert_eq!(location.column, 3 * MAX_DEPTH + 1);
            }
            other => panic!("expected too deep, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_trailing_tag_reports_location() {
        let outcome = parse("<p>ok</p><span class=\"item-nu");
        match outcome.diagnostics.first() {
            Some(HtmlError::UnterminatedTag { location, .. }) => {
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 10);
            }
            other => panic!("expected unterminated tag, got {:?}", other),
        }
    }
}
