use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::ROOT_OPEN;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static OPEN_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap());
static CLOSE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```[ \t]*$").unwrap());

/// Remove a markdown code fence wrapped around the whole payload
/// (models like to answer "```html … ```").
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = match OPEN_FENCE_RE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    match CLOSE_FENCE_RE.find(body) {
        Some(m) => body[..m.start()].trim(),
        None => body.trim(),
    }
}

/// Collapse whitespace runs to single spaces and make sure the root
/// container is present. Never fails; empty input gives an empty container.
pub fn normalize(raw: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(strip_code_fence(raw), " ");
    if collapsed.contains(ROOT_OPEN) {
        collapsed.into_owned()
    } else {
        format!("{}{}</div>", ROOT_OPEN, collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let out = normalize("<div class=\"analysis-content\">\n  <h3>Key\t\tInsights</h3>\n</div>\n");
        assert_eq!(out, "<div class=\"analysis-content\"> <h3>Key Insights</h3> </div>");
    }

    #[test]
    fn test_wraps_missing_container() {
        assert_eq!(
            normalize("<li>one</li>"),
            "<div class=\"analysis-content\"><li>one</li></div>"
        );
    }

    #[test]
    fn test_empty_input_gives_empty_container() {
        assert_eq!(normalize(""), "<div class=\"analysis-content\"></div>");
        assert_eq!(normalize(" \n\t "), "<div class=\"analysis-content\"></div>");
    }

    #[test]
    fn test_strips_code_fence() {
        assert_eq!(strip_code_fence("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("no fence"), "no fence");
    }
}
