//! JSON ingestion adapter. Responses produced in JSON mode already carry the
//! document structure, so they are mapped straight onto `Document` without
//! repair or reconstruction.

use log::warn;
use serde_json::Value;
use std::fmt;

use crate::document::{Document, Mode, Section, KEY_INSIGHTS, RECOMMENDATIONS, RESPONSE};

const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    NotAnObject,
    /// Top-level keys of an object that matched no known shape.
    UnrecognizedShape(Vec<String>),
    /// A known container field that is not an array.
    NotAnArray(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::NotAnObject => write!(f, "payload is not a JSON object"),
            AdapterError::UnrecognizedShape(keys) => {
                write!(f, "no analysis or response field (keys: {})", keys.join(", "))
            }
            AdapterError::NotAnArray(path) => write!(f, "{} is not an array", path),
        }
    }
}

impl std::error::Error for AdapterError {}

fn string_field<'v>(obj: &'v serde_json::Map<String, Value>, key: &str) -> &'v str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

fn details_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|d| match d {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Append every well-formed entry of `items` to `section`, in array order.
fn fill_section(section: &mut Section, items: &[Value], path: &str) {
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::Object(obj) => {
                let category = string_field(obj, "category");
                let description = string_field(obj, "description");
                if category.trim().is_empty() && description.trim().is_empty() {
                    warn!("[json] {}[{}] has neither category nor description, skipping", path, idx);
                    continue;
                }
                section.push(category, description, details_of(obj.get("details")));
            }
            Value::String(text) if !text.trim().is_empty() => {
                section.push(DEFAULT_CATEGORY, text, Vec::new());
            }
            other => warn!("[json] {}[{}] is not an item: {}", path, idx, other),
        }
    }
}

fn array_at<'v>(parent: &'v Value, key: &str, path: &str) -> Result<&'v [Value], AdapterError> {
    match parent.get(key) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AdapterError::NotAnArray(format!("{}.{}", path, key))),
    }
}

/// Map `{analysis: {keyInsights, recommendations}}` or
/// `{response: {points}}` onto a `Document`.
pub fn document_from_json(value: &Value) -> Result<Document, AdapterError> {
    let obj = value.as_object().ok_or(AdapterError::NotAnObject)?;

    if let Some(analysis) = obj.get("analysis").filter(|v| v.is_object()) {
        let mut doc = Document::new(Mode::InitialReview);
        for (key, title) in [("keyInsights", KEY_INSIGHTS), ("recommendations", RECOMMENDATIONS)] {
            let items = array_at(analysis, key, "analysis")?;
            if let Some(section) = doc.section_mut(title) {
                fill_section(section, items, &format!("analysis.{}", key));
            }
        }
        return Ok(doc);
    }

    if let Some(response) = obj.get("response").filter(|v| v.is_object()) {
        let mut doc = Document::new(Mode::ChatResponse);
        let items = array_at(response, "points", "response")?;
        if let Some(section) = doc.section_mut(RESPONSE) {
            fill_section(section, items, "response.points");
        }
        return Ok(doc);
    }

    Err(AdapterError::UnrecognizedShape(obj.keys().cloned().collect()))
}
