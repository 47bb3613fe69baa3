//! The repair pipeline: one entry point over both payload shapes.
//!
//! Text payloads go `Received -> Normalized -> Repaired -> Validated` and are
//! either emitted as repaired or sent once through deep reconstruction. JSON
//! payloads are mapped by the JSON adapter and emitted directly. Nothing in
//! here returns an error: every failure degrades to a renderable document.

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::RepairConfig;
use crate::fallback;
use crate::json_adapter::document_from_json;
use crate::markdown;
use crate::normalizer::{normalize, strip_code_fence};
use crate::reconstruct::reconstruct;
use crate::repair::{repair, RepairReport};
use crate::validator::{validate, Validation};

/// A model response as received, before any processing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Text(String),
    Json(Value),
}

impl RawResponse {
    /// Classify a payload. Anything that parses as a JSON object is JSON,
    /// except objects whose `response`/`analysis` field is itself the HTML
    /// string, which are unwrapped to text.
    pub fn from_payload(payload: &str) -> Self {
        let body = strip_code_fence(payload);
        if !body.starts_with('{') {
            return RawResponse::Text(payload.to_string());
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                let embedded = ["response", "analysis"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str));
                match embedded {
                    Some(text) => RawResponse::Text(text.to_string()),
                    None => RawResponse::Json(value),
                }
            }
            Err(e) => {
                debug!("[pipeline] payload looks like JSON but is not ({}), treating as text", e);
                RawResponse::Text(payload.to_string())
            }
        }
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        RawResponse::Text(text.to_string())
    }
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        RawResponse::Json(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Normalized,
    Repaired,
    Validated,
    Reconstructed,
    Emitted,
}

/// Which branch produced the emitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Repaired output passed validation.
    PassThrough,
    Reconstructed,
    Fallback,
    Json,
    /// Not text and not a known JSON shape.
    Unprocessable,
}

#[derive(Debug)]
pub struct Outcome {
    pub html: String,
    pub path: RenderPath,
    pub validation: Option<Validation>,
    pub report: Option<RepairReport>,
    pub trace: Vec<Stage>,
}

impl Outcome {
    fn emitted(html: String, path: RenderPath, mut trace: Vec<Stage>) -> Self {
        trace.push(Stage::Emitted);
        Outcome {
            html,
            path,
            validation: None,
            report: None,
            trace,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RepairConfig,
}

impl Pipeline {
    pub fn new(config: RepairConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    pub fn process(&self, raw: &RawResponse) -> Outcome {
        match raw {
            RawResponse::Text(text) => self.process_text(text),
            RawResponse::Json(Value::String(text)) => self.process_text(text),
            RawResponse::Json(value) => self.process_json(value),
        }
    }

    /// Finished document string for `raw`. Never empty.
    pub fn render(&self, raw: &RawResponse) -> String {
        self.process(raw).html
    }

    pub fn render_payload(&self, payload: &str) -> String {
        self.render(&RawResponse::from_payload(payload))
    }

    fn process_json(&self, value: &Value) -> Outcome {
        let trace = vec![Stage::Received];
        match document_from_json(value) {
            Ok(doc) => {
                debug!("[pipeline] JSON payload with {} item(s)", doc.item_count());
                Outcome::emitted(doc.to_string(), RenderPath::Json, trace)
            }
            Err(e) => {
                warn!("[pipeline] unusable JSON payload: {}", e);
                let html = fallback::could_not_process(&self.config).to_string();
                Outcome::emitted(html, RenderPath::Unprocessable, trace)
            }
        }
    }

    fn process_text(&self, raw: &str) -> Outcome {
        let mut trace = vec![Stage::Received];
        let body = strip_code_fence(raw);
        if body.is_empty() {
            info!("[pipeline] empty response, using fallback");
            let html = fallback::build(body, &self.config).to_string();
            return Outcome::emitted(html, RenderPath::Fallback, trace);
        }

        let converted;
        let body = if markdown::looks_like_markdown(body) {
            debug!("[pipeline] markdown-shaped response, converting");
            converted = markdown::to_html(body);
            converted.as_str()
        } else {
            body
        };

        let normalized = normalize(body);
        trace.push(Stage::Normalized);
        let (repaired, report) = repair(&normalized, &self.config);
        trace.push(Stage::Repaired);
        let validation = validate(&repaired, &self.config);
        trace.push(Stage::Validated);

        let mut outcome = if validation.is_valid() {
            Outcome::emitted(repaired, RenderPath::PassThrough, trace)
        } else {
            warn!("[pipeline] validation failed: {}", validation);
            match reconstruct(&normalized, &self.config) {
                Ok(doc) => {
                    trace.push(Stage::Reconstructed);
                    Outcome::emitted(doc.to_string(), RenderPath::Reconstructed, trace)
                }
                Err(e) => {
                    warn!("[pipeline] reconstruction failed: {}, using fallback", e);
                    let html = fallback::build(body, &self.config).to_string();
                    Outcome::emitted(html, RenderPath::Fallback, trace)
                }
            }
        };
        outcome.validation = Some(validation);
        outcome.report = Some(report);
        outcome
    }
}

/// Repair `raw` with the default configuration. Total: always returns a
/// renderable document.
pub fn rebuild_structured_html(raw: &str) -> String {
    Pipeline::default().render_payload(raw)
}

#[cfg(test)]
mod tests;
