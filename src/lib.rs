//! Repairs, validates and rebuilds the structured HTML analyses produced by a
//! language model, so the UI always receives a renderable document.

pub mod config;
pub mod document;
pub mod extract;
pub mod fallback;
pub mod html_tok;
pub mod html_types;
pub mod json_adapter;
pub mod markdown;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod reconstruct;
pub mod repair;
pub mod scoring;
pub mod tag_stack_parser;
pub mod validator;

pub use config::{ConfigError, RepairConfig};
pub use document::{Document, Item, Mode, Section};
pub use pipeline::{rebuild_structured_html, Outcome, Pipeline, RawResponse, RenderPath, Stage};
pub use validator::{validate, Validation};

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::config::RepairConfig;
    use crate::pipeline::{Pipeline, RawResponse};
    use crate::{json_adapter, scoring, validator};

    /// Python wrapper around a configured repair pipeline
    #[pyclass]
    #[derive(Debug)]
    struct HtmlRepairer {
        pipeline: Pipeline,
    }

    #[pymethods]
    impl HtmlRepairer {
        /// Configuration comes from `INSIGHT_REPAIR_*` environment variables
        /// when `from_env` is set.
        #[new]
        #[pyo3(signature = (from_env = false))]
        fn new(from_env: bool) -> PyResult<Self> {
            let config = if from_env {
                RepairConfig::from_env().map_err(|e| PyValueError::new_err(e.to_string()))?
            } else {
                RepairConfig::default()
            };
            Ok(Self {
                pipeline: Pipeline::new(config),
            })
        }

        /// Repair a raw text response
        #[pyo3(text_signature = "($self, raw)")]
        fn rebuild(&self, raw: String) -> String {
            self.pipeline.render(&RawResponse::Text(raw))
        }

        /// Repair a payload that may be JSON or text
        #[pyo3(text_signature = "($self, payload)")]
        fn render_payload(&self, payload: String) -> String {
            self.pipeline.render_payload(&payload)
        }

        /// Map a JSON payload directly, failing instead of degrading
        #[pyo3(text_signature = "($self, payload)")]
        fn render_json(&self, payload: String) -> PyResult<String> {
            let value: serde_json::Value = serde_json::from_str(&payload)
                .map_err(|e| PyValueError::new_err(format!("Invalid JSON: {}", e)))?;
            json_adapter::document_from_json(&value)
                .map(|doc| doc.to_string())
                .map_err(|e| PyValueError::new_err(e.to_string()))
        }

        /// Returns (is_valid, problems)
        #[pyo3(text_signature = "($self, html)")]
        fn validate(&self, html: String) -> (bool, Vec<String>) {
            let validation = validator::validate(&html, self.pipeline.config());
            let problems = validation
                .missing
                .iter()
                .map(|l| format!("missing {}", l))
                .chain(validation.defects.iter().map(|d| d.to_string()))
                .collect();
            (validation.is_valid(), problems)
        }

        /// Keyword scores for a finished analysis, as a JSON string
        #[pyo3(text_signature = "($self, text)")]
        fn scores(&self, text: String) -> String {
            scoring::scores_json(&text).to_string()
        }
    }

    #[pyfunction]
    fn rebuild_structured_html(raw: String) -> String {
        crate::pipeline::rebuild_structured_html(&raw)
    }

    /// A Python module for repairing structured analysis HTML
    #[pymodule]
    fn insight_repair(_py: Python, m: &PyModule) -> PyResult<()> {
        let _ = env_logger::try_init();
        m.add_class::<HtmlRepairer>()?;
        m.add_function(wrap_pyfunction!(rebuild_structured_html, m)?)?;
        Ok(())
    }
}
