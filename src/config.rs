use std::fmt;

use crate::document::Mode;

/// Bullet the repairer inserts when an item has no detail list. Its
/// presence in repaired output means the source was too damaged to trust.
pub const REPAIR_PLACEHOLDER: &str = "Details not provided";

/// Tunables for the repair pipeline. `Default` matches the contract the
/// rendering layer expects; the builder methods exist for tests and
/// deployments that need different wording.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    pub repair_placeholder: String,
    pub fallback_detail: String,
    pub empty_content_summary: String,
    pub unprocessable_summary: String,
    /// Minimum normalized Damerau-Levenshtein similarity for a header to
    /// count as a canonical section title.
    pub title_similarity: f64,
    /// Mode assumed when items are present but no header survived.
    pub default_mode: Mode,
    /// Characters kept by the fallback when no sentence end is found.
    pub sentence_fallback_chars: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            repair_placeholder: REPAIR_PLACEHOLDER.to_string(),
            fallback_detail:
                "Analysis details have been processed but couldn't be displayed in the required format"
                    .to_string(),
            empty_content_summary: "No content available".to_string(),
            unprocessable_summary: "The response could not be processed.".to_string(),
            title_similarity: 0.8,
            default_mode: Mode::InitialReview,
            sentence_fallback_chars: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { key: String, value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value, reason } => {
                write!(f, "invalid value '{}' for {}: {}", value, key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl RepairConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title_similarity(mut self, similarity: f64) -> Self {
        self.title_similarity = similarity.clamp(0.0, 1.0);
        self
    }

    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_repair_placeholder(mut self, placeholder: &str) -> Self {
        self.repair_placeholder = placeholder.to_string();
        self
    }

    pub fn with_fallback_detail(mut self, detail: &str) -> Self {
        self.fallback_detail = detail.to_string();
        self
    }

    /// Defaults overridden by the environment:
    ///
    /// - `INSIGHT_REPAIR_TITLE_SIMILARITY`: float in `0.0..=1.0`
    /// - `INSIGHT_REPAIR_DEFAULT_MODE`: `review`, `chat` or `summary`
    /// - `INSIGHT_REPAIR_PLACEHOLDER`: repairer placeholder bullet text
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("INSIGHT_REPAIR_TITLE_SIMILARITY") {
            let similarity: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "INSIGHT_REPAIR_TITLE_SIMILARITY".to_string(),
                value: raw.clone(),
                reason: "expected a number".to_string(),
            })?;
            if !(0.0..=1.0).contains(&similarity) {
                return Err(ConfigError::InvalidValue {
                    key: "INSIGHT_REPAIR_TITLE_SIMILARITY".to_string(),
                    value: raw,
                    reason: "must be between 0 and 1".to_string(),
                });
            }
            config.title_similarity = similarity;
        }

        if let Some(raw) = lookup("INSIGHT_REPAIR_DEFAULT_MODE") {
            config.default_mode = raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "INSIGHT_REPAIR_DEFAULT_MODE".to_string(),
                value: raw.clone(),
                reason,
            })?;
        }

        if let Some(raw) = lookup("INSIGHT_REPAIR_PLACEHOLDER") {
            if !raw.trim().is_empty() {
                config.repair_placeholder = raw.trim().to_string();
            }
        }

        Ok(config)
    }
}
