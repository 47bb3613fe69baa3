//! Deep reconstructor: rebuilds a `Document` from whatever the extractor
//! salvaged, filling empty sections with default items.

use log::{debug, info};
use std::fmt;

use crate::config::RepairConfig;
use crate::document::{Document, Mode, Section, RECOMMENDATIONS, SUMMARY};
use crate::extract::{extract, Extraction};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconstructError {
    /// No canonical title and no item: nothing to build a document from.
    UndeterminedMode,
}

impl fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructError::UndeterminedMode => {
                write!(f, "no section title or numbered item to infer a mode from")
            }
        }
    }
}

impl std::error::Error for ReconstructError {}

type DefaultItem = (&'static str, &'static str, [&'static str; 2]);

const INSIGHT_DEFAULTS: [DefaultItem; 2] = [
    (
        "Visual Elements",
        "The ad uses effective visual elements",
        ["Strong imagery", "Good color scheme"],
    ),
    (
        "Messaging",
        "The messaging is clear and direct",
        ["Clear value proposition", "Strong call to action"],
    ),
];

const RECOMMENDATION_DEFAULTS: [DefaultItem; 2] = [
    (
        "Visual Enhancement",
        "Improve visual elements",
        ["Use higher quality images", "Update color scheme for better contrast"],
    ),
    (
        "Message Clarity",
        "Enhance message clarity",
        ["Simplify the main call to action", "Make value proposition more prominent"],
    ),
];

const SUMMARY_DEFAULTS: [DefaultItem; 2] = [
    (
        "Overview",
        "The analysis has been processed",
        [
            "The complete analysis is available and has been processed by the system",
            "Key findings could not be recovered from the response",
        ],
    ),
    (
        "Further Information",
        "Try asking a follow-up question for more details",
        [
            "You can ask for specific aspects of the analysis",
            "Detailed insights are available through the chat interface",
        ],
    ),
];

fn defaults_for(title: &str) -> &'static [DefaultItem; 2] {
    match title {
        RECOMMENDATIONS => &RECOMMENDATION_DEFAULTS,
        SUMMARY => &SUMMARY_DEFAULTS,
        // chat answers reuse the insight defaults
        _ => &INSIGHT_DEFAULTS,
    }
}

fn fill_defaults(section: &mut Section) {
    for (category, description, details) in defaults_for(&section.title) {
        section.push(
            category,
            description,
            details.iter().map(|d| d.to_string()).collect(),
        );
    }
}

/// Any review title wins, then the chat title, then the summary title. With
/// no title at all, salvaged items go to the configured default mode.
pub fn infer_mode(extraction: &Extraction, config: &RepairConfig) -> Option<Mode> {
    Mode::from_canonical_titles(&extraction.titles()).or_else(|| {
        if extraction.item_count() > 0 {
            Some(config.default_mode)
        } else {
            None
        }
    })
}

/// Build a document from an already extracted response.
pub fn from_extraction(
    extraction: &Extraction,
    config: &RepairConfig,
) -> Result<Document, ReconstructError> {
    let mode = infer_mode(extraction, config).ok_or(ReconstructError::UndeterminedMode)?;
    let mut doc = Document::new(mode);

    for (idx, title) in mode.titles().iter().enumerate() {
        let Some(section) = doc.section_mut(title) else {
            continue;
        };
        let preamble = extraction
            .preamble()
            .filter(|_| idx == 0)
            .map(|scope| scope.items.iter())
            .into_iter()
            .flatten();
        for item in preamble.chain(extraction.items_for(title)) {
            section.push(&item.category, &item.description, item.details.clone());
        }
        if section.items().is_empty() {
            debug!("[reconstruct] no items under '{}', using defaults", title);
            fill_defaults(section);
        }
    }

    Ok(doc)
}

/// Extract fragments from `normalized` and re-emit them as a `Document`.
pub fn reconstruct(normalized: &str, config: &RepairConfig) -> Result<Document, ReconstructError> {
    info!("[reconstruct] Using deep HTML reconstruction");
    from_extraction(&extract(normalized, config), config)
}
