//! Keyword heuristics over the plain text of an analysis. Every function is
//! a pure tally of lower-cased substring hits.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::document::{Document, KEY_INSIGHTS, RECOMMENDATIONS};

static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

const PERSONALIZATION_POSITIVE: &[&str] = &[
    "personalized", "tailored", "specific", "targeted", "customized", "relevant", "individual",
    "demographic", "segment",
];
const PERSONALIZATION_NEGATIVE: &[&str] = &[
    "generic", "general", "broad", "vague", "unspecific", "impersonal", "bland", "standard",
    "conventional",
];

const ALIGNMENT_POSITIVE: &[&str] = &[
    "align", "target audience", "demographic", "resonates", "speaks to", "appeals to",
    "relevant to", "matches", "appropriate",
];
const ALIGNMENT_NEGATIVE: &[&str] = &[
    "misaligned", "disconnect", "irrelevant", "inappropriate", "mismatch", "wrong audience",
    "doesn't resonate", "doesn't appeal",
];

const SENTIMENT_POSITIVE: &[&str] = &[
    "effective", "strong", "compelling", "clear", "engaging", "successful", "impactful",
    "powerful", "attention-grabbing",
];
const SENTIMENT_NEGATIVE: &[&str] = &[
    "weak", "confusing", "unclear", "ineffective", "poor", "problematic", "inconsistent",
    "forgettable", "bland",
];

const INSIGHT_TERMS: &[&str] = &["effective", "audience", "appeal", "strength"];
const RECOMMENDATION_TERMS: &[&str] = &["should", "could", "recommend", "consider"];

const DEFAULT_INSIGHTS: [&str; 3] = [
    "The ad has some effective elements but could be more personalized.",
    "The visual hierarchy could be improved for better user engagement.",
    "The call-to-action could be more compelling.",
];
const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Add more personalized elements targeted to your specific audience.",
    "Strengthen the call-to-action with clear value proposition.",
    "Use more specific messaging that addresses customer pain points.",
];

const MAX_KEYWORD_SENTENCES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationScore {
    pub score: u8,
    pub potential_improvements: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudienceAlignment {
    pub score: u8,
    pub category: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub predicted_click_rate: String,
    pub predicted_conversion_rate: String,
    pub predicted_engagement_rate: String,
    pub confidence_level: &'static str,
    pub comparison_to_industry: &'static str,
}

/// `positive` hits add `up`, `negative` hits subtract `down`.
fn tally(lower: &str, positive: &[&str], negative: &[&str], up: f64, down: f64) -> f64 {
    let hits = |terms: &[&str]| terms.iter().filter(|t| lower.contains(*t)).count() as f64;
    hits(positive) * up - hits(negative) * down
}

/// Round half up, then clamp to the 1..=10 scale.
fn to_scale(raw: f64) -> u8 {
    (raw + 0.5).floor().clamp(1.0, 10.0) as u8
}

pub fn personalization_score(text: &str) -> PersonalizationScore {
    let lower = text.to_lowercase();
    let score = to_scale(
        5.0 + tally(&lower, PERSONALIZATION_POSITIVE, PERSONALIZATION_NEGATIVE, 0.5, 0.5),
    );
    let potential_improvements = if score < 5 {
        vec![
            "Add personalized elements specific to your target audience",
            "Include dynamic content that adapts to viewer preferences",
            "Consider segmenting your audience for more tailored messaging",
        ]
    } else if score < 8 {
        vec![
            "Refine personalization by including more specific audience signals",
            "Add contextual elements that change based on user behavior",
        ]
    } else {
        vec![
            "Continue optimizing personalization with A/B testing",
            "Consider adding real-time personalization elements",
        ]
    };
    PersonalizationScore {
        score,
        potential_improvements,
    }
}

pub fn audience_alignment(text: &str) -> AudienceAlignment {
    let lower = text.to_lowercase();
    let score = to_scale(5.0 + tally(&lower, ALIGNMENT_POSITIVE, ALIGNMENT_NEGATIVE, 0.5, 1.0));
    let category = match score {
        8.. => "Excellent",
        6..=7 => "Good",
        4..=5 => "Fair",
        _ => "Needs Improvement",
    };
    AudienceAlignment { score, category }
}

pub fn performance_metrics(text: &str) -> PerformanceMetrics {
    let lower = text.to_lowercase();
    let sentiment = tally(&lower, SENTIMENT_POSITIVE, SENTIMENT_NEGATIVE, 0.5, 0.5).clamp(-3.0, 3.0);
    let rate = |base: f64, factor: f64| format!("{:.1}%", base * (1.0 + sentiment * factor));

    let comparison_to_industry = if sentiment > 1.5 {
        "Well Above Average"
    } else if sentiment > 0.5 {
        "Above Average"
    } else if sentiment > -0.5 {
        "Average"
    } else if sentiment > -1.5 {
        "Below Average"
    } else {
        "Well Below Average"
    };

    PerformanceMetrics {
        predicted_click_rate: rate(2.8, 0.1),
        predicted_conversion_rate: rate(3.2, 0.08),
        predicted_engagement_rate: rate(4.5, 0.12),
        confidence_level: "Medium",
        comparison_to_industry,
    }
}

fn keyword_sentences(text: &str, terms: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for sentence in SENTENCE_SPLIT_RE.split(text) {
        let lower = sentence.to_lowercase();
        if terms.iter().any(|t| lower.contains(t)) {
            found.push(sentence.trim().to_string());
        }
        if found.len() >= MAX_KEYWORD_SENTENCES {
            break;
        }
    }
    found
}

fn summarize(
    doc: Option<&Document>,
    title: &str,
    text: &str,
    terms: &[&str],
    defaults: [&str; 3],
) -> Vec<String> {
    let from_doc: Vec<String> = doc
        .and_then(|d| d.section(title))
        .map(|s| s.items().iter().map(|i| i.summary_line()).collect())
        .unwrap_or_default();
    if !from_doc.is_empty() {
        return from_doc;
    }
    let sentences = keyword_sentences(text, terms);
    if !sentences.is_empty() {
        return sentences;
    }
    defaults.iter().map(|d| d.to_string()).collect()
}

/// One line per key insight: the document's own items when it has any,
/// otherwise sentences that mention what an insight usually talks about.
pub fn key_insights(text: &str, doc: Option<&Document>) -> Vec<String> {
    summarize(doc, KEY_INSIGHTS, text, INSIGHT_TERMS, DEFAULT_INSIGHTS)
}

pub fn recommendations(text: &str, doc: Option<&Document>) -> Vec<String> {
    summarize(doc, RECOMMENDATIONS, text, RECOMMENDATION_TERMS, DEFAULT_RECOMMENDATIONS)
}

/// Every score for `text`, in the shape the dashboard reads.
pub fn scores_json(text: &str) -> Value {
    let p = personalization_score(text);
    let a = audience_alignment(text);
    let m = performance_metrics(text);
    json!({
        "personalizationScore": {
            "score": p.score,
            "potentialImprovements": p.potential_improvements,
        },
        "audienceAlignment": {
            "score": a.score,
            "category": a.category,
        },
        "performanceMetrics": {
            "predictedClickRate": m.predicted_click_rate,
            "predictedConversionRate": m.predicted_conversion_rate,
            "predictedEngagementRate": m.predicted_engagement_rate,
            "confidenceLevel": m.confidence_level,
            "comparisonToIndustry": m.comparison_to_industry,
        },
    })
}
