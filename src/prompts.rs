//! Prompt templates sent to the model. The markup samples inside them are
//! rendered from `Document`s, so they always match what the emitter writes.

use crate::document::{Document, Mode, KEY_INSIGHTS, RECOMMENDATIONS, RESPONSE, ROOT_OPEN};

const ANALYST_INTRO: &str = "You are an expert ad creative analyst for Avata.";

const DISPLAY_NOTE: &str = "YOUR RESPONSE WILL BE DISPLAYED DIRECTLY IN THE UI WITH NO MODIFICATIONS.";

type SampleItem<'a> = (&'a str, &'a str, &'a [&'a str]);

fn sample_document(mode: Mode, sections: &[(&str, &[SampleItem])]) -> Document {
    let mut doc = Document::new(mode);
    for (title, items) in sections {
        if let Some(section) = doc.section_mut(title) {
            for (category, description, details) in items.iter() {
                section.push(
                    category,
                    description,
                    details.iter().map(|d| d.to_string()).collect(),
                );
            }
        }
    }
    doc
}

/// One top-level block per line, indented under the root container.
fn layout(doc: &Document) -> String {
    let mut out = String::from(ROOT_OPEN);
    out.push('\n');
    for node in &doc.to_element().children {
        out.push_str(&format!("  {}\n", node));
    }
    out.push_str("</div>");
    out
}

fn structure_block(doc: &Document) -> String {
    format!(
        "IMPORTANT HTML FORMATTING INSTRUCTIONS:\n\
         Your response MUST be valid, properly nested HTML that exactly follows this structure:\n\n{}",
        layout(doc)
    )
}

fn requirements(title_rules: &[String]) -> String {
    let mut rules = vec![format!(
        "ALWAYS wrap your entire response in {}</div>",
        ROOT_OPEN
    )];
    rules.extend(title_rules.iter().cloned());
    rules.extend(
        [
            "ALWAYS format each numbered point as <div class=\"numbered-item\"><span class=\"item-number\">N.</span> <strong>Category</strong>: Text</div>",
            "EVERY numbered item MUST be immediately followed by <ul class=\"insight-list\"> with at least one <li> item",
            "All list items must be inside a <ul> tag - NEVER place <li> tags outside of a <ul> tag",
            "ALWAYS close all tags properly - every opening tag must have a matching closing tag",
            "COMPLETE all HTML elements - never leave a tag incomplete or broken",
            "End the response with proper closing tags - make sure the final </div> is included",
        ]
        .iter()
        .map(|r| r.to_string()),
    );

    let mut out = String::from("CRITICAL REQUIREMENTS:\n");
    for (idx, rule) in rules.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, rule));
    }
    out
}

fn review_structure() -> Document {
    sample_document(
        Mode::InitialReview,
        &[
            (
                KEY_INSIGHTS,
                &[
                    ("Category Name", "Explanation text here", &["Detail point 1", "Detail point 2"]),
                    ("Another Category", "Explanation text here", &["Detail point 1", "Detail point 2"]),
                ],
            ),
            (
                RECOMMENDATIONS,
                &[
                    (
                        "Recommendation Category",
                        "Specific recommendation",
                        &["Implementation detail 1", "Implementation detail 2"],
                    ),
                    (
                        "Second Recommendation",
                        "Another specific recommendation",
                        &["Implementation detail 1", "Implementation detail 2"],
                    ),
                ],
            ),
        ],
    )
}

fn review_sample() -> Document {
    sample_document(
        Mode::InitialReview,
        &[
            (KEY_INSIGHTS, &[("Visual Appeal", "Strong imagery", &["Detail 1", "Detail 2"])]),
            (RECOMMENDATIONS, &[("Recommendation", "Suggestion", &["Detail 1"])]),
        ],
    )
}

fn chat_structure() -> Document {
    sample_document(
        Mode::ChatResponse,
        &[(
            RESPONSE,
            &[
                ("Category Name", "Explanation text here", &["Detail point 1", "Detail point 2"]),
                ("Another Category", "Explanation text here", &["Detail point 1", "Detail point 2"]),
            ],
        )],
    )
}

fn chat_sample() -> Document {
    sample_document(
        Mode::ChatResponse,
        &[(
            RESPONSE,
            &[
                ("Visual Appeal", "Strong imagery", &["Detail 1", "Detail 2"]),
                ("Second Point", "Additional info", &["Detail 1"]),
            ],
        )],
    )
}

/// System prompt for the first review of an uploaded ad.
pub fn review_system_prompt() -> String {
    let title_rules = [
        format!(
            "ONLY use TWO section titles: \"{}\" and \"{}\"",
            KEY_INSIGHTS, RECOMMENDATIONS
        ),
        format!(
            "NEVER duplicate section titles - only use ONE <h3> tag for \"{}\" and ONE for \"Recommendations\"",
            KEY_INSIGHTS
        ),
    ];
    format!(
        "{} Analyze this ad image and provide detailed feedback on its effectiveness, \
         personalization potential, audience alignment, and predicted performance. \
         Include specific recommendations for improvement.\n\n{}\n\n{}\nSAMPLE:\n{}\n\n{}",
        ANALYST_INTRO,
        structure_block(&review_structure()),
        requirements(&title_rules),
        layout(&review_sample()),
        DISPLAY_NOTE
    )
}

pub fn review_user_prompt(ad_context: &str) -> String {
    format!(
        "Analyze this ad creative. Context provided by advertiser: {}",
        ad_context
    )
}

/// System prompt for follow-up questions about an earlier review.
/// `insights` are the one-line key insights of that review.
pub fn chat_system_prompt(ad_context: &str, insights: &[String]) -> String {
    let title_rules = [
        format!("ONLY use ONE section title: \"{}\"", RESPONSE),
        "NEVER duplicate section titles".to_string(),
    ];
    format!(
        "{} You've previously analyzed an ad and provided feedback.\n\
         The original ad context was: \"{}\".\n\
         Your analysis found these key insights: \"{}\".\n\
         Now answer the user's follow-up question about this ad review.\n\n{}\n\n{}\nSAMPLE:\n{}\n\n{}",
        ANALYST_INTRO,
        ad_context,
        insights.join(", "),
        structure_block(&chat_structure()),
        requirements(&title_rules),
        layout(&chat_sample()),
        DISPLAY_NOTE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepairConfig;
    use crate::validator::validate;

    /// The markup between `SAMPLE:\n` and the blank line after it.
    fn sample_of(prompt: &str) -> &str {
        let start = prompt.find("SAMPLE:\n").unwrap() + "SAMPLE:\n".len();
        let len = prompt[start..].find("\n\n").unwrap();
        &prompt[start..start + len]
    }

    #[test]
    fn test_review_prompt_samples_validate() {
        let prompt = review_system_prompt();
        assert!(prompt.starts_with(ANALYST_INTRO));
        assert!(prompt.ends_with(DISPLAY_NOTE));
        assert!(prompt.contains("2. ONLY use TWO section titles"));
        assert!(prompt.contains("9. End the response with proper closing tags"));

        let sample = sample_of(&prompt);
        assert!(sample.contains(
            r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Visual Appeal</strong>: Strong imagery</div>"#
        ));
        let validation = validate(sample, &RepairConfig::default());
        assert!(validation.is_valid(), "{}", validation);
        assert_eq!(validation.mode, Some(Mode::InitialReview));
    }

    #[test]
    fn test_chat_prompt_embeds_context() {
        let prompt = chat_system_prompt(
            "Summer sale banner",
            &["Tone: Friendly".to_string(), "CTA: Weak".to_string()],
        );
        assert!(prompt.contains("The original ad context was: \"Summer sale banner\"."));
        assert!(prompt.contains("key insights: \"Tone: Friendly, CTA: Weak\""));
        assert!(!prompt.contains(KEY_INSIGHTS));

        let validation = validate(sample_of(&prompt), &RepairConfig::default());
        assert!(validation.is_valid(), "{}", validation);
        assert_eq!(validation.mode, Some(Mode::ChatResponse));
    }

    #[test]
    fn test_user_prompt() {
        assert_eq!(
            review_user_prompt("Coffee ad"),
            "Analyze this ad creative. Context provided by advertiser: Coffee ad"
        );
    }
}
