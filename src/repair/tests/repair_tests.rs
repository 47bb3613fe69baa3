use crate::config::RepairConfig;
use crate::html_types::HtmlError;
use crate::normalizer::normalize;
use crate::repair::repair;

/* -------------- helpers -------------------------------------------------- */

fn fix(raw: &str) -> String {
    repair(&normalize(raw), &RepairConfig::default()).0
}

fn wrap(body: &str) -> String {
    format!(r#"<div class="analysis-content">{}</div>"#, body)
}

/* -------------- tests ---------------------------------------------------- */

#[test]
fn well_formed_input_is_untouched() {
    let input = wrap(concat!(
        r#"<h3 class="section-title">Key Insights</h3>"#,
        r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Tone</strong>: Friendly</div>"#,
        r#"<ul class="insight-list"><li>Warm wording</li></ul>"#,
    ));
    let (out, report) = repair(&input, &RepairConfig::default());
    assert_eq!(out, input);
    assert_eq!(report.total_fixes(), 0);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn unclosed_marker_span_is_closed_and_marker_fixed() {
    let out = fix(concat!(
        r#"<h3 class="section-title">Key Insights</h3>"#,
        r#"<div class="numbered-item"><span class="item-number">1<strong>Visual</strong>: Good</div>"#,
        r#"<ul class="insight-list"><li>Bright</li></ul>"#,
    ));
    assert_eq!(
        out,
        wrap(concat!(
            r#"<h3 class="section-title">Key Insights</h3>"#,
            r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>Visual</strong>: Good</div>"#,
            r#"<ul class="insight-list"><li>Bright</li></ul>"#,
        ))
    );
}

#[test]
fn marker_with_parenthesis_is_rewritten() {
    let out = fix(concat!(
        r#"<div class="numbered-item"><span class="item-number">2)</span> <strong>A</strong>: b</div>"#,
        r#"<ul class="insight-list"><li>x</li></ul>"#,
    ));
    assert!(out.contains(r#"<span class="item-number">2.</span>"#));
}

#[test]
fn headings_become_canonical_section_titles() {
    let out = fix("<h2 style=\"color:red\">  Key <em>Insights</em> </h2><p>text</p>");
    assert_eq!(
        out,
        wrap(r#"<h3 class="section-title">Key Insights</h3><p>text</p>"#)
    );
}

#[test]
fn bare_bullets_are_wrapped_in_a_detail_list() {
    let out = fix(concat!(
        r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>A</strong>: b</div>"#,
        r#"<li>one</li> <li>two</li>"#,
    ));
    assert!(out.ends_with(r#"<ul class="insight-list"><li>one</li><li>two</li></ul></div>"#));
    assert!(!out.contains("</ul><li>"));
}

#[test]
fn item_without_list_gets_placeholder() {
    let (out, report) = repair(
        &normalize(r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>A</strong>: b</div>"#),
        &RepairConfig::default(),
    );
    assert!(out.contains(r#"<ul class="insight-list"><li>Details not provided</li></ul>"#));
    assert_eq!(report.placeholders_inserted, 1);
}

#[test]
fn placeholder_text_follows_config() {
    let config = RepairConfig::default().with_repair_placeholder("TBD");
    let (out, _) = repair(
        &normalize(r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>A</strong></div><ul></ul>"#),
        &config,
    );
    assert!(out.contains(r#"<ul class="insight-list"><li>TBD</li></ul>"#));
}

#[test]
fn ordered_detail_list_becomes_insight_list() {
    let out = fix(concat!(
        r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>A</strong>: b</div>"#,
        r#"<ol><li>x</li></ol>"#,
    ));
    assert!(out.contains(r#"</div><ul class="insight-list"><li>x</li></ul>"#));
}

#[test]
fn adjacent_detail_lists_are_merged() {
    let (out, report) = repair(
        &wrap(concat!(
            r#"<div class="numbered-item"><span class="item-number">1.</span> <strong>A</strong>: b</div>"#,
            r#"<ul class="insight-list"><li>x</li></ul><ul class="insight-list"><li>y</li></ul>"#,
        )),
        &RepairConfig::default(),
    );
    assert!(out.contains(r#"<ul class="insight-list"><li>x</li><li>y</li></ul>"#));
    assert_eq!(report.lists_merged, 1);
}

#[test]
fn duplicate_sections_merge_in_first_seen_order() {
    let item = |n: u32, cat: &str| {
        format!(
            r#"<div class="numbered-item"><span class="item-number">{}.</span> <strong>{}</strong></div><ul class="insight-list"><li>d</li></ul>"#,
            n, cat
        )
    };
    let input = wrap(&format!(
        r#"<h3 class="section-title">Key Insights</h3>{}<h3 class="section-title">Recommendations for Improvement</h3>{}<h3 class="section-title">Key Insights</h3>{}"#,
        item(1, "A"),
        item(1, "R"),
        item(2, "B"),
    ));
    let (out, report) = repair(&input, &RepairConfig::default());
    assert_eq!(report.sections_merged, 1);
    assert_eq!(out.matches(r#"<h3 class="section-title">"#).count(), 2);
    let a = out.find("<strong>A</strong>").unwrap();
    let b = out.find("<strong>B</strong>").unwrap();
    let r = out.find("<strong>R</strong>").unwrap();
    assert!(a < b && b < r);
}

#[test]
fn content_outside_root_is_hoisted() {
    let (out, report) = repair(
        r#"<p>before</p><div class="analysis-content"><p>inside</p></div><p>after</p>"#,
        &RepairConfig::default(),
    );
    assert_eq!(out, wrap("<p>before</p><p>inside</p><p>after</p>"));
    assert_eq!(report.nodes_hoisted, 2);
}

#[test]
fn nested_roots_and_wrappers_are_flattened() {
    let out = fix(concat!(
        r#"<div class="analysis-content"><section><div>"#,
        r#"<h3 class="section-title">Response to Your Question</h3>"#,
        r#"</div></section><div class="analysis-content"><p>x</p></div></div>"#,
    ));
    assert_eq!(
        out,
        wrap(r#"<h3 class="section-title">Response to Your Question</h3><p>x</p>"#)
    );
}

#[test]
fn scripts_and_styles_are_dropped() {
    let out = fix("<style>h3{}</style><p>kept</p><script>alert(1)</script>");
    assert_eq!(out, wrap("<p>kept</p>"));
}

#[test]
fn truncated_input_reports_diagnostics() {
    let (_, report) = repair(
        r#"<div class="analysis-content"><h3 class="section-title">Key Insights</h3><div class="numbered-item"><span class="item-nu"#,
        &RepairConfig::default(),
    );
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, HtmlError::UnterminatedTag { .. })));
    // root and item were still open
    assert_eq!(report.closers_synthesized, 2);
}

#[test]
fn repair_is_idempotent() {
    let inputs = [
        r#"<h2>Key Insights</h2><div class="numbered-item"><span class="item-number">1<b>A</b> x<li>a<li>b"#,
        "<li>orphan</li><p>x & y > z</p>",
        r#"<div class="numbered-item"><span class="item-number">3)"#,
        "",
        "plain text only",
    ];
    let config = RepairConfig::default();
    for raw in inputs {
        let once = repair(&normalize(raw), &config).0;
        let twice = repair(&once, &config).0;
        assert_eq!(once, twice, "input: {:?}", raw);
    }
}
