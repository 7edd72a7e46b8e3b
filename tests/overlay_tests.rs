use ux_overlay::dom::parser::parse_html;
use ux_overlay::locator::locator_model::Locator;
use ux_overlay::overlay::annotation_model::Annotation;
use ux_overlay::overlay::projector::{AnnotationProjector, ISSUE_ID_ATTR, OverlayStyle};

use crate::common::fixtures::{SAMPLE_HTML, first, nth, overlay_nodes};

mod common;

fn annotation(locator: &str, label: &str, issue_id: &str) -> Annotation {
    Annotation::new(Locator::from(locator), label, issue_id)
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn projecting_nothing_leaves_document_untouched() {
    let mut doc = parse_html(SAMPLE_HTML);
    let before = doc.to_html();

    let mut projector = AnnotationProjector::default();
    let report = projector.project(&mut doc, &[], true);

    assert_eq!(report.highlighted, 0);
    assert!(report.skipped.is_empty());
    assert_eq!(doc.to_html(), before);
}

#[test]
fn projection_outlines_and_labels_matches() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();

    let report = projector.project(&mut doc, &[annotation("#a", "1.1", "issue-1")], true);
    assert_eq!(report.highlighted, 1);

    let a = doc.find_by_id("a").expect("div#a");
    assert_eq!(
        doc.style_property(a, "outline").as_deref(),
        Some(OverlayStyle::default().outline.as_str())
    );
    assert_eq!(doc.position(a), "relative");

    let labels = overlay_nodes(&doc, "label");
    assert_eq!(labels.len(), 1);
    assert_eq!(doc.parent(labels[0]), Some(a), "label is placed inside the element");
    assert_eq!(doc.text_content(labels[0]), "1.1");
    assert_eq!(doc.attr(labels[0], ISSUE_ID_ATTR), Some("issue-1"));
}

#[test]
fn projection_keeps_existing_positioning() {
    let mut doc = parse_html(r#"<body><p style="position: absolute; top: 4px">x</p></body>"#);
    let mut projector = AnnotationProjector::default();
    projector.project(&mut doc, &[annotation("p", "1.1", "i")], true);

    let p = first(&doc, "p");
    assert_eq!(doc.position(p), "absolute");
}

#[test]
fn every_match_of_a_locator_is_highlighted() {
    let mut doc = parse_html("<body><li>a</li><li>b</li><li>c</li></body>");
    let mut projector = AnnotationProjector::default();

    let report = projector.project(&mut doc, &[annotation("li", "2.1", "i")], true);
    assert_eq!(report.highlighted, 3);
    assert_eq!(overlay_nodes(&doc, "label").len(), 3);
}

#[test]
fn missing_anchor_is_skipped_without_affecting_others() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();

    let report = projector.project(
        &mut doc,
        &[
            annotation("#gone", "1.1", "i1"),
            annotation("div[", "1.2", "i2"),
            annotation("main p", "1.3", "i3"),
        ],
        true,
    );

    assert_eq!(report.highlighted, 1);
    assert_eq!(
        report.skipped,
        vec![Locator::from("#gone"), Locator::from("div[")]
    );
    let labels = overlay_nodes(&doc, "label");
    assert_eq!(labels.len(), 1);
    assert_eq!(doc.text_content(labels[0]), "1.3");
}

#[test]
fn labels_do_not_shift_later_locators() {
    let mut doc = parse_html(r#"<div id="a"><span>x</span><span>y</span></div>"#);
    let second = nth(&doc, "span", 1);
    let mut projector = AnnotationProjector::default();

    let report = projector.project(
        &mut doc,
        &[
            annotation("#a span", "1.1", "i1"),
            annotation("#a span:nth-of-type(2)", "1.2", "i2"),
        ],
        true,
    );

    // "#a span" matches both spans; the second locator still lands on "y".
    assert_eq!(report.highlighted, 3);
    let labelled_y = doc
        .children(second)
        .iter()
        .filter(|&&c| doc.attr(c, ISSUE_ID_ATTR) == Some("i2"))
        .count();
    assert_eq!(labelled_y, 1);
}

#[test]
fn void_elements_get_label_as_next_sibling() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();
    projector.project(&mut doc, &[annotation("img", "3.1", "i")], true);

    let img = first(&doc, "img");
    let label = overlay_nodes(&doc, "label")[0];
    assert!(doc.children(img).is_empty());
    assert_eq!(doc.parent(label), doc.parent(img));

    let main = first(&doc, "main");
    let siblings: Vec<_> = doc.element_children(main).collect();
    let img_index = siblings.iter().position(|&n| n == img).expect("img in main");
    assert_eq!(siblings[img_index + 1], label);
}

#[test]
fn reprojecting_replaces_previous_set() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();

    projector.project(&mut doc, &[annotation("#a", "1.1", "i1")], true);
    projector.project(&mut doc, &[annotation("button", "1.1", "i2")], true);

    let labels = overlay_nodes(&doc, "label");
    assert_eq!(labels.len(), 1);
    assert_eq!(doc.attr(labels[0], ISSUE_ID_ATTR), Some("i2"));
    let a = doc.find_by_id("a").expect("div#a");
    assert_eq!(doc.attr(a, "style"), None, "previous outline removed");
}

// ============================================================================
// Visibility toggle
// ============================================================================

#[test]
fn hidden_projection_draws_nothing_until_shown() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();

    let report = projector.project(&mut doc, &[annotation("main p", "1.1", "i")], false);
    assert_eq!(report.highlighted, 0);
    assert!(overlay_nodes(&doc, "label").is_empty());
    assert!(!projector.is_visible());

    projector.set_visible(&mut doc, true);
    assert_eq!(overlay_nodes(&doc, "label").len(), 1);
}

#[test]
fn hiding_restores_original_inline_styles() {
    let mut doc = parse_html(SAMPLE_HTML);
    let before = doc.to_html();
    let mut projector = AnnotationProjector::default();

    projector.project(
        &mut doc,
        &[annotation("main p", "1.1", "i1"), annotation("button", "1.2", "i2")],
        true,
    );
    assert_ne!(doc.to_html(), before);

    projector.set_visible(&mut doc, false);
    assert_eq!(doc.to_html(), before, "hiding must undo every mutation");
    assert_eq!(projector.annotations().len(), 2, "the set is kept while hidden");

    let p = first(&doc, "main p");
    assert_eq!(doc.attr(p, "style"), Some("color: red"));
}

#[test]
fn clear_removes_everything() {
    let mut doc = parse_html(SAMPLE_HTML);
    let before = doc.to_html();
    let mut projector = AnnotationProjector::default();

    projector.project(&mut doc, &[annotation("span", "1.1", "i")], true);
    projector.clear(&mut doc);
    assert_eq!(doc.to_html(), before);
    assert!(projector.label_nodes().is_empty());
}

// ============================================================================
// Hover binding
// ============================================================================

#[test]
fn issue_at_resolves_label_and_its_text() {
    let mut doc = parse_html(SAMPLE_HTML);
    let mut projector = AnnotationProjector::default();
    projector.project(&mut doc, &[annotation("button", "2.4", "issue-7")], true);

    let label = projector.label_nodes()[0];
    let text = doc.children(label)[0];
    assert_eq!(projector.issue_at(&doc, label), Some("issue-7"));
    assert_eq!(projector.issue_at(&doc, text), Some("issue-7"));

    let button = first(&doc, "button");
    assert_eq!(
        projector.issue_at(&doc, button),
        None,
        "the annotated element itself is not a hover target"
    );
}

#[test]
fn custom_style_is_applied() {
    let mut doc = parse_html(SAMPLE_HTML);
    let style = OverlayStyle {
        outline: "3px dashed blue".to_string(),
        label_background: "navy".to_string(),
        label_color: "white".to_string(),
    };
    let mut projector = AnnotationProjector::new(style);
    projector.project(&mut doc, &[annotation("button", "1.1", "i")], true);

    let button = first(&doc, "button");
    assert_eq!(doc.style_property(button, "outline").as_deref(), Some("3px dashed blue"));
    let label = overlay_nodes(&doc, "label")[0];
    assert_eq!(doc.style_property(label, "background").as_deref(), Some("navy"));
}

// ============================================================================
// Annotation model
// ============================================================================

#[test]
fn annotation_serializes_camel_case_and_relabels() {
    let mut a = annotation("#a", "1.1", "issue-1");
    assert_eq!(
        serde_json::to_value(&a).expect("serialize"),
        serde_json::json!({ "locator": "#a", "label": "1.1", "issueId": "issue-1" })
    );

    a.relabel("1.2");
    assert_eq!(a.label(), "1.2");
    assert_eq!(a.locator().as_str(), "#a");
}
