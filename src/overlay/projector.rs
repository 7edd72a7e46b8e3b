use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Document, NodeId};
use crate::dom::hit_test::OVERLAY_ATTR;
use crate::dom::serialize::is_void_element;
use crate::locator::locator_model::Locator;
use crate::locator::resolver::locate_in;
use crate::locator::selector::QueryIndex;
use crate::overlay::annotation_model::Annotation;

pub const ISSUE_ID_ATTR: &str = "data-issue-id";

/// Visual parameters of outlines and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub outline: String,
    pub label_background: String,
    pub label_color: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            outline: "2px solid #e5484d".to_string(),
            label_background: "#e5484d".to_string(),
            label_color: "#ffffff".to_string(),
        }
    }
}

/// What a projection pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionReport {
    /// Elements that received an outline and label.
    pub highlighted: usize,

    /// Locators that matched nothing in the current document.
    pub skipped: Vec<Locator>,
}

/// Applies annotations to the document of one rendering context and
/// remembers enough to undo them.
#[derive(Debug, Default)]
pub struct AnnotationProjector {
    style: OverlayStyle,
    annotations: Vec<Annotation>,
    visible: bool,

    /// Inline style each highlighted element had before we touched it.
    original_styles: HashMap<NodeId, Option<String>>,
    labels: Vec<NodeId>,

    /// Label node -> issue id, the hover binding.
    label_bindings: HashMap<NodeId, String>,
}

impl AnnotationProjector {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn label_nodes(&self) -> &[NodeId] {
        &self.labels
    }

    /// Replace the projected set. Locators are resolved against `doc` as it
    /// is now, which need not be the document they were computed from.
    pub fn project(
        &mut self,
        doc: &mut Document,
        annotations: &[Annotation],
        visible: bool,
    ) -> ProjectionReport {
        self.annotations = annotations.to_vec();
        self.visible = visible;
        self.render(doc)
    }

    /// Show or hide the current set without replacing it.
    pub fn set_visible(&mut self, doc: &mut Document, visible: bool) -> ProjectionReport {
        self.visible = visible;
        self.render(doc)
    }

    fn render(&mut self, doc: &mut Document) -> ProjectionReport {
        self.clear(doc);

        let mut report = ProjectionReport::default();
        if !self.visible {
            return report;
        }

        // Resolve everything against one index before mutating.
        let annotations = self.annotations.clone();
        let index = QueryIndex::build(doc);
        let resolved: Vec<(&Annotation, Vec<NodeId>)> = annotations
            .iter()
            .map(|a| (a, locate_in(&index, a.locator())))
            .collect();

        for (annotation, targets) in resolved {
            if targets.is_empty() {
                report.skipped.push(annotation.locator().clone());
                continue;
            }
            for target in targets {
                self.highlight(doc, target, annotation);
                report.highlighted += 1;
            }
        }
        report
    }

    fn highlight(&mut self, doc: &mut Document, target: NodeId, annotation: &Annotation) {
        self.original_styles
            .entry(target)
            .or_insert_with(|| doc.attr(target, "style").map(str::to_string));

        doc.set_style_property(target, "outline", &self.style.outline);
        if doc.position(target) == "static" {
            doc.set_style_property(target, "position", "relative");
        }

        let label = doc.create_element(
            "span",
            vec![
                (OVERLAY_ATTR.to_string(), "label".to_string()),
                (ISSUE_ID_ATTR.to_string(), annotation.issue_id().to_string()),
                ("style".to_string(), self.label_style()),
            ],
        );
        let text = doc.create_text(annotation.label());
        doc.append_child(label, text);

        // Void elements cannot host children; the label rides along as the
        // next sibling instead.
        let is_void = doc.tag_name(target).is_some_and(is_void_element);
        if is_void {
            doc.insert_after(target, label);
        } else {
            doc.append_child(target, label);
        }

        self.labels.push(label);
        self.label_bindings
            .insert(label, annotation.issue_id().to_string());
    }

    fn label_style(&self) -> String {
        format!(
            "position: absolute; top: -12px; left: -12px; z-index: 2147483647; \
             background: {}; color: {}; font: 600 11px/1.4 sans-serif; \
             padding: 0 4px; border-radius: 3px; pointer-events: auto;",
            self.style.label_background, self.style.label_color
        )
    }

    /// Remove every outline and label and restore original inline styles.
    /// Does not touch the document when nothing is applied.
    pub fn clear(&mut self, doc: &mut Document) {
        for label in self.labels.drain(..) {
            doc.detach(label);
        }
        for (element, original) in self.original_styles.drain() {
            match original {
                Some(style) => doc.set_attr(element, "style", &style),
                None => doc.remove_attr(element, "style"),
            }
        }
        self.label_bindings.clear();
    }

    /// Issue bound to the label containing `target`, if any.
    pub fn issue_at(&self, doc: &Document, target: NodeId) -> Option<&str> {
        let mut current = Some(target);
        while let Some(node) = current {
            if let Some(issue) = self.label_bindings.get(&node) {
                return Some(issue);
            }
            current = doc.parent(node);
        }
        None
    }
}
