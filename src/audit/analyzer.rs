use serde::Deserialize;

use crate::audit::ai_model::{MockTextInference, TextInference, strip_code_fence};
use crate::audit::error::AuditError;
use crate::audit::issue_model::{HeuristicCategory, Issue, Occurrence, Severity};
use crate::capture::capture_model::Capture;
use crate::dom::dom_model::{Document, NodeId};
use crate::dom::parser::parse_html;
use crate::locator::resolver::resolve;

// ============================================================================
// IssueAnalyzer trait
// ============================================================================

/// Produces the heuristic issue list for a capture.
pub trait IssueAnalyzer {
    fn analyze(&self, capture: &Capture) -> Result<Vec<HeuristicCategory>, AuditError>;
}

// ============================================================================
// MockIssueAnalyzer (rule-based, no model needed)
// ============================================================================

/// Rule-based analyzer over the captured markup. Finds the structural
/// problems that need no visual judgment and anchors each occurrence with
/// a locator computed from the snapshot itself.
pub struct MockIssueAnalyzer;

impl IssueAnalyzer for MockIssueAnalyzer {
    fn analyze(&self, capture: &Capture) -> Result<Vec<HeuristicCategory>, AuditError> {
        let doc = parse_html(&capture.full_html);
        let elements = doc.elements();

        let mut accessibility = Vec::new();
        let mut navigation = Vec::new();
        let mut content = Vec::new();

        let images: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|&n| doc.tag_name(n) == Some("img") && doc.attr(n, "alt").is_none())
            .collect();
        push_issue(
            &mut accessibility,
            &doc,
            "Images without alternative text",
            "Screen reader users get no description of these images.",
            Severity::High,
            &images,
        );

        let unlabeled: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|&n| is_form_control(&doc, n) && !has_label(&doc, n))
            .collect();
        push_issue(
            &mut accessibility,
            &doc,
            "Form fields without labels",
            "Fields rely on placeholder text or nothing at all to explain what they expect.",
            Severity::Medium,
            &unlabeled,
        );

        let mute_buttons: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|&n| doc.tag_name(n) == Some("button") && !has_accessible_name(&doc, n))
            .collect();
        push_issue(
            &mut accessibility,
            &doc,
            "Buttons without accessible names",
            "Icon-only buttons need an aria-label so their action is announced.",
            Severity::Medium,
            &mute_buttons,
        );

        let empty_links: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|&n| {
                doc.tag_name(n) == Some("a")
                    && doc.attr(n, "href").is_some()
                    && !has_accessible_name(&doc, n)
            })
            .collect();
        push_issue(
            &mut navigation,
            &doc,
            "Links without discernible text",
            "Users cannot tell where these links lead.",
            Severity::Medium,
            &empty_links,
        );

        let has_title = elements
            .iter()
            .any(|&n| doc.tag_name(n) == Some("title") && !doc.text_content(n).trim().is_empty());
        if !has_title {
            let head: Vec<NodeId> = elements
                .iter()
                .copied()
                .filter(|&n| doc.tag_name(n) == Some("head"))
                .take(1)
                .collect();
            push_issue(
                &mut content,
                &doc,
                "Page has no title",
                "The browser tab and bookmarks show no meaningful name for this page.",
                Severity::Low,
                &head,
            );
        }

        Ok([
            ("Accessibility", accessibility),
            ("Navigation", navigation),
            ("Content", content),
        ]
        .into_iter()
        .filter(|(_, issues)| !issues.is_empty())
        .map(|(name, issues)| HeuristicCategory {
            name: name.to_string(),
            issues,
        })
        .collect())
    }
}

fn push_issue(
    issues: &mut Vec<Issue>,
    doc: &Document,
    title: &str,
    description: &str,
    severity: Severity,
    nodes: &[NodeId],
) {
    if nodes.is_empty() {
        return;
    }
    issues.push(Issue {
        id: String::new(),
        title: title.to_string(),
        description: description.to_string(),
        severity,
        occurrences: nodes
            .iter()
            .map(|&n| Occurrence {
                locator: resolve(doc, n),
                note: None,
                image: None,
            })
            .collect(),
    });
}

fn is_form_control(doc: &Document, n: NodeId) -> bool {
    match doc.tag_name(n) {
        Some("select") | Some("textarea") => true,
        Some("input") => !matches!(
            doc.attr(n, "type").map(str::to_ascii_lowercase).as_deref(),
            Some("hidden" | "submit" | "button" | "reset" | "image")
        ),
        _ => false,
    }
}

fn has_label(doc: &Document, n: NodeId) -> bool {
    if doc.attr(n, "aria-label").is_some_and(|v| !v.trim().is_empty())
        || doc.attr(n, "aria-labelledby").is_some()
    {
        return true;
    }

    // Wrapped in a <label>
    let mut current = doc.parent_element(n);
    while let Some(p) = current {
        if doc.tag_name(p) == Some("label") {
            return true;
        }
        current = doc.parent_element(p);
    }

    // <label for="...">
    let Some(id) = doc.element_id(n) else {
        return false;
    };
    doc.elements()
        .into_iter()
        .any(|l| doc.tag_name(l) == Some("label") && doc.attr(l, "for") == Some(id))
}

fn has_accessible_name(doc: &Document, n: NodeId) -> bool {
    if !doc.text_content(n).trim().is_empty() {
        return true;
    }
    if doc.attr(n, "aria-label").is_some_and(|v| !v.trim().is_empty())
        || doc.attr(n, "title").is_some_and(|v| !v.trim().is_empty())
    {
        return true;
    }
    doc.descendants(n).into_iter().any(|d| {
        doc.tag_name(d) == Some("img") && doc.attr(d, "alt").is_some_and(|a| !a.trim().is_empty())
    })
}

// ============================================================================
// LlmIssueAnalyzer (vision model over truncated HTML + screenshot)
// ============================================================================

#[derive(Deserialize)]
struct AnalysisResponse {
    categories: Vec<HeuristicCategory>,
}

/// Parse a model answer, accepting either `{"categories": [...]}` or a bare
/// array of categories.
pub fn try_parse_analysis(response: &str) -> Option<Vec<HeuristicCategory>> {
    let body = strip_code_fence(response);
    if let Ok(wrapped) = serde_json::from_str::<AnalysisResponse>(body) {
        return Some(wrapped.categories);
    }
    serde_json::from_str::<Vec<HeuristicCategory>>(body).ok()
}

/// Model-backed analyzer. Falls back to `MockIssueAnalyzer` when the model
/// is unreachable or its answer does not parse.
pub struct LlmIssueAnalyzer {
    backend: Box<dyn TextInference>,
}

impl LlmIssueAnalyzer {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    /// Analyzer backed by a canned model answer.
    pub fn with_mock_response(response: &str) -> Self {
        Self {
            backend: Box::new(MockTextInference {
                response: response.to_string(),
            }),
        }
    }

    fn build_prompt(capture: &Capture) -> String {
        format!(
            r##"You are a UX auditor. Review the attached screenshot and the HTML of the page at {url}.
Group usability problems by heuristic (e.g. "Visibility of system status", "Consistency and standards").
For every problem, list the elements where it occurs as CSS selectors that match the HTML below.

Return ONLY valid JSON matching this exact schema:
{{
  "categories": [
    {{
      "name": "heuristic name",
      "issues": [
        {{
          "title": "short problem statement",
          "description": "why it hurts users",
          "severity": "low|medium|high",
          "occurrences": [ {{ "locator": "css selector", "note": "optional detail" }} ]
        }}
      ]
    }}
  ]
}}

HTML:
{html}"##,
            url = capture.url,
            html = capture.truncated_html,
        )
    }
}

impl IssueAnalyzer for LlmIssueAnalyzer {
    fn analyze(&self, capture: &Capture) -> Result<Vec<HeuristicCategory>, AuditError> {
        let prompt = Self::build_prompt(capture);
        let images = vec![capture.screenshot_base64.clone()];

        match self
            .backend
            .infer_text(&prompt, &images)
            .and_then(|r| try_parse_analysis(&r))
        {
            Some(categories) => Ok(categories),
            None => MockIssueAnalyzer.analyze(capture),
        }
    }
}
