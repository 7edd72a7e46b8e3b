use serde::Deserialize;

use crate::audit::ai_model::{MockTextInference, TextInference, strip_code_fence};
use crate::audit::error::AuditError;
use crate::capture::capture_model::Capture;
use crate::dom::parser::parse_html;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Markup with `id` attributes dropped and whitespace runs collapsed, so
/// generated ids and reformatting do not count as a change.
pub fn normalize_markup(html: &str) -> String {
    let mut doc = parse_html(html);
    for node in doc.elements() {
        doc.remove_attr(node, "id");
    }
    doc.to_html().split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalized_fingerprint(html: &str) -> String {
    text_fingerprint(&normalize_markup(html))
}

// ============================================================================
// EquivalenceService trait
// ============================================================================

/// Judges whether two captures of a URL show the same experience.
pub trait EquivalenceService {
    fn is_same_experience(&self, old: &Capture, new: &Capture) -> Result<bool, AuditError>;
}

/// Offline judge: same experience iff the normalized markup matches.
pub struct MarkupEquivalence;

impl EquivalenceService for MarkupEquivalence {
    fn is_same_experience(&self, old: &Capture, new: &Capture) -> Result<bool, AuditError> {
        Ok(normalized_fingerprint(&old.truncated_html) == normalized_fingerprint(&new.truncated_html))
    }
}

#[derive(Deserialize)]
struct Verdict {
    same: bool,
}

/// Model-backed oracle fed both HTML prefixes and the new screenshot.
pub struct LlmEquivalence {
    backend: Box<dyn TextInference>,
}

impl LlmEquivalence {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    pub fn with_mock_response(response: &str) -> Self {
        Self {
            backend: Box::new(MockTextInference {
                response: response.to_string(),
            }),
        }
    }

    fn build_prompt(old: &Capture, new: &Capture) -> String {
        format!(
            r#"You compare two captures of the same web page and decide whether a user would experience them as the same page.
Ignore superficial noise: generated or random ids, timestamps, minor copy edits, tracking attributes.
Treat added, removed or rearranged sections, changed navigation and changed forms as a different experience.
The attached image is a screenshot of the NEW capture.

Return ONLY valid JSON: {{ "same": true }} or {{ "same": false }}

OLD HTML:
{old}

NEW HTML:
{new}"#,
            old = old.truncated_html,
            new = new.truncated_html,
        )
    }
}

impl EquivalenceService for LlmEquivalence {
    fn is_same_experience(&self, old: &Capture, new: &Capture) -> Result<bool, AuditError> {
        let prompt = Self::build_prompt(old, new);
        let images = vec![new.screenshot_base64.clone()];

        let response = self
            .backend
            .infer_text(&prompt, &images)
            .ok_or_else(|| AuditError::ServiceUnavailable("equivalence model gave no answer".to_string()))?;

        let verdict: Verdict =
            serde_json::from_str(strip_code_fence(&response)).map_err(|e| AuditError::JsonParse {
                context: "equivalence verdict".to_string(),
                source: e,
            })?;
        Ok(verdict.same)
    }
}

/// Reuse decision for a new capture against a stored one. Identical
/// normalized markup short-circuits the service; a failing service counts
/// as "not the same".
pub fn check_equivalence(
    service: &dyn EquivalenceService,
    old: &Capture,
    new: &Capture,
    tracer: &TraceLogger,
) -> bool {
    if normalized_fingerprint(&old.truncated_html) == normalized_fingerprint(&new.truncated_html) {
        tracer.log(TraceEvent::now("pipeline", "equivalent_markup").with_detail(&new.url));
        return true;
    }

    match service.is_same_experience(old, new) {
        Ok(same) => {
            tracer.log(
                TraceEvent::now("pipeline", "equivalence_verdict")
                    .with_detail(if same { "same" } else { "different" }),
            );
            same
        }
        Err(e) => {
            tracer.log(TraceEvent::now("pipeline", "equivalence_failed").with_detail(e));
            false
        }
    }
}
