use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One JSON line in the overlay trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,

    /// Which side produced the event: "host", "frame", "bridge", "pipeline".
    pub context: String,
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

impl TraceEvent {
    pub fn now(context: &str, kind: &str) -> Self {
        Self {
            timestamp_ms: now_ms(),
            context: context.to_string(),
            kind: kind.to_string(),
            issue_id: None,
            locator: None,
            detail: None,
        }
    }

    pub fn with_issue(mut self, issue_id: impl ToString) -> Self {
        self.issue_id = Some(issue_id.to_string());
        self
    }

    pub fn with_locator(mut self, locator: impl ToString) -> Self {
        self.locator = Some(locator.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
