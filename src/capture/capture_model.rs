use serde::{Deserialize, Serialize};

use crate::dom::parser::LayoutNode;

/// Size bound (bytes) of the HTML prefix fed to the model services.
pub const DEFAULT_TRUNCATE_LIMIT: usize = 50_000;

/// Raw material of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub url: String,
    pub truncated_html: String,
    pub full_html: String,
    pub screenshot_base64: String,

    /// Per-element boxes, when the capture script measured them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutNode>,
}

impl Capture {
    pub fn new(url: &str, full_html: &str, screenshot_base64: &str, truncate_limit: usize) -> Self {
        Self {
            url: url.to_string(),
            truncated_html: truncate_html(full_html, truncate_limit),
            full_html: full_html.to_string(),
            screenshot_base64: screenshot_base64.to_string(),
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: LayoutNode) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// Longest prefix of `html` that fits in `limit` bytes without splitting a
/// UTF-8 sequence.
pub fn truncate_html(html: &str, limit: usize) -> String {
    if html.len() <= limit {
        return html.to_string();
    }
    let mut end = limit;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    html[..end].to_string()
}
