use serde::{Deserialize, Serialize};

use crate::geometry::geometry_model::Region;
use crate::locator::locator_model::Locator;
use crate::overlay::annotation_model::Annotation;

/// Instructions carried into a rendering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    Highlight { highlights: Vec<Annotation> },
    ToggleHighlights { visible: bool },
    SetScale { scale: f64 },
    ToggleEditMode { edit: bool },
}

/// Notifications carried out of a rendering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    IssueHoverEnter {
        #[serde(rename = "issueId")]
        issue_id: String,
    },
    IssueHoverLeave,
    ElementSelected {
        locator: Locator,
        image: String,
        region: Region,
    },
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Highlight { .. } => "HIGHLIGHT",
            InboundMessage::ToggleHighlights { .. } => "TOGGLE_HIGHLIGHTS",
            InboundMessage::SetScale { .. } => "SET_SCALE",
            InboundMessage::ToggleEditMode { .. } => "TOGGLE_EDIT_MODE",
        }
    }
}
