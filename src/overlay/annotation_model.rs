use serde::{Deserialize, Serialize};

use crate::locator::locator_model::Locator;

/// An issue marker anchored to page elements through a locator.
///
/// Only the label can change after creation; the anchor and the owning
/// issue are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    locator: Locator,
    label: String,
    issue_id: String,
}

impl Annotation {
    pub fn new(locator: Locator, label: impl Into<String>, issue_id: impl Into<String>) -> Self {
        Self {
            locator,
            label: label.into(),
            issue_id: issue_id.into(),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    pub fn relabel(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}
