use std::fmt;

use serde::{Deserialize, Serialize};

/// Selector string that re-identifies elements within one document instance.
///
/// The empty locator is what non-element nodes resolve to; it never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(pub String);

impl Locator {
    pub fn new(s: impl Into<String>) -> Self {
        Locator(s.into())
    }

    pub fn empty() -> Self {
        Locator(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator(s.to_string())
    }
}
