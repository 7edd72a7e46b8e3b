use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::locator::locator_model::Locator;
use crate::overlay::annotation_model::Annotation;
use crate::trace::trace::now_ms;

use super::equivalence::text_fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

/// One place on the page where an issue shows up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// PNG data URL cropped from the page, for occurrences marked by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

/// A heuristic (e.g. "Visibility of system status") and the issues found
/// against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicCategory {
    pub name: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Category that region-captured issues are filed under.
pub const MANUAL_CATEGORY: &str = "Manual findings";

/// Marker text shown on the page: 1-based category and issue positions.
pub fn issue_label(category_index: usize, issue_index: usize) -> String {
    format!("{}.{}", category_index + 1, issue_index + 1)
}

/// Give every issue without an id a stable one derived from its content
/// and position.
pub fn assign_issue_ids(categories: &mut [HeuristicCategory]) {
    for (ci, category) in categories.iter_mut().enumerate() {
        for (ii, issue) in category.issues.iter_mut().enumerate() {
            if issue.id.is_empty() {
                let seed = format!("{}::{}::{}::{}", category.name, issue.title, ci, ii);
                issue.id = format!("issue-{}", &text_fingerprint(&seed)[..12]);
            }
        }
    }
}

static ISSUE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh id for an issue created outside an analysis run. Unique within
/// the process even for repeated titles in the same millisecond.
pub fn new_issue_id(title: &str) -> String {
    let n = ISSUE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let seed = format!("{}::{}::{}", title, now_ms(), n);
    format!("issue-{}", &text_fingerprint(&seed)[..12])
}

/// Flatten categories into the annotations the overlay draws. Occurrences
/// without a locator have nothing to anchor to and are left out.
pub fn annotations_for(categories: &[HeuristicCategory]) -> Vec<Annotation> {
    let mut out = Vec::new();
    for (ci, category) in categories.iter().enumerate() {
        for (ii, issue) in category.issues.iter().enumerate() {
            let label = issue_label(ci, ii);
            for occurrence in &issue.occurrences {
                if occurrence.locator.is_empty() {
                    continue;
                }
                out.push(Annotation::new(
                    occurrence.locator.clone(),
                    label.clone(),
                    issue.id.clone(),
                ));
            }
        }
    }
    out
}

/// Remove the issue with `issue_id`, dropping any category this removal
/// emptied. Categories that were already empty stay. Returns whether
/// anything was removed.
pub fn remove_issue(categories: &mut Vec<HeuristicCategory>, issue_id: &str) -> bool {
    let mut removed = false;
    categories.retain_mut(|category| {
        let before = category.issues.len();
        category.issues.retain(|i| i.id != issue_id);
        if category.issues.len() == before {
            return true;
        }
        removed = true;
        !category.issues.is_empty()
    });
    removed
}
