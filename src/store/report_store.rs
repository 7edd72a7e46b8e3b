use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::audit::error::AuditError;
use crate::audit::issue_model::HeuristicCategory;
use crate::dom::parser::LayoutNode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub report_id: String,
    pub url: String,
    pub created_at_ms: u128,
}

/// The replay artifact of a report: what the overlay is drawn onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub full_html: String,
    pub screenshot_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutNode>,
}

/// Persistence for reports, their snapshots and their issue lists.
pub trait ReportStore {
    fn save_report(&self, report: &StoredReport) -> Result<(), AuditError>;

    /// Most recent report for `url`, if any.
    fn latest_for_url(&self, url: &str) -> Result<Option<StoredReport>, AuditError>;

    fn save_snapshot(&self, report_id: &str, snapshot: &Snapshot) -> Result<(), AuditError>;
    fn load_snapshot(&self, report_id: &str) -> Result<Snapshot, AuditError>;

    fn save_issues(&self, report_id: &str, categories: &[HeuristicCategory]) -> Result<(), AuditError>;
    fn load_issues(&self, report_id: &str) -> Result<Vec<HeuristicCategory>, AuditError>;
}

fn latest(reports: impl IntoIterator<Item = StoredReport>, url: &str) -> Option<StoredReport> {
    reports
        .into_iter()
        .filter(|r| r.url == url)
        .max_by_key(|r| r.created_at_ms)
}

// ============================================================================
// InMemoryReportStore
// ============================================================================

#[derive(Default)]
struct MemoryState {
    reports: Vec<StoredReport>,
    snapshots: HashMap<String, Snapshot>,
    issues: HashMap<String, Vec<HeuristicCategory>>,
}

/// Process-local store, used by tests and one-shot CLI runs.
#[derive(Default)]
pub struct InMemoryReportStore {
    state: Mutex<MemoryState>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        // A poisoned lock still holds consistent data: every write is a
        // single insert.
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }
}

impl ReportStore for InMemoryReportStore {
    fn save_report(&self, report: &StoredReport) -> Result<(), AuditError> {
        self.with_state(|s| {
            s.reports.retain(|r| r.report_id != report.report_id);
            s.reports.push(report.clone());
        });
        Ok(())
    }

    fn latest_for_url(&self, url: &str) -> Result<Option<StoredReport>, AuditError> {
        Ok(self.with_state(|s| latest(s.reports.iter().cloned(), url)))
    }

    fn save_snapshot(&self, report_id: &str, snapshot: &Snapshot) -> Result<(), AuditError> {
        self.with_state(|s| s.snapshots.insert(report_id.to_string(), snapshot.clone()));
        Ok(())
    }

    fn load_snapshot(&self, report_id: &str) -> Result<Snapshot, AuditError> {
        self.with_state(|s| s.snapshots.get(report_id).cloned())
            .ok_or_else(|| AuditError::ReportNotFound(report_id.to_string()))
    }

    fn save_issues(&self, report_id: &str, categories: &[HeuristicCategory]) -> Result<(), AuditError> {
        self.with_state(|s| s.issues.insert(report_id.to_string(), categories.to_vec()));
        Ok(())
    }

    fn load_issues(&self, report_id: &str) -> Result<Vec<HeuristicCategory>, AuditError> {
        self.with_state(|s| s.issues.get(report_id).cloned())
            .ok_or_else(|| AuditError::ReportNotFound(report_id.to_string()))
    }
}

// ============================================================================
// FileReportStore
// ============================================================================

/// JSON files under one directory:
///
/// ```text
/// <dir>/reports.json
/// <dir>/<report_id>/snapshot.json
/// <dir>/<report_id>/issues.json
/// ```
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("reports.json")
    }

    fn report_file(&self, report_id: &str, name: &str) -> Result<PathBuf, AuditError> {
        // Ids become directory names; refuse anything that could escape.
        if report_id.is_empty()
            || !report_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AuditError::ReportNotFound(report_id.to_string()));
        }
        Ok(self.dir.join(report_id).join(name))
    }

    fn read_index(&self) -> Result<Vec<StoredReport>, AuditError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path, "reports index")
    }

    fn read_report_file<T: DeserializeOwned>(&self, report_id: &str, name: &str) -> Result<T, AuditError> {
        let path = self.report_file(report_id, name)?;
        if !path.exists() {
            return Err(AuditError::ReportNotFound(report_id.to_string()));
        }
        read_json(&path, name)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, context: &str) -> Result<T, AuditError> {
    let content = fs::read_to_string(path).map_err(|e| AuditError::Store {
        operation: format!("read {}", path.display()),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| AuditError::JsonParse {
        context: context.to_string(),
        source: e,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, context: &str) -> Result<(), AuditError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AuditError::Store {
            operation: format!("create {}", parent.display()),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| AuditError::JsonSerialize {
        context: context.to_string(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| AuditError::Store {
        operation: format!("write {}", path.display()),
        source: e,
    })
}

impl ReportStore for FileReportStore {
    fn save_report(&self, report: &StoredReport) -> Result<(), AuditError> {
        let mut index = self.read_index()?;
        index.retain(|r| r.report_id != report.report_id);
        index.push(report.clone());
        write_json(&self.index_path(), &index, "reports index")
    }

    fn latest_for_url(&self, url: &str) -> Result<Option<StoredReport>, AuditError> {
        Ok(latest(self.read_index()?, url))
    }

    fn save_snapshot(&self, report_id: &str, snapshot: &Snapshot) -> Result<(), AuditError> {
        write_json(&self.report_file(report_id, "snapshot.json")?, snapshot, "snapshot")
    }

    fn load_snapshot(&self, report_id: &str) -> Result<Snapshot, AuditError> {
        self.read_report_file(report_id, "snapshot.json")
    }

    fn save_issues(&self, report_id: &str, categories: &[HeuristicCategory]) -> Result<(), AuditError> {
        write_json(&self.report_file(report_id, "issues.json")?, categories, "issues")
    }

    fn load_issues(&self, report_id: &str) -> Result<Vec<HeuristicCategory>, AuditError> {
        self.read_report_file(report_id, "issues.json")
    }
}
