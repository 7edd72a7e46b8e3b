use std::fmt;
use std::process::ExitStatus;

use crate::capture::error::CaptureError;

#[derive(Debug)]
pub enum AuditError {
    /// Capture script failed to spawn
    SubprocessSpawn { script: String, source: std::io::Error },

    /// Capture script exited with non-zero status
    SubprocessFailed { script: String, status: ExitStatus, stderr: String },

    /// JSON parsing failed (script output, stored records, model output)
    JsonParse { context: String, source: serde_json::Error },

    /// JSON serialization failed
    JsonSerialize { context: String, source: serde_json::Error },

    /// A model-backed service did not answer usefully
    ServiceUnavailable(String),

    /// Reading or writing persisted reports failed
    Store { operation: String, source: std::io::Error },

    /// No report stored under this id
    ReportNotFound(String),

    /// Captured data is missing something the operation needs
    InvalidCapture(String),

    /// Raster or image handling failed
    Capture(CaptureError),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::SubprocessSpawn { script, source } => {
                write!(f, "Failed to spawn {} (is Node.js installed?): {}", script, source)
            }
            AuditError::SubprocessFailed { script, status, stderr } => {
                write!(f, "{} exited with {}: {}", script, status, stderr)
            }
            AuditError::JsonParse { context, source } => {
                write!(f, "JSON parse error ({}): {}", context, source)
            }
            AuditError::JsonSerialize { context, source } => {
                write!(f, "JSON serialize error ({}): {}", context, source)
            }
            AuditError::ServiceUnavailable(msg) => {
                write!(f, "Analysis service unavailable: {}", msg)
            }
            AuditError::Store { operation, source } => {
                write!(f, "Report store failed to {}: {}", operation, source)
            }
            AuditError::ReportNotFound(id) => write!(f, "No report found with id '{}'", id),
            AuditError::InvalidCapture(msg) => write!(f, "Invalid capture: {}", msg),
            AuditError::Capture(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::SubprocessSpawn { source, .. } => Some(source),
            AuditError::JsonParse { source, .. } => Some(source),
            AuditError::JsonSerialize { source, .. } => Some(source),
            AuditError::Store { source, .. } => Some(source),
            AuditError::Capture(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CaptureError> for AuditError {
    fn from(e: CaptureError) -> Self {
        AuditError::Capture(e)
    }
}
