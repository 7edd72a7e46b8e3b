use serde::Deserialize;
use std::process::Command;

use crate::audit::error::AuditError;
use crate::capture::capture_model::{Capture, DEFAULT_TRUNCATE_LIMIT};
use crate::dom::parser::LayoutNode;

pub const DEFAULT_CAPTURE_SCRIPT: &str = "node/capture/capture.js";

/// Fetches and renders a URL, producing the raw material for an analysis run.
pub trait CaptureService {
    fn capture(&self, url: &str) -> Result<Capture, AuditError>;
}

/// Stdout of capture.js.
#[derive(Debug, Deserialize)]
pub struct CaptureOutput {
    pub html: String,

    /// Base64 PNG of the full page at desktop width.
    pub screenshot: String,

    #[serde(default)]
    pub layout: Option<LayoutNode>,
}

/// Renders pages with Playwright through a Node.js subprocess.
pub struct PlaywrightCapture {
    pub script: String,
    pub truncate_limit: usize,
    pub dismiss_cookies: bool,
}

impl Default for PlaywrightCapture {
    fn default() -> Self {
        Self {
            script: DEFAULT_CAPTURE_SCRIPT.to_string(),
            truncate_limit: DEFAULT_TRUNCATE_LIMIT,
            dismiss_cookies: true,
        }
    }
}

impl PlaywrightCapture {
    pub fn new(script: &str, truncate_limit: usize) -> Self {
        Self {
            script: script.to_string(),
            truncate_limit,
            ..Default::default()
        }
    }
}

/// Turn the script's stdout into a `Capture`.
pub fn parse_capture_output(url: &str, stdout: &str, truncate_limit: usize) -> Result<Capture, AuditError> {
    let output: CaptureOutput = serde_json::from_str(stdout).map_err(|e| AuditError::JsonParse {
        context: "capture.js output".to_string(),
        source: e,
    })?;

    if output.html.trim().is_empty() {
        return Err(AuditError::InvalidCapture(format!("{} rendered no HTML", url)));
    }

    let capture = Capture::new(url, &output.html, &output.screenshot, truncate_limit);
    Ok(match output.layout {
        Some(layout) => capture.with_layout(layout),
        None => capture,
    })
}

impl CaptureService for PlaywrightCapture {
    fn capture(&self, url: &str) -> Result<Capture, AuditError> {
        let mut command = Command::new("node");
        command.arg(&self.script).arg(url);
        if self.dismiss_cookies {
            command.arg("--dismiss-cookies");
        }

        let output = command.output().map_err(|e| AuditError::SubprocessSpawn {
            script: self.script.clone(),
            source: e,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(AuditError::SubprocessFailed {
                script: self.script.clone(),
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.is_empty() {
            eprintln!("[capture.js] {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_capture_output(url, &stdout, self.truncate_limit)
    }
}
