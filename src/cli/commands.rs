use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;

use crate::audit::ai_model::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_TIMEOUT, OllamaBackend};
use crate::audit::analyzer::{IssueAnalyzer, LlmIssueAnalyzer, MockIssueAnalyzer};
use crate::audit::equivalence::{EquivalenceService, LlmEquivalence, MarkupEquivalence, check_equivalence};
use crate::audit::issue_model::{HeuristicCategory, annotations_for, issue_label};
use crate::audit::pipeline::{AuditPipeline, snapshot_document};
use crate::browser::playwright::{DEFAULT_CAPTURE_SCRIPT, PlaywrightCapture};
use crate::capture::capture_model::Capture;
use crate::cli::config::{AppConfig, build_overlay_settings};
use crate::geometry::transform::{ScaleFactor, apply_scale};
use crate::overlay::projector::AnnotationProjector;
use crate::store::report_store::{FileReportStore, ReportStore};
use crate::trace::logger::TraceLogger;

pub const TRACE_FILE: &str = "overlay_trace.jsonl";

/// Model connection settings after CLI > config file > defaults.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl OllamaSettings {
    pub fn resolve(config: &AppConfig, endpoint: Option<&str>, model: Option<&str>) -> Self {
        Self {
            endpoint: endpoint
                .or(config.ollama.endpoint.as_deref())
                .unwrap_or(DEFAULT_OLLAMA_ENDPOINT)
                .to_string(),
            model: model
                .or(config.ollama.model.as_deref())
                .unwrap_or(DEFAULT_OLLAMA_MODEL)
                .to_string(),
            timeout: config
                .ollama
                .timeout_ms
                .map_or(DEFAULT_OLLAMA_TIMEOUT, Duration::from_millis),
        }
    }

    fn backend(&self) -> OllamaBackend {
        OllamaBackend::new(&self.endpoint, &self.model, self.timeout)
    }
}

// ============================================================================
// audit subcommand
// ============================================================================

pub fn cmd_audit(
    url: &str,
    force: bool,
    analyzer_name: &str,
    config: &AppConfig,
    ollama: &OllamaSettings,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = config
        .capture
        .script
        .as_deref()
        .unwrap_or(DEFAULT_CAPTURE_SCRIPT);

    let pipeline = AuditPipeline::new(
        Box::new(PlaywrightCapture::new(script, config.capture.truncate_limit)),
        build_analyzer(analyzer_name, ollama),
        build_equivalence(analyzer_name, ollama),
        Box::new(FileReportStore::new(&config.store.dir)),
        Arc::new(TraceLogger::new(TRACE_FILE)),
    )
    .with_truncate_limit(config.capture.truncate_limit);

    if verbose > 0 {
        eprintln!("Auditing {} (analyzer={}, force={})...", url, analyzer_name, force);
    }

    let outcome = pipeline.run(url, force)?;

    println!(
        "Report {} ({})",
        outcome.report_id,
        if outcome.reused { "reused, page unchanged" } else { "fresh analysis" }
    );
    print!("{}", format_issue_list(&outcome.categories, verbose));
    println!("{} annotations", outcome.annotations.len());

    Ok(())
}

/// Labelled issue list, one heuristic per block.
pub fn format_issue_list(categories: &[HeuristicCategory], verbose: u8) -> String {
    let mut out = String::new();
    if categories.is_empty() {
        out.push_str("No issues found\n");
        return out;
    }

    for (ci, category) in categories.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", ci + 1, category.name));
        for (ii, issue) in category.issues.iter().enumerate() {
            out.push_str(&format!(
                "  {} [{:?}] {} ({} occurrences)\n",
                issue_label(ci, ii),
                issue.severity,
                issue.title,
                issue.occurrences.len()
            ));
            if verbose > 0 {
                for occurrence in &issue.occurrences {
                    out.push_str(&format!("      {}\n", occurrence.locator));
                }
            }
        }
    }
    out
}

// ============================================================================
// project subcommand
// ============================================================================

pub fn cmd_project(
    report_id: &str,
    hidden: bool,
    width: Option<f64>,
    output: &str,
    config: &AppConfig,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileReportStore::new(&config.store.dir);
    let settings = build_overlay_settings(config);

    let snapshot = store.load_snapshot(report_id)?;
    let annotations = annotations_for(&store.load_issues(report_id)?);

    let mut doc = snapshot_document(&snapshot);
    let mut projector = AnnotationProjector::new(settings.style.clone());
    let report = projector.project(&mut doc, &annotations, !hidden);

    if let Some(width) = width {
        let scale = ScaleFactor::for_container(width, settings.desktop_width);
        apply_scale(&mut doc, scale, settings.desktop_width);
        if verbose > 0 {
            eprintln!("Scaled to {:.3}", scale.value());
        }
    }

    std::fs::write(output, doc.to_html())?;

    println!(
        "Highlighted {} elements from {} annotations -> {}",
        report.highlighted,
        annotations.len(),
        output
    );
    if !report.skipped.is_empty() {
        println!("{} locators matched nothing:", report.skipped.len());
        for locator in &report.skipped {
            println!("  {}", locator);
        }
    }

    Ok(())
}

// ============================================================================
// compare subcommand
// ============================================================================

/// Compare two HTML captures and return whether they show the same experience.
pub fn cmd_compare(
    old_path: &str,
    new_path: &str,
    screenshot: Option<&str>,
    analyzer_name: &str,
    config: &AppConfig,
    ollama: &OllamaSettings,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let old_html = std::fs::read_to_string(old_path)?;
    let new_html = std::fs::read_to_string(new_path)?;
    let screenshot_base64 = match screenshot {
        Some(path) => base64::engine::general_purpose::STANDARD.encode(std::fs::read(path)?),
        None => String::new(),
    };

    let limit = config.capture.truncate_limit;
    let old = Capture::new(old_path, &old_html, "", limit);
    let new = Capture::new(new_path, &new_html, &screenshot_base64, limit);

    let service = build_equivalence(analyzer_name, ollama);
    let tracer = TraceLogger::new(TRACE_FILE);
    let same = check_equivalence(service.as_ref(), &old, &new, &tracer);

    if verbose > 0 {
        eprintln!(
            "Compared {} bytes against {} bytes (limit {})",
            old.truncated_html.len(),
            new.truncated_html.len(),
            limit
        );
    }
    println!("{}", if same { "same experience" } else { "different experience" });

    Ok(same)
}

// ============================================================================
// Helpers
// ============================================================================

/// Build the appropriate IssueAnalyzer based on name.
fn build_analyzer(name: &str, ollama: &OllamaSettings) -> Box<dyn IssueAnalyzer> {
    match name {
        "llm" => Box::new(LlmIssueAnalyzer::new(Box::new(ollama.backend()))),
        _ => Box::new(MockIssueAnalyzer),
    }
}

fn build_equivalence(name: &str, ollama: &OllamaSettings) -> Box<dyn EquivalenceService> {
    match name {
        "llm" => Box::new(LlmEquivalence::new(Box::new(ollama.backend()))),
        _ => Box::new(MarkupEquivalence),
    }
}
