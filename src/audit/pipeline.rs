use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audit::analyzer::IssueAnalyzer;
use crate::audit::equivalence::{EquivalenceService, check_equivalence, text_fingerprint};
use crate::audit::error::AuditError;
use crate::audit::issue_model::{
    HeuristicCategory, Issue, MANUAL_CATEGORY, Occurrence, Severity, annotations_for,
    assign_issue_ids, new_issue_id, remove_issue,
};
use crate::bridge::context::{OverlaySettings, RenderingContext};
use crate::bridge::host::OverlayHost;
use crate::browser::playwright::CaptureService;
use crate::capture::capture_model::{Capture, DEFAULT_TRUNCATE_LIMIT};
use crate::capture::raster::StaticRaster;
use crate::capture::region_capture::RegionCaptured;
use crate::dom::dom_model::Document;
use crate::dom::parser::{from_layout, parse_html};
use crate::overlay::annotation_model::Annotation;
use crate::store::report_store::{ReportStore, Snapshot, StoredReport};
use crate::trace::{logger::TraceLogger, trace::TraceEvent, trace::now_ms};

static REPORT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn new_report_id(url: &str) -> String {
    let n = REPORT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let seed = format!("{}::{}::{}", url, now_ms(), n);
    format!("report-{}", &text_fingerprint(&seed)[..12])
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisDecision {
    /// A stored report shows the same experience; its issues stand.
    Reuse { report_id: String },
    Fresh,
}

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report_id: String,
    pub categories: Vec<HeuristicCategory>,
    pub annotations: Vec<Annotation>,

    /// True when the issues came from an earlier report.
    pub reused: bool,
    pub capture: Capture,
}

/// URL in, labelled annotations out: capture, reuse-or-analyse, persist.
pub struct AuditPipeline {
    capture: Box<dyn CaptureService>,
    analyzer: Box<dyn IssueAnalyzer>,
    equivalence: Box<dyn EquivalenceService>,
    store: Box<dyn ReportStore>,
    tracer: Arc<TraceLogger>,
    truncate_limit: usize,
}

impl AuditPipeline {
    pub fn new(
        capture: Box<dyn CaptureService>,
        analyzer: Box<dyn IssueAnalyzer>,
        equivalence: Box<dyn EquivalenceService>,
        store: Box<dyn ReportStore>,
        tracer: Arc<TraceLogger>,
    ) -> Self {
        Self {
            capture,
            analyzer,
            equivalence,
            store,
            tracer,
            truncate_limit: DEFAULT_TRUNCATE_LIMIT,
        }
    }

    pub fn with_truncate_limit(mut self, limit: usize) -> Self {
        self.truncate_limit = limit;
        self
    }

    pub fn store(&self) -> &dyn ReportStore {
        self.store.as_ref()
    }

    /// Whether `capture` can reuse a stored report. `force` skips the check.
    pub fn decide(&self, capture: &Capture, force: bool) -> Result<AnalysisDecision, AuditError> {
        if force {
            self.tracer
                .log(TraceEvent::now("pipeline", "forced").with_detail(&capture.url));
            return Ok(AnalysisDecision::Fresh);
        }

        let Some(previous) = self.store.latest_for_url(&capture.url)? else {
            return Ok(AnalysisDecision::Fresh);
        };
        let snapshot = match self.store.load_snapshot(&previous.report_id) {
            Ok(s) => s,
            Err(AuditError::ReportNotFound(_)) => return Ok(AnalysisDecision::Fresh),
            Err(e) => return Err(e),
        };

        let old = Capture::new(
            &previous.url,
            &snapshot.full_html,
            &snapshot.screenshot_base64,
            self.truncate_limit,
        );
        if check_equivalence(self.equivalence.as_ref(), &old, capture, &self.tracer) {
            Ok(AnalysisDecision::Reuse {
                report_id: previous.report_id,
            })
        } else {
            Ok(AnalysisDecision::Fresh)
        }
    }

    pub fn run(&self, url: &str, force: bool) -> Result<AuditOutcome, AuditError> {
        let capture = self.capture.capture(url)?;
        self.tracer
            .log(TraceEvent::now("pipeline", "captured").with_detail(url));
        self.run_with_capture(capture, force)
    }

    pub fn run_with_capture(&self, capture: Capture, force: bool) -> Result<AuditOutcome, AuditError> {
        if let AnalysisDecision::Reuse { report_id } = self.decide(&capture, force)? {
            match self.store.load_issues(&report_id) {
                Ok(categories) => {
                    self.tracer
                        .log(TraceEvent::now("pipeline", "reuse").with_detail(&report_id));
                    return Ok(AuditOutcome {
                        annotations: annotations_for(&categories),
                        report_id,
                        categories,
                        reused: true,
                        capture,
                    });
                }
                // A report without issues has nothing to reuse.
                Err(AuditError::ReportNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let mut categories = self.analyzer.analyze(&capture)?;
        assign_issue_ids(&mut categories);

        let report_id = new_report_id(&capture.url);
        self.store.save_report(&StoredReport {
            report_id: report_id.clone(),
            url: capture.url.clone(),
            created_at_ms: now_ms(),
        })?;
        self.store.save_snapshot(
            &report_id,
            &Snapshot {
                full_html: capture.full_html.clone(),
                screenshot_base64: capture.screenshot_base64.clone(),
                layout: capture.layout.clone(),
            },
        )?;
        self.store.save_issues(&report_id, &categories)?;
        self.tracer.log(
            TraceEvent::now("pipeline", "fresh")
                .with_detail(format!("{} ({} categories)", report_id, categories.len())),
        );

        Ok(AuditOutcome {
            annotations: annotations_for(&categories),
            report_id,
            categories,
            reused: false,
            capture,
        })
    }

    pub fn categories(&self, report_id: &str) -> Result<Vec<HeuristicCategory>, AuditError> {
        self.store.load_issues(report_id)
    }

    /// Annotations for a report, labelled by current positions.
    pub fn annotations(&self, report_id: &str) -> Result<Vec<Annotation>, AuditError> {
        Ok(annotations_for(&self.store.load_issues(report_id)?))
    }

    /// File a region capture as a new issue of the report.
    pub fn record_region_capture(
        &self,
        report_id: &str,
        captured: &RegionCaptured,
        title: &str,
    ) -> Result<Issue, AuditError> {
        let mut categories = self.store.load_issues(report_id)?;

        let issue = Issue {
            id: new_issue_id(title),
            title: title.to_string(),
            description: String::new(),
            severity: Severity::Medium,
            occurrences: vec![Occurrence {
                locator: captured.locator.clone(),
                note: None,
                image: Some(captured.image.clone()),
            }],
        };

        match categories.iter_mut().find(|c| c.name == MANUAL_CATEGORY) {
            Some(manual) => manual.issues.push(issue.clone()),
            None => categories.push(HeuristicCategory {
                name: MANUAL_CATEGORY.to_string(),
                issues: vec![issue.clone()],
            }),
        }
        self.store.save_issues(report_id, &categories)?;
        self.tracer.log(
            TraceEvent::now("pipeline", "issue_recorded")
                .with_issue(&issue.id)
                .with_locator(&captured.locator),
        );
        Ok(issue)
    }

    /// Remove an issue; labels of the issues after it shift down.
    pub fn delete_issue(&self, report_id: &str, issue_id: &str) -> Result<bool, AuditError> {
        let mut categories = self.store.load_issues(report_id)?;
        let removed = remove_issue(&mut categories, issue_id);
        if removed {
            self.store.save_issues(report_id, &categories)?;
            self.tracer
                .log(TraceEvent::now("pipeline", "issue_deleted").with_issue(issue_id));
        }
        Ok(removed)
    }

    pub fn snapshot_document(&self, report_id: &str) -> Result<Document, AuditError> {
        Ok(snapshot_document(&self.store.load_snapshot(report_id)?))
    }

    /// Load a report's snapshot into a fresh rendering context, ready for
    /// projection and region capture.
    pub fn open_overlay(
        &self,
        report_id: &str,
        settings: &OverlaySettings,
    ) -> Result<OverlayHost<RenderingContext>, AuditError> {
        let snapshot = self.store.load_snapshot(report_id)?;
        // Stored screenshots cover the unscaled page, not the container.
        let raster = StaticRaster::from_base64_png(&snapshot.screenshot_base64)?
            .in_page_space(settings.desktop_width);
        let mut host = OverlayHost::in_process(
            snapshot_document(&snapshot),
            Arc::new(raster),
            settings,
            Arc::clone(&self.tracer),
        );
        host.load_frame();
        Ok(host)
    }
}

/// The measured layout when the capture has one, else the parsed markup.
pub fn snapshot_document(snapshot: &Snapshot) -> Document {
    match &snapshot.layout {
        Some(layout) => from_layout(layout),
        None => parse_html(&snapshot.full_html),
    }
}
