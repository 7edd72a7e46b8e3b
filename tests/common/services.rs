use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use ux_overlay::audit::analyzer::IssueAnalyzer;
use ux_overlay::audit::equivalence::EquivalenceService;
use ux_overlay::audit::error::AuditError;
use ux_overlay::audit::issue_model::{HeuristicCategory, Issue, Occurrence, Severity};
use ux_overlay::bridge::bridge::{DeliveryError, FrameTransport};
use ux_overlay::browser::playwright::CaptureService;
use ux_overlay::capture::capture_model::Capture;
use ux_overlay::capture::error::CaptureError;
use ux_overlay::capture::raster::RasterCapture;
use ux_overlay::locator::locator_model::Locator;

// ============================================================================
// Rasters
// ============================================================================

pub struct FailingRaster;

impl RasterCapture for FailingRaster {
    fn capture(&self) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::RasterFailed("canvas is tainted".into()))
    }
}

/// Answers only after `delay`.
pub struct SlowRaster {
    pub delay: Duration,
    pub image: RgbaImage,
}

impl RasterCapture for SlowRaster {
    fn capture(&self) -> Result<RgbaImage, CaptureError> {
        thread::sleep(self.delay);
        Ok(self.image.clone())
    }
}

// ============================================================================
// Audit services
// ============================================================================

pub fn issue(title: &str, locators: &[&str]) -> Issue {
    Issue {
        id: String::new(),
        title: title.to_string(),
        description: String::new(),
        severity: Severity::Medium,
        occurrences: locators
            .iter()
            .map(|l| Occurrence {
                locator: Locator::from(*l),
                note: None,
                image: None,
            })
            .collect(),
    }
}

pub fn category(name: &str, issues: Vec<Issue>) -> HeuristicCategory {
    HeuristicCategory {
        name: name.to_string(),
        issues,
    }
}

/// Analyzer returning fixed categories and counting its calls.
pub struct CountingAnalyzer {
    pub calls: Arc<AtomicUsize>,
    pub categories: Vec<HeuristicCategory>,
}

impl CountingAnalyzer {
    pub fn new(categories: Vec<HeuristicCategory>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                categories,
            },
            calls,
        )
    }
}

impl IssueAnalyzer for CountingAnalyzer {
    fn analyze(&self, _capture: &Capture) -> Result<Vec<HeuristicCategory>, AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.clone())
    }
}

/// Equivalence oracle with a fixed answer; `None` simulates an outage.
pub struct ScriptedEquivalence {
    pub answer: Option<bool>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedEquivalence {
    pub fn new(answer: Option<bool>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                answer,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl EquivalenceService for ScriptedEquivalence {
    fn is_same_experience(&self, _old: &Capture, _new: &Capture) -> Result<bool, AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or_else(|| AuditError::ServiceUnavailable("timed out".to_string()))
    }
}

/// Capture service handing out prepared captures in order.
pub struct QueuedCapture {
    pub captures: Mutex<VecDeque<Capture>>,
}

impl QueuedCapture {
    pub fn new(captures: Vec<Capture>) -> Self {
        Self {
            captures: Mutex::new(captures.into()),
        }
    }
}

impl CaptureService for QueuedCapture {
    fn capture(&self, url: &str) -> Result<Capture, AuditError> {
        self.captures
            .lock()
            .expect("capture queue lock")
            .pop_front()
            .ok_or_else(|| AuditError::InvalidCapture(format!("no capture queued for {}", url)))
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Frame transport that records payloads once `loaded` is set.
#[derive(Default)]
pub struct RecordingTransport {
    pub loaded: bool,
    pub posted: Vec<String>,
}

impl FrameTransport for RecordingTransport {
    fn post(&mut self, payload: &str) -> Result<(), DeliveryError> {
        if !self.loaded {
            return Err(DeliveryError::NotLoaded);
        }
        self.posted.push(payload.to_string());
        Ok(())
    }
}
