use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::bridge::bridge::{DEFAULT_RETRY_DELAY, DeliveryError, FrameTransport};
use crate::bridge::message::{InboundMessage, OutboundMessage};
use crate::capture::error::CaptureError;
use crate::capture::raster::RasterCapture;
use crate::capture::region_capture::{CaptureSettings, RegionCapture, RegionCaptured};
use crate::dom::dom_model::{Document, NodeId};
use crate::geometry::geometry_model::Point;
use crate::geometry::transform::{DESKTOP_WIDTH, ScaleFactor, apply_scale};
use crate::overlay::annotation_model::Annotation;
use crate::overlay::projector::{AnnotationProjector, OverlayStyle, ProjectionReport};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

/// Everything a rendering context needs to know about presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub style: OverlayStyle,
    pub capture: CaptureSettings,
    pub desktop_width: f64,
    pub retry_delay: Duration,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            style: OverlayStyle::default(),
            capture: CaptureSettings::default(),
            desktop_width: DESKTOP_WIDTH,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The frame side: one document plus the overlay machinery living in it.
///
/// Instructions arrive as JSON through `FrameTransport::post`; pointer and
/// keyboard input is fed in directly; notifications leave through the
/// outbound channel.
pub struct RenderingContext {
    document: Document,
    projector: AnnotationProjector,
    capture: RegionCapture,
    scale: ScaleFactor,
    desktop_width: f64,
    visible: bool,
    loaded: bool,
    outbound: Sender<OutboundMessage>,
    tracer: Arc<TraceLogger>,
}

impl RenderingContext {
    pub fn new(
        document: Document,
        raster: Arc<dyn RasterCapture>,
        settings: &OverlaySettings,
        outbound: Sender<OutboundMessage>,
        tracer: Arc<TraceLogger>,
    ) -> Self {
        Self {
            document,
            projector: AnnotationProjector::new(settings.style.clone()),
            capture: RegionCapture::new(raster, settings.capture),
            scale: ScaleFactor::identity(),
            desktop_width: settings.desktop_width,
            visible: true,
            loaded: false,
            outbound,
            tracer,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }

    pub fn projector(&self) -> &AnnotationProjector {
        &self.projector
    }

    pub fn region_capture(&self) -> &RegionCapture {
        &self.capture
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The document finished loading; messages are accepted from now on.
    pub fn load(&mut self) {
        self.loaded = true;
        self.tracer.log(TraceEvent::now("frame", "loaded"));
    }

    pub fn handle(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Highlight { highlights } => {
                let report = self
                    .projector
                    .project(&mut self.document, &highlights, self.visible);
                self.trace_projection(&report);
            }
            InboundMessage::ToggleHighlights { visible } => {
                self.visible = visible;
                let report = self.projector.set_visible(&mut self.document, visible);
                self.trace_projection(&report);
            }
            InboundMessage::SetScale { scale } => {
                self.scale = ScaleFactor::new(scale);
                apply_scale(&mut self.document, self.scale, self.desktop_width);
            }
            InboundMessage::ToggleEditMode { edit } => {
                self.capture.set_edit_mode(&mut self.document, edit);
                self.tracer.log(
                    TraceEvent::now("frame", "edit_mode").with_detail(if edit { "on" } else { "off" }),
                );
            }
        }
    }

    /// Project directly, bypassing the transport.
    pub fn project(&mut self, annotations: &[Annotation], visible: bool) -> ProjectionReport {
        self.visible = visible;
        let report = self
            .projector
            .project(&mut self.document, annotations, visible);
        self.trace_projection(&report);
        report
    }

    fn trace_projection(&self, report: &ProjectionReport) {
        for locator in &report.skipped {
            self.tracer
                .log(TraceEvent::now("frame", "anchor_missing").with_locator(locator));
        }
    }

    fn emit(&self, message: OutboundMessage) {
        // A dropped receiver means the host view is gone; nothing to tell.
        let _ = self.outbound.send(message);
    }

    // ------------------------------------------------------------------
    // Pointer and keyboard input
    // ------------------------------------------------------------------

    /// Only label nodes react to hover; the annotated element itself keeps
    /// its own behaviour.
    pub fn pointer_enter(&mut self, target: NodeId) {
        if let Some(issue_id) = self.projector.issue_at(&self.document, target) {
            let issue_id = issue_id.to_string();
            self.emit(OutboundMessage::IssueHoverEnter { issue_id });
        }
    }

    pub fn pointer_leave(&mut self, target: NodeId) {
        if self.projector.issue_at(&self.document, target).is_some() {
            self.emit(OutboundMessage::IssueHoverLeave);
        }
    }

    pub fn pointer_down(&mut self, client: Point, scroll: Point) -> bool {
        let started = self.capture.pointer_down(&mut self.document, client, scroll);
        if started {
            self.tracer.log(TraceEvent::now("frame", "drawing"));
        }
        started
    }

    pub fn pointer_move(&mut self, client: Point, scroll: Point) {
        self.capture.pointer_move(&mut self.document, client, scroll);
    }

    pub fn key_escape(&mut self) -> bool {
        let aborted = self.capture.key_escape(&mut self.document);
        if aborted {
            self.tracer.log(TraceEvent::now("frame", "drag_aborted"));
        }
        aborted
    }

    pub fn pointer_up(
        &mut self,
        client: Point,
        scroll: Point,
    ) -> Result<Option<RegionCaptured>, CaptureError> {
        let outcome = self
            .capture
            .pointer_up(&mut self.document, client, scroll, self.scale);

        match &outcome {
            Ok(Some(captured)) => {
                self.tracer.log(
                    TraceEvent::now("frame", "region_captured").with_locator(&captured.locator),
                );
                self.emit(OutboundMessage::ElementSelected {
                    locator: captured.locator.clone(),
                    image: captured.image.clone(),
                    region: captured.region,
                });
            }
            Ok(None) => self
                .tracer
                .log(TraceEvent::now("frame", "hit_test_miss")),
            Err(e) => self
                .tracer
                .log(TraceEvent::now("frame", "capture_failed").with_detail(e)),
        }
        outcome
    }
}

impl FrameTransport for RenderingContext {
    fn post(&mut self, payload: &str) -> Result<(), DeliveryError> {
        if !self.loaded {
            return Err(DeliveryError::NotLoaded);
        }
        let message: InboundMessage =
            serde_json::from_str(payload).map_err(DeliveryError::Malformed)?;
        self.handle(message);
        Ok(())
    }
}
