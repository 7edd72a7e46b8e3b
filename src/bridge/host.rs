use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::bridge::bridge::{DeliveryError, FrameTransport, MessageBridge};
use crate::bridge::context::{OverlaySettings, RenderingContext};
use crate::bridge::message::{InboundMessage, OutboundMessage};
use crate::capture::raster::RasterCapture;
use crate::dom::dom_model::Document;
use crate::geometry::geometry_model::Region;
use crate::geometry::transform::ScaleFactor;
use crate::locator::locator_model::Locator;
use crate::overlay::annotation_model::Annotation;
use crate::trace::logger::TraceLogger;

/// Notifications delivered to the UI embedding the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OverlayEvent {
    HoverEnter {
        #[serde(rename = "issueId")]
        issue_id: String,
    },
    HoverLeave,
    RegionCaptured {
        locator: Locator,
        image: String,
        region: Region,
    },
}

/// The single hovered-issue slot of one analysis view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverState {
    active: Option<String>,
}

impl HoverState {
    pub fn enter(&mut self, issue_id: &str) {
        self.active = Some(issue_id.to_string());
    }

    pub fn leave(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

/// Host side of the overlay: the calls UI code makes and the event
/// stream it consumes.
pub struct OverlayHost<T: FrameTransport> {
    bridge: MessageBridge<T>,
    events: Receiver<OutboundMessage>,
    hover: HoverState,
    desktop_width: f64,
    scale: ScaleFactor,
    edit_mode: bool,
}

impl OverlayHost<RenderingContext> {
    /// Wire a host to an in-process rendering context over `document`.
    pub fn in_process(
        document: Document,
        raster: Arc<dyn RasterCapture>,
        settings: &OverlaySettings,
        tracer: Arc<TraceLogger>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let context = RenderingContext::new(document, raster, settings, tx, Arc::clone(&tracer));
        let bridge = MessageBridge::new(context, settings.retry_delay, tracer);
        Self::new(bridge, rx, settings.desktop_width)
    }

    /// The in-process document finished loading.
    pub fn load_frame(&mut self) {
        self.bridge.transport_mut().load();
        self.bridge.on_load();
    }

    pub fn context(&self) -> &RenderingContext {
        self.bridge.transport()
    }

    pub fn context_mut(&mut self) -> &mut RenderingContext {
        self.bridge.transport_mut()
    }
}

impl<T: FrameTransport> OverlayHost<T> {
    pub fn new(bridge: MessageBridge<T>, events: Receiver<OutboundMessage>, desktop_width: f64) -> Self {
        Self {
            bridge,
            events,
            hover: HoverState::default(),
            desktop_width,
            scale: ScaleFactor::identity(),
            edit_mode: false,
        }
    }

    pub fn bridge(&self) -> &MessageBridge<T> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut MessageBridge<T> {
        &mut self.bridge
    }

    pub fn project(&mut self, annotations: &[Annotation], visible: bool) -> Result<(), DeliveryError> {
        self.bridge.send(&InboundMessage::ToggleHighlights { visible })?;
        self.bridge.send(&InboundMessage::Highlight {
            highlights: annotations.to_vec(),
        })
    }

    pub fn set_highlights_visible(&mut self, visible: bool) -> Result<(), DeliveryError> {
        self.bridge.send(&InboundMessage::ToggleHighlights { visible })
    }

    pub fn set_scale(&mut self, factor: f64) -> Result<(), DeliveryError> {
        self.scale = ScaleFactor::new(factor);
        self.bridge.send(&InboundMessage::SetScale {
            scale: self.scale.value(),
        })
    }

    /// Recompute the scale for a resized container and push it.
    pub fn set_container_width(&mut self, width: f64) -> Result<ScaleFactor, DeliveryError> {
        let scale = ScaleFactor::for_container(width, self.desktop_width);
        self.set_scale(scale.value())?;
        Ok(scale)
    }

    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }

    pub fn set_edit_mode(&mut self, edit: bool) -> Result<(), DeliveryError> {
        self.edit_mode = edit;
        self.bridge.send(&InboundMessage::ToggleEditMode { edit })
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn on_frame_load(&mut self) {
        self.bridge.on_load();
    }

    pub fn poll(&mut self, now: Instant) {
        self.bridge.poll(now);
    }

    pub fn hovered_issue(&self) -> Option<&str> {
        self.hover.active()
    }

    /// Drain outbound notifications, updating hover and edit state.
    pub fn pump(&mut self) -> Vec<OverlayEvent> {
        let mut out = Vec::new();
        while let Ok(message) = self.events.try_recv() {
            out.push(match message {
                OutboundMessage::IssueHoverEnter { issue_id } => {
                    self.hover.enter(&issue_id);
                    OverlayEvent::HoverEnter { issue_id }
                }
                OutboundMessage::IssueHoverLeave => {
                    self.hover.leave();
                    OverlayEvent::HoverLeave
                }
                OutboundMessage::ElementSelected {
                    locator,
                    image,
                    region,
                } => {
                    // Capture is single-shot; the frame already left edit mode.
                    self.edit_mode = false;
                    OverlayEvent::RegionCaptured {
                        locator,
                        image,
                        region,
                    }
                }
            });
        }
        out
    }

    /// The analysis view went away.
    pub fn unmount(&mut self) {
        self.hover.leave();
    }
}
