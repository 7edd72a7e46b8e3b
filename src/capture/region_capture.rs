use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::error::CaptureError;
use crate::capture::raster::{
    RasterCapture, RasterSpace, capture_with_timeout, crop, to_png_data_url,
};
use crate::dom::dom_model::{Document, NodeId};
use crate::dom::hit_test::{OVERLAY_ATTR, element_from_point};
use crate::geometry::geometry_model::{Point, Region};
use crate::geometry::transform::{
    ScaleFactor, region_to_screenshot, to_image_space, to_page_space,
};
use crate::locator::locator_model::Locator;
use crate::locator::resolver::resolve;

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    Idle,
    /// Points are container-local and scroll-adjusted.
    Drawing { start: Point, current: Point },
    Capturing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub timeout: Duration,
    pub device_pixel_ratio: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Result of one completed drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCaptured {
    pub locator: Locator,

    /// PNG data URL of the dragged area.
    pub image: String,

    /// Container-local rectangle that was dragged.
    pub region: Region,
}

/// Drag-a-rectangle state machine for one rendering context.
///
/// `Idle -> Drawing -> Capturing -> Idle`. One drag yields at most one
/// capture, after which edit mode switches itself off.
pub struct RegionCapture {
    state: CaptureState,
    edit_mode: bool,
    drag_node: Option<NodeId>,
    raster: Arc<dyn RasterCapture>,
    settings: CaptureSettings,
}

impl RegionCapture {
    pub fn new(raster: Arc<dyn RasterCapture>, settings: CaptureSettings) -> Self {
        Self {
            state: CaptureState::Idle,
            edit_mode: false,
            drag_node: None,
            raster,
            settings,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn drag_node(&self) -> Option<NodeId> {
        self.drag_node
    }

    /// Turning edit mode off mid-drag abandons the drag.
    pub fn set_edit_mode(&mut self, doc: &mut Document, edit: bool) {
        if !edit {
            self.abort(doc);
        }
        self.edit_mode = edit;
    }

    /// Begin a drag. Ignored outside edit mode and while a drag is already
    /// in flight. Returns whether drawing started.
    pub fn pointer_down(&mut self, doc: &mut Document, client: Point, scroll: Point) -> bool {
        if !self.edit_mode || self.state != CaptureState::Idle {
            return false;
        }

        let start = client.offset(scroll);
        let Some(host) = doc.body().or_else(|| doc.document_element()) else {
            return false;
        };
        let node = doc.create_element("div", vec![(OVERLAY_ATTR.to_string(), "drag".to_string())]);
        doc.append_child(host, node);
        self.drag_node = Some(node);
        self.state = CaptureState::Drawing {
            start,
            current: start,
        };
        self.paint(doc, Region::from_corners(start, start));
        true
    }

    pub fn pointer_move(&mut self, doc: &mut Document, client: Point, scroll: Point) {
        let CaptureState::Drawing { start, .. } = self.state else {
            return;
        };
        let current = client.offset(scroll);
        self.state = CaptureState::Drawing { start, current };
        self.paint(doc, Region::from_corners(start, current));
    }

    /// Escape: drop the drag without emitting. Returns whether a drag was aborted.
    pub fn key_escape(&mut self, doc: &mut Document) -> bool {
        if matches!(self.state, CaptureState::Drawing { .. }) {
            self.abort(doc);
            return true;
        }
        false
    }

    fn abort(&mut self, doc: &mut Document) {
        if let Some(node) = self.drag_node.take() {
            doc.detach(node);
        }
        if matches!(self.state, CaptureState::Drawing { .. }) {
            self.state = CaptureState::Idle;
        }
    }

    fn paint(&self, doc: &mut Document, region: Region) {
        let Some(node) = self.drag_node else {
            return;
        };
        let style = format!(
            "position: absolute; left: {}px; top: {}px; width: {}px; height: {}px; \
             border: 2px dashed #3b82f6; background: rgba(59, 130, 246, 0.15); \
             pointer-events: none; z-index: 2147483647;",
            region.left, region.top, region.width, region.height
        );
        doc.set_attr(node, "style", &style);
    }

    /// Finish the drag: capture, crop, hit-test and resolve.
    ///
    /// `Ok(None)` means nothing was under the rectangle's centre and the
    /// capture was discarded. Errors from the raster step propagate, but
    /// the machine is back in `Idle` either way.
    pub fn pointer_up(
        &mut self,
        doc: &mut Document,
        client: Point,
        scroll: Point,
        scale: ScaleFactor,
    ) -> Result<Option<RegionCaptured>, CaptureError> {
        let CaptureState::Drawing { start, .. } = self.state else {
            return Ok(None);
        };
        let region = Region::from_corners(start, client.offset(scroll));

        // The rectangle must not show up in its own screenshot.
        if let Some(node) = self.drag_node.take() {
            doc.detach(node);
        }
        self.state = CaptureState::Capturing;

        let outcome = self.complete(doc, region, scale);
        self.state = CaptureState::Idle;
        if matches!(outcome, Ok(Some(_))) {
            self.edit_mode = false;
        }
        outcome
    }

    fn complete(
        &self,
        doc: &Document,
        region: Region,
        scale: ScaleFactor,
    ) -> Result<Option<RegionCaptured>, CaptureError> {
        let full = capture_with_timeout(Arc::clone(&self.raster), self.settings.timeout)?;
        let rect = match self.raster.space() {
            RasterSpace::Container => to_image_space(region, self.settings.device_pixel_ratio),
            RasterSpace::Page { desktop_width } => {
                region_to_screenshot(region, scale, full.width(), desktop_width)
            }
        };
        let cropped = crop(&full, rect)?;
        let image = to_png_data_url(&cropped)?;

        let centre = to_page_space(region.center(), scale);
        let Some(element) = element_from_point(doc, centre) else {
            return Ok(None);
        };
        let locator = resolve(doc, element);
        if locator.is_empty() {
            return Ok(None);
        }

        Ok(Some(RegionCaptured {
            locator,
            image,
            region,
        }))
    }
}
