use std::sync::Arc;
use std::time::Duration;

use ux_overlay::capture::error::CaptureError;
use ux_overlay::capture::raster::{StaticRaster, capture_with_timeout, crop, decode_base64_image};
use ux_overlay::capture::region_capture::{CaptureSettings, CaptureState, RegionCapture};
use ux_overlay::dom::dom_model::Document;
use ux_overlay::geometry::geometry_model::{Point, Region};
use ux_overlay::geometry::transform::{PixelRect, ScaleFactor};

use crate::common::fixtures::{gradient_image, overlay_nodes, sample_document};
use crate::common::services::{FailingRaster, SlowRaster};

mod common;

const NO_SCROLL: Point = Point { x: 0.0, y: 0.0 };

fn capture_over_gradient() -> RegionCapture {
    RegionCapture::new(
        Arc::new(StaticRaster::new(gradient_image(300, 200))),
        CaptureSettings::default(),
    )
}

fn armed(doc: &mut Document) -> RegionCapture {
    let mut capture = capture_over_gradient();
    capture.set_edit_mode(doc, true);
    capture
}

// ============================================================================
// Drag scenario
// ============================================================================

#[test]
fn drag_produces_region_crop_and_locator() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    assert!(capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL));
    capture.pointer_move(&mut doc, Point::new(80.0, 40.0), NO_SCROLL);
    let captured = capture
        .pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity())
        .expect("raster succeeds")
        .expect("element under the drag");

    assert_eq!(captured.region, Region::new(10.0, 10.0, 100.0, 50.0));
    assert_eq!(captured.locator.as_str(), "#a span");
    assert!(captured.image.starts_with("data:image/png;base64,"));

    let image = decode_base64_image(&captured.image).expect("valid png");
    assert_eq!(image.dimensions(), (100, 50));
    assert_eq!(image.get_pixel(0, 0).0, [10, 10, 0, 255]);
    assert_eq!(image.get_pixel(99, 49).0, [109, 59, 0, 255]);
}

#[test]
fn drag_in_any_direction_gives_same_region() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(110.0, 60.0), NO_SCROLL);
    let captured = capture
        .pointer_up(&mut doc, Point::new(10.0, 10.0), NO_SCROLL, ScaleFactor::identity())
        .expect("raster succeeds")
        .expect("element under the drag");
    assert_eq!(captured.region, Region::new(10.0, 10.0, 100.0, 50.0));
}

#[test]
fn scaled_container_hit_tests_in_page_space() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    // Half scale: the second span (page x 120..220) sits at container x 60..110.
    capture.pointer_down(&mut doc, Point::new(65.0, 8.0), NO_SCROLL);
    let captured = capture
        .pointer_up(&mut doc, Point::new(95.0, 26.0), NO_SCROLL, ScaleFactor::new(0.5))
        .expect("raster succeeds")
        .expect("element under the drag");

    assert_eq!(captured.locator.as_str(), "#a span:nth-of-type(2)");
    assert_eq!(captured.region, Region::new(8.0, 65.0, 30.0, 18.0));
    let image = decode_base64_image(&captured.image).expect("valid png");
    assert_eq!(image.dimensions(), (30, 18));
    assert_eq!(image.get_pixel(0, 0).0, [65, 8, 0, 255]);
}

#[test]
fn scroll_offset_moves_region() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);
    let scroll = Point::new(0.0, 200.0);

    // Viewport (30, 30)..(130, 130) scrolled by 200 covers the hero image.
    capture.pointer_down(&mut doc, Point::new(30.0, 30.0), scroll);
    let captured = capture
        .pointer_up(&mut doc, Point::new(130.0, 130.0), scroll, ScaleFactor::identity())
        .expect("raster succeeds")
        .expect("element under the drag");

    assert_eq!(captured.region, Region::new(230.0, 30.0, 100.0, 100.0));
    assert_eq!(captured.locator.as_str(), "html > body main img");
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn state_machine_walks_idle_drawing_idle() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);
    assert_eq!(capture.state(), CaptureState::Idle);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    assert!(matches!(capture.state(), CaptureState::Drawing { .. }));

    capture.pointer_move(&mut doc, Point::new(50.0, 30.0), NO_SCROLL);
    assert_eq!(
        capture.state(),
        CaptureState::Drawing {
            start: Point::new(10.0, 10.0),
            current: Point::new(50.0, 30.0),
        }
    );

    let outcome = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());
    assert!(matches!(outcome, Ok(Some(_))));
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn pointer_down_requires_edit_mode() {
    let mut doc = sample_document();
    let mut capture = capture_over_gradient();

    assert!(!capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(overlay_nodes(&doc, "drag").is_empty());
}

#[test]
fn second_pointer_down_while_drawing_is_ignored() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    assert!(capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL));
    assert!(!capture.pointer_down(&mut doc, Point::new(400.0, 400.0), NO_SCROLL));

    assert_eq!(
        capture.state(),
        CaptureState::Drawing {
            start: Point::new(10.0, 10.0),
            current: Point::new(10.0, 10.0),
        }
    );
    assert_eq!(overlay_nodes(&doc, "drag").len(), 1, "still exactly one rectangle");
}

#[test]
fn drag_rectangle_tracks_pointer_and_is_removed_before_capture() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    capture.pointer_move(&mut doc, Point::new(110.0, 60.0), NO_SCROLL);

    let rect = capture.drag_node().expect("rectangle while drawing");
    assert_eq!(doc.style_property(rect, "left").as_deref(), Some("10px"));
    assert_eq!(doc.style_property(rect, "top").as_deref(), Some("10px"));
    assert_eq!(doc.style_property(rect, "width").as_deref(), Some("100px"));
    assert_eq!(doc.style_property(rect, "height").as_deref(), Some("50px"));

    let _ = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());
    assert!(!doc.is_connected(rect));
    assert!(capture.drag_node().is_none());
}

#[test]
fn escape_aborts_drag_without_capture() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    assert!(capture.key_escape(&mut doc));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(overlay_nodes(&doc, "drag").is_empty());
    assert!(capture.is_edit_mode(), "escape keeps edit mode on");

    let outcome = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());
    assert!(matches!(outcome, Ok(None)), "pointer-up after abort emits nothing");
    assert!(!capture.key_escape(&mut doc), "nothing to abort when idle");
}

#[test]
fn successful_capture_disables_edit_mode() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    let _ = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());

    assert!(!capture.is_edit_mode());
    assert!(!capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL));
}

#[test]
fn disabling_edit_mode_mid_drag_aborts() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    capture.set_edit_mode(&mut doc, false);

    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(overlay_nodes(&doc, "drag").is_empty());
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn hit_test_miss_discards_capture() {
    let mut doc = sample_document();
    let mut capture = armed(&mut doc);

    capture.pointer_down(&mut doc, Point::new(1300.0, 900.0), NO_SCROLL);
    let outcome = capture.pointer_up(&mut doc, Point::new(1400.0, 950.0), NO_SCROLL, ScaleFactor::identity());

    assert!(matches!(outcome, Ok(None)));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(capture.is_edit_mode(), "a miss does not use up the single shot");
}

#[test]
fn raster_failure_propagates_and_returns_to_idle() {
    let mut doc = sample_document();
    let mut capture = RegionCapture::new(Arc::new(FailingRaster), CaptureSettings::default());
    capture.set_edit_mode(&mut doc, true);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    let outcome = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());

    assert!(matches!(outcome, Err(CaptureError::RasterFailed(_))));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(overlay_nodes(&doc, "drag").is_empty());
}

#[test]
fn hanging_raster_times_out_back_to_idle() {
    let mut doc = sample_document();
    let raster = SlowRaster {
        delay: Duration::from_millis(500),
        image: gradient_image(300, 200),
    };
    let settings = CaptureSettings {
        timeout: Duration::from_millis(20),
        ..CaptureSettings::default()
    };
    let mut capture = RegionCapture::new(Arc::new(raster), settings);
    capture.set_edit_mode(&mut doc, true);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    let outcome = capture.pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity());

    assert!(matches!(outcome, Err(CaptureError::TimedOut(_))));
    assert_eq!(capture.state(), CaptureState::Idle);
    assert!(capture.is_edit_mode());
}

// ============================================================================
// Raster helpers
// ============================================================================

#[test]
fn capture_with_timeout_returns_fast_rasters() {
    let raster = Arc::new(StaticRaster::new(gradient_image(4, 4)));
    let image = capture_with_timeout(raster, Duration::from_secs(1)).expect("static raster");
    assert_eq!(image.dimensions(), (4, 4));
}

#[test]
fn crop_clamps_to_image_bounds() {
    let image = gradient_image(50, 40);
    let cropped = crop(&image, PixelRect { x: 45, y: 30, width: 20, height: 20 }).expect("crop");
    assert_eq!(cropped.dimensions(), (5, 10));
    assert_eq!(cropped.get_pixel(0, 0).0, [45, 30, 0, 255]);
}

#[test]
fn device_pixel_ratio_scales_crop() {
    let mut doc = sample_document();
    let settings = CaptureSettings {
        device_pixel_ratio: 2.0,
        ..CaptureSettings::default()
    };
    let mut capture = RegionCapture::new(Arc::new(StaticRaster::new(gradient_image(250, 250))), settings);
    capture.set_edit_mode(&mut doc, true);

    capture.pointer_down(&mut doc, Point::new(10.0, 10.0), NO_SCROLL);
    let captured = capture
        .pointer_up(&mut doc, Point::new(110.0, 60.0), NO_SCROLL, ScaleFactor::identity())
        .expect("raster succeeds")
        .expect("element under the drag");

    assert_eq!(captured.region, Region::new(10.0, 10.0, 100.0, 50.0), "region stays in CSS pixels");
    let image = decode_base64_image(&captured.image).expect("valid png");
    assert_eq!(image.dimensions(), (200, 100));
    assert_eq!(image.get_pixel(0, 0).0, [20, 20, 0, 255]);
}
