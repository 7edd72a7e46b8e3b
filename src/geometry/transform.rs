use crate::dom::dom_model::Document;
use crate::geometry::geometry_model::{Point, Region};

/// Layout width snapshots are rendered at before being shrunk to fit.
pub const DESKTOP_WIDTH: f64 = 1200.0;

/// Stand-in for non-positive or NaN scale values.
pub const MIN_SCALE: f64 = 0.01;

/// How much the desktop-width snapshot is shrunk to fit its container.
/// Always within `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Clamp `raw` into `(0, 1]`. NaN and non-positive values become
    /// `MIN_SCALE`; anything above 1 becomes 1 (no upscaling). Small
    /// positive values are kept as they are.
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() || raw <= 0.0 {
            return ScaleFactor(MIN_SCALE);
        }
        ScaleFactor(raw.min(1.0))
    }

    pub fn identity() -> Self {
        ScaleFactor(1.0)
    }

    /// Scale needed to fit `desktop_width` into a container `container_width` wide.
    pub fn for_container(container_width: f64, desktop_width: f64) -> Self {
        if desktop_width <= 0.0 {
            return Self::identity();
        }
        Self::new(container_width / desktop_width)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::identity()
    }
}

/// Map a container-local (scaled) point back into unscaled page space.
pub fn to_page_space(point: Point, scale: ScaleFactor) -> Point {
    Point::new(point.x / scale.value(), point.y / scale.value())
}

/// Forward transform: page space to the scaled rendering.
pub fn to_viewport_space(point: Point, scale: ScaleFactor) -> Point {
    Point::new(point.x * scale.value(), point.y * scale.value())
}

/// Apply `scale` to the rendering context's root element: origin pinned
/// top-left, explicit desktop width, horizontal overflow suppressed.
pub fn apply_scale(doc: &mut Document, scale: ScaleFactor, desktop_width: f64) {
    let Some(root) = doc.document_element() else {
        return;
    };
    doc.set_style_property(root, "transform", &format!("scale({})", scale.value()));
    doc.set_style_property(root, "transform-origin", "0 0");
    doc.set_style_property(root, "width", &format!("{}px", desktop_width));
    doc.set_style_property(root, "overflow-x", "hidden");
}

/// Pixel rectangle inside a raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Convert a container-local region into raster pixels at `device_pixel_ratio`.
/// The result is at least one pixel in each dimension.
pub fn to_image_space(region: Region, device_pixel_ratio: f64) -> PixelRect {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    PixelRect {
        x: (region.left * dpr).round().max(0.0) as u32,
        y: (region.top * dpr).round().max(0.0) as u32,
        width: ((region.width * dpr).round() as u32).max(1),
        height: ((region.height * dpr).round() as u32).max(1),
    }
}

/// Map a page-space point onto a screenshot taken at `desktop_width` and
/// stored `screenshot_width` pixels wide.
pub fn page_to_screenshot(point: Point, screenshot_width: u32, desktop_width: f64) -> Point {
    if desktop_width <= 0.0 {
        return point;
    }
    let ratio = screenshot_width as f64 / desktop_width;
    Point::new(point.x * ratio, point.y * ratio)
}

/// Map a container region onto a screenshot of the unscaled page: undo
/// the snapshot scale, then resize to the screenshot's resolution. The
/// result is at least one pixel in each dimension.
pub fn region_to_screenshot(
    region: Region,
    scale: ScaleFactor,
    screenshot_width: u32,
    desktop_width: f64,
) -> PixelRect {
    let corner = |x: f64, y: f64| {
        page_to_screenshot(to_page_space(Point::new(x, y), scale), screenshot_width, desktop_width)
    };
    let top_left = corner(region.left, region.top);
    let bottom_right = corner(region.right(), region.bottom());

    let x = top_left.x.round().max(0.0);
    let y = top_left.y.round().max(0.0);
    PixelRect {
        x: x as u32,
        y: y as u32,
        width: (bottom_right.x.round() - x).max(1.0) as u32,
        height: (bottom_right.y.round() - y).max(1.0) as u32,
    }
}
