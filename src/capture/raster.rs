use std::io::Cursor;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use image::{ImageFormat, RgbaImage};

use crate::capture::error::CaptureError;
use crate::geometry::transform::PixelRect;

/// What a raster's pixels cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RasterSpace {
    /// The container as displayed, already scaled and at device pixel ratio.
    Container,
    /// The unscaled page, `desktop_width` CSS pixels across whatever the
    /// image width is.
    Page { desktop_width: f64 },
}

/// Produces a bitmap of the tracked container or page. Implementations may
/// block; callers bound them with `capture_with_timeout`.
pub trait RasterCapture: Send + Sync {
    fn capture(&self) -> Result<RgbaImage, CaptureError>;

    fn space(&self) -> RasterSpace {
        RasterSpace::Container
    }
}

/// Raster backed by an image captured earlier, e.g. the stored screenshot
/// of a report snapshot.
pub struct StaticRaster {
    image: RgbaImage,
    space: RasterSpace,
}

impl StaticRaster {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            space: RasterSpace::Container,
        }
    }

    pub fn from_base64_png(data: &str) -> Result<Self, CaptureError> {
        Ok(Self::new(decode_base64_image(data)?))
    }

    /// Treat the image as a full-page screenshot rendered at `desktop_width`.
    pub fn in_page_space(mut self, desktop_width: f64) -> Self {
        self.space = RasterSpace::Page { desktop_width };
        self
    }
}

impl RasterCapture for StaticRaster {
    fn capture(&self) -> Result<RgbaImage, CaptureError> {
        Ok(self.image.clone())
    }

    fn space(&self) -> RasterSpace {
        self.space
    }
}

/// Run `raster` on a helper thread and wait at most `timeout` for it.
/// A raster that never answers leaves its thread behind but never blocks
/// the caller past the bound.
pub fn capture_with_timeout(
    raster: Arc<dyn RasterCapture>,
    timeout: Duration,
) -> Result<RgbaImage, CaptureError> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(raster.capture());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(CaptureError::TimedOut(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CaptureError::RasterFailed(
            "raster worker exited without a result".into(),
        )),
    }
}

/// Cut `rect` out of `image`, clamped to the image bounds.
pub fn crop(image: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, CaptureError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(CaptureError::Image("raster is empty".into()));
    }
    let x = rect.x.min(w - 1);
    let y = rect.y.min(h - 1);
    let width = rect.width.min(w - x).max(1);
    let height = rect.height.min(h - y).max(1);
    Ok(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

pub fn to_png_data_url(image: &RgbaImage) -> Result<String, CaptureError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buf)
    ))
}

/// Decode a base64 image, with or without a `data:` URL prefix.
pub fn decode_base64_image(data: &str) -> Result<RgbaImage, CaptureError> {
    let payload = match data.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => data,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| CaptureError::Image(format!("base64 decode failed: {}", e)))?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}
