use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum CaptureError {
    /// The raster primitive reported a failure.
    RasterFailed(String),

    /// The raster primitive did not answer within the configured bound.
    TimedOut(Duration),

    /// Decoding, cropping or encoding the raster failed.
    Image(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::RasterFailed(msg) => write!(f, "Could not capture the page: {}", msg),
            CaptureError::TimedOut(after) => write!(
                f,
                "Capturing the page took longer than {} ms",
                after.as_millis()
            ),
            CaptureError::Image(msg) => write!(f, "Could not process the captured image: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<image::ImageError> for CaptureError {
    fn from(e: image::ImageError) -> Self {
        CaptureError::Image(e.to_string())
    }
}
