pub mod capture_model;
pub mod error;
pub mod raster;
pub mod region_capture;
