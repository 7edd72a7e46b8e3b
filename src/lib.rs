pub mod audit;
pub mod bridge;
pub mod browser;
pub mod capture;
pub mod cli;
pub mod dom;
pub mod geometry;
pub mod locator;
pub mod overlay;
pub mod store;
pub mod trace;
