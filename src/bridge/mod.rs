pub mod bridge;
pub mod context;
pub mod host;
pub mod message;
