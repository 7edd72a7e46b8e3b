pub mod annotation_model;
pub mod projector;
