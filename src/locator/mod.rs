pub mod escape;
pub mod locator_model;
pub mod resolver;
pub mod selector;
