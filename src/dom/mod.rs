pub mod dom_model;
pub mod parser;
pub mod serialize;
pub mod style;
