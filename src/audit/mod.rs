pub mod ai_model;
pub mod analyzer;
pub mod equivalence;
pub mod error;
pub mod issue_model;
pub mod pipeline;
