// src/editor/mod.rs

pub mod form;
pub mod quiz;
pub mod tree;
pub mod validation;

pub use form::{FormController, FormEvent, SubmitOutcome};
pub use quiz::QuizEngine;
pub use tree::ContentTree;
pub use validation::{FieldError, ValidationReport, validate};
