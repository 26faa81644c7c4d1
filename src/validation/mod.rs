//! Validation Engine
//!
//! Line-by-line document checking against a dialect and a simulated machine.

pub mod engine;

pub use engine::{Diagnostic, Severity, ValidationResult, validate_document, validate_line};
