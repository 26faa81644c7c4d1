//! G-code parsing and machine simulation
//!
//! A fast, dialect-aware reader for G-code programs and a simulator of
//! their effect on a machine.
//!
//! This library provides:
//! - Typed words and data-driven dialect tables
//! - Grouping of a line's words into instructions
//! - A modal machine with coordinate systems, canned cycles and arcs
//! - Line-by-line document validation

pub mod config;
pub mod dialect;
pub mod error;
pub mod gcode;
pub mod machine;
pub mod parser;
pub mod validation;
pub mod word;

// Re-exports for clean public API
pub use config::Config;
pub use dialect::{Dialect, DialectRegistry};
pub use error::{GcodeError, Result};
pub use gcode::{GCode, GCodeKind, ModalGroup, text_to_gcodes, words_to_gcodes};
pub use machine::{Machine, Position};
pub use parser::{Block, Line, parse_line};
pub use validation::{Diagnostic, validate_document};
pub use word::{Word, parse_word, tokenize_line};
