//! Validation Engine
//!
//! Runs a document line by line through the parser and a scratch machine.
//! A line that fails is reported and skipped; the machine keeps the state
//! of the last good line.

use serde::Serialize;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::machine::Machine;
use crate::parser::parse_line;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic message for a validation issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based; 0 for problems not tied to a line.
    pub line: usize,
    pub message: String,
    pub severity: Severity,
}

/// Result of validating a document or line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add_error(&mut self, line: usize, message: String) {
        self.diagnostics.push(Diagnostic {
            line,
            message,
            severity: Severity::Error,
        });
    }

    pub fn add_warning(&mut self, line: usize, message: String) {
        self.diagnostics.push(Diagnostic {
            line,
            message,
            severity: Severity::Warning,
        });
    }

    pub fn is_valid(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

/// Validate a single line of GCode and run it on `machine`.
pub fn validate_line(line_num: usize, text: &str, machine: &mut Machine) -> ValidationResult {
    let mut result = ValidationResult::new();

    let line = match parse_line(text, machine.dialect()) {
        Ok(line) => line,
        Err(e) => {
            result.add_error(line_num, e.to_string());
            return result;
        }
    };

    if line.is_empty() {
        return result;
    }
    if line.block_delete {
        result.add_warning(line_num, "block delete line is executed".to_string());
    }

    let unknown: Vec<String> = line
        .block
        .modal_params()
        .iter()
        .filter(|w| matches!(w.letter(), 'G' | 'M'))
        .map(|w| w.to_string())
        .collect();
    if !unknown.is_empty() {
        for word in unknown {
            result.add_error(
                line_num,
                format!("Unknown command '{}' for the {} dialect", word, machine.dialect().name()),
            );
        }
        return result;
    }

    if let Err(e) = machine.process_block(&line.block) {
        result.add_error(line_num, e.to_string());
    }

    result
}

/// Validate an entire document
pub fn validate_document(content: &str, dialect: &Arc<Dialect>) -> ValidationResult {
    let mut result = ValidationResult::new();

    let mut machine = match Machine::new(dialect.clone()) {
        Ok(machine) => machine,
        Err(e) => {
            result.add_error(0, format!("cannot set up the {} machine: {}", dialect.name(), e));
            return result;
        }
    };

    for (line_num, line) in content.lines().enumerate() {
        let line_result = validate_line(line_num + 1, line, &mut machine);
        result.diagnostics.extend(line_result.diagnostics);
    }

    log::debug!(
        "validated {} lines, {} diagnostics",
        content.lines().count(),
        result.diagnostics.len()
    );
    result
}
