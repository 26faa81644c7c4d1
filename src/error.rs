//! Error types shared by the parser, the dispatcher and the machine.

use thiserror::Error;

use crate::gcode::ModalGroup;
use crate::word::Word;

/// Errors raised while parsing, grouping, validating or simulating G-code.
///
/// Per-line errors never leave a [`Machine`](crate::machine::Machine) half
/// updated: instructions are validated before any of them is applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GcodeError {
    #[error("malformed word at '{text}': {reason}")]
    MalformedWord { text: String, reason: String },

    #[error("invalid parameter for {gcode}: {word}")]
    UnknownParameter { gcode: String, word: Word },

    #[error("parameter defined twice: {existing} -> {word}")]
    DuplicateParameter { existing: Word, word: Word },

    #[error("invalid parameters for {gcode}: {reason}")]
    InvalidParameterCombination { gcode: String, reason: String },

    #[error("gcode text not fully formed, unassigned parameters: {}", join_words(.words))]
    UnassignedParameters { words: Vec<Word> },

    #[error("{gcode} to incremental coordinates is not supported")]
    UnsupportedConversion { gcode: String },

    #[error("multiple gcode kinds map to '{word}'")]
    DuplicateInstructionKey { word: String },

    #[error("multiple gcodes in the {group:?} modal group: {first} and {second}")]
    ModalGroupConflict {
        group: ModalGroup,
        first: String,
        second: String,
    },

    #[error("invalid machine state: {0}")]
    InvalidMachineState(String),

    #[error("invalid dialect definition: {0}")]
    InvalidDialect(String),

    #[error("unknown dialect '{0}'")]
    UnknownDialect(String),
}

pub type Result<T> = std::result::Result<T, GcodeError>;

fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
