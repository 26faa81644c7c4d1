//! Dialect Schema Types
//!
//! Serde mirror of the TOML dialect tables. Nothing here is checked beyond
//! what serde does; [`Dialect::from_file`](super::Dialect::from_file) turns a
//! [`DialectFile`] into validated, compiled lookups.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{GcodeError, Result};
use crate::gcode::{Behavior, ModalGroup};
use crate::word::{LetterSet, ValueFormat, ValueType};

/// Root dialect file structure (matches TOML)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DialectFile {
    pub dialect: DialectMeta,
    #[serde(default)]
    pub grammars: BTreeMap<String, GrammarDef>,
    /// Letter -> grammar assignment, keyed by the letter as written.
    #[serde(default)]
    pub words: BTreeMap<String, WordDef>,
    #[serde(default)]
    pub gcodes: Vec<KindDef>,
}

/// Dialect metadata
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DialectMeta {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Name of a dialect whose tables this one builds on.
    pub extends: Option<String>,
    /// Letters the machine moves along.
    pub axes: Option<LetterSet>,
    /// Line applied to a fresh machine.
    pub default_mode: Option<String>,
}

/// Lexical form of a value
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GrammarDef {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub pattern: String,
    pub format: ValueFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WordDef {
    pub grammar: String,
    pub description: Option<String>,
}

/// Instruction kind entry (`[[gcodes]]`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KindDef {
    pub name: String,
    pub word: Option<String>,
    #[serde(rename = "match")]
    pub matcher: Option<MatchDef>,
    pub default_word: Option<String>,
    #[serde(default)]
    pub params: LetterSet,
    #[serde(default)]
    pub modal_params: LetterSet,
    pub modal_group: Option<ModalGroup>,
    #[serde(default = "default_exec_order")]
    pub exec_order: u32,
    #[serde(default)]
    pub behavior: Behavior,
    pub description: Option<String>,
}

/// Predicate over a word's letter and value
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MatchDef {
    pub letter: String,
    pub codes: Option<Vec<f64>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

fn default_exec_order() -> u32 {
    999
}

/// Read a single `A-Z` letter key, case-insensitively.
pub(crate) fn parse_letter(text: &str) -> Result<char> {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
        _ => Err(GcodeError::InvalidDialect(format!(
            "'{}' is not a word letter",
            text
        ))),
    }
}

impl MatchDef {
    pub fn letter(&self) -> Result<char> {
        parse_letter(&self.letter)
    }
}

impl KindDef {
    /// Whether `other` redefines this kind when extending a dialect.
    fn is_replaced_by(&self, other: &KindDef) -> bool {
        if self.name == other.name {
            return true;
        }
        match (&self.word, &other.word) {
            (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
            _ => false,
        }
    }
}

impl DialectFile {
    /// Layer this file on top of `parent`.
    ///
    /// Grammars and words override the parent's by key. Kinds replace a
    /// parent kind with the same name or exact word, and are appended
    /// otherwise. Missing `axes`/`default_mode` fall back to the parent's.
    pub fn merged_onto(self, parent: &DialectFile) -> DialectFile {
        let mut grammars = parent.grammars.clone();
        grammars.extend(self.grammars);
        let mut words = parent.words.clone();
        words.extend(self.words);

        let mut gcodes: Vec<KindDef> = parent
            .gcodes
            .iter()
            .filter(|inherited| !self.gcodes.iter().any(|own| inherited.is_replaced_by(own)))
            .cloned()
            .collect();
        gcodes.extend(self.gcodes);

        DialectFile {
            dialect: DialectMeta {
                axes: self.dialect.axes.or(parent.dialect.axes),
                default_mode: self
                    .dialect
                    .default_mode
                    .or_else(|| parent.dialect.default_mode.clone()),
                ..self.dialect
            },
            grammars,
            words,
            gcodes,
        }
    }
}
