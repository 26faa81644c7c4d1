//! A line's instructions and its unclaimed parameter words.

use std::collections::BTreeMap;
use std::fmt;

use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};
use crate::gcode::{GCode, ModalGroup, words_to_gcodes};
use crate::word::{Word, tokenize_line};

/// Instructions of one line, in textual order, plus the words that no
/// instruction claimed.
///
/// The unclaimed words are modal parameters: they apply to whatever motion
/// mode is active when the block runs. No two instructions of a block share
/// a modal group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    gcodes: Vec<GCode>,
    modal_params: Vec<Word>,
}

impl Block {
    /// Read a comment-free line.
    pub fn parse(text: &str, dialect: &Dialect) -> Result<Self> {
        let words = tokenize_line(text, dialect).collect::<Result<Vec<_>>>()?;
        Self::from_words(&words, dialect)
    }

    pub fn from_words(words: &[Word], dialect: &Dialect) -> Result<Self> {
        let (gcodes, modal_params) = words_to_gcodes(words, dialect)?;
        Self::new(gcodes, modal_params)
    }

    pub fn new(gcodes: Vec<GCode>, modal_params: Vec<Word>) -> Result<Self> {
        let mut seen: BTreeMap<ModalGroup, &GCode> = BTreeMap::new();
        for gcode in &gcodes {
            let Some(group) = gcode.modal_group() else {
                continue;
            };
            if let Some(first) = seen.insert(group, gcode) {
                return Err(GcodeError::ModalGroupConflict {
                    group,
                    first: first.to_string(),
                    second: gcode.to_string(),
                });
            }
        }
        Ok(Self {
            gcodes,
            modal_params,
        })
    }

    pub fn gcodes(&self) -> &[GCode] {
        &self.gcodes
    }

    pub fn modal_params(&self) -> &[Word] {
        &self.modal_params
    }

    pub fn is_empty(&self) -> bool {
        self.gcodes.is_empty() && self.modal_params.is_empty()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .gcodes
            .iter()
            .map(|g| g.to_string())
            .chain(self.modal_params.iter().map(|w| w.to_string()))
            .collect();
        f.write_str(&parts.join(" "))
    }
}
