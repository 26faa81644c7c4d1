//! Grouping a line's flat word list into instructions.
//!
//! Words are resolved to candidate kinds first; each surviving candidate
//! then claims every later word whose letter it takes as a parameter. A
//! claimed word is a parameter even if it could have defined an
//! instruction itself, and a claimed candidate claims nothing.

use std::sync::Arc;

use super::instruction::{GCode, sort_by_exec_order};
use super::kind::GCodeKind;
use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};
use crate::word::{Word, tokenize_line};

/// Group `words` into instructions, in textual order, plus the words no
/// instruction claimed.
pub fn words_to_gcodes(words: &[Word], dialect: &Dialect) -> Result<(Vec<GCode>, Vec<Word>)> {
    let dispatcher = dialect.dispatcher();
    let candidates: Vec<Option<&Arc<GCodeKind>>> = words
        .iter()
        .map(|word| dispatcher.resolve(word, false))
        .collect();

    // owner[j] = index of the candidate word j is bound to
    let mut owner: Vec<Option<usize>> = vec![None; words.len()];
    for (i, candidate) in candidates.iter().enumerate() {
        let Some(kind) = candidate else { continue };
        if owner[i].is_some() {
            continue;
        }
        for j in (i + 1)..words.len() {
            if owner[j].is_none() && kind.params.contains(words[j].letter()) {
                owner[j] = Some(i);
            }
        }
    }

    let mut gcodes = Vec::new();
    let mut leftovers = Vec::new();
    for (i, word) in words.iter().enumerate() {
        match (candidates[i], owner[i]) {
            (Some(kind), None) => {
                let mut gcode = GCode::with_word(kind.clone(), word.clone())?;
                for (param, _) in owner
                    .iter()
                    .enumerate()
                    .filter(|(_, bound_to)| **bound_to == Some(i))
                {
                    gcode.add_parameter(words[param].clone())?;
                }
                gcodes.push(gcode);
            }
            (None, None) => leftovers.push(word.clone()),
            (_, Some(_)) => {}
        }
    }

    Ok((gcodes, leftovers))
}

/// Tokenize and group one comment-free line, requiring every word to be
/// claimed.
pub fn text_to_gcodes(text: &str, dialect: &Dialect) -> Result<Vec<GCode>> {
    let words = tokenize_line(text, dialect).collect::<Result<Vec<_>>>()?;
    let (gcodes, leftovers) = words_to_gcodes(&words, dialect)?;
    if !leftovers.is_empty() {
        return Err(GcodeError::UnassignedParameters { words: leftovers });
    }
    Ok(gcodes)
}

/// Split `gcodes` around the first instruction matching `pred`.
///
/// Returns `(before, [match], after)`, or `(all, [], [])` when nothing
/// matches. With `sort` the list is put in execution order first.
pub fn split_gcodes<F>(
    mut gcodes: Vec<GCode>,
    pred: F,
    sort: bool,
) -> (Vec<GCode>, Vec<GCode>, Vec<GCode>)
where
    F: Fn(&GCode) -> bool,
{
    if sort {
        sort_by_exec_order(&mut gcodes);
    }
    match gcodes.iter().position(|g| pred(g)) {
        Some(index) => {
            let after = gcodes.split_off(index + 1);
            let matched = gcodes.split_off(index);
            (gcodes, matched, after)
        }
        None => (gcodes, Vec::new(), Vec::new()),
    }
}
