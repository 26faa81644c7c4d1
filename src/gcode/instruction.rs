//! Instructions: a defining word with its bound parameters, plus
//! validation, rendering and execution order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::kind::{
    ArcDirection, Behavior, DistanceMode, GCodeKind, ModalGroup, ReturnMode, Units,
};
use crate::error::{GcodeError, Result};
use crate::machine::Plane;
use crate::word::{LetterSet, Word};

/// One instruction: a defining word and its parameters.
///
/// Parameters are keyed by letter, each letter at most once, and every
/// letter is one the kind accepts.
#[derive(Debug, Clone)]
pub struct GCode {
    kind: Arc<GCodeKind>,
    word: Word,
    params: BTreeMap<char, Word>,
}

impl PartialEq for GCode {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word && self.params == other.params
    }
}

impl GCode {
    /// An instruction defined by the kind's default word.
    pub fn new(kind: Arc<GCodeKind>) -> Self {
        let word = kind.default_word.clone();
        Self {
            kind,
            word,
            params: BTreeMap::new(),
        }
    }

    /// An instruction defined by `word`, which must belong to `kind`.
    pub fn with_word(kind: Arc<GCodeKind>, word: Word) -> Result<Self> {
        if !kind.accepts_word(&word) {
            return Err(GcodeError::InvalidParameterCombination {
                gcode: kind.name.clone(),
                reason: format!("{} does not define this gcode", word),
            });
        }
        Ok(Self {
            kind,
            word,
            params: BTreeMap::new(),
        })
    }

    /// Shorthand for [`with_word`](Self::with_word) followed by
    /// [`add_parameter`](Self::add_parameter) for each of `params`.
    pub fn with_params(
        kind: Arc<GCodeKind>,
        word: Word,
        params: impl IntoIterator<Item = Word>,
    ) -> Result<Self> {
        let mut gcode = Self::with_word(kind, word)?;
        for param in params {
            gcode.add_parameter(param)?;
        }
        Ok(gcode)
    }

    pub fn kind(&self) -> &Arc<GCodeKind> {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.kind.name
    }

    pub fn word(&self) -> &Word {
        &self.word
    }

    pub fn modal_group(&self) -> Option<ModalGroup> {
        self.kind.modal_group
    }

    pub fn exec_order(&self) -> u32 {
        self.kind.exec_order
    }

    pub fn behavior(&self) -> Behavior {
        self.kind.behavior
    }

    /// Parameters in letter order.
    pub fn params(&self) -> impl Iterator<Item = &Word> {
        self.params.values()
    }

    pub fn param_letters(&self) -> LetterSet {
        self.params.keys().copied().collect()
    }

    pub fn param(&self, letter: char) -> Option<&Word> {
        self.params.get(&letter.to_ascii_uppercase())
    }

    pub fn param_f64(&self, letter: char) -> Option<f64> {
        self.param(letter).and_then(Word::as_f64)
    }

    pub fn has_param(&self, letter: char) -> bool {
        self.param(letter).is_some()
    }

    /// Attach a parameter; its letter must be accepted and not yet present.
    pub fn add_parameter(&mut self, word: Word) -> Result<()> {
        self.check_accepted(&word)?;
        if let Some(existing) = self.params.get(&word.letter()) {
            return Err(GcodeError::DuplicateParameter {
                existing: existing.clone(),
                word,
            });
        }
        self.params.insert(word.letter(), word);
        Ok(())
    }

    /// Attach or replace a parameter.
    pub fn set_parameter(&mut self, word: Word) -> Result<()> {
        self.check_accepted(&word)?;
        self.params.insert(word.letter(), word);
        Ok(())
    }

    pub fn remove_parameter(&mut self, letter: char) -> Option<Word> {
        self.params.remove(&letter.to_ascii_uppercase())
    }

    fn check_accepted(&self, word: &Word) -> Result<()> {
        if self.kind.params.contains(word.letter()) {
            Ok(())
        } else {
            Err(GcodeError::UnknownParameter {
                gcode: self.kind.name.clone(),
                word: word.clone(),
            })
        }
    }

    /// Structural checks beyond per-parameter grammar.
    pub fn validate(&self) -> Result<()> {
        if self.kind.behavior == Behavior::Arc {
            self.validate_arc()?;
        }
        Ok(())
    }

    fn validate_arc(&self) -> Result<()> {
        let letters = self.param_letters();
        let has_xyz = !letters.intersection(xyz()).is_empty();
        let has_ijk = !letters.intersection(ijk()).is_empty();
        let has_r = letters.contains('R');

        let reason = if !has_xyz {
            Some("at least one of XYZ is required")
        } else if has_ijk && has_r {
            Some("both IJK and R given")
        } else if !has_ijk && !has_r {
            Some("neither IJK nor R given")
        } else if has_r && self.param_f64('R') == Some(0.0) {
            Some("cannot plot a circle with a radius of zero")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(GcodeError::InvalidParameterCombination {
                gcode: self.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Number of times a canned cycle runs; `L` when positive, else 1.
    pub fn loop_count(&self) -> u32 {
        self.param('L')
            .and_then(|w| w.value().as_i64())
            .filter(|l| *l > 0)
            .map_or(1, |l| l.min(u32::MAX as i64) as u32)
    }

    /// Copy holding only the parameters worth remembering across lines.
    pub fn modal_snapshot(&self) -> GCode {
        let modal = self.kind.modal_params;
        GCode {
            kind: self.kind.clone(),
            word: self.word.clone(),
            params: self
                .params
                .iter()
                .filter(|(letter, _)| modal.contains(**letter))
                .map(|(letter, word)| (*letter, word.clone()))
                .collect(),
        }
    }

    /// Text of the instruction: the word, then parameters in letter order.
    ///
    /// With `whitespace_prefix` the word is blanked out, keeping the
    /// parameters aligned with a full rendering.
    pub fn render(&self, whitespace_prefix: bool) -> String {
        let word = self.word.to_string();
        let mut text = if whitespace_prefix {
            " ".repeat(word.len())
        } else {
            word
        };
        for param in self.params.values() {
            text.push(' ');
            text.push_str(&param.to_string());
        }
        text
    }

    fn code_tenths(&self) -> Option<i64> {
        self.word.code_key().map(|key| key.tenths)
    }

    fn when(&self, behavior: Behavior) -> Option<i64> {
        (self.kind.behavior == behavior)
            .then(|| self.code_tenths())
            .flatten()
    }

    pub fn plane(&self) -> Option<Plane> {
        self.when(Behavior::PlaneSelect).and_then(Plane::from_code)
    }

    pub fn distance_mode(&self) -> Option<DistanceMode> {
        match self.when(Behavior::DistanceMode)? {
            900 => Some(DistanceMode::Absolute),
            910 => Some(DistanceMode::Incremental),
            _ => None,
        }
    }

    pub fn arc_distance_mode(&self) -> Option<DistanceMode> {
        match self.when(Behavior::ArcDistanceMode)? {
            901 => Some(DistanceMode::Absolute),
            911 => Some(DistanceMode::Incremental),
            _ => None,
        }
    }

    pub fn units(&self) -> Option<Units> {
        match self.when(Behavior::Units)? {
            200 => Some(Units::Inches),
            210 => Some(Units::Millimeters),
            _ => None,
        }
    }

    pub fn return_mode(&self) -> Option<ReturnMode> {
        match self.when(Behavior::CannedReturn)? {
            990 => Some(ReturnMode::ToR),
            _ => Some(ReturnMode::PreviousLevel),
        }
    }

    pub fn arc_direction(&self) -> Option<ArcDirection> {
        match self.when(Behavior::Arc)? {
            20 => Some(ArcDirection::Clockwise),
            30 => Some(ArcDirection::CounterClockwise),
            _ => None,
        }
    }

    /// Coordinate system index, 1 (`G54`) to 9 (`G59.3`).
    pub fn coordinate_system(&self) -> Option<usize> {
        match self.when(Behavior::CoordinateSystem)? {
            t @ (540 | 550 | 560 | 570 | 580 | 590) => Some(((t - 540) / 10 + 1) as usize),
            t @ 591..=593 => Some((t - 591 + 7) as usize),
            _ => None,
        }
    }

    /// Predefined position slot of `G28`/`G30` style codes (0 and 1).
    pub fn predefined_slot(&self) -> Option<usize> {
        let tenths = self
            .when(Behavior::GotoPredefined)
            .or_else(|| self.when(Behavior::SetPredefined))?;
        match tenths / 10 {
            28 => Some(0),
            30 => Some(1),
            _ => None,
        }
    }

    /// `G92.2` resets the offset but keeps it for `G92.3`.
    pub fn keeps_saved_offset(&self) -> bool {
        self.when(Behavior::ResetCoordinateOffset) == Some(922)
    }
}

impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

fn xyz() -> LetterSet {
    LetterSet::parse("XYZ").unwrap_or_default()
}

fn ijk() -> LetterSet {
    LetterSet::parse("IJK").unwrap_or_default()
}

/// Execution order comparison; equal ranks compare equal.
pub fn cmp_exec_order(a: &GCode, b: &GCode) -> Ordering {
    a.exec_order().cmp(&b.exec_order())
}

/// Stable sort into execution order.
pub fn sort_by_exec_order(gcodes: &mut [GCode]) {
    gcodes.sort_by(cmp_exec_order);
}
