//! Instruction kinds: the per-dialect description of what a defining word
//! means, which parameters it takes, and how it affects the machine.

use serde::Deserialize;

use crate::dialect::schema::{KindDef, MatchDef};
use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};
use crate::word::{LetterSet, Word};

/// Modal groups; at most one instruction per group is active on a machine.
///
/// Variants are declared in the order of their conventional group numbers
/// (see [`ModalGroup::id`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalGroup {
    Motion,
    PlaneSelection,
    Distance,
    ArcIjkDistance,
    FeedRateMode,
    Units,
    CutterDiameterComp,
    ToolLengthOffset,
    CannedCycle,
    CannedCyclesReturn,
    CoordinateSystem,
    ControlMode,
    SpindleSpeedMode,
    LatheDiameter,
    Stopping,
    Spindle,
    Coolant,
    OverrideSwitches,
    UserDefined,
    // Not grouped by the standard, but modal all the same.
    FeedRate,
    SpindleSpeed,
    Tool,
}

impl ModalGroup {
    /// Conventional group number; M-code groups are offset by 100 and the
    /// non-standard singleton groups by 200.
    pub fn id(self) -> u16 {
        match self {
            ModalGroup::Motion => 1,
            ModalGroup::PlaneSelection => 2,
            ModalGroup::Distance => 3,
            ModalGroup::ArcIjkDistance => 4,
            ModalGroup::FeedRateMode => 5,
            ModalGroup::Units => 6,
            ModalGroup::CutterDiameterComp => 7,
            ModalGroup::ToolLengthOffset => 8,
            ModalGroup::CannedCycle => 9,
            ModalGroup::CannedCyclesReturn => 10,
            ModalGroup::CoordinateSystem => 12,
            ModalGroup::ControlMode => 13,
            ModalGroup::SpindleSpeedMode => 14,
            ModalGroup::LatheDiameter => 15,
            ModalGroup::Stopping => 104,
            ModalGroup::Spindle => 107,
            ModalGroup::Coolant => 108,
            ModalGroup::OverrideSwitches => 109,
            ModalGroup::UserDefined => 110,
            ModalGroup::FeedRate => 201,
            ModalGroup::SpindleSpeed => 202,
            ModalGroup::Tool => 203,
        }
    }
}

/// What applying an instruction does to a machine beyond setting its mode.
///
/// Where one kind covers several codes (e.g. `G17`-`G19` in some dialects)
/// the specifics are read from the defining word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    #[default]
    Passive,
    Rapid,
    Linear,
    Arc,
    /// Any other move to the XYZ.. parameters (splines, probing, ...).
    Motion,
    Dwell,
    CannedCycle,
    PlaneSelect,
    DistanceMode,
    ArcDistanceMode,
    Units,
    CannedReturn,
    CoordinateSystem,
    CoordinateOffset,
    ResetCoordinateOffset,
    RestoreCoordinateOffset,
    GotoPredefined,
    SetPredefined,
    Home,
}

impl Behavior {
    /// Moves to the axis parameters when applied.
    pub fn moves(self) -> bool {
        matches!(
            self,
            Behavior::Rapid | Behavior::Linear | Behavior::Arc | Behavior::Motion
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    Absolute,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Inches,
    Millimeters,
}

/// Where the plane's normal axis goes at the end of a canned cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    PreviousLevel,
    ToR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// Predicate for kinds that cover a range or list of codes.
#[derive(Debug, Clone, PartialEq)]
pub enum WordMatcher {
    /// Any value of the letter (`F`, `S`, `T`, `N`, ...).
    Letter(char),
    /// One of the listed codes, in tenths.
    Codes { letter: char, codes: Vec<i64> },
    /// An inclusive range of values.
    Range { letter: char, min: f64, max: f64 },
}

impl WordMatcher {
    pub(crate) fn from_def(def: &MatchDef) -> Result<Self> {
        let letter = def.letter()?;
        match (&def.codes, def.min, def.max) {
            (None, None, None) => Ok(WordMatcher::Letter(letter)),
            (Some(codes), None, None) => Ok(WordMatcher::Codes {
                letter,
                codes: codes.iter().map(|c| (c * 10.0).round() as i64).collect(),
            }),
            (None, Some(min), Some(max)) if min <= max => {
                Ok(WordMatcher::Range { letter, min, max })
            }
            _ => Err(GcodeError::InvalidDialect(format!(
                "match on '{}' needs either codes or both min and max",
                letter
            ))),
        }
    }

    pub fn matches(&self, word: &Word) -> bool {
        match self {
            WordMatcher::Letter(letter) => word.letter() == *letter,
            WordMatcher::Codes { letter, codes } => {
                word.letter() == *letter
                    && word
                        .as_f64()
                        .is_some_and(|v| codes.contains(&((v * 10.0).round() as i64)))
            }
            WordMatcher::Range { letter, min, max } => {
                word.letter() == *letter
                    && word.as_f64().is_some_and(|v| *min <= v && v <= *max)
            }
        }
    }
}

/// One instruction kind of a dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct GCodeKind {
    pub name: String,
    pub description: Option<String>,
    /// Exact defining word, for kinds dispatched by table lookup.
    pub word_key: Option<Word>,
    /// Predicate, for kinds dispatched by scanning.
    pub matcher: Option<WordMatcher>,
    /// Word used when an instruction is created without one.
    pub default_word: Word,
    pub params: LetterSet,
    /// Parameters remembered in the machine's mode.
    pub modal_params: LetterSet,
    pub modal_group: Option<ModalGroup>,
    pub exec_order: u32,
    pub behavior: Behavior,
}

impl GCodeKind {
    /// Build a kind from its table entry; words are read with `dialect`'s
    /// letter grammars.
    pub fn from_def(def: &KindDef, dialect: &Dialect) -> Result<Self> {
        let word_key = def
            .word
            .as_deref()
            .map(|text| Word::parse(text, dialect))
            .transpose()?;
        let matcher = def.matcher.as_ref().map(WordMatcher::from_def).transpose()?;

        match (&word_key, &matcher) {
            (Some(word), None) if word.code_key().is_none() => {
                return Err(GcodeError::InvalidDialect(format!(
                    "gcode {}: exact word '{}' must be numeric",
                    def.name, word
                )));
            }
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(GcodeError::InvalidDialect(format!(
                    "gcode {} must declare exactly one of 'word' or 'match'",
                    def.name
                )));
            }
        }

        let default_word = match &def.default_word {
            Some(text) => Word::parse(text, dialect)?,
            None => word_key.clone().ok_or_else(|| {
                GcodeError::InvalidDialect(format!("gcode {} has no default word", def.name))
            })?,
        };

        Ok(Self {
            name: def.name.clone(),
            description: def.description.clone(),
            word_key,
            matcher,
            default_word,
            params: def.params,
            modal_params: def.modal_params,
            modal_group: def.modal_group,
            exec_order: def.exec_order,
            behavior: def.behavior,
        })
    }

    /// Whether `word` defines an instruction of this kind.
    pub fn accepts_word(&self, word: &Word) -> bool {
        match (&self.word_key, &self.matcher) {
            (Some(key), _) => key == word,
            (None, Some(matcher)) => matcher.matches(word),
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;

    #[test]
    fn test_modal_group_ids_follow_order() {
        let groups = [
            ModalGroup::Motion,
            ModalGroup::Units,
            ModalGroup::CoordinateSystem,
            ModalGroup::Coolant,
            ModalGroup::Tool,
        ];
        for pair in groups.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].id() < pair[1].id());
        }
    }

    #[test]
    fn test_matchers() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let g38 = WordMatcher::Range {
            letter: 'G',
            min: 38.2,
            max: 38.5,
        };
        assert!(g38.matches(&Word::parse("G38.2", &d).unwrap()));
        assert!(g38.matches(&Word::parse("G38.5", &d).unwrap()));
        assert!(!g38.matches(&Word::parse("G38.6", &d).unwrap()));
        assert!(!g38.matches(&Word::parse("M38.3", &d).unwrap()));

        let goto = WordMatcher::Codes {
            letter: 'G',
            codes: vec![280, 300],
        };
        assert!(goto.matches(&Word::parse("G30", &d).unwrap()));
        assert!(!goto.matches(&Word::parse("G28.1", &d).unwrap()));

        let feed = WordMatcher::Letter('F');
        assert!(feed.matches(&Word::parse("F1500", &d).unwrap()));
    }

    #[test]
    fn test_kind_lookup() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let arc = d.kind("ArcMoveCW").expect("G2 kind");
        assert_eq!(arc.behavior, Behavior::Arc);
        assert_eq!(arc.modal_group, Some(ModalGroup::Motion));
        assert!(arc.params.contains('I'));
        assert!(arc.params.contains('R'));
        assert!(arc.accepts_word(&Word::parse("G2", &d).unwrap()));
        assert!(!arc.accepts_word(&Word::parse("G3", &d).unwrap()));
    }
}
