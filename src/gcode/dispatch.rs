//! Word -> instruction kind resolution.

use std::collections::HashMap;
use std::sync::Arc;

use super::kind::GCodeKind;
use crate::error::{GcodeError, Result};
use crate::word::{CodeKey, LetterSet, Word};

/// Letters that can define an instruction without an exhaustive search.
const LIKELY_DEFINING: &str = "GMFSTNO";

/// Exact-key table plus an ordered list of predicate kinds.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    exact: HashMap<CodeKey, Arc<GCodeKind>>,
    fallback: Vec<Arc<GCodeKind>>,
    likely: LetterSet,
}

impl Dispatcher {
    /// Index `kinds`. Two kinds claiming the same exact word is an error.
    pub fn build(kinds: &[Arc<GCodeKind>]) -> Result<Self> {
        let mut exact = HashMap::new();
        let mut fallback = Vec::new();

        for kind in kinds {
            match (&kind.word_key, &kind.matcher) {
                (Some(word), _) => {
                    let Some(key) = word.code_key() else {
                        return Err(GcodeError::InvalidDialect(format!(
                            "gcode {} has a non-numeric word key",
                            kind.name
                        )));
                    };
                    if let Some(existing) = exact.insert(key, kind.clone()) {
                        log::debug!("{} and {} both claim {}", existing.name, kind.name, word);
                        return Err(GcodeError::DuplicateInstructionKey {
                            word: word.to_string(),
                        });
                    }
                }
                (None, Some(_)) => fallback.push(kind.clone()),
                (None, None) => {}
            }
        }

        Ok(Self {
            exact,
            fallback,
            likely: LetterSet::parse(LIKELY_DEFINING).unwrap_or_default(),
        })
    }

    /// Kind defined by `word`, or `None` if it is a plain parameter.
    ///
    /// Unless `exhaustive`, letters outside `GMFSTNO` are assumed to be
    /// parameters without looking them up.
    pub fn resolve(&self, word: &Word, exhaustive: bool) -> Option<&Arc<GCodeKind>> {
        if !exhaustive && !self.likely.contains(word.letter()) {
            return None;
        }
        word.code_key()
            .and_then(|key| self.exact.get(&key))
            .or_else(|| self.fallback.iter().find(|kind| kind.accepts_word(word)))
    }

    /// Number of indexed kinds.
    pub fn len(&self) -> usize {
        self.exact.len() + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;

    #[test]
    fn test_resolve_exact_and_fallback() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let dispatcher = d.dispatcher();

        let g1 = Word::parse("G1", &d).unwrap();
        assert_eq!(dispatcher.resolve(&g1, false).unwrap().name, "LinearMove");

        let straight = Word::parse("G38.3", &d).unwrap();
        assert_eq!(dispatcher.resolve(&straight, false).unwrap().name, "StraightProbe");

        let tool = Word::parse("T3", &d).unwrap();
        assert_eq!(dispatcher.resolve(&tool, false).unwrap().name, "SelectTool");

        let user = Word::parse("M150", &d).unwrap();
        assert_eq!(dispatcher.resolve(&user, false).unwrap().name, "UserDefined");
    }

    #[test]
    fn test_resolve_unknown_code() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let g999 = Word::parse("G999", &d).unwrap();
        assert!(d.dispatcher().resolve(&g999, true).is_none());
    }

    #[test]
    fn test_parameter_letters_filtered() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let x = Word::parse("X10", &d).unwrap();
        assert!(d.dispatcher().resolve(&x, false).is_none());
        assert!(d.dispatcher().resolve(&x, true).is_none());
    }

    #[test]
    fn test_filter_does_not_change_defining_letters() {
        let d = dialect::builtin("linuxcnc").unwrap();
        for text in ["G0", "M9", "F100", "S2000", "T1", "N10", "Oprog"] {
            let word = Word::parse(text, &d).unwrap();
            let quick = d.dispatcher().resolve(&word, false).map(|k| k.name.clone());
            let full = d.dispatcher().resolve(&word, true).map(|k| k.name.clone());
            assert!(quick.is_some(), "{} should resolve", text);
            assert_eq!(quick, full);
        }
    }

    #[test]
    fn test_dispatcher_counts_every_kind() {
        let d = dialect::builtin("marlin2").unwrap();
        assert_eq!(d.dispatcher().len(), d.kinds().len());
    }
}
