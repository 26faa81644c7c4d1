//! Dialects: the letter grammars and instruction kinds a G-code flavour
//! recognizes.
//!
//! A [`Dialect`] is built once from a [`DialectFile`] and is immutable
//! afterwards; it owns the compiled letter grammars and the [`Dispatcher`]
//! for its kinds. Built-in dialects are embedded TOML tables compiled on
//! first use.

pub mod registry;
pub mod schema;

pub use registry::DialectRegistry;
pub use schema::{DialectFile, DialectMeta, GrammarDef, KindDef, MatchDef, WordDef};

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use crate::error::{GcodeError, Result};
use crate::gcode::{Dispatcher, GCodeKind};
use crate::word::{LetterSet, ValueFormat, ValueType, Word, WordValue};

/// Dialect used when none is selected.
pub const DEFAULT_DIALECT: &str = "linuxcnc";

const BUILTIN_SOURCES: [(&str, &str); 3] = [
    (
        "linuxcnc",
        include_str!("../../resources/dialects/linuxcnc.toml"),
    ),
    (
        "marlin2",
        include_str!("../../resources/dialects/marlin2.toml"),
    ),
    ("prusa", include_str!("../../resources/dialects/prusa.toml")),
];

static BUILTINS: [OnceLock<std::result::Result<Arc<Dialect>, GcodeError>>; 3] =
    [const { OnceLock::new() }; 3];

/// Compiled value grammar of one letter.
#[derive(Debug, Clone)]
pub struct LetterGrammar {
    pub value_type: ValueType,
    pub format: ValueFormat,
    pub description: Option<String>,
    regex: Regex,
}

impl LetterGrammar {
    fn compile(def: &GrammarDef, description: Option<String>) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})", def.pattern)).map_err(|e| {
            GcodeError::InvalidDialect(format!("bad grammar pattern '{}': {}", def.pattern, e))
        })?;
        Ok(Self {
            value_type: def.value_type,
            format: def.format,
            description,
            regex,
        })
    }

    /// The longest grammar match at the start of `text`, if any.
    pub fn match_prefix<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| &text[..m.end()])
    }

    /// Whether all of `text` is a value of this grammar.
    pub fn accepts(&self, text: &str) -> bool {
        self.match_prefix(text).is_some_and(|m| m.len() == text.len())
    }
}

/// A compiled dialect.
#[derive(Debug)]
pub struct Dialect {
    name: String,
    version: Option<String>,
    description: Option<String>,
    grammars: BTreeMap<char, LetterGrammar>,
    kinds: Vec<Arc<GCodeKind>>,
    axes: LetterSet,
    default_mode: String,
    dispatcher: Dispatcher,
    source: DialectFile,
}

impl Dialect {
    /// Compile and validate a dialect table.
    ///
    /// `extends` must already be resolved (see [`DialectFile::merged_onto`]).
    pub fn from_file(file: DialectFile) -> Result<Self> {
        let mut compiled: HashMap<&str, LetterGrammar> = HashMap::new();
        for (name, def) in &file.grammars {
            compiled.insert(name.as_str(), LetterGrammar::compile(def, None)?);
        }

        let mut grammars = BTreeMap::new();
        for (key, word_def) in &file.words {
            let letter = schema::parse_letter(key)?;
            let grammar = compiled.get(word_def.grammar.as_str()).ok_or_else(|| {
                GcodeError::InvalidDialect(format!(
                    "word {} uses unknown grammar '{}'",
                    letter, word_def.grammar
                ))
            })?;
            let mut grammar = grammar.clone();
            grammar.description = word_def.description.clone();
            grammars.insert(letter, grammar);
        }

        let axes = file
            .dialect
            .axes
            .unwrap_or_else(|| LetterSet::parse("XYZ").unwrap_or_default());
        if let Some(missing) = axes.iter().find(|a| !grammars.contains_key(a)) {
            return Err(GcodeError::InvalidDialect(format!(
                "axis {} has no word grammar",
                missing
            )));
        }

        let mut dialect = Dialect {
            name: file.dialect.name.clone(),
            version: file.dialect.version.clone(),
            description: file.dialect.description.clone(),
            grammars,
            kinds: Vec::new(),
            axes,
            default_mode: file.dialect.default_mode.clone().unwrap_or_default(),
            dispatcher: Dispatcher::default(),
            source: DialectFile {
                gcodes: Vec::new(),
                ..file.clone()
            },
        };

        // Kind words are read with the grammars compiled above.
        let kinds = file
            .gcodes
            .iter()
            .map(|def| GCodeKind::from_def(def, &dialect).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        dialect.dispatcher = Dispatcher::build(&kinds)?;
        dialect.kinds = kinds;
        dialect.source.gcodes = file.gcodes;

        log::debug!(
            "built dialect {} ({} letters, {} gcode kinds)",
            dialect.name,
            dialect.grammars.len(),
            dialect.kinds.len()
        );
        Ok(dialect)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Grammar of `letter` (uppercase), if the dialect knows the letter.
    pub fn grammar(&self, letter: char) -> Option<&LetterGrammar> {
        self.grammars.get(&letter)
    }

    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.grammars.keys().copied()
    }

    pub fn kinds(&self) -> &[Arc<GCodeKind>] {
        &self.kinds
    }

    pub fn kind(&self, name: &str) -> Option<&Arc<GCodeKind>> {
        self.kinds.iter().find(|k| k.name == name)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn axes(&self) -> LetterSet {
        self.axes
    }

    /// G-code line describing a fresh machine's modes.
    pub fn default_mode(&self) -> &str {
        &self.default_mode
    }

    /// The table this dialect was compiled from.
    pub fn source(&self) -> &DialectFile {
        &self.source
    }

    /// Build a word from a programmatic value.
    ///
    /// The value is coerced to the letter's type and normalized; it must
    /// then render to text the letter's grammar accepts.
    pub fn word(&self, letter: char, value: impl Into<WordValue>) -> Result<Word> {
        let letter = letter.to_ascii_uppercase();
        let grammar = self
            .grammar(letter)
            .ok_or_else(|| GcodeError::MalformedWord {
                text: letter.to_string(),
                reason: format!("not a word letter in the {} dialect", self.name),
            })?;
        let value = value.into();
        let shown = ValueFormat::Verbatim.render(&value);
        let value = grammar
            .value_type
            .coerce(value)
            .ok_or_else(|| GcodeError::MalformedWord {
                text: format!("{}{}", letter, shown),
                reason: format!("value does not fit word '{}'", letter),
            })?;
        let word = Word::from_parts(letter, value, grammar.format);
        if !grammar.accepts(&word.value_str()) {
            return Err(GcodeError::MalformedWord {
                text: word.to_string(),
                reason: format!("value does not match the grammar of '{}'", letter),
            });
        }
        Ok(word)
    }
}

/// Names of the dialects compiled into the crate.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_SOURCES.iter().map(|(name, _)| *name)
}

/// A built-in dialect, compiled on first request and shared afterwards.
pub fn builtin(name: &str) -> Result<Arc<Dialect>> {
    let index = BUILTIN_SOURCES
        .iter()
        .position(|(n, _)| *n == name)
        .ok_or_else(|| GcodeError::UnknownDialect(name.to_string()))?;
    BUILTINS[index].get_or_init(|| load_builtin(index)).clone()
}

/// The [`DEFAULT_DIALECT`].
pub fn default_dialect() -> Result<Arc<Dialect>> {
    builtin(DEFAULT_DIALECT)
}

fn load_builtin(index: usize) -> Result<Arc<Dialect>> {
    let (name, source) = BUILTIN_SOURCES[index];
    let file: DialectFile = toml::from_str(source)
        .map_err(|e| GcodeError::InvalidDialect(format!("built-in {}: {}", name, e)))?;
    let file = match file.dialect.extends.clone() {
        Some(parent) => file.merged_onto(builtin(&parent)?.source()),
        None => file,
    };
    Dialect::from_file(file).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::{Behavior, ModalGroup};

    #[test]
    fn test_builtins_compile() {
        for name in builtin_names() {
            let dialect = builtin(name).unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(dialect.name(), name);
            assert!(!dialect.kinds().is_empty());
        }
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = builtin("linuxcnc").unwrap();
        let b = default_dialect().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_builtin() {
        assert_eq!(
            builtin("reprap").unwrap_err(),
            GcodeError::UnknownDialect("reprap".to_string())
        );
    }

    #[test]
    fn test_letter_grammars() {
        let linuxcnc = builtin("linuxcnc").unwrap();
        let t = linuxcnc.grammar('T').unwrap();
        assert_eq!(t.value_type, ValueType::Str);
        assert_eq!(t.match_prefix("12 X1"), Some("12"));
        assert!(t.accepts("3"));
        assert!(!t.accepts("-3"));
        assert!(!linuxcnc.axes().contains('E'));

        let marlin = builtin("marlin2").unwrap();
        assert!(marlin.grammar('E').is_some());
        assert!(marlin.axes().contains('E'));
    }

    #[test]
    fn test_dialect_metadata() {
        let linuxcnc = builtin("linuxcnc").unwrap();
        assert_eq!(linuxcnc.version(), Some("2.9"));
        assert!(linuxcnc.description().is_some_and(|d| d.contains("LinuxCNC")));

        let letters: Vec<char> = linuxcnc.letters().collect();
        assert!(letters.windows(2).all(|pair| pair[0] < pair[1]));
        for letter in ['G', 'M', 'N', 'L', 'X', 'F'] {
            assert!(letters.contains(&letter), "{}", letter);
        }
        assert!(!letters.contains(&'E'));
    }

    #[test]
    fn test_prusa_extends_linuxcnc() {
        let prusa = builtin("prusa").unwrap();
        let linuxcnc = builtin("linuxcnc").unwrap();
        assert_eq!(prusa.default_mode(), linuxcnc.default_mode());
        assert!(prusa.kind("RapidMove").is_some());
        assert!(prusa.kind("CancelCannedCycle").is_none());

        let mesh = prusa.kind("MeshBasedZProbe").unwrap();
        assert_eq!(mesh.behavior, Behavior::Passive);
        assert_eq!(mesh.modal_group, None);
        let g80 = prusa.word('G', 80.0).unwrap();
        let resolved = prusa.dispatcher().resolve(&g80, false).unwrap();
        assert_eq!(resolved.name, "MeshBasedZProbe");
    }

    #[test]
    fn test_word_builder() {
        let d = builtin("linuxcnc").unwrap();
        assert_eq!(d.word('g', 1).unwrap().to_string(), "G01");
        assert_eq!(d.word('X', 1.23456).unwrap().to_string(), "X1.235");
        assert_eq!(d.word('T', 2).unwrap().to_string(), "T2");
        assert_eq!(d.word('N', 10.0).unwrap().to_string(), "N10");
        assert!(d.word('N', 1.5).is_err());
        assert!(d.word('G', -1.0).is_err());
        assert!(d.word('#', 1.0).is_err());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let file: DialectFile = toml::from_str(
            r#"
            [dialect]
            name = "dup"
            axes = "X"
            [grammars.code]
            type = "float"
            pattern = '\s*\d+(\.\d)?'
            format = "code"
            [grammars.float]
            type = "float"
            pattern = '\s*-?(\d+\.?\d*|\.\d+)'
            format = "float"
            [words]
            G = { grammar = "code" }
            X = { grammar = "float" }
            [[gcodes]]
            name = "Linear"
            word = "G1"
            modal_group = "motion"
            [[gcodes]]
            name = "AlsoLinear"
            word = "G01"
            "#,
        )
        .unwrap();
        assert!(matches!(
            Dialect::from_file(file),
            Err(GcodeError::DuplicateInstructionKey { .. })
        ));
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let base = r#"
            [dialect]
            name = "bad"
            axes = "X"
            [grammars.float]
            type = "float"
            pattern = '\s*-?(\d+\.?\d*|\.\d+)'
            format = "float"
            [words]
            X = { grammar = "float" }
        "#;

        let unknown_grammar = format!("{}\nG = {{ grammar = \"code\" }}\n", base);
        let file: DialectFile = toml::from_str(&unknown_grammar).unwrap();
        assert!(matches!(
            Dialect::from_file(file),
            Err(GcodeError::InvalidDialect(_))
        ));

        let no_axis_grammar = base.replace("axes = \"X\"", "axes = \"XY\"");
        let file: DialectFile = toml::from_str(&no_axis_grammar).unwrap();
        assert!(matches!(
            Dialect::from_file(file),
            Err(GcodeError::InvalidDialect(_))
        ));

        let unknown_letter = format!(
            "{}\n[[gcodes]]\nname = \"Rapid\"\nword = \"G0\"\n",
            base
        );
        let file: DialectFile = toml::from_str(&unknown_letter).unwrap();
        assert!(matches!(
            Dialect::from_file(file),
            Err(GcodeError::MalformedWord { .. })
        ));
    }

    #[test]
    fn test_modal_groups_in_builtin() {
        let d = builtin("linuxcnc").unwrap();
        let coolant_off = d.kind("CoolantOff").unwrap();
        assert_eq!(coolant_off.modal_group, Some(ModalGroup::Coolant));
        assert_eq!(coolant_off.exec_order, 110);
    }
}
