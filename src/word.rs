//! G-code words: a letter address followed by a typed value.
//!
//! The lexical form of each letter's value is owned by the active
//! [`Dialect`]; this module reads words against those grammars and renders
//! them back to canonical text.

use std::fmt;

use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};

/// Value type a letter's grammar converts its matched text into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Int,
    Str,
}

impl ValueType {
    /// Convert the text matched by a letter grammar.
    pub(crate) fn convert(self, text: &str) -> Option<WordValue> {
        let text = text.trim();
        match self {
            ValueType::Float => text.parse().ok().map(WordValue::Float),
            ValueType::Int => text.parse().ok().map(WordValue::Integer),
            ValueType::Str => Some(WordValue::Text(text.to_string())),
        }
    }

    /// Coerce a programmatically supplied value into this type.
    pub(crate) fn coerce(self, value: WordValue) -> Option<WordValue> {
        match (self, value) {
            (ValueType::Float, WordValue::Float(v)) => Some(WordValue::Float(v)),
            (ValueType::Float, WordValue::Integer(i)) => Some(WordValue::Float(i as f64)),
            (ValueType::Float, WordValue::Text(s)) => self.convert(&s),
            (ValueType::Int, WordValue::Integer(i)) => Some(WordValue::Integer(i)),
            (ValueType::Int, WordValue::Float(v)) if v.fract() == 0.0 => {
                Some(WordValue::Integer(v as i64))
            }
            (ValueType::Int, WordValue::Float(_)) => None,
            (ValueType::Int, WordValue::Text(s)) => self.convert(&s),
            (ValueType::Str, WordValue::Text(s)) => Some(WordValue::Text(s)),
            (ValueType::Str, number) => Some(WordValue::Text(ValueFormat::Verbatim.render(&number))),
        }
    }
}

/// Canonical rendering rule of a letter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// G/M codes: one decimal place at most, leading zero below 10 (`G01`, `G38.2`).
    Code,
    /// Coordinates and rates: three decimal places at most.
    Float,
    /// Whole numbers (`N`, `L`).
    Integer,
    /// Text kept as written.
    Verbatim,
}

impl ValueFormat {
    /// Round a value to the precision this format can render, so that a
    /// rendered word parses back to an identical word.
    pub fn normalize(self, value: WordValue) -> WordValue {
        match (self, value) {
            (ValueFormat::Code, WordValue::Float(v)) => WordValue::Float(round_to(v, 1)),
            (ValueFormat::Float, WordValue::Float(v)) => WordValue::Float(round_to(v, 3)),
            (_, value) => value,
        }
    }

    pub fn render(self, value: &WordValue) -> String {
        match (self, value) {
            (_, WordValue::Text(s)) => s.clone(),
            (ValueFormat::Code, WordValue::Float(v)) => code_str(*v),
            (ValueFormat::Code, WordValue::Integer(i)) => code_str(*i as f64),
            (ValueFormat::Float, WordValue::Float(v)) => trim_decimal(format!("{:.3}", v)),
            (ValueFormat::Integer, WordValue::Float(v)) => format!("{:.0}", v),
            (ValueFormat::Verbatim, WordValue::Float(v)) => trim_decimal(format!("{}", v)),
            (_, WordValue::Integer(i)) => i.to_string(),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let scaled = value * scale;
    // already an integer at this magnitude
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / scale;
    // no negative zero
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn code_str(value: f64) -> String {
    let digits = trim_decimal(format!("{:.1}", value));
    if value < 10.0 {
        format!("0{}", digits)
    } else {
        digits
    }
}

fn trim_decimal(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Value carried by a word.
#[derive(Debug, Clone, PartialEq)]
pub enum WordValue {
    Float(f64),
    Integer(i64),
    Text(String),
}

impl WordValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WordValue::Float(v) => Some(*v),
            WordValue::Integer(i) => Some(*i as f64),
            WordValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WordValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            WordValue::Float(_) => None,
            WordValue::Integer(i) => Some(*i),
            WordValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WordValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for WordValue {
    fn from(value: f64) -> Self {
        WordValue::Float(value)
    }
}

impl From<i64> for WordValue {
    fn from(value: i64) -> Self {
        WordValue::Integer(value)
    }
}

impl From<i32> for WordValue {
    fn from(value: i32) -> Self {
        WordValue::Integer(value as i64)
    }
}

impl From<&str> for WordValue {
    fn from(value: &str) -> Self {
        WordValue::Text(value.to_string())
    }
}

/// Exact-match key of a numeric word, with the value scaled to tenths
/// (`G38.2` is `('G', 382)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeKey {
    pub letter: char,
    pub tenths: i64,
}

/// A letter address and its value, e.g. `G1`, `X-2.5`, `T01`.
///
/// Two words are equal when their letters and values are equal.
#[derive(Debug, Clone)]
pub struct Word {
    letter: char,
    value: WordValue,
    format: ValueFormat,
}

impl Word {
    pub(crate) fn from_parts(letter: char, value: WordValue, format: ValueFormat) -> Self {
        Self {
            letter,
            value: format.normalize(value),
            format,
        }
    }

    /// Parse text holding exactly one word.
    pub fn parse(text: &str, dialect: &Dialect) -> Result<Self> {
        let (word, rest) = parse_word(text, dialect)?;
        if !rest.trim().is_empty() {
            return Err(GcodeError::MalformedWord {
                text: rest.trim().to_string(),
                reason: "trailing text after word".to_string(),
            });
        }
        Ok(word)
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn value(&self) -> &WordValue {
        &self.value
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// Key used by the exact-match dispatch table; `None` for text values.
    pub fn code_key(&self) -> Option<CodeKey> {
        let tenths = match &self.value {
            WordValue::Float(v) => (v * 10.0).round() as i64,
            WordValue::Integer(i) => i * 10,
            WordValue::Text(_) => return None,
        };
        Some(CodeKey {
            letter: self.letter,
            tenths,
        })
    }

    /// Rendered value without the letter.
    pub fn value_str(&self) -> String {
        self.format.render(&self.value)
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.letter == other.letter && self.value == other.value
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.value_str())
    }
}

/// Read one word from the start of `text`, returning it with the
/// unconsumed remainder.
///
/// Leading whitespace is skipped and the letter is case-insensitive; the
/// value must match the letter's grammar in `dialect`.
pub fn parse_word<'a>(text: &'a str, dialect: &Dialect) -> Result<(Word, &'a str)> {
    let text = text.trim_start();
    let Some(first) = text.chars().next() else {
        return Err(GcodeError::MalformedWord {
            text: String::new(),
            reason: "expected a word".to_string(),
        });
    };

    let letter = first.to_ascii_uppercase();
    let grammar = dialect
        .grammar(letter)
        .ok_or_else(|| GcodeError::MalformedWord {
            text: text.to_string(),
            reason: format!("'{}' is not a word letter in the {} dialect", first, dialect.name()),
        })?;

    let rest = &text[first.len_utf8()..];
    let matched = grammar
        .match_prefix(rest)
        .ok_or_else(|| GcodeError::MalformedWord {
            text: text.to_string(),
            reason: format!("invalid value for word '{}'", letter),
        })?;
    let value = grammar
        .value_type
        .convert(matched)
        .ok_or_else(|| GcodeError::MalformedWord {
            text: text.to_string(),
            reason: format!("cannot convert '{}' for word '{}'", matched.trim(), letter),
        })?;

    let word = Word::from_parts(letter, value, grammar.format);
    Ok((word, &rest[matched.len()..]))
}

/// Lazily tokenize a comment-free line into words.
///
/// The iterator yields an error at the first malformed word and stops.
pub fn tokenize_line<'a>(text: &'a str, dialect: &'a Dialect) -> Words<'a> {
    Words {
        rest: text,
        dialect,
    }
}

/// Iterator returned by [`tokenize_line`].
pub struct Words<'a> {
    rest: &'a str,
    dialect: &'a Dialect,
}

impl Iterator for Words<'_> {
    type Item = Result<Word>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.trim().is_empty() {
            return None;
        }
        match parse_word(self.rest, self.dialect) {
            Ok((word, rest)) => {
                self.rest = rest;
                Some(Ok(word))
            }
            Err(e) => {
                self.rest = "";
                Some(Err(e))
            }
        }
    }
}

/// A set of word letters `A`..=`Z`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct LetterSet(u32);

impl LetterSet {
    pub const EMPTY: LetterSet = LetterSet(0);

    /// Build a set from a string of letters; anything outside `A-Z`
    /// (after uppercasing) is rejected.
    pub fn parse(letters: &str) -> Option<Self> {
        let mut set = LetterSet::EMPTY;
        for c in letters.chars() {
            if !set.insert(c) {
                return None;
            }
        }
        Some(set)
    }

    fn bit(letter: char) -> Option<u32> {
        let letter = letter.to_ascii_uppercase();
        letter
            .is_ascii_uppercase()
            .then(|| 1 << (letter as u32 - 'A' as u32))
    }

    /// Add a letter, returning `false` if it is not in `A-Z`.
    pub fn insert(&mut self, letter: char) -> bool {
        match Self::bit(letter) {
            Some(bit) => {
                self.0 |= bit;
                true
            }
            None => false,
        }
    }

    pub fn contains(self, letter: char) -> bool {
        Self::bit(letter).is_some_and(|bit| self.0 & bit != 0)
    }

    pub fn union(self, other: LetterSet) -> LetterSet {
        LetterSet(self.0 | other.0)
    }

    pub fn intersection(self, other: LetterSet) -> LetterSet {
        LetterSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = char> {
        ('A'..='Z').filter(move |c| self.contains(*c))
    }
}

impl FromIterator<char> for LetterSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut set = LetterSet::EMPTY;
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl TryFrom<String> for LetterSet {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        LetterSet::parse(&value).ok_or_else(|| format!("invalid letter set '{}'", value))
    }
}

impl fmt::Display for LetterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.iter() {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LetterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LetterSet({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;

    fn linuxcnc() -> std::sync::Arc<Dialect> {
        dialect::builtin("linuxcnc").expect("linuxcnc dialect")
    }

    #[test]
    fn test_parse_word_basic() {
        let d = linuxcnc();
        let (word, rest) = parse_word("G1 X10", &d).unwrap();
        assert_eq!(word.letter(), 'G');
        assert_eq!(word.value(), &WordValue::Float(1.0));
        assert_eq!(rest, " X10");
    }

    #[test]
    fn test_parse_word_lowercase_and_spacing() {
        let d = linuxcnc();
        let (word, _) = parse_word("  x -2.5", &d).unwrap();
        assert_eq!(word.letter(), 'X');
        assert_eq!(word.as_f64(), Some(-2.5));
    }

    #[test]
    fn test_parse_word_malformed() {
        let d = linuxcnc();
        assert!(matches!(
            parse_word("Gx", &d),
            Err(GcodeError::MalformedWord { .. })
        ));
        assert!(matches!(
            parse_word("G-1", &d),
            Err(GcodeError::MalformedWord { .. })
        ));
        assert!(matches!(
            parse_word("#1", &d),
            Err(GcodeError::MalformedWord { .. })
        ));
        assert!(matches!(
            parse_word("", &d),
            Err(GcodeError::MalformedWord { .. })
        ));
    }

    #[test]
    fn test_render_codes_and_floats() {
        let d = linuxcnc();
        assert_eq!(Word::parse("G1", &d).unwrap().to_string(), "G01");
        assert_eq!(Word::parse("G38.2", &d).unwrap().to_string(), "G38.2");
        assert_eq!(Word::parse("M30", &d).unwrap().to_string(), "M30");
        assert_eq!(Word::parse("X10.0", &d).unwrap().to_string(), "X10");
        assert_eq!(Word::parse("Y-.5", &d).unwrap().to_string(), "Y-0.5");
        assert_eq!(Word::parse("Z1.23456", &d).unwrap().to_string(), "Z1.235");
        assert_eq!(Word::parse("N0100", &d).unwrap().to_string(), "N100");
        assert_eq!(Word::parse("T01", &d).unwrap().to_string(), "T01");
    }

    #[test]
    fn test_round_trip() {
        let d = linuxcnc();
        let huge = format!("X{}", "9".repeat(306));
        let texts = [
            "G0", "G1", "G38.3", "G59.3", "M9", "M100", "X0", "X-0.0001", "Y12345.6789",
            "Z.5", "F1500", "S12000", "N42", "L3", "T7", "P0.25", "R-3.5", "Oprog 1",
            "I1.23456789", "J-0.000049", "K123456789012.3456", huge.as_str(),
        ];
        for text in texts {
            let word = Word::parse(text, &d).unwrap();
            let rendered = word.to_string();
            let again = Word::parse(&rendered, &d)
                .unwrap_or_else(|e| panic!("{} rendered as {}: {}", text, rendered, e));
            assert_eq!(word, again, "round trip of {}", text);
        }
    }

    #[test]
    fn test_huge_values_stay_finite() {
        let d = linuxcnc();
        let word = Word::parse(&format!("X{}", "9".repeat(306)), &d).unwrap();
        assert!(word.as_f64().is_some_and(f64::is_finite));
        assert!(!word.to_string().contains("inf"));
    }

    #[test]
    fn test_negative_line_number_and_loop_count() {
        let d = linuxcnc();
        for text in ["N-5", "L-2"] {
            assert!(
                matches!(Word::parse(text, &d), Err(GcodeError::MalformedWord { .. })),
                "{}",
                text
            );
        }
        assert!(Word::parse("N5", &d).is_ok());
    }

    #[test]
    fn test_tokenize_line() {
        let d = linuxcnc();
        let words: Vec<Word> = tokenize_line("G1X10 y-2.5  F100", &d)
            .collect::<Result<_>>()
            .unwrap();
        let rendered: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        assert_eq!(rendered, vec!["G01", "X10", "Y-2.5", "F100"]);
    }

    #[test]
    fn test_tokenize_stops_at_error() {
        let d = linuxcnc();
        let results: Vec<Result<Word>> = tokenize_line("G1 X? Y2", &d).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_tokenize_is_restartable() {
        let d = linuxcnc();
        let first: Vec<_> = tokenize_line("G0 X1", &d).collect();
        let second: Vec<_> = tokenize_line("G0 X1", &d).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_code_key() {
        let d = linuxcnc();
        let word = Word::parse("G38.2", &d).unwrap();
        assert_eq!(
            word.code_key(),
            Some(CodeKey {
                letter: 'G',
                tenths: 382
            })
        );
        assert_eq!(Word::parse("T1", &d).unwrap().code_key(), None);
    }

    #[test]
    fn test_letter_set() {
        let set = LetterSet::parse("xyz").unwrap();
        assert!(set.contains('X'));
        assert!(set.contains('z'));
        assert!(!set.contains('A'));
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_string(), "XYZ");
        assert!(LetterSet::parse("X1").is_none());
        let union = set.union(LetterSet::parse("IJ").unwrap());
        assert_eq!(union.to_string(), "IJXYZ");
        assert_eq!(union.intersection(LetterSet::parse("JX").unwrap()).len(), 2);
    }
}
