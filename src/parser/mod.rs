//! GCode Parser
//!
//! Raw text lines to [`Line`]s: comments split off, then the code read into
//! a [`Block`] with the active dialect.

pub mod block;
pub mod lexer;

pub use block::Block;
pub use lexer::{Comment, CommentKind, StrippedLine, is_program_delimiter, strip_comments};

use crate::dialect::Dialect;
use crate::error::Result;

/// One parsed source line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub block: Block,
    pub comments: Vec<Comment>,
    /// The block is skipped when block delete is switched on.
    pub block_delete: bool,
}

impl Line {
    /// Nothing to execute on this line.
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}

/// Parse a single line of GCode.
///
/// `%` program delimiters parse as empty lines.
pub fn parse_line(line: &str, dialect: &Dialect) -> Result<Line> {
    let stripped = strip_comments(line);
    if is_program_delimiter(&stripped.code) {
        return Ok(Line {
            comments: stripped.comments,
            ..Line::default()
        });
    }
    Ok(Line {
        block: Block::parse(&stripped.code, dialect)?,
        comments: stripped.comments,
        block_delete: stripped.block_delete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;
    use crate::error::GcodeError;

    #[test]
    fn test_parse_simple_command() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let line = parse_line("G1 X10 Y20", &d).unwrap();
        let gcodes = line.block.gcodes();
        assert_eq!(gcodes.len(), 1);
        assert_eq!(gcodes[0].name(), "LinearMove");
        assert_eq!(gcodes[0].param_f64('X'), Some(10.0));
    }

    #[test]
    fn test_parse_with_comment() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let line = parse_line("G1 X10 ; move to X10", &d).unwrap();
        assert_eq!(line.block.to_string(), "G01 X10");
        assert_eq!(line.comments[0].text, "move to X10");
    }

    #[test]
    fn test_parse_comment_only() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let line = parse_line("(this is a comment)", &d).unwrap();
        assert!(line.is_empty());
        assert_eq!(line.comments[0].kind, CommentKind::Paren);
    }

    #[test]
    fn test_parse_empty_and_delimiter_lines() {
        let d = dialect::builtin("linuxcnc").unwrap();
        assert!(parse_line("   ", &d).unwrap().is_empty());
        assert!(parse_line("%", &d).unwrap().is_empty());
    }

    #[test]
    fn test_parse_lowercase_words() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let line = parse_line("g0 x1.5 z-2", &d).unwrap();
        assert_eq!(line.block.to_string(), "G00 X1.5 Z-2");
    }

    #[test]
    fn test_parse_malformed_word() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let err = parse_line("G1 X1 #5", &d).unwrap_err();
        assert!(matches!(err, GcodeError::MalformedWord { .. }));
    }
}
