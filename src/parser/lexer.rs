//! GCode Lexer
//!
//! Separates a raw line into its code text and comments before the code
//! is read into words.

/// A comment found on a line, without its delimiters.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommentKind {
    /// `; ...` to end of line
    Semicolon,
    /// `( ... )`, possibly several per line
    Paren,
}

/// A line with its comments taken out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrippedLine {
    /// Code text; each comment is replaced by a single space.
    pub code: String,
    pub comments: Vec<Comment>,
    /// The line started with `/`.
    pub block_delete: bool,
}

/// Split `line` into code and comments.
///
/// An unterminated `(` comment runs to the end of the line.
pub fn strip_comments(line: &str) -> StrippedLine {
    let mut stripped = StrippedLine::default();
    let mut chars = line.char_indices().peekable();

    let trimmed = line.trim_start();
    if trimmed.starts_with('/') {
        stripped.block_delete = true;
        let skip = line.len() - trimmed.len() + 1;
        while chars.next_if(|(idx, _)| *idx < skip).is_some() {}
    }

    while let Some((start_idx, ch)) = chars.next() {
        match ch {
            ';' => {
                stripped.comments.push(Comment {
                    kind: CommentKind::Semicolon,
                    text: line[start_idx + 1..].trim().to_string(),
                });
                break;
            }

            '(' => {
                let mut end_idx = line.len();
                for (idx, ch) in chars.by_ref() {
                    if ch == ')' {
                        end_idx = idx;
                        break;
                    }
                }
                stripped.comments.push(Comment {
                    kind: CommentKind::Paren,
                    text: line[start_idx + 1..end_idx].trim().to_string(),
                });
                stripped.code.push(' ');
            }

            '\r' | '\n' => continue,

            c => stripped.code.push(c),
        }
    }

    stripped
}

/// Whether the line is a `%` program delimiter.
pub fn is_program_delimiter(code: &str) -> bool {
    code.trim() == "%"
}
