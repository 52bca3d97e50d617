//! Character-level scan position over the input text.
//!
//! [`Cursor`] is the only thing the grammar parsers are built on: peek
//! without consuming, advance one character at a time with line/column
//! tracking, and capture/restore [`Snapshot`]s for transactional
//! backtracking. A parser that fails after partial consumption restores
//! its snapshot before propagating failure; lookahead helpers restore it
//! unconditionally.

use crate::error::Position;

/// A saved cursor state. Restoring one rewinds the cursor completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    offset: usize,
    line: usize,
    column: usize,
}

/// A mutable scan position over borrowed input text.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Cursor {
            input,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// The next character, without consuming it.
    pub(crate) fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    /// The character `k` positions ahead, without consuming anything.
    pub(crate) fn peek_at(&self, k: usize) -> Option<char> {
        self.input[self.offset..].chars().nth(k)
    }

    /// Consume one character, tracking line and column.
    pub(crate) fn advance(&mut self) -> Option<char> {
        let ch = self.input[self.offset..].chars().next()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Consume the next character if it equals `expected`.
    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// Whether the remaining input starts with `prefix`.
    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.offset..].starts_with(prefix)
    }

    /// The current coordinates, for error attachment.
    pub(crate) fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.offset = snapshot.offset;
        self.line = snapshot.line;
        self.column = snapshot.column;
    }

    /// Skip horizontal whitespace only (space and tab).
    ///
    /// The grammar is line-sensitive: key-value statements and headers end
    /// at a newline, so most parsers must not skip past one.
    pub(crate) fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip full trivia: whitespace, newlines, and `#` comments.
    ///
    /// Used between statements and between array elements, where blank
    /// lines and comments are insignificant.
    pub(crate) fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }
}

/// Characters permitted in a bare (unquoted) key.
pub(crate) fn is_bare_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}
