//! Error types for parsing and typed extraction.
//!
//! Two independent taxonomies cover the two phases of working with a
//! document:
//!
//! - [`ParseError`]: lexical or structural violations found while turning
//!   text into a document tree. Every variant carries the [`Position`]
//!   where the violation was detected and renders as
//!   `"<line>, <column>: <message>"`.
//! - [`ExtractError`]: failures of the read contract — a dotted path that
//!   does not exist, a value of the wrong type, or an environment variable
//!   that could not be resolved. Renders as `"at '<path>': <message>"`.
//!
//! [`Error`] is the umbrella over both, returned by the entry points that
//! span parsing and interpolation.
//!
//! ## Examples
//!
//! ```rust
//! use envtoml::parse;
//!
//! let err = parse("key = [1, \"two\"]").unwrap_err();
//! assert!(err.to_string().contains("homogeneous"));
//! ```

use std::fmt;
use thiserror::Error;

/// A source coordinate: 0-based byte offset, 1-based line and column.
///
/// Constructed fresh at each parse step so errors can be attached to the
/// exact place they were detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The start of input: offset 0, line 1, column 1.
    #[must_use]
    pub const fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.line, self.column)
    }
}

/// All failures that can abort a parse.
///
/// Parsing is fail-fast: the first violation aborts the whole parse and is
/// returned together with the position where it was detected. There is no
/// partial-document result and no multi-error collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A character that cannot start or continue the construct being parsed.
    #[error("{position}: unexpected character '{found}'")]
    UnexpectedChar { position: Position, found: char },

    /// Input ended in the middle of a construct.
    #[error("{position}: unexpected end of input while parsing {context}")]
    UnexpectedEof { position: Position, context: String },

    /// A malformed bare or quoted key.
    #[error("{position}: invalid key: {message}")]
    InvalidKey { position: Position, message: String },

    /// A malformed or unterminated string. For unterminated strings the
    /// position is the string's opening delimiter.
    #[error("{position}: invalid string: {message}")]
    InvalidString { position: Position, message: String },

    /// A malformed integer or float literal.
    #[error("{position}: invalid number: {message}")]
    InvalidNumber { position: Position, message: String },

    /// A malformed date, time, or offset.
    #[error("{position}: invalid datetime: {message}")]
    InvalidDatetime { position: Position, message: String },

    /// A value that matched no production of the value grammar.
    #[error("{position}: invalid value: {message}")]
    InvalidValue { position: Position, message: String },

    /// A key defined twice where redefinition is illegal (inline tables).
    #[error("{position}: duplicate key '{key}'")]
    DuplicateKey { position: Position, key: String },

    /// An illegal table header: duplicate explicit table, a table under an
    /// array-of-tables path, or a header path blocked by a non-table value.
    #[error("{position}: invalid table path: {message}")]
    InvalidTablePath { position: Position, message: String },

    /// An array whose elements do not all share one type category.
    #[error("{position}: arrays must contain homogeneous types")]
    MixedArrayTypes { position: Position },

    /// A malformed inline table.
    #[error("{position}: invalid inline table: {message}")]
    InvalidInlineTable { position: Position, message: String },

    /// Anything that does not fit the other variants.
    #[error("{position}: {message}")]
    Other { position: Position, message: String },
}

impl ParseError {
    pub(crate) fn unexpected_char(position: Position, found: char) -> Self {
        ParseError::UnexpectedChar { position, found }
    }

    pub(crate) fn unexpected_eof(position: Position, context: &str) -> Self {
        ParseError::UnexpectedEof {
            position,
            context: context.to_string(),
        }
    }

    pub(crate) fn invalid_key(position: Position, message: &str) -> Self {
        ParseError::InvalidKey {
            position,
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_string(position: Position, message: &str) -> Self {
        ParseError::InvalidString {
            position,
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_number(position: Position, message: &str) -> Self {
        ParseError::InvalidNumber {
            position,
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_datetime(position: Position, message: &str) -> Self {
        ParseError::InvalidDatetime {
            position,
            message: message.to_string(),
        }
    }

    pub(crate) fn duplicate_key(position: Position, key: &str) -> Self {
        ParseError::DuplicateKey {
            position,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_table_path(position: Position, message: &str) -> Self {
        ParseError::InvalidTablePath {
            position,
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_inline_table(position: Position, message: &str) -> Self {
        ParseError::InvalidInlineTable {
            position,
            message: message.to_string(),
        }
    }

    /// The position the error was detected at.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedChar { position, .. }
            | ParseError::UnexpectedEof { position, .. }
            | ParseError::InvalidKey { position, .. }
            | ParseError::InvalidString { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::InvalidDatetime { position, .. }
            | ParseError::InvalidValue { position, .. }
            | ParseError::DuplicateKey { position, .. }
            | ParseError::InvalidTablePath { position, .. }
            | ParseError::MixedArrayTypes { position }
            | ParseError::InvalidInlineTable { position, .. }
            | ParseError::Other { position, .. } => *position,
        }
    }
}

/// Failures of the typed read contract over a parsed document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// The value at `path` exists but has the wrong type.
    #[error("at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// No value exists at `path`.
    #[error("at '{path}': key not found")]
    KeyNotFound { path: String },

    /// A numeric path segment indexed past the end of an array.
    #[error("at '{path}': index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// A `${VAR}` reference with no resolution and no default.
    #[error("environment variable '{name}' not found")]
    EnvVarNotFound { name: String },

    /// Interpolation failed for a reason other than a missing variable,
    /// e.g. an unclosed `${`.
    #[error("at '{path}': environment interpolation failed: {message}")]
    Interpolation { path: String, message: String },
}

impl ExtractError {
    pub(crate) fn type_mismatch(expected: &str, actual: &str) -> Self {
        ExtractError::TypeMismatch {
            path: String::new(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn key_not_found(path: &str) -> Self {
        ExtractError::KeyNotFound {
            path: path.to_string(),
        }
    }

    /// Rewrite the error to carry `path`, preserving everything else.
    ///
    /// Conversion capabilities build errors without knowing where in the
    /// document they were invoked; the path-based accessors patch the full
    /// dotted path in before surfacing the error.
    #[must_use]
    pub(crate) fn with_path(self, new_path: &str) -> Self {
        match self {
            ExtractError::TypeMismatch {
                expected, actual, ..
            } => ExtractError::TypeMismatch {
                path: new_path.to_string(),
                expected,
                actual,
            },
            ExtractError::KeyNotFound { .. } => ExtractError::KeyNotFound {
                path: new_path.to_string(),
            },
            ExtractError::IndexOutOfBounds { index, len, .. } => ExtractError::IndexOutOfBounds {
                path: new_path.to_string(),
                index,
                len,
            },
            ExtractError::Interpolation { message, .. } => ExtractError::Interpolation {
                path: new_path.to_string(),
                message,
            },
            other @ ExtractError::EnvVarNotFound { .. } => other,
        }
    }
}

/// Umbrella over both error taxonomies, returned by entry points that span
/// parsing and interpolation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_renders_line_and_column() {
        let err = ParseError::unexpected_char(
            Position {
                offset: 10,
                line: 2,
                column: 5,
            },
            '%',
        );
        assert_eq!(err.to_string(), "2, 5: unexpected character '%'");
    }

    #[test]
    fn extract_error_renders_path() {
        let err = ExtractError::type_mismatch("integer", "string").with_path("server.port");
        assert_eq!(
            err.to_string(),
            "at 'server.port': expected integer, found string"
        );
    }

    #[test]
    fn env_var_not_found_keeps_name_when_rewritten() {
        let err = ExtractError::EnvVarNotFound {
            name: "HOME".to_string(),
        };
        assert_eq!(
            err.clone().with_path("ignored"),
            err,
            "variable-not-found errors are not path-scoped"
        );
    }

    #[test]
    fn umbrella_error_is_transparent() {
        let parse: Error = ParseError::MixedArrayTypes {
            position: Position::start(),
        }
        .into();
        assert_eq!(parse.to_string(), "1, 1: arrays must contain homogeneous types");
    }
}
