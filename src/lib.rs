//! A configuration-file format with typed access and environment
//! interpolation.
//!
//! `envtoml` parses a TOML-flavored configuration text into an ordered
//! document tree, gives dotted-path typed access to it, and optionally
//! substitutes `${VAR}` environment references (with `${VAR:-default}`
//! fallbacks) into string values.
//!
//! ## Quick start
//!
//! ```rust
//! use envtoml::parse;
//!
//! let doc = parse(r#"
//! title = "demo"
//!
//! [server]
//! host = "localhost"
//! port = 8080
//! tags = ["alpha", "beta"]
//! "#).unwrap();
//!
//! assert_eq!(doc.get_as::<String>("title").unwrap(), "demo");
//! assert_eq!(doc.get_as::<i64>("server.port").unwrap(), 8080);
//! assert_eq!(
//!     doc.get_as::<Vec<String>>("server.tags").unwrap(),
//!     vec!["alpha", "beta"]
//! );
//! ```
//!
//! ## Environment interpolation
//!
//! ```rust
//! use envtoml::parse_with_env_resolver;
//!
//! let doc = parse_with_env_resolver(
//!     "database = \"${DB_URL:-postgres://localhost/dev}\"",
//!     |name| std::env::var(name).ok(),
//! ).unwrap();
//! assert!(doc.get_as::<String>("database").unwrap().starts_with("postgres"));
//! ```
//!
//! ## Errors
//!
//! Parsing is fail-fast and every [`ParseError`] renders with the line and
//! column where the violation was detected. Typed access fails with an
//! [`ExtractError`] naming the full dotted path. The entry points that
//! combine both phases return the umbrella [`Error`].

mod cursor;
mod env;
mod parser;

pub mod error;
pub mod extract;
pub mod table;
pub mod value;

pub use error::{Error, ExtractError, ParseError, Position, Result};
pub use extract::FromValue;
pub use table::Table;
pub use value::{Datetime, Kind, LocalDate, LocalDatetime, LocalTime, TimeOffset, Value};

/// Parse a document into its root [`Table`].
///
/// # Errors
///
/// Returns the first lexical or structural violation found, with the
/// position where it was detected.
pub fn parse(text: &str) -> Result<Table, ParseError> {
    parser::parse_document(text)
}

/// Parse a document, then substitute `${VAR}` references from the process
/// environment.
///
/// # Errors
///
/// Fails on any parse error, on an unclosed `${` reference, or on a
/// reference to a variable that is unset and has no default.
pub fn parse_with_env(text: &str) -> Result<Table> {
    parse_with_env_resolver(text, |name| std::env::var(name).ok())
}

/// Parse a document, then substitute `${VAR}` references through a custom
/// resolver.
///
/// The resolver is consulted exactly once per distinct variable name,
/// regardless of how many references to it appear.
///
/// # Errors
///
/// Fails on any parse error, on an unclosed `${` reference, or on a
/// reference the resolver cannot supply when no default is given.
pub fn parse_with_env_resolver<F>(text: &str, resolve: F) -> Result<Table>
where
    F: Fn(&str) -> Option<String>,
{
    let table = parse(text)?;
    env::interpolate_table(table, resolve).map_err(Error::from)
}
