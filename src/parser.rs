//! The recursive-descent grammar and document assembler.
//!
//! Parsing is single-pass and fail-fast: the first lexical or structural
//! violation aborts with a [`ParseError`] carrying the position where it
//! was detected. Grammar disambiguation (integer vs float, date vs bare
//! integer, closing-delimiter checks) is done with bounded lookahead that
//! either restores the cursor snapshot or never consumes at all; past a
//! committed grammar choice every failure is fatal.
//!
//! The document assembler consumes a stream of table headers,
//! array-of-tables headers, comments and key-value statements, and builds
//! one root [`Table`] while enforcing the legality rules:
//!
//! - an explicit `[path]` header may be declared at most once;
//! - a `[path]` header may not sit at or below an array-of-tables path;
//! - `[[path]]` appends a fresh table to the array at `path`;
//! - key-value statements in an array-of-tables context land in the last
//!   element of that array.

use crate::cursor::{is_bare_key_char, Cursor};
use crate::error::{ParseError, Position};
use crate::value::{Datetime, LocalDate, LocalDatetime, LocalTime, TimeOffset, Value};
use crate::Table;
use std::collections::HashSet;

/// Parse a complete document into its root table.
pub(crate) fn parse_document(input: &str) -> Result<Table, ParseError> {
    Parser::new(input).document()
}

struct Parser<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            cursor: Cursor::new(input),
        }
    }

    // -- document assembly --------------------------------------------------

    fn document(mut self) -> Result<Table, ParseError> {
        let mut root = Table::new();
        let mut current_path: Vec<String> = Vec::new();
        let mut explicit_tables: HashSet<Vec<String>> = HashSet::new();
        let mut array_tables: HashSet<Vec<String>> = HashSet::new();

        loop {
            self.cursor.skip_trivia();
            if self.cursor.at_end() {
                break;
            }
            let position = self.cursor.position();
            match self.cursor.peek() {
                Some('[') if self.cursor.peek_at(1) == Some('[') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    self.cursor.skip_ws();
                    let path = self.key()?;
                    self.cursor.skip_ws();
                    if !(self.cursor.eat(']') && self.cursor.eat(']')) {
                        return Err(ParseError::invalid_table_path(
                            position,
                            "expected ']]' to close array-of-tables header",
                        ));
                    }
                    self.append_array_table(&mut root, &path, position)?;
                    array_tables.insert(path.clone());
                    current_path = path;
                    self.line_end()?;
                }
                Some('[') => {
                    self.cursor.advance();
                    self.cursor.skip_ws();
                    let path = self.key()?;
                    self.cursor.skip_ws();
                    if !self.cursor.eat(']') {
                        return Err(ParseError::invalid_table_path(
                            position,
                            "expected ']' to close table header",
                        ));
                    }
                    if explicit_tables.contains(&path) {
                        return Err(ParseError::invalid_table_path(
                            position,
                            &format!("duplicate table '{}'", path.join(".")),
                        ));
                    }
                    // A plain table header may not continue an
                    // array-of-tables path, including the path itself.
                    for end in 1..=path.len() {
                        if array_tables.contains(&path[..end]) {
                            return Err(ParseError::invalid_table_path(
                                position,
                                &format!(
                                    "cannot define table '{}' because '{}' is an array of tables",
                                    path.join("."),
                                    path[..end].join(".")
                                ),
                            ));
                        }
                    }
                    root.table_at_path_mut(&path)
                        .map_err(|msg| ParseError::invalid_table_path(position, &msg))?;
                    explicit_tables.insert(path.clone());
                    current_path = path;
                    self.line_end()?;
                }
                Some(c) if c == '"' || c == '\'' || is_bare_key_char(c) => {
                    let key = self.key()?;
                    self.cursor.skip_ws();
                    if !self.cursor.eat('=') {
                        return Err(ParseError::invalid_key(
                            self.cursor.position(),
                            "expected '=' after key",
                        ));
                    }
                    let value = self.value()?;
                    if array_tables.contains(&current_path) {
                        // Write into the last element of the array, never a
                        // new one.
                        let target = last_array_table_mut(&mut root, &current_path)
                            .ok_or_else(|| {
                                ParseError::invalid_table_path(
                                    position,
                                    &format!(
                                        "array of tables '{}' has no open element",
                                        current_path.join(".")
                                    ),
                                )
                            })?;
                        target
                            .insert_path(&key, value)
                            .map_err(|msg| ParseError::invalid_table_path(position, &msg))?;
                    } else {
                        let mut full = current_path.clone();
                        full.extend(key);
                        root.insert_path(&full, value)
                            .map_err(|msg| ParseError::invalid_table_path(position, &msg))?;
                    }
                    self.line_end()?;
                }
                Some(found) => return Err(ParseError::unexpected_char(position, found)),
                None => break,
            }
        }
        Ok(root)
    }

    /// Append a fresh empty table onto the array at `path`, creating
    /// intermediate tables as needed and starting a one-element array if
    /// the tail does not already hold one.
    fn append_array_table(
        &mut self,
        root: &mut Table,
        path: &[String],
        position: Position,
    ) -> Result<(), ParseError> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| ParseError::invalid_table_path(position, "empty header path"))?;
        let parent = root
            .table_at_path_mut(parents)
            .map_err(|msg| ParseError::invalid_table_path(position, &msg))?;
        match parent.get_mut(last) {
            Some(Value::Array(array)) => array.push(Value::Table(Table::new())),
            _ => {
                parent.insert(
                    last.clone(),
                    Value::Array(vec![Value::Table(Table::new())]),
                );
            }
        }
        Ok(())
    }

    /// Headers and key-value statements must be the last thing on their
    /// line, save for trailing whitespace and a comment.
    fn line_end(&mut self) -> Result<(), ParseError> {
        self.cursor.skip_ws();
        match self.cursor.peek() {
            None => Ok(()),
            Some('\n') => {
                self.cursor.advance();
                Ok(())
            }
            Some('\r') if self.cursor.peek_at(1) == Some('\n') => {
                self.cursor.advance();
                self.cursor.advance();
                Ok(())
            }
            Some('#') => {
                while let Some(ch) = self.cursor.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.cursor.advance();
                }
                Ok(())
            }
            Some(found) => Err(ParseError::unexpected_char(self.cursor.position(), found)),
        }
    }

    // -- keys ---------------------------------------------------------------

    /// A possibly dotted key: one or more segments separated by `.` with
    /// optional horizontal whitespace around each dot.
    fn key(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parts = vec![self.key_segment()?];
        loop {
            let before_dot = self.cursor.snapshot();
            self.cursor.skip_ws();
            if self.cursor.eat('.') {
                self.cursor.skip_ws();
                parts.push(self.key_segment()?);
            } else {
                self.cursor.restore(before_dot);
                break;
            }
        }
        Ok(parts)
    }

    fn key_segment(&mut self) -> Result<String, ParseError> {
        let position = self.cursor.position();
        match self.cursor.peek() {
            Some('"') => self.basic_string(),
            Some('\'') => self.literal_string(),
            Some(c) if is_bare_key_char(c) => {
                let mut segment = String::new();
                while let Some(ch) = self.cursor.peek() {
                    if is_bare_key_char(ch) {
                        segment.push(ch);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                Ok(segment)
            }
            Some(found) => Err(ParseError::invalid_key(
                position,
                &format!("unexpected character '{}' in key", found),
            )),
            None => Err(ParseError::unexpected_eof(position, "a key")),
        }
    }

    // -- values -------------------------------------------------------------

    /// Top-level value dispatch on the first character, with bounded
    /// lookahead to tell dates and times apart from bare numbers.
    fn value(&mut self) -> Result<Value, ParseError> {
        self.cursor.skip_ws();
        let position = self.cursor.position();
        match self.cursor.peek() {
            Some('"') | Some('\'') => self.string().map(Value::String),
            Some('[') => self.array(),
            Some('{') => self.inline_table(),
            Some('t') | Some('f') => self.boolean(),
            Some('i') if self.cursor.starts_with("inf") => self.number(),
            Some('n') if self.cursor.starts_with("nan") => self.number(),
            Some('+') | Some('-') => self.number(),
            Some(c) if c.is_ascii_digit() => {
                if self.looks_like_date() {
                    self.date_or_datetime()
                } else if self.looks_like_time() {
                    self.local_time().map(Value::LocalTime)
                } else {
                    self.number()
                }
            }
            Some(found) => Err(ParseError::unexpected_char(position, found)),
            None => Err(ParseError::unexpected_eof(position, "a value")),
        }
    }

    fn boolean(&mut self) -> Result<Value, ParseError> {
        let position = self.cursor.position();
        if self.cursor.starts_with("true") {
            for _ in 0..4 {
                self.cursor.advance();
            }
            Ok(Value::Boolean(true))
        } else if self.cursor.starts_with("false") {
            for _ in 0..5 {
                self.cursor.advance();
            }
            Ok(Value::Boolean(false))
        } else {
            Err(ParseError::InvalidValue {
                position,
                message: "expected 'true' or 'false'".to_string(),
            })
        }
    }

    // -- strings ------------------------------------------------------------

    /// Select among the four string forms by the first one to three
    /// characters.
    fn string(&mut self) -> Result<String, ParseError> {
        if self.cursor.starts_with("\"\"\"") {
            self.multiline_basic_string()
        } else if self.cursor.starts_with("'''") {
            self.multiline_literal_string()
        } else if self.cursor.peek() == Some('"') {
            self.basic_string()
        } else {
            self.literal_string()
        }
    }

    fn basic_string(&mut self) -> Result<String, ParseError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut out = String::new();
        loop {
            match self.cursor.peek() {
                None => return Err(ParseError::invalid_string(start, "unclosed string")),
                Some('"') => {
                    self.cursor.advance();
                    return Ok(out);
                }
                Some('\n') | Some('\r') => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "newline in single-line string",
                    ));
                }
                Some('\\') => {
                    self.cursor.advance();
                    out.push(self.escape()?);
                }
                Some(ch) if ch < '\u{20}' && ch != '\t' => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "control character in string",
                    ));
                }
                Some(ch) => {
                    self.cursor.advance();
                    out.push(ch);
                }
            }
        }
    }

    fn literal_string(&mut self) -> Result<String, ParseError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut out = String::new();
        loop {
            match self.cursor.peek() {
                None => return Err(ParseError::invalid_string(start, "unclosed string")),
                Some('\'') => {
                    self.cursor.advance();
                    return Ok(out);
                }
                Some('\n') | Some('\r') => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "newline in single-line string",
                    ));
                }
                Some(ch) if ch < '\u{20}' && ch != '\t' => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "control character in string",
                    ));
                }
                Some(ch) => {
                    self.cursor.advance();
                    out.push(ch);
                }
            }
        }
    }

    fn multiline_basic_string(&mut self) -> Result<String, ParseError> {
        let start = self.cursor.position();
        for _ in 0..3 {
            self.cursor.advance();
        }
        self.skip_immediate_newline();
        let mut out = String::new();
        loop {
            // The closing delimiter is checked before any content
            // character is consumed.
            if self.cursor.starts_with("\"\"\"") {
                for _ in 0..3 {
                    self.cursor.advance();
                }
                return Ok(out);
            }
            match self.cursor.peek() {
                None => return Err(ParseError::invalid_string(start, "unclosed string")),
                Some('\\') => {
                    if matches!(self.cursor.peek_at(1), Some('\n') | Some('\r')) {
                        // Line continuation: the backslash, the newline and
                        // all following whitespace produce no output.
                        self.cursor.advance();
                        while matches!(
                            self.cursor.peek(),
                            Some(' ') | Some('\t') | Some('\n') | Some('\r')
                        ) {
                            self.cursor.advance();
                        }
                    } else {
                        self.cursor.advance();
                        out.push(self.escape()?);
                    }
                }
                Some(ch) if ch < '\u{20}' && ch != '\t' && ch != '\n' && ch != '\r' => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "control character in string",
                    ));
                }
                Some(ch) => {
                    self.cursor.advance();
                    out.push(ch);
                }
            }
        }
    }

    fn multiline_literal_string(&mut self) -> Result<String, ParseError> {
        let start = self.cursor.position();
        for _ in 0..3 {
            self.cursor.advance();
        }
        self.skip_immediate_newline();
        let mut out = String::new();
        loop {
            if self.cursor.starts_with("'''") {
                for _ in 0..3 {
                    self.cursor.advance();
                }
                return Ok(out);
            }
            match self.cursor.peek() {
                None => return Err(ParseError::invalid_string(start, "unclosed string")),
                Some(ch) if ch < '\u{20}' && ch != '\t' && ch != '\n' && ch != '\r' => {
                    return Err(ParseError::invalid_string(
                        self.cursor.position(),
                        "control character in string",
                    ));
                }
                Some(ch) => {
                    self.cursor.advance();
                    out.push(ch);
                }
            }
        }
    }

    /// A newline directly after an opening multi-line delimiter is
    /// discarded.
    fn skip_immediate_newline(&mut self) {
        if self.cursor.starts_with("\r\n") {
            self.cursor.advance();
            self.cursor.advance();
        } else if self.cursor.peek() == Some('\n') {
            self.cursor.advance();
        }
    }

    /// One backslash escape, with the backslash already consumed.
    fn escape(&mut self) -> Result<char, ParseError> {
        let position = self.cursor.position();
        match self.cursor.advance() {
            Some('b') => Ok('\u{8}'),
            Some('t') => Ok('\t'),
            Some('n') => Ok('\n'),
            Some('f') => Ok('\u{c}'),
            Some('r') => Ok('\r'),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('u') => self.unicode_escape(4, position),
            Some('U') => self.unicode_escape(8, position),
            Some(other) => Err(ParseError::invalid_string(
                position,
                &format!("unknown escape '\\{}'", other),
            )),
            None => Err(ParseError::unexpected_eof(position, "an escape sequence")),
        }
    }

    fn unicode_escape(&mut self, digits: usize, position: Position) -> Result<char, ParseError> {
        let mut code_point: u32 = 0;
        for _ in 0..digits {
            match self.cursor.peek() {
                Some(ch) if ch.is_ascii_hexdigit() => {
                    code_point = code_point * 16 + ch.to_digit(16).unwrap_or(0);
                    self.cursor.advance();
                }
                _ => {
                    return Err(ParseError::invalid_string(
                        position,
                        &format!("expected {} hex digits in unicode escape", digits),
                    ));
                }
            }
        }
        if code_point >= 0x110000 {
            return Err(ParseError::invalid_string(
                position,
                "unicode code point out of range",
            ));
        }
        char::from_u32(code_point).ok_or_else(|| {
            ParseError::invalid_string(position, "unicode escape names a surrogate code point")
        })
    }

    // -- numbers ------------------------------------------------------------

    /// The grammar is ambiguous at the first character of a number, so the
    /// entry point decides integer-vs-float with a speculative scan that
    /// restores the cursor before committing.
    fn number(&mut self) -> Result<Value, ParseError> {
        if self.looks_like_float() {
            self.float().map(Value::Float)
        } else {
            self.integer().map(Value::Integer)
        }
    }

    /// Non-consuming scan: after an optional sign, `inf`/`nan` or a digit
    /// run followed by `.`, `e` or `E` is float-shaped. Radix-prefixed
    /// integers are never floats (their hex digits may contain `e`).
    fn looks_like_float(&mut self) -> bool {
        let saved = self.cursor.snapshot();
        if matches!(self.cursor.peek(), Some('+') | Some('-')) {
            self.cursor.advance();
        }
        let shaped = if self.cursor.starts_with("inf") || self.cursor.starts_with("nan") {
            true
        } else if self.cursor.starts_with("0x")
            || self.cursor.starts_with("0o")
            || self.cursor.starts_with("0b")
        {
            false
        } else {
            loop {
                match self.cursor.peek() {
                    Some(c) if c.is_ascii_digit() || c == '_' => {
                        self.cursor.advance();
                    }
                    Some('.') | Some('e') | Some('E') => break true,
                    _ => break false,
                }
            }
        };
        self.cursor.restore(saved);
        shaped
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let start = self.cursor.position();
        let mut sign = None;
        if matches!(self.cursor.peek(), Some('+') | Some('-')) {
            sign = self.cursor.advance();
        }
        for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
            if self.cursor.starts_with(prefix) {
                if sign.is_some() {
                    return Err(ParseError::invalid_number(
                        start,
                        "sign is not allowed on radix-prefixed integers",
                    ));
                }
                self.cursor.advance();
                self.cursor.advance();
                let digits = self.digits(radix)?;
                return i64::from_str_radix(&digits, radix)
                    .map_err(|_| ParseError::invalid_number(start, "integer out of range"));
            }
        }
        let digits = self.digits(10)?;
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(ParseError::invalid_number(
                start,
                "leading zeros are not allowed",
            ));
        }
        let mut text = String::new();
        if sign == Some('-') {
            text.push('-');
        }
        text.push_str(&digits);
        text.parse::<i64>()
            .map_err(|_| ParseError::invalid_number(start, "integer out of range"))
    }

    fn float(&mut self) -> Result<f64, ParseError> {
        let start = self.cursor.position();
        let mut negative = false;
        if matches!(self.cursor.peek(), Some('+') | Some('-')) {
            negative = self.cursor.advance() == Some('-');
        }
        if self.cursor.starts_with("inf") {
            for _ in 0..3 {
                self.cursor.advance();
            }
            return Ok(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            });
        }
        if self.cursor.starts_with("nan") {
            for _ in 0..3 {
                self.cursor.advance();
            }
            // The sign does not apply to nan.
            return Ok(f64::NAN);
        }
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        let int_part = self.digits(10)?;
        if int_part.len() > 1 && int_part.starts_with('0') {
            return Err(ParseError::invalid_number(
                start,
                "leading zeros are not allowed",
            ));
        }
        text.push_str(&int_part);
        let mut shaped = false;
        if self.cursor.eat('.') {
            text.push('.');
            text.push_str(&self.digits(10)?);
            shaped = true;
        }
        if matches!(self.cursor.peek(), Some('e') | Some('E')) {
            self.cursor.advance();
            text.push('e');
            if matches!(self.cursor.peek(), Some('+') | Some('-')) {
                if let Some(exp_sign) = self.cursor.advance() {
                    text.push(exp_sign);
                }
            }
            text.push_str(&self.digits(10)?);
            shaped = true;
        }
        if !shaped {
            // Unreachable through the dispatcher, which routes bare digit
            // runs to integer parsing.
            return Err(ParseError::invalid_number(
                start,
                "expected '.' or exponent in float",
            ));
        }
        text.parse::<f64>()
            .map_err(|_| ParseError::invalid_number(start, "malformed float"))
    }

    /// A run of digits in `radix` with `_` separators; every underscore
    /// must be preceded and followed by a digit.
    fn digits(&mut self, radix: u32) -> Result<String, ParseError> {
        let start = self.cursor.position();
        let mut digits = String::new();
        let mut trailing_underscore = false;
        loop {
            match self.cursor.peek() {
                Some('_') => {
                    if digits.is_empty() || trailing_underscore {
                        return Err(ParseError::invalid_number(
                            self.cursor.position(),
                            "underscore must be surrounded by digits",
                        ));
                    }
                    trailing_underscore = true;
                    self.cursor.advance();
                }
                Some(ch) if ch.is_digit(radix) => {
                    digits.push(ch);
                    trailing_underscore = false;
                    self.cursor.advance();
                }
                _ => break,
            }
        }
        if digits.is_empty() {
            return Err(ParseError::invalid_number(start, "expected digits"));
        }
        if trailing_underscore {
            return Err(ParseError::invalid_number(
                self.cursor.position(),
                "underscore must be surrounded by digits",
            ));
        }
        Ok(digits)
    }

    // -- datetimes ----------------------------------------------------------

    /// Bounded lookahead: four digits then `-` is date-shaped. Never
    /// consumes.
    fn looks_like_date(&self) -> bool {
        (0..4).all(|i| matches!(self.cursor.peek_at(i), Some(c) if c.is_ascii_digit()))
            && self.cursor.peek_at(4) == Some('-')
    }

    /// Bounded lookahead: two digits then `:` is time-shaped. Never
    /// consumes.
    fn looks_like_time(&self) -> bool {
        (0..2).all(|i| matches!(self.cursor.peek_at(i), Some(c) if c.is_ascii_digit()))
            && self.cursor.peek_at(2) == Some(':')
    }

    fn date_or_datetime(&mut self) -> Result<Value, ParseError> {
        let date = self.local_date()?;
        match self.cursor.peek() {
            Some('T') | Some('t') => {
                self.cursor.advance();
            }
            Some(' ') if matches!(self.cursor.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                self.cursor.advance();
            }
            _ => return Ok(Value::LocalDate(date)),
        }
        let time = self.local_time()?;
        match self.cursor.peek() {
            Some('Z') | Some('z') | Some('+') | Some('-') => {
                let offset = self.time_offset()?;
                Ok(Value::Datetime(Datetime {
                    date,
                    time,
                    offset: Some(offset),
                }))
            }
            _ => Ok(Value::LocalDatetime(LocalDatetime { date, time })),
        }
    }

    /// Exactly `YYYY-MM-DD`. Month and day get coarse range checks only;
    /// month-specific day limits and leap years are not validated.
    fn local_date(&mut self) -> Result<LocalDate, ParseError> {
        let start = self.cursor.position();
        let year = self.fixed_digits(4, "year")?;
        self.expect_datetime_char('-', start)?;
        let month = self.fixed_digits(2, "month")?;
        if !(1..=12).contains(&month) {
            return Err(ParseError::invalid_datetime(start, "month out of range"));
        }
        self.expect_datetime_char('-', start)?;
        let day = self.fixed_digits(2, "day")?;
        if !(1..=31).contains(&day) {
            return Err(ParseError::invalid_datetime(start, "day out of range"));
        }
        Ok(LocalDate {
            year: year as i32,
            month: month as u8,
            day: day as u8,
        })
    }

    /// Exactly `HH:MM:SS` with an optional fraction. Fractional digits
    /// beyond nanosecond precision are consumed and discarded; fewer than
    /// nine are right-padded with zeros.
    fn local_time(&mut self) -> Result<LocalTime, ParseError> {
        let start = self.cursor.position();
        let hour = self.fixed_digits(2, "hour")?;
        if hour > 23 {
            return Err(ParseError::invalid_datetime(start, "hour out of range"));
        }
        self.expect_datetime_char(':', start)?;
        let minute = self.fixed_digits(2, "minute")?;
        if minute > 59 {
            return Err(ParseError::invalid_datetime(start, "minute out of range"));
        }
        self.expect_datetime_char(':', start)?;
        let second = self.fixed_digits(2, "second")?;
        // 60 is allowed for leap seconds.
        if second > 60 {
            return Err(ParseError::invalid_datetime(start, "second out of range"));
        }
        let mut nanosecond: u32 = 0;
        if self.cursor.eat('.') {
            let mut count = 0u32;
            while let Some(ch) = self.cursor.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                if count < 9 {
                    nanosecond = nanosecond * 10 + ch.to_digit(10).unwrap_or(0);
                }
                count += 1;
                self.cursor.advance();
            }
            if count == 0 {
                return Err(ParseError::invalid_datetime(
                    start,
                    "expected fractional-second digits",
                ));
            }
            while count < 9 {
                nanosecond *= 10;
                count += 1;
            }
        }
        Ok(LocalTime {
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            nanosecond,
        })
    }

    /// `Z`/`z`, or `+HH:MM` / `-HH:MM` as a signed minute offset.
    fn time_offset(&mut self) -> Result<TimeOffset, ParseError> {
        let start = self.cursor.position();
        match self.cursor.peek() {
            Some('Z') | Some('z') => {
                self.cursor.advance();
                Ok(TimeOffset { minutes: 0 })
            }
            Some('+') | Some('-') => {
                let negative = self.cursor.advance() == Some('-');
                let hours = self.fixed_digits(2, "offset hours")?;
                if hours > 23 {
                    return Err(ParseError::invalid_datetime(
                        start,
                        "offset hours out of range",
                    ));
                }
                self.expect_datetime_char(':', start)?;
                let minutes = self.fixed_digits(2, "offset minutes")?;
                if minutes > 59 {
                    return Err(ParseError::invalid_datetime(
                        start,
                        "offset minutes out of range",
                    ));
                }
                let total = (hours * 60 + minutes) as i16;
                Ok(TimeOffset {
                    minutes: if negative { -total } else { total },
                })
            }
            _ => Err(ParseError::invalid_datetime(start, "expected timezone offset")),
        }
    }

    fn fixed_digits(&mut self, count: usize, what: &str) -> Result<u32, ParseError> {
        let mut value: u32 = 0;
        for _ in 0..count {
            match self.cursor.peek() {
                Some(ch) if ch.is_ascii_digit() => {
                    value = value * 10 + ch.to_digit(10).unwrap_or(0);
                    self.cursor.advance();
                }
                _ => {
                    return Err(ParseError::invalid_datetime(
                        self.cursor.position(),
                        &format!("expected {} digits for {}", count, what),
                    ));
                }
            }
        }
        Ok(value)
    }

    fn expect_datetime_char(&mut self, expected: char, start: Position) -> Result<(), ParseError> {
        if self.cursor.eat(expected) {
            Ok(())
        } else {
            Err(ParseError::invalid_datetime(
                start,
                &format!("expected '{}'", expected),
            ))
        }
    }

    // -- arrays and inline tables -------------------------------------------

    /// Elements may span lines; full trivia is allowed between them. Every
    /// element must share the first element's coarse type category.
    fn array(&mut self) -> Result<Value, ParseError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut elements: Vec<Value> = Vec::new();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                None => return Err(ParseError::unexpected_eof(start, "an array")),
                Some(']') => {
                    self.cursor.advance();
                    break;
                }
                _ => {}
            }
            let element_position = self.cursor.position();
            let value = self.value()?;
            if let Some(first) = elements.first() {
                if value.kind() != first.kind() {
                    return Err(ParseError::MixedArrayTypes {
                        position: element_position,
                    });
                }
            }
            elements.push(value);
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.advance();
                }
                Some(']') => {
                    self.cursor.advance();
                    break;
                }
                Some(found) => {
                    return Err(ParseError::unexpected_char(self.cursor.position(), found))
                }
                None => return Err(ParseError::unexpected_eof(start, "an array")),
            }
        }
        Ok(Value::Array(elements))
    }

    /// Entries stay on one line: only horizontal whitespace separates
    /// them. A single-segment key must not already exist; dotted keys go
    /// through path-creating insertion.
    fn inline_table(&mut self) -> Result<Value, ParseError> {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut table = Table::new();
        self.cursor.skip_ws();
        if self.cursor.eat('}') {
            return Ok(Value::Table(table));
        }
        loop {
            self.cursor.skip_ws();
            let key_position = self.cursor.position();
            let key = self.key()?;
            self.cursor.skip_ws();
            if !self.cursor.eat('=') {
                return Err(ParseError::invalid_inline_table(
                    self.cursor.position(),
                    "expected '=' after key",
                ));
            }
            let value = self.value()?;
            if key.len() == 1 {
                if table.contains_key(&key[0]) {
                    return Err(ParseError::duplicate_key(key_position, &key[0]));
                }
                table.insert(key[0].clone(), value);
            } else {
                table
                    .insert_path(&key, value)
                    .map_err(|msg| ParseError::invalid_inline_table(key_position, &msg))?;
            }
            self.cursor.skip_ws();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.advance();
                }
                Some('}') => {
                    self.cursor.advance();
                    break;
                }
                Some(found) => {
                    return Err(ParseError::invalid_inline_table(
                        self.cursor.position(),
                        &format!("expected ',' or '}}', found '{}'", found),
                    ));
                }
                None => return Err(ParseError::unexpected_eof(start, "an inline table")),
            }
        }
        Ok(Value::Table(table))
    }
}

/// Locate the last element of the array of tables at `path`.
fn last_array_table_mut<'t>(root: &'t mut Table, path: &[String]) -> Option<&'t mut Table> {
    let (last, parents) = path.split_last()?;
    let mut current = root;
    for segment in parents {
        current = match current.get_mut(segment)? {
            Value::Table(table) => table,
            _ => return None,
        };
    }
    match current.get_mut(last)? {
        Value::Array(array) => match array.last_mut()? {
            Value::Table(table) => Some(table),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    fn parse(input: &str) -> Table {
        parse_document(input).unwrap()
    }

    fn parse_value(input: &str) -> Value {
        let doc = parse(&format!("v = {}", input));
        doc.get("v").cloned().unwrap()
    }

    fn parse_err(input: &str) -> ParseError {
        parse_document(input).unwrap_err()
    }

    // -- strings --

    #[test]
    fn basic_string_escapes() {
        assert_eq!(
            parse_value(r#""a\tb\nc\\d\"e""#),
            Value::from("a\tb\nc\\d\"e")
        );
        assert_eq!(parse_value(r#""\u0048\u0065\u006C\u006C\u006F""#), Value::from("Hello"));
        assert_eq!(parse_value(r#""\U0001F600""#), Value::from("\u{1F600}"));
    }

    #[test]
    fn unicode_escape_out_of_range_fails() {
        let err = parse_err("v = \"\\U00110000\"");
        assert!(matches!(err, ParseError::InvalidString { .. }));
    }

    #[test]
    fn literal_string_takes_content_verbatim() {
        assert_eq!(
            parse_value(r"'C:\Users\no\escape'"),
            Value::from(r"C:\Users\no\escape")
        );
    }

    #[test]
    fn raw_newline_in_single_line_string_fails() {
        assert!(matches!(
            parse_err("v = \"one\ntwo\""),
            ParseError::InvalidString { .. }
        ));
        assert!(matches!(
            parse_err("v = 'one\ntwo'"),
            ParseError::InvalidString { .. }
        ));
    }

    #[test]
    fn unclosed_string_reports_start_position() {
        let err = parse_err("v = \"never closed");
        match err {
            ParseError::InvalidString { position, message } => {
                assert_eq!(position.column, 5);
                assert_eq!(message, "unclosed string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn multiline_basic_string_discards_leading_newline() {
        assert_eq!(
            parse_value("\"\"\"\nline one\nline two\"\"\""),
            Value::from("line one\nline two")
        );
    }

    #[test]
    fn multiline_line_continuation_swallows_whitespace() {
        assert_eq!(
            parse_value("\"\"\"one \\\n     two\"\"\""),
            Value::from("one two")
        );
    }

    #[test]
    fn multiline_literal_keeps_backslashes() {
        assert_eq!(
            parse_value("'''a\\nb\nc'''"),
            Value::from("a\\nb\nc")
        );
    }

    // -- numbers --

    #[test]
    fn integer_bases() {
        assert_eq!(parse_value("0xDEAD"), Value::Integer(57005));
        assert_eq!(parse_value("0o755"), Value::Integer(493));
        assert_eq!(parse_value("0b1010"), Value::Integer(10));
        assert_eq!(parse_value("1_000_000"), Value::Integer(1_000_000));
        assert_eq!(parse_value("-42"), Value::Integer(-42));
        assert_eq!(parse_value("+42"), Value::Integer(42));
        assert_eq!(parse_value("0"), Value::Integer(0));
    }

    #[test]
    fn leading_zero_is_rejected() {
        assert!(matches!(
            parse_err("v = 0123"),
            ParseError::InvalidNumber { .. }
        ));
    }

    #[test]
    fn stray_underscores_are_rejected() {
        for input in ["v = _1", "v = 1_", "v = 1__0", "v = 0x_FF"] {
            assert!(
                matches!(
                    parse_document(input),
                    Err(ParseError::InvalidNumber { .. }) | Err(ParseError::UnexpectedChar { .. })
                ),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn floats() {
        assert_eq!(parse_value("3.25"), Value::Float(3.25));
        assert_eq!(parse_value("-0.01"), Value::Float(-0.01));
        assert_eq!(parse_value("5e2"), Value::Float(500.0));
        assert_eq!(parse_value("6.26e-2"), Value::Float(0.0626));
        assert_eq!(parse_value("1_0.5"), Value::Float(10.5));
        assert_eq!(parse_value("inf"), Value::Float(f64::INFINITY));
        assert_eq!(parse_value("-inf"), Value::Float(f64::NEG_INFINITY));
        match parse_value("nan") {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn float_requires_digits_around_the_dot() {
        assert!(matches!(
            parse_err("v = 1."),
            ParseError::InvalidNumber { .. }
        ));
    }

    // -- datetimes --

    #[test]
    fn date_and_datetime_variants() {
        assert_eq!(
            parse_value("1979-05-27"),
            Value::LocalDate(LocalDate {
                year: 1979,
                month: 5,
                day: 27,
            })
        );
        let ldt = parse_value("1979-05-27T07:32:00");
        assert!(matches!(ldt, Value::LocalDatetime(_)));
        let dt = parse_value("1979-05-27T00:32:00-07:00");
        match dt {
            Value::Datetime(dt) => {
                assert_eq!(dt.offset, Some(TimeOffset { minutes: -420 }));
            }
            other => panic!("unexpected value: {other:?}"),
        }
        let zulu = parse_value("1979-05-27 07:32:00Z");
        match zulu {
            Value::Datetime(dt) => assert_eq!(dt.offset, Some(TimeOffset { minutes: 0 })),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn bare_local_time() {
        assert_eq!(
            parse_value("07:32:00.5"),
            Value::LocalTime(LocalTime {
                hour: 7,
                minute: 32,
                second: 0,
                nanosecond: 500_000_000,
            })
        );
    }

    #[test]
    fn fractional_seconds_truncate_past_nine_digits() {
        assert_eq!(
            parse_value("00:00:00.1234567899"),
            Value::LocalTime(LocalTime {
                hour: 0,
                minute: 0,
                second: 0,
                nanosecond: 123_456_789,
            })
        );
    }

    #[test]
    fn leap_second_is_accepted() {
        assert!(matches!(
            parse_value("23:59:60"),
            Value::LocalTime(LocalTime { second: 60, .. })
        ));
    }

    #[test]
    fn calendar_is_not_validated_beyond_coarse_ranges() {
        // Day 31 in a 30-day month parses; that validation is out of scope.
        assert!(matches!(
            parse_value("2023-02-31"),
            Value::LocalDate(_)
        ));
        assert!(matches!(
            parse_err("v = 2023-13-01"),
            ParseError::InvalidDatetime { .. }
        ));
        assert!(matches!(
            parse_err("v = 2023-01-32"),
            ParseError::InvalidDatetime { .. }
        ));
    }

    // -- arrays and inline tables --

    #[test]
    fn arrays_allow_trailing_comma_and_trivia() {
        let value = parse_value("[\n  1, # one\n  2,\n]");
        assert_eq!(
            value,
            Value::Array(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn arrays_must_be_homogeneous_by_category() {
        assert!(matches!(
            parse_err("v = [1, \"a\"]"),
            ParseError::MixedArrayTypes { .. }
        ));
        // Datetime kinds collapse into one category.
        let value = parse_value("[1979-05-27, 07:32:00]");
        assert_eq!(value.kind(), Kind::Array);
        // Nested arrays are compared only by the outer tag.
        let nested = parse_value("[[1, 2], [\"a\"]]");
        assert!(matches!(nested, Value::Array(_)));
    }

    #[test]
    fn unclosed_array_fails() {
        assert!(matches!(
            parse_err("v = [1, 2"),
            ParseError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn inline_tables() {
        let doc = parse("point = { x = 1, y = 2, label.text = \"origin\" }");
        assert_eq!(doc.get_as::<i64>("point.x").unwrap(), 1);
        assert_eq!(
            doc.get_as::<String>("point.label.text").unwrap(),
            "origin"
        );
    }

    #[test]
    fn inline_table_duplicate_key_fails() {
        assert!(matches!(
            parse_err("v = { a = 1, a = 2 }"),
            ParseError::DuplicateKey { .. }
        ));
    }

    // -- document assembly --

    #[test]
    fn dotted_keys_nest() {
        let doc = parse("a.b.c = \"v\"");
        assert_eq!(doc.get_as::<String>("a.b.c").unwrap(), "v");
    }

    #[test]
    fn whitespace_around_punctuation_is_insignificant() {
        let tight = parse("a.b=1");
        let loose = parse("a  .  b   =    1");
        assert_eq!(tight, loose);
    }

    #[test]
    fn table_headers_set_context() {
        let doc = parse("[a.b.c]\nk = \"v\"");
        assert_eq!(doc.get_as::<String>("a.b.c.k").unwrap(), "v");
    }

    #[test]
    fn duplicate_table_header_fails() {
        let err = parse_err("[a]\nx = 1\n[a]\ny = 2");
        match err {
            ParseError::InvalidTablePath { message, .. } => {
                assert!(message.contains("duplicate table 'a'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn redeclaring_implicit_table_is_allowed_once() {
        // [a.b] creates 'a' implicitly; [a] may still be declared.
        let doc = parse("[a.b]\nx = 1\n[a]\ny = 2");
        assert_eq!(doc.get_as::<i64>("a.b.x").unwrap(), 1);
        assert_eq!(doc.get_as::<i64>("a.y").unwrap(), 2);
    }

    #[test]
    fn array_of_tables_accumulates() {
        let doc = parse("[[p]]\nname = \"a\"\n\n[[p]]\nname = \"b\"");
        let entries = doc.get("p").and_then(Value::as_array).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(doc.get_as::<String>("p.0.name").unwrap(), "a");
        assert_eq!(doc.get_as::<String>("p.1.name").unwrap(), "b");
    }

    #[test]
    fn table_header_under_array_of_tables_fails() {
        let err = parse_err("[[p]]\nname = \"a\"\n[p.sub]\nx = 1");
        match err {
            ParseError::InvalidTablePath { message, .. } => {
                assert!(message.contains("array of tables"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn table_header_at_array_path_fails() {
        assert!(matches!(
            parse_err("[[p]]\n[p]"),
            ParseError::InvalidTablePath { .. }
        ));
    }

    #[test]
    fn comments_and_blank_lines_are_trivia() {
        let doc = parse("# heading\n\nkey = 1 # trailing\n\n# footer\n");
        assert_eq!(doc.get_as::<i64>("key").unwrap(), 1);
    }

    #[test]
    fn garbage_after_a_statement_fails() {
        assert!(matches!(
            parse_err("key = 1 garbage"),
            ParseError::UnexpectedChar { .. }
        ));
    }

    #[test]
    fn unexpected_leading_character_fails_with_position() {
        let err = parse_err("\n\n  % = 1");
        match err {
            ParseError::UnexpectedChar { position, found } => {
                assert_eq!(found, '%');
                assert_eq!(position.line, 3);
                assert_eq!(position.column, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
