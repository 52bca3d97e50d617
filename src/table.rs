//! Ordered table type and the dotted-path read contract.
//!
//! [`Table`] wraps an [`IndexMap`] so that insertion order is preserved
//! and observable, and inserting an existing key overwrites rather than
//! duplicates. Both properties are part of the document's contract.
//!
//! On top of plain key access the table exposes dotted-path navigation:
//! `a.b.c` descends through nested tables, and a numeric segment indexes
//! into an array, which is how array-of-tables entries are addressed
//! (`server.0.name`). The typed accessors convert the located value via
//! the [`FromValue`] capability for the requested type.
//!
//! ## Examples
//!
//! ```rust
//! use envtoml::parse;
//!
//! let doc = parse("[server]\nhost = \"localhost\"\nport = 8080").unwrap();
//! assert_eq!(doc.get_as::<String>("server.host").unwrap(), "localhost");
//! assert_eq!(doc.get_as::<i64>("server.port").unwrap(), 8080);
//! assert!(doc.get_as_opt::<i64>("server.workers").unwrap().is_none());
//! ```

use crate::error::ExtractError;
use crate::extract::FromValue;
use crate::Value;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// An ordered map of string keys to values, unique keys, insertion order
/// preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table(IndexMap<String, Value>);

impl Table {
    /// Creates an empty `Table`.
    #[must_use]
    pub fn new() -> Self {
        Table(IndexMap::new())
    }

    /// Creates an empty `Table` with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Table(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair, overwriting and returning any previous
    /// value under the same key. No table ever holds two entries with the
    /// same key.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    #[must_use]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Returns `true` if `key` is present at the top level of this table.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Iterates values in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Iterates key-value pairs in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Iterates key-value pairs mutably, in insertion order.
    pub(crate) fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.0.iter_mut()
    }

    // -- path navigation ----------------------------------------------------

    /// Returns the value at a dotted path, or `None` if any segment is
    /// absent, a non-table intermediate blocks the descent, or an index is
    /// out of range.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.locate(path).ok()
    }

    /// Returns `true` if a value exists at the dotted path.
    #[must_use]
    pub fn has_key(&self, path: &str) -> bool {
        self.locate(path).is_ok()
    }

    /// Converts the value at a dotted path to `T`.
    ///
    /// A missing key is reported as [`ExtractError::KeyNotFound`]; a
    /// present value of the wrong type as [`ExtractError::TypeMismatch`]
    /// carrying the full path.
    pub fn get_as<T: FromValue>(&self, path: &str) -> Result<T, ExtractError> {
        let value = self.locate(path)?;
        T::from_value(value).map_err(|e| e.with_path(path))
    }

    /// Like [`get_as`](Table::get_as), but a missing key yields `Ok(None)`.
    ///
    /// A key that is present with the wrong type still surfaces the
    /// conversion error.
    pub fn get_as_opt<T: FromValue>(&self, path: &str) -> Result<Option<T>, ExtractError> {
        match self.locate(path) {
            Ok(value) => T::from_value(value)
                .map(Some)
                .map_err(|e| e.with_path(path)),
            Err(ExtractError::KeyNotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Like [`get_as_opt`](Table::get_as_opt), substituting `default` for a
    /// missing key.
    pub fn get_as_or_default<T: FromValue>(
        &self,
        path: &str,
        default: T,
    ) -> Result<T, ExtractError> {
        Ok(self.get_as_opt(path)?.unwrap_or(default))
    }

    /// Returns the nested table at a dotted path.
    pub fn get_table(&self, path: &str) -> Result<&Table, ExtractError> {
        let value = self.locate(path)?;
        value
            .as_table()
            .ok_or_else(|| ExtractError::type_mismatch("table", value.type_name()).with_path(path))
    }

    /// Descend the dotted path, distinguishing "missing" from "indexed out
    /// of range". Non-table, non-array intermediates end the descent as
    /// missing, matching the read-only path contract.
    fn locate(&self, path: &str) -> Result<&Value, ExtractError> {
        let mut current: Option<&Value> = None;
        for segment in path.split('.') {
            let next = match current {
                None => self.get(segment),
                Some(Value::Table(table)) => table.get(segment),
                Some(Value::Array(array)) => match segment.parse::<usize>() {
                    Ok(index) => {
                        if index >= array.len() {
                            return Err(ExtractError::IndexOutOfBounds {
                                path: path.to_string(),
                                index,
                                len: array.len(),
                            });
                        }
                        array.get(index)
                    }
                    Err(_) => None,
                },
                Some(_) => None,
            };
            match next {
                Some(value) => current = Some(value),
                None => return Err(ExtractError::key_not_found(path)),
            }
        }
        current.ok_or_else(|| ExtractError::key_not_found(path))
    }

    // -- path mutation (used by the parser) ---------------------------------

    /// Insert `value` at a multi-segment path, creating intermediate tables
    /// as needed. Fails with a message naming the blocking path if an
    /// intermediate exists and is not a table.
    pub(crate) fn insert_path(&mut self, path: &[String], value: Value) -> Result<(), String> {
        let (last, parents) = match path.split_last() {
            Some(split) => split,
            None => return Err("empty key path".to_string()),
        };
        let target = self.table_at_path_mut(parents)?;
        target.insert(last.clone(), value);
        Ok(())
    }

    /// Descend to (creating as needed) the table at `path`.
    pub(crate) fn table_at_path_mut(&mut self, path: &[String]) -> Result<&mut Table, String> {
        let mut current = self;
        for (depth, segment) in path.iter().enumerate() {
            let entry = current
                .0
                .entry(segment.clone())
                .or_insert_with(|| Value::Table(Table::new()));
            match entry {
                Value::Table(table) => current = table,
                other => {
                    return Err(format!(
                        "'{}' is a {}, not a table",
                        path[..=depth].join("."),
                        other.type_name()
                    ))
                }
            }
        }
        Ok(current)
    }
}

impl IntoIterator for Table {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Table {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Table(IndexMap::from_iter(iter))
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut inner = Table::new();
        inner.insert("port".to_string(), Value::from(8080));
        let mut root = Table::new();
        root.insert("server".to_string(), Value::Table(inner));
        root.insert(
            "hosts".to_string(),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        );
        root
    }

    #[test]
    fn insert_overwrites_and_preserves_order() {
        let mut table = Table::new();
        table.insert("first".to_string(), Value::from(1));
        table.insert("second".to_string(), Value::from(2));
        assert!(table.insert("first".to_string(), Value::from(3)).is_some());
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(table.get("first").and_then(Value::as_integer), Some(3));
    }

    #[test]
    fn get_path_descends_tables_and_arrays() {
        let root = sample();
        assert_eq!(
            root.get_path("server.port").and_then(Value::as_integer),
            Some(8080)
        );
        assert_eq!(
            root.get_path("hosts.1").and_then(Value::as_str),
            Some("b")
        );
        assert!(root.get_path("server.missing").is_none());
        assert!(root.get_path("server.port.deeper").is_none());
    }

    #[test]
    fn index_out_of_bounds_is_its_own_error() {
        let root = sample();
        let err = root.get_as::<String>("hosts.5").unwrap_err();
        assert_eq!(
            err,
            ExtractError::IndexOutOfBounds {
                path: "hosts.5".to_string(),
                index: 5,
                len: 2,
            }
        );
    }

    #[test]
    fn get_as_opt_distinguishes_missing_from_wrong_type() {
        let root = sample();
        assert_eq!(root.get_as_opt::<i64>("server.workers").unwrap(), None);
        assert!(root.get_as_opt::<i64>("hosts.0").is_err());
    }

    #[test]
    fn get_as_or_default_layers_a_fallback() {
        let root = sample();
        assert_eq!(
            root.get_as_or_default::<i64>("server.workers", 4).unwrap(),
            4
        );
        assert_eq!(
            root.get_as_or_default::<i64>("server.port", 4).unwrap(),
            8080
        );
    }

    #[test]
    fn insert_path_creates_intermediates() {
        let mut root = Table::new();
        let path: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        root.insert_path(&path, Value::from(true)).unwrap();
        assert_eq!(
            root.get_path("a.b.c").and_then(Value::as_boolean),
            Some(true)
        );
    }

    #[test]
    fn insert_path_rejects_non_table_intermediate() {
        let mut root = Table::new();
        root.insert("a".to_string(), Value::from(1));
        let path: Vec<String> = vec!["a".into(), "b".into()];
        let err = root.insert_path(&path, Value::from(2)).unwrap_err();
        assert!(err.contains("'a' is a integer"));
    }
}
