//! Environment-variable interpolation over a parsed document.
//!
//! String values may embed `${VAR}` references, with `${VAR:-default}`
//! supplying a literal fallback for unresolved variables. Interpolation is
//! a post-parse pass over the tree and runs in two phases: first every
//! referenced variable name is collected, then each name is resolved
//! exactly once, and finally every string is rewritten against that fixed
//! resolution map. A resolver is consulted once per distinct name no
//! matter how many references to it exist.
//!
//! Substitution is textual and not recursive: a resolved value that itself
//! contains `${...}` stays as-is, and so does a default.

use crate::error::ExtractError;
use crate::{Table, Value};
use std::collections::{BTreeMap, BTreeSet};

/// One `${...}` occurrence inside a string, with the byte range of the
/// whole reference including the delimiters.
struct VarRef {
    name: String,
    default: Option<String>,
    start: usize,
    end: usize,
}

/// Scan a string for `${...}` references. Braces nest: the reference ends
/// at the brace balancing the opening one, so a default may itself contain
/// `${...}` as literal text. An unbalanced `${` is an error.
fn scan_refs(text: &str) -> Result<Vec<VarRef>, ExtractError> {
    let bytes = text.as_bytes();
    let mut refs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            let body_start = i + 2;
            let mut depth = 1usize;
            let mut j = body_start;
            while j < bytes.len() {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            if depth != 0 {
                return Err(ExtractError::Interpolation {
                    path: String::new(),
                    message: "unclosed '${' in string".to_string(),
                });
            }
            let body = &text[body_start..j];
            let (name, default) = match body.find(":-") {
                Some(split) => (&body[..split], Some(body[split + 2..].to_string())),
                None => (body, None),
            };
            refs.push(VarRef {
                name: name.to_string(),
                default,
                start: i,
                end: j + 1,
            });
            i = j + 1;
        } else {
            i += 1;
        }
    }
    Ok(refs)
}

/// Rewrite one string against the resolved variable map. A reference that
/// resolved substitutes the resolved value; otherwise its default; a
/// reference with neither is an error naming the variable.
fn interpolate_str(text: &str, vars: &BTreeMap<String, String>) -> Result<String, ExtractError> {
    let refs = scan_refs(text)?;
    if refs.is_empty() {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut consumed = 0;
    for var_ref in refs {
        out.push_str(&text[consumed..var_ref.start]);
        match vars.get(&var_ref.name) {
            Some(resolved) => out.push_str(resolved),
            None => match var_ref.default {
                Some(default) => out.push_str(&default),
                None => {
                    return Err(ExtractError::EnvVarNotFound {
                        name: var_ref.name,
                    })
                }
            },
        }
        consumed = var_ref.end;
    }
    out.push_str(&text[consumed..]);
    Ok(out)
}

/// Phase one: walk the tree and record every referenced variable name.
fn collect_names(value: &Value, names: &mut BTreeSet<String>) -> Result<(), ExtractError> {
    match value {
        Value::String(text) => {
            for var_ref in scan_refs(text)? {
                names.insert(var_ref.name);
            }
        }
        Value::Array(elements) => {
            for element in elements {
                collect_names(element, names)?;
            }
        }
        Value::Table(table) => {
            for (_, nested) in table.iter() {
                collect_names(nested, names)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Phase three: rewrite every string in place, recursing through arrays
/// and tables. Non-string leaves are untouched.
fn substitute(value: &mut Value, vars: &BTreeMap<String, String>) -> Result<(), ExtractError> {
    match value {
        Value::String(text) => {
            *text = interpolate_str(text, vars)?;
        }
        Value::Array(elements) => {
            for element in elements {
                substitute(element, vars)?;
            }
        }
        Value::Table(table) => {
            for (_, nested) in table.iter_mut() {
                substitute(nested, vars)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Run the full interpolation pass over a document, resolving each
/// distinct variable name exactly once through `resolve`.
pub(crate) fn interpolate_table<F>(mut table: Table, resolve: F) -> Result<Table, ExtractError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut names = BTreeSet::new();
    for (_, value) in table.iter() {
        collect_names(value, &mut names)?;
    }
    let mut vars = BTreeMap::new();
    for name in names {
        if let Some(resolved) = resolve(&name) {
            vars.insert(name, resolved);
        }
    }
    for (_, value) in table.iter_mut() {
        substitute(value, &vars)?;
    }
    Ok(table)
}
