//! Sectioned `key = value` configuration files.
//!
//! ```ini
//! ; comment
//! name = app
//!
//! [db]
//! host = localhost
//! port = 5432
//! pool.size = 4
//!
//! [db_test : db]
//! host = "test.local"
//! replicas[] = r1
//! replicas[] = r2
//! ```
//!
//! Sections become nested tables, dotted keys nest further, `[child : parent]`
//! starts the child from a copy of the parent, and `key[]` appends to an array.

use std::path::Path;

use toml::{Table, Value};

use super::merge::{deep_merge, insert_at_path};
use super::ConfigError;

/// Parses INI source into a table. `path` is used for error reporting only.
pub fn parse_ini(contents: &str, path: &Path) -> Result<Table, ConfigError> {
    let mut root = Table::new();
    let mut current: Option<(String, Table)> = None;

    for (index, raw_line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        let syntax = |message: &str| ConfigError::IniSyntax {
            path: path.to_path_buf(),
            line: line_no,
            message: message.to_string(),
        };

        if let Some(header) = line.strip_prefix('[') {
            let header = header
                .strip_suffix(']')
                .ok_or_else(|| syntax("unterminated section header"))?;

            if let Some((name, table)) = current.take() {
                flush_section(&mut root, name, table);
            }

            let (name, parent) = match header.split_once(':') {
                Some((name, parent)) => (name.trim(), Some(parent.trim())),
                None => (header.trim(), None),
            };
            if name.is_empty() {
                return Err(syntax("empty section name"));
            }

            let mut table = Table::new();
            if let Some(parent) = parent {
                match root.get(parent) {
                    Some(Value::Table(base)) => table = base.clone(),
                    _ => {
                        return Err(ConfigError::UnknownParentSection {
                            path: path.to_path_buf(),
                            section: name.to_string(),
                            parent: parent.to_string(),
                        })
                    }
                }
            }
            current = Some((name.to_string(), table));
            continue;
        }

        let (key, raw_value) = line
            .split_once('=')
            .ok_or_else(|| syntax("expected 'key = value'"))?;
        let key = key.trim();
        let value = parse_value(raw_value.trim()).map_err(|msg| syntax(msg))?;

        let (key, append) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.trim_end(), true),
            None => (key, false),
        };
        let segments: Vec<&str> = key.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(syntax("invalid key"));
        }

        let target = match current.as_mut() {
            Some((_, table)) => table,
            None => &mut root,
        };
        if append {
            append_at_path(target, &segments, value);
        } else {
            insert_at_path(target, &segments, value);
        }
    }

    if let Some((name, table)) = current {
        flush_section(&mut root, name, table);
    }

    Ok(root)
}

/// Redeclared sections merge into what was already collected.
fn flush_section(root: &mut Table, name: String, table: Table) {
    match root.get_mut(&name) {
        Some(Value::Table(existing)) => deep_merge(existing, table),
        _ => {
            root.insert(name, Value::Table(table));
        }
    }
}

fn append_at_path(table: &mut Table, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match table.get_mut(*first) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                table.insert((*first).to_string(), Value::Array(vec![value]));
            }
        }
        return;
    }

    if !matches!(table.get(*first), Some(Value::Table(_))) {
        table.insert((*first).to_string(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(*first) {
        append_at_path(nested, rest, value);
    }
}

/// Quoted values stay strings; bare values are coerced.
fn parse_value(raw: &str) -> Result<Value, &'static str> {
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            let end = rest.find(quote).ok_or("unterminated quoted value")?;
            let trailing = rest[end + 1..].trim();
            if !trailing.is_empty() && !trailing.starts_with(';') {
                return Err("unexpected text after quoted value");
            }
            return Ok(Value::String(rest[..end].to_string()));
        }
    }

    // Inline comment
    let bare = match raw.find(';') {
        Some(pos) => raw[..pos].trim_end(),
        None => raw,
    };
    Ok(coerce_value(bare))
}

fn coerce_value(s: &str) -> Value {
    match s.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => return Value::Boolean(true),
        "false" | "off" | "no" | "none" => return Value::Boolean(false),
        _ => {}
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
