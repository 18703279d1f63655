//! Conversion between parameter values and their textual forms.
//!
//! Both the namelist renderer/parser and the JSON converter go through this
//! module, so a value written by one surface reads back identically through
//! the other.

use crate::domain::{GlmError, GlmResult, ParamValue};
use serde_json::{Number, Value};

/// Upper bound on the number of items one assignment may expand to.
const MAX_LIST_LEN: usize = 100_000;

pub fn format_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Bool(flag) => format_bool(*flag).to_string(),
        ParamValue::Int(value) => value.to_string(),
        ParamValue::Real(value) => format_real(*value),
        ParamValue::Str(text) | ParamValue::DateTime(text) => quote(text),
        ParamValue::RealList(values) => join(values.iter().map(|value| format_real(*value))),
        ParamValue::IntList(values) => join(values.iter().map(ToString::to_string)),
        ParamValue::BoolList(values) => {
            join(values.iter().map(|flag| format_bool(*flag).to_string()))
        }
        ParamValue::StrList(values) => join(values.iter().map(|text| quote(text))),
    }
}

/// Shortest text that parses back to the same `f64`, always carrying a
/// decimal point or exponent so the reader keeps it real.
pub fn format_real(value: f64) -> String {
    format!("{:?}", value)
}

pub const fn format_bool(flag: bool) -> &'static str {
    if flag { ".true." } else { ".false." }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// Parses the right-hand side of a `name = value` assignment. A single item
/// yields a scalar; several comma separated items yield a homogeneous list.
pub fn parse_value(raw: &str, source_line: usize) -> GlmResult<ParamValue> {
    let items = split_items(raw, source_line)?;
    let mut scalars = Vec::with_capacity(items.len());
    for item in &items {
        let (repeat, literal) = split_repeat(item);
        let scalar = parse_scalar(literal).ok_or_else(|| {
            GlmError::parse(source_line, format!("unrecognised literal '{}'", literal))
        })?;
        if scalars.len().saturating_add(repeat) > MAX_LIST_LEN {
            return Err(GlmError::parse(
                source_line,
                format!(
                    "value list expands beyond {} items at '{}'",
                    MAX_LIST_LEN, item
                ),
            ));
        }
        scalars.extend(std::iter::repeat_n(scalar, repeat));
    }

    match scalars.len() {
        0 => Err(GlmError::parse(source_line, "missing value after '='")),
        1 => Ok(scalars.remove(0)),
        _ => collect_list(scalars).ok_or_else(|| {
            GlmError::parse(
                source_line,
                format!("list '{}' mixes incompatible value types", raw.trim()),
            )
        }),
    }
}

fn parse_scalar(token: &str) -> Option<ParamValue> {
    if let Some(text) = unquote(token) {
        return Some(ParamValue::Str(text));
    }
    if let Some(flag) = parse_bool(token) {
        return Some(ParamValue::Bool(flag));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Some(ParamValue::Int(value));
    }

    // Fortran double precision exponents use `d`.
    let normalized = token.replace(['d', 'D'], "e");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(ParamValue::Real)
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        ".true." | ".t." | "t" | "true" => Some(true),
        ".false." | ".f." | "f" | "false" => Some(false),
        _ => None,
    }
}

fn unquote(token: &str) -> Option<String> {
    let quote = token.chars().next().filter(|ch| *ch == '\'' || *ch == '"')?;
    if token.len() < 2 || !token.ends_with(quote) {
        return None;
    }

    let inner = &token[1..token.len() - 1];
    let doubled = format!("{quote}{quote}");
    Some(inner.replace(&doubled, &quote.to_string()))
}

/// `3*0.5` is namelist shorthand for three copies of `0.5`.
fn split_repeat(item: &str) -> (usize, &str) {
    if item.starts_with(['\'', '"']) {
        return (1, item);
    }

    match item.split_once('*') {
        Some((count, literal)) => match count.trim().parse::<usize>() {
            Ok(repeat) if repeat > 0 => (repeat, literal.trim()),
            _ => (1, item),
        },
        None => (1, item),
    }
}

fn split_items(raw: &str, source_line: usize) -> GlmResult<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                current.push(ch);
                quote = Some(ch);
            }
            None if ch == ',' => {
                items.push(current.trim().to_string());
                current.clear();
            }
            None => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(GlmError::parse(source_line, "unterminated string literal"));
    }

    let last = current.trim();
    if !last.is_empty() || items.is_empty() {
        items.push(last.to_string());
    }
    if items.iter().any(String::is_empty) {
        if items.len() == 1 {
            return Ok(Vec::new());
        }
        return Err(GlmError::parse(source_line, "empty item in value list"));
    }

    Ok(items)
}

/// Byte offsets of `target` that sit outside single or double quotes.
pub(crate) fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, ch) in text.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == target => return Some(index),
            None => {}
        }
    }
    None
}

/// Folds scalar items into the narrowest list type that holds all of them.
/// Integers widen to reals when the two are mixed.
fn collect_list(items: Vec<ParamValue>) -> Option<ParamValue> {
    if items.iter().all(|item| matches!(item, ParamValue::Bool(_))) {
        return Some(ParamValue::BoolList(
            items
                .iter()
                .filter_map(|item| match item {
                    ParamValue::Bool(flag) => Some(*flag),
                    _ => None,
                })
                .collect(),
        ));
    }
    if items.iter().all(|item| matches!(item, ParamValue::Int(_))) {
        return Some(ParamValue::IntList(
            items.iter().filter_map(ParamValue::as_int).collect(),
        ));
    }
    if items
        .iter()
        .all(|item| matches!(item, ParamValue::Int(_) | ParamValue::Real(_)))
    {
        return Some(ParamValue::RealList(
            items.iter().filter_map(ParamValue::as_real).collect(),
        ));
    }
    if items.iter().all(|item| matches!(item, ParamValue::Str(_))) {
        return Some(ParamValue::StrList(
            items
                .into_iter()
                .filter_map(|item| match item {
                    ParamValue::Str(text) => Some(text),
                    _ => None,
                })
                .collect(),
        ));
    }
    None
}

pub fn value_to_json(value: &ParamValue) -> Value {
    match value {
        ParamValue::Bool(flag) => Value::Bool(*flag),
        ParamValue::Int(value) => Value::from(*value),
        ParamValue::Real(value) => real_to_json(*value),
        ParamValue::Str(text) | ParamValue::DateTime(text) => Value::String(text.clone()),
        ParamValue::RealList(values) => {
            Value::Array(values.iter().map(|value| real_to_json(*value)).collect())
        }
        ParamValue::IntList(values) => Value::Array(values.iter().copied().map(Value::from).collect()),
        ParamValue::BoolList(values) => {
            Value::Array(values.iter().copied().map(Value::Bool).collect())
        }
        ParamValue::StrList(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
    }
}

fn real_to_json(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Maps a JSON value onto an untyped parameter value. `null` and objects
/// have no namelist form and yield `None`.
pub fn value_from_json(value: &Value) -> Option<ParamValue> {
    match value {
        Value::Bool(flag) => Some(ParamValue::Bool(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(ParamValue::Int)
            .or_else(|| number.as_f64().map(ParamValue::Real)),
        Value::String(text) => Some(ParamValue::Str(text.clone())),
        Value::Array(items) => {
            let scalars = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => None,
                    other => value_from_json(other),
                })
                .collect::<Option<Vec<_>>>()?;
            if scalars.is_empty() {
                return Some(ParamValue::RealList(Vec::new()));
            }
            collect_list(scalars)
        }
        Value::Null | Value::Object(_) => None,
    }
}
