//! Field validation shared by the trainer, pokemon and battle inputs.
//!
//! Rules never stop at the first failure: every failing field is recorded so
//! the client receives the complete list in one response.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Per-field validation failures, keyed by the JSON field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record that `field` names a record that does not exist.
    pub fn invalid_reference(&mut self, field: &str) {
        self.add(field, format!("The selected {} is invalid.", field));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `field` has at least one failure.
    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for `field`.
    #[cfg(test)]
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Finish validation, yielding `value` only when nothing failed.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Deserialize a field that may be absent, `null`, or any JSON value.
///
/// Use with `#[serde(default, deserialize_with = "present")]`: absent yields
/// `None`, `null` yields `Some(Value::Null)`. Type checks are left to the
/// rules below so a wrong-typed field fails under its own name.
pub fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Trim a string, treating blank input as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Drop absent, `null` and blank values; trim strings.
fn filled(value: Option<Value>) -> Option<Value> {
    match value? {
        Value::Null => None,
        Value::String(s) => non_blank(Some(s)).map(Value::String),
        other => Some(other),
    }
}

/// Read an integer from a JSON number or an integer-valued string.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_message(field: &str) -> String {
    format!("The {} field is required.", field)
}

/// A required string of at most `max` characters.
pub fn required_string(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    max: usize,
) -> Option<String> {
    match filled(value) {
        None => {
            errors.add(field, required_message(field));
            None
        }
        Some(Value::String(s)) if s.chars().count() > max => {
            errors.add(
                field,
                format!("The {} field must not be greater than {} characters.", field, max),
            );
            None
        }
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            errors.add(field, format!("The {} field must be a string.", field));
            None
        }
    }
}

/// A required integer within `min..=max`. Integer-valued strings such as
/// `"25"` are accepted.
pub fn required_integer(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    min: i64,
    max: i64,
) -> Option<i64> {
    let Some(value) = filled(value) else {
        errors.add(field, required_message(field));
        return None;
    };

    match as_integer(&value) {
        None => {
            errors.add(field, format!("The {} field must be an integer.", field));
            None
        }
        Some(n) if n < min || n > max => {
            errors.add(
                field,
                format!("The {} field must be between {} and {}.", field, min, max),
            );
            None
        }
        Some(n) => Some(n),
    }
}

/// A required id whose existence has already been looked up. Values that
/// are not ids at all fail the same way as unknown ids.
pub fn required_reference(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    exists: bool,
) -> Option<i64> {
    match filled(value).map(|v| as_integer(&v)) {
        None => {
            errors.add(field, required_message(field));
            None
        }
        Some(Some(id)) if exists => Some(id),
        Some(_) => {
            errors.invalid_reference(field);
            None
        }
    }
}

/// A required date, accepted in the formats of [`parse_date`].
pub fn required_date(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
) -> Option<DateTime<Utc>> {
    let Some(value) = filled(value) else {
        errors.add(field, required_message(field));
        return None;
    };

    let parsed = value.as_str().and_then(parse_date);
    if parsed.is_none() {
        errors.add(field, format!("The {} field must be a valid date.", field));
    }
    parsed
}

/// An optional battle result. Absent, `null` and blank mean "no result";
/// anything else must be a string such as `3-1`. Failures are recorded in
/// `errors` and the value is dropped.
pub fn optional_result(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
) -> Option<String> {
    match filled(value)? {
        Value::String(s) if is_valid_result(&s) => Some(s),
        Value::String(_) => {
            errors.add(field, format!("The {} field format is invalid.", field));
            None
        }
        _ => {
            errors.add(field, format!("The {} field must be a string.", field));
            None
        }
    }
}

/// Apply a "present means required" rule to a partial-update field.
///
/// Absent fields pass through as `None`; a present `null` fails `required`.
pub fn when_present<U>(
    errors: &mut ValidationErrors,
    value: Option<Value>,
    rule: impl FnOnce(&mut ValidationErrors, Option<Value>) -> Option<U>,
) -> Option<U> {
    value.and_then(|inner| rule(errors, Some(inner)))
}

/// Parse a date in RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
/// or `YYYY-MM-DD` form. Naive values are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whether `value` is a score such as `3-1`.
pub fn is_valid_result(value: &str) -> bool {
    static RESULT_PATTERN: OnceLock<Regex> = OnceLock::new();
    RESULT_PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]+-[0-9]+$").expect("result pattern is valid"))
        .is_match(value)
}
