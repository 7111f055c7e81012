//! OData URI-literal encoding
//!
//! Converts host values into the literal forms OData v4 expects inside
//! query options: unquoted GUIDs, single-quoted strings with embedded quotes
//! doubled, invariant numerics, and the fixed date/time wire formats shared
//! with the entity layer.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::constants::{DATE_FORMAT, DATETIME_FORMAT};

static GUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// A value that can be rendered as an OData v4 URI literal
#[derive(Debug, Clone, PartialEq)]
pub enum ODataValue {
    /// String value; GUID-shaped strings encode unquoted
    String(String),
    /// Whole number
    Int(i64),
    /// Floating point (decimal, money)
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Null literal
    Null,
    /// Date and time, millisecond precision, UTC
    DateTime(DateTime<Utc>),
    /// Date without a time component
    Date(NaiveDate),
    /// Pre-rendered expression, emitted unmodified
    Raw(String),
}

impl ODataValue {
    /// Render this value as an OData URI literal.
    pub fn encode(&self) -> String {
        match self {
            ODataValue::String(s) => {
                if GUID_PATTERN.is_match(s) {
                    s.clone()
                } else {
                    format!("'{}'", s.replace('\'', "''"))
                }
            }
            ODataValue::Int(i) => i.to_string(),
            ODataValue::Float(f) => format_float(*f),
            ODataValue::Bool(b) => b.to_string(),
            ODataValue::Null => "null".to_string(),
            ODataValue::DateTime(dt) => format_datetime(dt),
            ODataValue::Date(d) => format_date(d),
            ODataValue::Raw(s) => s.clone(),
        }
    }
}

/// Invariant decimal notation; `Display` falls back to scientific notation
/// for extreme magnitudes, which OData literals do not allow.
fn format_float(f: f64) -> String {
    let rendered = f.to_string();
    if rendered.contains('e') || rendered.contains('E') {
        let expanded = format!("{f:.12}");
        let trimmed = expanded.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    } else {
        rendered
    }
}

/// Format a date-time in the fixed wire format (`YYYY-MM-DDThh:mm:ss.sssZ`).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Format a date in the fixed wire format (`YYYY-MM-DD`).
pub fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Parse a date-time from the fixed wire format.
///
/// Accepts both the millisecond-precision form and the second-precision form
/// the server emits for whole seconds. The year-zero placeholder the service
/// uses for "no value" parses to `None`.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ").ok()?;
    if naive.year() == 0 {
        return None;
    }
    Some(naive.and_utc())
}

/// Parse a date from the fixed wire format; the year-zero placeholder parses
/// to `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
    if date.year() == 0 {
        return None;
    }
    Some(date)
}

impl From<&str> for ODataValue {
    fn from(value: &str) -> Self {
        ODataValue::String(value.to_string())
    }
}

impl From<String> for ODataValue {
    fn from(value: String) -> Self {
        ODataValue::String(value)
    }
}

impl From<i32> for ODataValue {
    fn from(value: i32) -> Self {
        ODataValue::Int(value as i64)
    }
}

impl From<i64> for ODataValue {
    fn from(value: i64) -> Self {
        ODataValue::Int(value)
    }
}

impl From<f64> for ODataValue {
    fn from(value: f64) -> Self {
        ODataValue::Float(value)
    }
}

impl From<bool> for ODataValue {
    fn from(value: bool) -> Self {
        ODataValue::Bool(value)
    }
}

impl From<Uuid> for ODataValue {
    fn from(value: Uuid) -> Self {
        ODataValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for ODataValue {
    fn from(value: DateTime<Utc>) -> Self {
        ODataValue::DateTime(value)
    }
}

impl From<NaiveDate> for ODataValue {
    fn from(value: NaiveDate) -> Self {
        ODataValue::Date(value)
    }
}

impl From<&serde_json::Value> for ODataValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ODataValue::Null,
            serde_json::Value::Bool(b) => ODataValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ODataValue::Int(i)
                } else {
                    ODataValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => ODataValue::String(s.clone()),
            // Fall back to the quoted string form of the textual representation
            other => ODataValue::String(other.to_string()),
        }
    }
}
