//! Values bound to template placeholders.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{TemplateError, TemplateResult};

/// Named parameters for a template.
pub type Params = HashMap<String, SqlValue>;

/// A date/time type that can convert itself to a native UTC timestamp.
///
/// Values wrapped with [`SqlValue::temporal`] are converted before they are
/// rendered, so a wrapper and its native timestamp always format the same.
pub trait NativeTemporal: fmt::Debug + Send + Sync {
    /// Convert to the native timestamp representation.
    fn to_native(&self) -> DateTime<Utc>;
}

impl NativeTemporal for DateTime<Utc> {
    fn to_native(&self) -> DateTime<Utc> {
        *self
    }
}

impl NativeTemporal for DateTime<FixedOffset> {
    fn to_native(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

impl NativeTemporal for DateTime<Local> {
    fn to_native(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

/// Naive timestamps are taken to be UTC.
impl NativeTemporal for NaiveDateTime {
    fn to_native(&self) -> DateTime<Utc> {
        self.and_utc()
    }
}

impl NativeTemporal for SystemTime {
    fn to_native(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(*self)
    }
}

/// Dynamic value type for placeholder bindings.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<SqlValue>),
    /// A JSON object or array, rendered as `jsonb`.
    Json(serde_json::Value),
    /// A date/time wrapper, unwrapped to `Timestamp` before rendering.
    Temporal(Arc<dyn NativeTemporal>),
}

impl SqlValue {
    /// Wrap a date/time value that converts to a native timestamp.
    pub fn temporal(value: impl NativeTemporal + 'static) -> Self {
        SqlValue::Temporal(Arc::new(value))
    }

    /// Binary data, rendered as a `bytea` hex literal.
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        SqlValue::Bytes(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Replace temporal wrappers with native timestamps, including inside arrays.
    pub fn normalized(&self) -> Cow<'_, SqlValue> {
        match self {
            SqlValue::Temporal(t) => Cow::Owned(SqlValue::Timestamp(t.to_native())),
            SqlValue::Array(items) if items.iter().any(SqlValue::has_temporal) => Cow::Owned(
                SqlValue::Array(items.iter().map(|v| v.normalized().into_owned()).collect()),
            ),
            _ => Cow::Borrowed(self),
        }
    }

    fn has_temporal(&self) -> bool {
        match self {
            SqlValue::Temporal(_) => true,
            SqlValue::Array(items) => items.iter().any(SqlValue::has_temporal),
            _ => false,
        }
    }

    /// Infer a value from command-line text.
    ///
    /// Integers, plain decimals such as `-2.5`, `true`/`false` and `null` are
    /// recognised; anything else (`inf`, `NaN`, `1e5`) is text.
    pub fn infer(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            SqlValue::Int(n)
        } else if let Some(f) = parse_decimal(raw) {
            SqlValue::Float(f)
        } else if raw == "true" {
            SqlValue::Bool(true)
        } else if raw == "false" {
            SqlValue::Bool(false)
        } else if raw == "null" {
            SqlValue::Null
        } else {
            SqlValue::Text(raw.to_string())
        }
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let (whole, fraction) = digits.split_once('.')?;
    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if is_digits(whole) && is_digits(fraction) {
        raw.parse().ok()
    } else {
        None
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self.normalized().as_ref(), other.normalized().as_ref()) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int(a), SqlValue::Int(b)) => a == b,
            (SqlValue::Float(a), SqlValue::Float(b)) => a == b,
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a == b,
            (SqlValue::Array(a), SqlValue::Array(b)) => a == b,
            (SqlValue::Json(a), SqlValue::Json(b)) => a == b,
            _ => false,
        }
    }
}

/// Build named parameters from a JSON object.
pub fn params_from_json(value: serde_json::Value) -> TemplateResult<Params> {
    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, SqlValue::from(v)))
            .collect()),
        other => Err(TemplateError::InvalidValue(format!(
            "parameters must be a JSON object, got {}",
            other
        ))),
    }
}

/// Build a [`Params`] map.
///
/// ```
/// use pgtemplate::params;
///
/// let params = params! { "table" => "events", "limit" => 10 };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::value::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::value::Params::new();
        $(
            params.insert(
                ::std::string::String::from($key),
                $crate::value::SqlValue::from($value),
            );
        )+
        params
    }};
}

// Implement From traits for SqlValue
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        SqlValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => SqlValue::Text(s),
            serde_json::Value::Array(items) => {
                SqlValue::Array(items.into_iter().map(SqlValue::from).collect())
            }
            obj @ serde_json::Value::Object(_) => SqlValue::Json(obj),
        }
    }
}
