//! Value encoders: how bound values become SQL text.

use chrono::{DateTime, Utc};

use crate::error::{TemplateError, TemplateResult};
use crate::value::SqlValue;

/// PostgreSQL reserved key words. These are always quoted as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "collation",
    "column",
    "concurrently",
    "constraint",
    "create",
    "cross",
    "current_catalog",
    "current_date",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "table",
    "tablesample",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

/// Trait for rendering bound values as SQL text.
///
/// Each method corresponds to one placeholder marker. Implementations see
/// values that have already been normalized (no temporal wrappers).
pub trait SqlEncoder {
    /// Render a value for `%I`.
    fn identifier(&self, value: &SqlValue) -> TemplateResult<String>;
    /// Render a value for `%L`.
    fn literal(&self, value: &SqlValue) -> TemplateResult<String>;
    /// Render a value for `%s`.
    fn string(&self, value: &SqlValue) -> TemplateResult<String>;
}

/// PostgreSQL encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgEncoder;

impl PgEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl SqlEncoder for PgEncoder {
    fn identifier(&self, value: &SqlValue) -> TemplateResult<String> {
        let value = value.normalized();
        match value.as_ref() {
            SqlValue::Null => Err(TemplateError::identifier("SQL identifier cannot be NULL")),
            SqlValue::Bool(b) => Ok(if *b { "\"t\"" } else { "\"f\"" }.to_string()),
            SqlValue::Timestamp(ts) => Ok(format!("\"{}\"", format_timestamp(ts))),
            SqlValue::Bytes(_) => Err(TemplateError::identifier(
                "SQL identifier cannot be binary data",
            )),
            SqlValue::Json(_) => Err(TemplateError::identifier(
                "SQL identifier cannot be a JSON object",
            )),
            SqlValue::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if matches!(item, SqlValue::Array(_)) {
                        return Err(TemplateError::identifier(
                            "nested arrays cannot be used as SQL identifiers",
                        ));
                    }
                    parts.push(self.identifier(item)?);
                }
                Ok(parts.join(","))
            }
            SqlValue::Int(n) => Ok(quote_identifier(&n.to_string())),
            SqlValue::Float(f) => Ok(quote_identifier(&format_float(*f))),
            SqlValue::Text(s) => Ok(quote_identifier(s)),
            SqlValue::Temporal(t) => self.identifier(&SqlValue::Timestamp(t.to_native())),
        }
    }

    fn literal(&self, value: &SqlValue) -> TemplateResult<String> {
        let value = value.normalized();
        match value.as_ref() {
            SqlValue::Null => Ok("NULL".to_string()),
            SqlValue::Bool(b) => Ok(if *b { "'t'" } else { "'f'" }.to_string()),
            SqlValue::Timestamp(ts) => Ok(format!("'{}'", format_timestamp(ts))),
            SqlValue::Bytes(bytes) => Ok(format!("E'\\\\x{}'", hex(bytes))),
            SqlValue::Array(items) => list(items, |v| self.literal(v)),
            SqlValue::Json(json) => Ok(format!("{}::jsonb", quote_literal(&json.to_string()))),
            SqlValue::Int(n) => Ok(quote_literal(&n.to_string())),
            SqlValue::Float(f) => Ok(quote_literal(&format_float(*f))),
            SqlValue::Text(s) => Ok(quote_literal(s)),
            SqlValue::Temporal(t) => self.literal(&SqlValue::Timestamp(t.to_native())),
        }
    }

    fn string(&self, value: &SqlValue) -> TemplateResult<String> {
        let value = value.normalized();
        match value.as_ref() {
            SqlValue::Null => Ok(String::new()),
            SqlValue::Bool(b) => Ok(if *b { "t" } else { "f" }.to_string()),
            SqlValue::Timestamp(ts) => Ok(format_timestamp(ts)),
            SqlValue::Bytes(bytes) => Ok(format!("\\x{}", hex(bytes))),
            SqlValue::Array(items) => list(items, |v| self.string(v)),
            SqlValue::Json(json) => Ok(json.to_string()),
            SqlValue::Int(n) => Ok(n.to_string()),
            SqlValue::Float(f) => Ok(format_float(*f)),
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Temporal(t) => self.string(&SqlValue::Timestamp(t.to_native())),
        }
    }
}

/// Strip encoder artifacts from a rendered value.
///
/// A leading `E'` escape-string prefix (any case) becomes a plain `'`, and
/// NUL characters are removed.
pub fn clean_escaped(rendered: &str) -> String {
    let rendered = match rendered.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("e'") => &rendered[1..],
        _ => rendered,
    };
    rendered.replace('\0', "")
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS.mmm+00`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f+00").to_string()
}

/// Quote an identifier unless it is a plain, non-reserved lower-case name.
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) && !RESERVED_WORDS.contains(&name) {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a literal, doubling quotes and backslashes.
///
/// Backslashes switch the literal to an `E'...'` escape string.
pub fn quote_literal(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    let mut has_backslash = false;

    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => {
                quoted.push_str("\\\\");
                has_backslash = true;
            }
            c => quoted.push(c),
        }
    }
    quoted.push('\'');

    if has_backslash {
        quoted.insert(0, 'E');
    }
    quoted
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Join array items with `,`; nested arrays become `(a, b)` groups.
fn list<F>(items: &[SqlValue], render: F) -> TemplateResult<String>
where
    F: Fn(&SqlValue) -> TemplateResult<String>,
{
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SqlValue::Array(inner) => {
                let group: TemplateResult<Vec<String>> = inner.iter().map(&render).collect();
                parts.push(format!("({})", group?.join(", ")));
            }
            other => parts.push(render(other)?),
        }
    }
    Ok(parts.join(","))
}

fn format_float(f: f64) -> String {
    if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        f.to_string()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
