//! # pgtemplate: SQL templates with named parameters and includes
//!
//! Renders SQL templates into a single escaped PostgreSQL string.
//!
//! ## Quick Example
//!
//! ```rust
//! use pgtemplate::{args, format, params};
//!
//! // Positional: markers are filled in text order
//! let sql = format(
//!     "insert into %I (select * from foo where %s and bar > %L)",
//!     args!["a_table", "something=another", 123],
//! )?;
//! assert_eq!(sql, "insert into a_table (select * from foo where something=another and bar > '123')");
//!
//! // Named: every occurrence of a name gets the same value
//! let sql = format("SELECT event_time::DATE WHERE asset_type=%L:type", params! { "type" => "foo" })?;
//! assert_eq!(sql, "SELECT event_time::DATE WHERE asset_type='foo'");
//! # Ok::<(), pgtemplate::TemplateError>(())
//! ```
//!
//! ## Markers
//!
//! | Marker      | Name       | Renders as                         |
//! |-------------|------------|------------------------------------|
//! | `%I`        | Identifier | `name` or `"Quoted Name"`          |
//! | `%L`        | Literal    | `'value'`, `NULL`                  |
//! | `%s`        | String     | value text, unquoted               |
//! | `%F:<name>` | Include    | contents of `<name>.sql`           |
//! | `%%`        | Percent    | `%`                                |
//!
//! Add `:<name>` to `%I`, `%L` or `%s` to bind by name. Use `%<n>$I` to pick
//! positional argument `n`.

pub mod binder;
pub mod config;
pub mod encoder;
pub mod error;
pub mod formatter;
pub mod include;
pub mod parser;
pub mod runner;
pub mod token;
pub mod value;

pub use config::FormatterConfig;
pub use error::{TemplateError, TemplateResult};
pub use formatter::{FormatArgs, Formatter};
pub use value::{NativeTemporal, Params, SqlValue};

use std::path::Path;

pub mod prelude {
    pub use crate::config::FormatterConfig;
    pub use crate::encoder::{PgEncoder, SqlEncoder};
    pub use crate::error::*;
    pub use crate::formatter::{FormatArgs, Formatter};
    pub use crate::runner::SqlRunner;
    pub use crate::token::{Marker, Token};
    pub use crate::value::{NativeTemporal, Params, SqlValue};
    pub use crate::{args, params};
}

/// Format a template with positional or named arguments.
///
/// Named calls resolve `%F:<name>` includes against the current directory.
///
/// # Example
///
/// ```
/// use pgtemplate::{format, params};
///
/// let sql = format("%I:one %s:one %L:one", params! { "one" => "one" }).unwrap();
/// assert_eq!(sql, "one one 'one'");
/// ```
pub fn format(template: &str, args: impl Into<FormatArgs>) -> TemplateResult<String> {
    Formatter::new().format(template, args)
}

/// Read and format a template file, resolving includes next to it.
pub fn format_file(path: impl AsRef<Path>, params: &Params) -> TemplateResult<String> {
    Formatter::new().format_file(path, params)
}

/// Escape a value as an SQL identifier.
pub fn format_identifier(value: impl Into<SqlValue>) -> TemplateResult<String> {
    Formatter::new().format_identifier(&value.into())
}

/// Escape a value as an SQL literal.
///
/// ```
/// assert_eq!(pgtemplate::format_literal("ab\0c").unwrap(), "'abc'");
/// ```
pub fn format_literal(value: impl Into<SqlValue>) -> TemplateResult<String> {
    Formatter::new().format_literal(&value.into())
}

/// Render a value as a plain string.
pub fn format_string(value: impl Into<SqlValue>) -> TemplateResult<String> {
    Formatter::new().format_string(&value.into())
}
