//! The formatting pipeline.
//!
//! Named calls run include expansion, then binding, then substitution.
//! Positional calls go straight to substitution.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::binder::{bind_named, bind_named_strict};
use crate::config::FormatterConfig;
use crate::encoder::{clean_escaped, PgEncoder, SqlEncoder};
use crate::error::{TemplateError, TemplateResult};
use crate::include::{expand_includes, has_includes};
use crate::parser::{extract_tokens, scan};
use crate::token::Marker;
use crate::value::{Params, SqlValue};

/// Arguments for a [`Formatter::format`] call.
#[derive(Debug, Clone)]
pub enum FormatArgs {
    /// Bare markers, substituted in text order.
    Positional(Vec<SqlValue>),
    /// `:<name>` markers, looked up by name. Enables `%F` includes.
    Named(Params),
}

impl From<Vec<SqlValue>> for FormatArgs {
    fn from(args: Vec<SqlValue>) -> Self {
        FormatArgs::Positional(args)
    }
}

impl From<Params> for FormatArgs {
    fn from(params: Params) -> Self {
        FormatArgs::Named(params)
    }
}

/// Build positional [`FormatArgs`] from values of mixed types.
///
/// ```
/// use pgtemplate::{args, format};
///
/// let sql = format("SELECT %I FROM t WHERE id = %L", args!["name", 7]).unwrap();
/// assert_eq!(sql, "SELECT name FROM t WHERE id = '7'");
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        $crate::formatter::FormatArgs::Positional(::std::vec![
            $($crate::value::SqlValue::from($value)),*
        ])
    };
}

/// Substitute `args` into a template of bare markers.
///
/// Each value is normalized and rendered by `encoder` according to its
/// marker. `%L` values and the start of the output lose their `E'` prefix;
/// `%s` fragments are kept as written. NUL characters are removed everywhere.
/// `%%` renders as `%`.
/// `%<n>$` selects argument `n`; later bare markers continue after it.
pub fn apply_format<E>(text: &str, args: &[SqlValue], encoder: &E) -> TemplateResult<String>
where
    E: SqlEncoder + ?Sized,
{
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut next = 0;

    for token in scan(text) {
        out.push_str(&text[cursor..token.span.start]);
        cursor = token.span.end;

        match token.marker {
            Marker::Percent => {
                out.push('%');
                continue;
            }
            // Named calls expand every include first; only positional calls get here
            Marker::File => {
                let name = token.name.unwrap_or_default();
                return Err(TemplateError::UnresolvedInclude(name.to_string()));
            }
            Marker::Identifier | Marker::Literal | Marker::String => {}
        }

        if let Some(name) = token.name {
            return Err(TemplateError::UnboundName(name.to_string()));
        }

        let index = match token.position {
            Some(0) => return Err(TemplateError::ArgumentZero),
            Some(position) => position - 1,
            None => next,
        };
        let value = args.get(index).ok_or(TemplateError::TooFewArguments {
            needed: index + 1,
            given: args.len(),
        })?;
        next = index + 1;

        let value = value.normalized();
        match token.marker {
            Marker::Identifier => out.push_str(&encoder.identifier(&value)?),
            Marker::Literal => out.push_str(&clean_escaped(&encoder.literal(&value)?)),
            _ => out.push_str(&encoder.string(&value)?),
        }
    }
    out.push_str(&text[cursor..]);

    Ok(clean_escaped(&out))
}

/// Renders templates with a given encoder and configuration.
///
/// # Example
///
/// ```
/// use pgtemplate::{params, Formatter};
///
/// let fmt = Formatter::new();
/// let sql = fmt
///     .format("SELECT * FROM %I:table WHERE kind = %L:kind", params! {
///         "table" => "events",
///         "kind" => "click",
///     })
///     .unwrap();
/// assert_eq!(sql, "SELECT * FROM events WHERE kind = 'click'");
/// ```
#[derive(Debug, Clone)]
pub struct Formatter<E = PgEncoder> {
    encoder: E,
    config: FormatterConfig,
}

impl Default for Formatter<PgEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter<PgEncoder> {
    /// A PostgreSQL formatter with default configuration.
    pub fn new() -> Self {
        Self::from_config(FormatterConfig::default())
    }

    /// A PostgreSQL formatter with the given configuration.
    pub fn from_config(config: FormatterConfig) -> Self {
        Self {
            encoder: PgEncoder,
            config,
        }
    }
}

impl<E: SqlEncoder> Formatter<E> {
    /// A formatter using a custom encoder.
    pub fn with_encoder(encoder: E, config: FormatterConfig) -> Self {
        Self { encoder, config }
    }

    /// Resolve includes of [`format`](Self::format) calls against `dir`.
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.include_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Format a template with positional or named arguments.
    pub fn format(&self, template: &str, args: impl Into<FormatArgs>) -> TemplateResult<String> {
        match args.into() {
            FormatArgs::Positional(args) => self.format_positional(template, &args),
            FormatArgs::Named(params) => self.format_named(template, &params),
        }
    }

    /// Substitute bare markers by position. Includes are not expanded.
    pub fn format_positional(&self, template: &str, args: &[SqlValue]) -> TemplateResult<String> {
        debug!(args = args.len(), "formatting positional template");
        apply_format(template, args, &self.encoder)
    }

    /// Expand includes against the configured directory, then bind by name.
    pub fn format_named(&self, template: &str, params: &Params) -> TemplateResult<String> {
        self.render_named(template, params, &self.include_dir())
    }

    /// Read a template file and format it by name, resolving includes
    /// relative to the file's directory.
    pub fn format_file(&self, path: impl AsRef<Path>, params: &Params) -> TemplateResult<String> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        debug!(path = %path.display(), "formatting template file");
        self.render_named(&template, params, &base_dir)
    }

    /// Expand includes until none remain.
    ///
    /// Fails with [`TemplateError::IncludeDepthExceeded`] when more than
    /// `max_include_depth` passes would be needed.
    pub fn expand(&self, template: &str, base_dir: &Path) -> TemplateResult<String> {
        let mut text = template.to_string();
        for pass in 0..self.config.max_include_depth {
            if !has_includes(&text) {
                return Ok(text);
            }
            debug!(pass, base_dir = %base_dir.display(), "expanding includes");
            text = expand_includes(&text, base_dir, &self.config.include_extension)?;
        }

        if has_includes(&text) {
            return Err(TemplateError::IncludeDepthExceeded {
                depth: self.config.max_include_depth,
            });
        }
        Ok(text)
    }

    /// Escape a value as an identifier.
    pub fn format_identifier(&self, value: &SqlValue) -> TemplateResult<String> {
        self.encoder.identifier(&value.normalized())
    }

    /// Escape a value as a literal, without `E'` prefix or NUL characters.
    pub fn format_literal(&self, value: &SqlValue) -> TemplateResult<String> {
        let rendered = self.encoder.literal(&value.normalized())?;
        Ok(clean_escaped(&rendered))
    }

    /// Render a value as a plain string, without NUL characters.
    pub fn format_string(&self, value: &SqlValue) -> TemplateResult<String> {
        let rendered = self.encoder.string(&value.normalized())?;
        Ok(clean_escaped(&rendered))
    }

    fn include_dir(&self) -> PathBuf {
        self.config
            .include_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn render_named(&self, template: &str, params: &Params, base_dir: &Path) -> TemplateResult<String> {
        let expanded = self.expand(template, base_dir)?;
        check_not_mixed(&expanded)?;

        let (stripped, args) = if self.config.strict_params {
            bind_named_strict(&expanded, params)?
        } else {
            bind_named(&expanded, params)
        };
        debug!(args = args.len(), "formatting named template");
        apply_format(&stripped, &args, &self.encoder)
    }
}

/// Named templates bind only named occurrences; unnamed markers would
/// shift every argument after them.
fn check_not_mixed(text: &str) -> TemplateResult<()> {
    let tokens = extract_tokens(text);
    let mut values = tokens.iter().filter(|t| t.marker.takes_value());
    let first_named = match values.next() {
        Some(token) => token.is_named(),
        None => return Ok(()),
    };
    if values.any(|t| t.is_named() != first_named) {
        return Err(TemplateError::MixedPlaceholders);
    }
    Ok(())
}
