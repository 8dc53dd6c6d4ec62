//! Placeholder tokens found in template text.

use std::fmt;
use std::ops::Range;

/// How a placeholder's value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `%I`: SQL identifier.
    Identifier,
    /// `%s`: plain, unquoted string.
    String,
    /// `%L`: quoted SQL literal.
    Literal,
    /// `%F`: file include. Only a token when named.
    File,
    /// `%%`: escaped percent sign.
    Percent,
}

impl Marker {
    /// The marker character as written after `%`.
    pub fn as_char(self) -> char {
        match self {
            Marker::Identifier => 'I',
            Marker::String => 's',
            Marker::Literal => 'L',
            Marker::File => 'F',
            Marker::Percent => '%',
        }
    }

    /// Whether this marker consumes an argument.
    pub fn takes_value(self) -> bool {
        matches!(self, Marker::Identifier | Marker::String | Marker::Literal)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.as_char())
    }
}

/// A placeholder occurrence, borrowed from the template it was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub marker: Marker,
    /// Parameter name from a `:<name>` suffix.
    pub name: Option<&'a str>,
    /// Explicit 1-based argument position from a `%<n>$` prefix.
    pub position: Option<usize>,
    /// Byte range of the whole token in the source text.
    pub span: Range<usize>,
}

impl<'a> Token<'a> {
    /// The exact token text, e.g. `%I:foo`.
    pub fn raw<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }

    pub fn is_include(&self) -> bool {
        self.marker == Marker::File
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.marker == Marker::Percent {
            return write!(f, "%%");
        }
        write!(f, "%")?;
        if let Some(position) = self.position {
            write!(f, "{}$", position)?;
        }
        write!(f, "{}", self.marker.as_char())?;
        if let Some(name) = self.name {
            write!(f, ":{}", name)?;
        }
        Ok(())
    }
}
