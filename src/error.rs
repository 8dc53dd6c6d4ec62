//! Error types for pgtemplate.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// An include directive named a file that could not be read.
    #[error("Include '{name}' could not be read from {}: {source}", path.display())]
    IncludeNotFound {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Include expansion did not settle within the configured depth.
    #[error("Include depth exceeded ({depth} passes); check for include cycles")]
    IncludeDepthExceeded { depth: usize },

    /// An include directive survived until value substitution.
    #[error("Unresolved include '%F:{0}' reached value substitution")]
    UnresolvedInclude(String),

    /// A named template also used unnamed placeholders.
    #[error("Template mixes named and unnamed placeholders")]
    MixedPlaceholders,

    /// A named parameter was absent from the mapping (strict mode only).
    #[error("Missing parameter: '{0}'")]
    MissingParameter(String),

    /// A named placeholder appeared in a positional call.
    #[error("Named placeholder ':{0}' used with positional arguments")]
    UnboundName(String),

    /// The template consumes more arguments than were supplied.
    #[error("Too few arguments: placeholder needs argument {needed}, {given} given")]
    TooFewArguments { needed: usize, given: usize },

    /// A positioned placeholder referenced argument zero.
    #[error("Argument positions start at 1, found %0$")]
    ArgumentZero,

    /// The value cannot be rendered as an SQL identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The template file itself could not be read.
    #[error("Failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A parameter value could not be interpreted.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Create an include error for the given name and resolved path.
    pub fn include(name: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IncludeNotFound {
            name: name.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an invalid identifier error.
    pub fn identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }
}

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
