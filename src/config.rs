//! Formatter configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! include_dir = "sql/fragments"
//! include_extension = "sql"
//! max_include_depth = 16
//! strict_params = false
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::include::DEFAULT_EXTENSION;

/// Name of the project-local config file.
pub const CONFIG_FILE: &str = "pgtemplate.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// Base directory for `%F:<name>` includes in [`format`](crate::format)
    /// calls. `None` means the current directory. `format_file` always uses
    /// the template's own directory instead.
    pub include_dir: Option<PathBuf>,
    /// Extension appended to include names.
    pub include_extension: String,
    /// Maximum number of include expansion passes.
    pub max_include_depth: usize,
    /// Fail on named parameters missing from the mapping instead of binding NULL.
    pub strict_params: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_dir: None,
            include_extension: DEFAULT_EXTENSION.to_string(),
            max_include_depth: 16,
            strict_params: false,
        }
    }
}

impl FormatterConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> TemplateResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| TemplateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative `include_dir` values resolve against the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TemplateError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;

        if let (Some(dir), Some(parent)) = (&config.include_dir, path.parent()) {
            if dir.is_relative() {
                config.include_dir = Some(parent.join(dir));
            }
        }

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Find and load the first config present:
    /// `./pgtemplate.toml`, then `<config dir>/pgtemplate/config.toml`.
    /// Falls back to defaults.
    pub fn discover() -> TemplateResult<Self> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }

        if let Some(global) = dirs::config_dir().map(|d| d.join("pgtemplate").join("config.toml")) {
            if global.is_file() {
                return Self::from_file(global);
            }
        }

        Ok(Self::default())
    }

    fn validate(&self) -> TemplateResult<()> {
        if self.max_include_depth == 0 {
            return Err(TemplateError::Config(
                "max_include_depth must be at least 1".to_string(),
            ));
        }
        if self.include_extension.is_empty() || self.include_extension.starts_with('.') {
            return Err(TemplateError::Config(format!(
                "include_extension must be a bare extension like \"sql\", got {:?}",
                self.include_extension
            )));
        }
        Ok(())
    }
}
