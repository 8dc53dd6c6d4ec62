//! File include expansion for `%F:<name>` directives.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::parser::extract_tokens;

/// Default file extension for included templates.
pub const DEFAULT_EXTENSION: &str = "sql";

/// Expand the include directives of `text` once.
///
/// Each `%F:<name>` is replaced with the raw contents of
/// `<base_dir>/<name>.<extension>`. Included content is spliced verbatim and
/// not scanned again in this pass. Returns the input unchanged when it has
/// no include directives.
pub fn expand_includes(text: &str, base_dir: &Path, extension: &str) -> TemplateResult<String> {
    let includes: Vec<_> = extract_tokens(text)
        .into_iter()
        .filter(|t| t.is_include())
        .collect();

    if includes.is_empty() {
        return Ok(text.to_string());
    }

    // Each file is read once, however often it is included
    let mut loaded: HashMap<&str, String> = HashMap::new();
    for token in &includes {
        if let Some(name) = token.name {
            if !loaded.contains_key(name) {
                loaded.insert(name, load_include(base_dir, name, extension)?);
            }
        }
    }

    let mut expanded = String::with_capacity(text.len() + loaded.values().map(String::len).sum::<usize>());
    let mut cursor = 0;
    for token in &includes {
        let Some(content) = token.name.and_then(|name| loaded.get(name)) else {
            continue;
        };
        expanded.push_str(&text[cursor..token.span.start]);
        expanded.push_str(content);
        cursor = token.span.end;
    }
    expanded.push_str(&text[cursor..]);

    Ok(expanded)
}

/// Whether `text` still contains include directives.
pub fn has_includes(text: &str) -> bool {
    extract_tokens(text).iter().any(|t| t.is_include())
}

fn load_include(base_dir: &Path, name: &str, extension: &str) -> TemplateResult<String> {
    let path = base_dir.join(format!("{}.{}", name, extension));
    debug!(include = name, path = %path.display(), "loading include");
    std::fs::read_to_string(&path).map_err(|e| TemplateError::include(name, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_no_includes_is_noop() {
        let dir = fixture(&[]);
        let text = "SELECT * FROM %I:table";
        assert_eq!(expand_includes(text, dir.path(), "sql").unwrap(), text);
    }

    #[test]
    fn test_splices_every_occurrence() {
        let dir = fixture(&[("cols.sql", "id, name")]);
        let out = expand_includes("SELECT %F:cols FROM a UNION SELECT %F:cols FROM b", dir.path(), "sql")
            .unwrap();
        assert_eq!(out, "SELECT id, name FROM a UNION SELECT id, name FROM b");
    }

    #[test]
    fn test_exact_token_replacement() {
        let dir = fixture(&[("foo.sql", "FOO"), ("foobar.sql", "FOOBAR")]);
        let out = expand_includes("%F:foobar %F:foo %I:foo", dir.path(), "sql").unwrap();
        assert_eq!(out, "FOOBAR FOO %I:foo");
    }

    #[test]
    fn test_included_content_not_rescanned() {
        let dir = fixture(&[("outer.sql", "(%F:inner)"), ("inner.sql", "x")]);
        let once = expand_includes("%F:outer", dir.path(), "sql").unwrap();
        assert_eq!(once, "(%F:inner)");
        let twice = expand_includes(&once, dir.path(), "sql").unwrap();
        assert_eq!(twice, "(x)");
    }

    #[test]
    fn test_custom_extension() {
        let dir = fixture(&[("part.pgsql", "1")]);
        assert_eq!(expand_includes("%F:part", dir.path(), "pgsql").unwrap(), "1");
    }

    #[test]
    fn test_missing_include() {
        let dir = fixture(&[]);
        let err = expand_includes("%F:nope", dir.path(), "sql").unwrap_err();
        match err {
            TemplateError::IncludeNotFound { name, path, source } => {
                assert_eq!(name, "nope");
                assert!(path.ends_with("nope.sql"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_has_includes() {
        assert!(has_includes("a %F:b"));
        assert!(!has_includes("a %I:b %%F:c"));
    }
}
