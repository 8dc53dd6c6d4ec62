//! Named parameter binding.
//!
//! Turns `%I:table ... %L:table` into `%I ... %L` plus an argument list with
//! one entry per named occurrence, so the result can be formatted
//! positionally.

use tracing::warn;

use crate::error::{TemplateError, TemplateResult};
use crate::parser::extract_tokens;
use crate::value::{Params, SqlValue};

/// Strip `:<name>` suffixes and look up each occurrence in `params`.
///
/// Names missing from `params` bind as [`SqlValue::Null`]. Unused keys are
/// ignored. Unnamed placeholders are left in place and take no argument.
pub fn bind_named(text: &str, params: &Params) -> (String, Vec<SqlValue>) {
    let (stripped, names) = strip_names(text);
    let args = names.into_iter().map(|name| lookup(params, name)).collect();
    (stripped, args)
}

/// Like [`bind_named`], but a name missing from `params` is an error.
pub fn bind_named_strict(text: &str, params: &Params) -> TemplateResult<(String, Vec<SqlValue>)> {
    let (stripped, names) = strip_names(text);
    let args = names
        .into_iter()
        .map(|name| {
            params
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::MissingParameter(name.to_string()))
        })
        .collect::<TemplateResult<Vec<_>>>()?;
    Ok((stripped, args))
}

/// Rebuild `text` with every named value placeholder reduced to its marker.
/// Returns the names in occurrence order.
fn strip_names(text: &str) -> (String, Vec<&str>) {
    let mut stripped = String::with_capacity(text.len());
    let mut names = Vec::new();
    let mut cursor = 0;

    for token in extract_tokens(text) {
        let Some(name) = token.name else { continue };
        // Includes are resolved before binding; stragglers are left for the formatter to reject
        if token.is_include() {
            continue;
        }
        names.push(name);
        stripped.push_str(&text[cursor..token.span.start]);
        stripped.push_str(&token.marker.to_string());
        cursor = token.span.end;
    }
    stripped.push_str(&text[cursor..]);

    (stripped, names)
}

fn lookup(params: &Params, name: &str) -> SqlValue {
    match params.get(name) {
        Some(value) => value.clone(),
        None => {
            warn!(parameter = name, "missing named parameter, binding NULL");
            SqlValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_strips_names_and_orders_args() {
        let params = params! { "one" => "a_table", "two" => "x=y", "three" => 123 };
        let (sql, args) = bind_named(
            "insert into %I:one (select * from foo where %s:two and bar > %L:three)",
            &params,
        );
        assert_eq!(sql, "insert into %I (select * from foo where %s and bar > %L)");
        assert_eq!(
            args,
            vec![
                SqlValue::from("a_table"),
                SqlValue::from("x=y"),
                SqlValue::from(123),
            ]
        );
    }

    #[test]
    fn test_repeated_names_bind_per_occurrence() {
        let params = params! { "one" => 1, "two" => 2, "unused" => 3 };
        let (sql, args) = bind_named("%I:one %s:one %L:two %L:one", &params);
        assert_eq!(sql, "%I %s %L %L");
        assert_eq!(
            args,
            vec![
                SqlValue::Int(1),
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(1),
            ]
        );
    }

    #[test]
    fn test_cast_survives_stripping() {
        let params = params! { "type" => "foo" };
        let (sql, args) = bind_named("SELECT event_time::DATE WHERE asset_type=%L:type", &params);
        assert_eq!(sql, "SELECT event_time::DATE WHERE asset_type=%L");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_missing_binds_null() {
        let (sql, args) = bind_named("%L:absent", &Params::new());
        assert_eq!(sql, "%L");
        assert_eq!(args, vec![SqlValue::Null]);
    }

    #[test]
    fn test_unnamed_left_untouched() {
        let params = params! { "a" => 1 };
        let (sql, args) = bind_named("%I %L:a %% %2$s", &params);
        assert_eq!(sql, "%I %L %% %2$s");
        assert_eq!(args, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn test_strict_missing_is_error() {
        let params = params! { "a" => 1 };
        let err = bind_named_strict("%L:a %L:b", &params).unwrap_err();
        assert!(matches!(err, TemplateError::MissingParameter(name) if name == "b"));

        let (sql, args) = bind_named_strict("%L:a", &params).unwrap();
        assert_eq!(sql, "%L");
        assert_eq!(args, vec![SqlValue::Int(1)]);
    }
}
