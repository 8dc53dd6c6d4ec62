use chrono::{FixedOffset, TimeZone, Utc};
use pgtemplate::prelude::*;
use pgtemplate::{format, format_file, format_literal, format_string};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn test_basic_positional_formatting() {
    let sql = "insert into %I (select * from foo where %s and bar > %L)";
    let out = format(sql, args!["a_table", "something=another", 123]).unwrap();
    assert_eq!(
        out,
        "insert into a_table (select * from foo where something=another and bar > '123')"
    );
}

#[test]
fn test_basic_named_formatting() {
    let sql = "insert into %I:one (select * from foo where %s:two and bar > %L:three)";
    let out = format(
        sql,
        params! { "one" => "a_table", "two" => "something=another", "three" => 123 },
    )
    .unwrap();
    assert_eq!(
        out,
        "insert into a_table (select * from foo where something=another and bar > '123')"
    );
}

#[test]
fn test_repeated_named_formatting() {
    let sql = "%I:one %s:one %L:one - %I:two %s:two %L:two - %I:one %s:one %L:one )";
    let out = format(sql, params! { "one" => "one", "two" => "two" }).unwrap();
    assert_eq!(out, "one one 'one' - two two 'two' - one one 'one' )");
}

#[test]
fn test_extra_params_ignored() {
    let sql = "%I:one %s:one %L:one - %I:two %s:two %L:two - %I:one %s:one %L:one )";
    let out = format(
        sql,
        params! { "one" => "one", "two" => "two", "three" => "three", "four" => "four" },
    )
    .unwrap();
    assert_eq!(out, "one one 'one' - two two 'two' - one one 'one' )");
}

#[test]
fn test_type_cast_is_not_a_placeholder() {
    let sql = "SELECT event_time::DATE WHERE asset_type=%L:type";
    let out = format(sql, params! { "type" => "foo" }).unwrap();
    assert_eq!(out, "SELECT event_time::DATE WHERE asset_type='foo'");
}

#[test]
fn test_underscores_in_names() {
    let sql = "SELECT event_time::DATE WHERE asset_type=%L:t_y_p_e";
    let out = format(sql, params! { "t_y_p_e" => "foo" }).unwrap();
    assert_eq!(out, "SELECT event_time::DATE WHERE asset_type='foo'");
}

#[test]
fn test_temporal_wrapper_formats_like_native() {
    let offset = FixedOffset::east_opt(3600).unwrap();
    let start = offset.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();

    let sql = "SELECT * FROM foo WHERE event_time >= %L:startTime";
    let wrapped = format(sql, params! { "startTime" => SqlValue::temporal(start) }).unwrap();
    let native = format(sql, params! { "startTime" => start.with_timezone(&Utc) }).unwrap();
    assert_eq!(wrapped, native);
    assert_eq!(
        native,
        "SELECT * FROM foo WHERE event_time >= '2021-03-04 04:06:07.000+00'"
    );
}

#[test]
fn test_aggregator_query() {
    let sql = r#"INSERT INTO %I:finalStep (
  SELECT
    date_id,
    %L:name as thename,
    JSON_EXTRACT_PATH_TEXT(experiments, %L:name) AS variant,
    COUNT(CASE WHEN %s:sample_clause THEN 1 END) as sample_total,
    COUNT(CASE WHEN %s:conversion_clause THEN 1 END) as conversion_total
  FROM %I:eventStream
  WHERE LEN(experiments) > 2
    AND event_time >= %L:start_time AND event_time < %L:end_time
    AND NULLIF(JSON_EXTRACT_PATH_TEXT(experiments, %L:name), '') IS NOT NULL
    AND ( (%s:sample_clause) OR (%s:conversion_clause) )
  GROUP BY 1,2,3
)"#;

    let pdt = FixedOffset::west_opt(7 * 3600).unwrap();
    let params = params! {
        "finalStep" => "experiments_daily_build_20160901_1934_1",
        "name" => "aa_rdp_to_buy_test",
        "start_time" => SqlValue::temporal(pdt.with_ymd_and_hms(2016, 8, 9, 17, 0, 0).unwrap()),
        "end_time" => Utc.with_ymd_and_hms(2016, 9, 19, 0, 0, 0).unwrap(),
        "enabled" => true,
        "sample_clause" => "event = 'view' AND asset_type = 'resource' AND licence_type='TES-PAID'",
        "conversion_clause" => "event = 'buy' AND asset_type = 'resource'",
        "eventStream" => "event_stream",
    };

    let expected = r#"INSERT INTO experiments_daily_build_20160901_1934_1 (
  SELECT
    date_id,
    'aa_rdp_to_buy_test' as thename,
    JSON_EXTRACT_PATH_TEXT(experiments, 'aa_rdp_to_buy_test') AS variant,
    COUNT(CASE WHEN event = 'view' AND asset_type = 'resource' AND licence_type='TES-PAID' THEN 1 END) as sample_total,
    COUNT(CASE WHEN event = 'buy' AND asset_type = 'resource' THEN 1 END) as conversion_total
  FROM event_stream
  WHERE LEN(experiments) > 2
    AND event_time >= '2016-08-10 00:00:00.000+00' AND event_time < '2016-09-19 00:00:00.000+00'
    AND NULLIF(JSON_EXTRACT_PATH_TEXT(experiments, 'aa_rdp_to_buy_test'), '') IS NOT NULL
    AND ( (event = 'view' AND asset_type = 'resource' AND licence_type='TES-PAID') OR (event = 'buy' AND asset_type = 'resource') )
  GROUP BY 1,2,3
)"#;

    assert_eq!(format(sql, params).unwrap(), expected);
}

#[test]
fn test_format_literal_and_string() {
    assert_eq!(format_literal(123).unwrap(), "'123'");
    assert_eq!(format_string(123).unwrap(), "123");
}

#[test]
fn test_temporal_literal_and_string_match_native() {
    let now = chrono::Local::now();
    let native = now.with_timezone(&Utc);

    assert_eq!(
        format_literal(SqlValue::temporal(now)).unwrap(),
        format_literal(native).unwrap()
    );
    assert_eq!(
        format_string(SqlValue::temporal(now)).unwrap(),
        format_string(native).unwrap()
    );
}

#[test]
fn test_literal_strips_null_characters() {
    assert_eq!(format_literal("ab\0c").unwrap(), "'abc'");
}

#[test]
fn test_literal_never_leaves_escape_prefix_or_nul() {
    for input in ["a\\b", "\0", "\\\0\\", "it's \\ ok\0", "E'x'"] {
        let out = format_literal(input).unwrap();
        assert!(!out.contains('\0'), "{:?} rendered {:?}", input, out);
        assert!(
            !out.starts_with("E'") && !out.starts_with("e'"),
            "{:?} rendered {:?}",
            input,
            out
        );
    }
}

#[test]
fn test_positional_strips_null_characters() {
    let sql = "insert into %I (select * from foo where %s and bar > %L)";
    let out = format(sql, args!["a_table", "some\0thing=anot\0her", 123]).unwrap();
    assert_eq!(
        out,
        "insert into a_table (select * from foo where something=another and bar > '123')"
    );
}

#[test]
fn test_file_includes() {
    let out = format_file(fixture("sample.sql"), &params! { "sample" => "dear_sir" }).unwrap();
    assert_eq!(
        out,
        "WITH foobar AS (SELECT * FROM dear_sir) SELECT * FROM dear_sir"
    );
}

#[test]
fn test_included_file_binds_repeated_names() {
    let out = format_file(fixture("wrapper.sql"), &params! { "sample" => "dear_sir" }).unwrap();
    assert_eq!(
        out,
        "WITH foobar AS (SELECT * FROM dear_sir) SELECT * FROM dear_sir"
    );
}

#[test]
fn test_nested_includes() {
    let params = params! {
        "key" => "asset_type",
        "table" => "events",
        "since" => Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };
    let out = format_file(fixture("nested/report.sql"), &params).unwrap();
    assert_eq!(
        out,
        "SELECT asset_type, count(*) AS total FROM events WHERE created_at >= '2024-01-01 00:00:00.000+00'"
    );
}

#[test]
fn test_missing_include_fails() {
    let err = format_file(fixture("broken.sql"), &Params::new()).unwrap_err();
    assert!(matches!(err, TemplateError::IncludeNotFound { ref name, .. } if name == "missing_part"));
}

#[test]
fn test_missing_template_file() {
    let err = format_file(fixture("does_not_exist.sql"), &Params::new()).unwrap_err();
    assert!(matches!(err, TemplateError::Read { .. }));
}

#[test]
fn test_named_format_uses_include_dir() {
    let formatter = Formatter::new().with_include_dir(fixture(""));
    let out = formatter
        .format("%F:othername LIMIT %s:n", params! { "sample" => "t", "n" => 5 })
        .unwrap();
    assert_eq!(out, "SELECT * FROM t LIMIT 5");
}

#[test]
fn test_include_cycle_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.sql"), "(%F:b)").unwrap();
    std::fs::write(dir.path().join("b.sql"), "(%F:a)").unwrap();

    let config = FormatterConfig {
        max_include_depth: 5,
        ..FormatterConfig::default()
    };
    let formatter = Formatter::from_config(config).with_include_dir(dir.path());
    let err = formatter.format("%F:a", params! {}).unwrap_err();
    assert!(matches!(err, TemplateError::IncludeDepthExceeded { depth: 5 }));
}

#[test]
fn test_identifier_quoting_in_templates() {
    let out = format(
        "SELECT %I:col FROM %I:table",
        params! { "col" => "Total Sales", "table" => "order" },
    )
    .unwrap();
    assert_eq!(out, "SELECT \"Total Sales\" FROM \"order\"");
}

#[test]
fn test_list_values() {
    let out = format(
        "SELECT %I:cols FROM t WHERE id IN (%L:ids)",
        params! { "cols" => vec!["id", "name"], "ids" => vec![1, 2, 3] },
    )
    .unwrap();
    assert_eq!(out, "SELECT id,name FROM t WHERE id IN ('1','2','3')");
}

#[test]
fn test_positional_list_literal() {
    let out = format("WHERE c1 IN (%L)", args![vec![1, 2, 3]]).unwrap();
    assert_eq!(out, "WHERE c1 IN ('1','2','3')");
}

#[test]
fn test_string_fragment_escape_string_untouched() {
    let out = format("SELECT col FROM t WHERE %s", args!["E'\\t' = sep"]).unwrap();
    assert_eq!(out, "SELECT col FROM t WHERE E'\\t' = sep");
}
