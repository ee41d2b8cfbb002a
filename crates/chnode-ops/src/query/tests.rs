use super::*;
use crate::testing::{ScriptedExecutor, client, json_page, ok};
use chnode_core::ChNodeError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::plain("SELECT 1", 10, 0, "SELECT * FROM (SELECT 1) LIMIT 10")]
#[case::semicolon("SELECT 1;", 10, 0, "SELECT * FROM (SELECT 1) LIMIT 10")]
#[case::many_semicolons("  SELECT 1 ; ;;  ", 5, 0, "SELECT * FROM (SELECT 1) LIMIT 5")]
#[case::offset("SELECT * FROM t", 100, 200, "SELECT * FROM (SELECT * FROM t) LIMIT 100 OFFSET 200")]
#[case::negative_limit("SELECT 1", -3, 0, "SELECT * FROM (SELECT 1) LIMIT 0")]
#[case::negative_offset("SELECT 1", 10, -10, "SELECT * FROM (SELECT 1) LIMIT 10")]
#[case::inner_semicolon("SELECT ';'", 1, 0, "SELECT * FROM (SELECT ';') LIMIT 1")]
fn test_build_paginated_sql(
    #[case] sql: &str,
    #[case] limit: i64,
    #[case] offset: i64,
    #[case] expected: &str,
) {
    assert_eq!(build_paginated_sql(sql, limit, offset), expected);
}

#[test]
fn test_shape_query_output_defaults() {
    let rows = vec![json!({"id": 1}), json!({"id": 2})]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

    let output = shape_query_output(QueryParts {
        rows: Some(rows),
        ..QueryParts::default()
    });

    assert_eq!(
        serde_json::to_value(&output).expect("serializable"),
        json!({
            "rows": [{"id": 1}, {"id": 2}],
            "meta": [],
            "statistics": {},
            "summary": {"rowCount": 2},
        })
    );
}

#[test]
fn test_shape_query_output_empty() {
    let output = shape_query_output(QueryParts::default());
    assert!(output.rows.is_empty());
    assert_eq!(output.summary.get("rowCount"), Some(&json!(0)));
}

#[tokio::test]
async fn test_single_pass_without_pagination() {
    let executor = ScriptedExecutor::new([json_page(json!([{"id": 1}, {"id": 2}]))]);

    let result = execute_query(&client(&executor), &QueryRequest::new("SELECT id FROM t;").limit(2))
        .await
        .expect("query should succeed");

    assert_eq!(result.rows.len(), 2);
    assert_eq!(
        result.summary,
        QuerySummary {
            row_count: 2,
            limit: 2,
            pages: 1,
            paginated: false,
        }
    );

    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.contains("default_format=JSON"));
    assert!(requests[0].url.contains("wait_end_of_query=1"));
    assert_eq!(executor.bodies(), vec!["SELECT * FROM (SELECT id FROM t) LIMIT 2"]);
}

#[tokio::test]
async fn test_pagination_follows_full_pages() {
    let executor = ScriptedExecutor::new([
        json_page(json!([{"id": 1}, {"id": 2}])),
        json_page(json!([{"id": 3}, {"id": 4}])),
        json_page(json!([{"id": 5}])),
    ]);

    let result = execute_query(
        &client(&executor),
        &QueryRequest::new("SELECT id FROM t").limit(2).paginate(true),
    )
    .await
    .expect("query should succeed");

    assert_eq!(result.rows.len(), 5);
    assert_eq!(result.summary.pages, 3);
    assert!(result.summary.paginated);
    assert_eq!(
        executor.bodies(),
        vec![
            "SELECT * FROM (SELECT id FROM t) LIMIT 2",
            "SELECT * FROM (SELECT id FROM t) LIMIT 2 OFFSET 2",
            "SELECT * FROM (SELECT id FROM t) LIMIT 2 OFFSET 4",
        ]
    );
}

#[tokio::test]
async fn test_exact_multiple_costs_one_empty_page() {
    let executor = ScriptedExecutor::new([
        json_page(json!([{"id": 1}, {"id": 2}])),
        json_page(json!([])),
    ]);

    let result = execute_query(
        &client(&executor),
        &QueryRequest::new("SELECT id FROM t").limit(2).paginate(true),
    )
    .await
    .expect("query should succeed");

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.summary.pages, 2);
}

#[tokio::test]
async fn test_meta_from_first_page_statistics_from_last() {
    let first = ok(json!({
        "meta": [{"name": "id"}],
        "data": [{"id": 1}],
        "statistics": {"page": 1},
    })
    .to_string());
    let second = ok(json!({
        "meta": [{"name": "other"}],
        "data": [],
        "statistics": {"page": 2},
    })
    .to_string());
    let executor = ScriptedExecutor::new([first, second]);

    let result = execute_query(
        &client(&executor),
        &QueryRequest::new("SELECT id FROM t").limit(1).paginate(true),
    )
    .await
    .expect("query should succeed");

    assert_eq!(Value::from(result.meta), json!([{"name": "id"}]));
    assert_eq!(Value::Object(result.statistics), json!({"page": 2}));
}

#[tokio::test]
async fn test_zero_limit_disables_pagination() {
    let executor = ScriptedExecutor::new([json_page(json!([]))]);

    let result = execute_query(
        &client(&executor),
        &QueryRequest::new("SELECT 1").limit(0).paginate(true),
    )
    .await
    .expect("query should succeed");

    assert!(!result.summary.paginated);
    assert_eq!(result.summary.pages, 1);
    assert_eq!(executor.bodies(), vec!["SELECT * FROM (SELECT 1) LIMIT 0"]);
}

#[tokio::test]
async fn test_database_override_reaches_url() {
    let executor = ScriptedExecutor::new([json_page(json!([]))]);

    execute_query(
        &client(&executor),
        &QueryRequest::new("SELECT 1").database(Some("analytics")),
    )
    .await
    .expect("query should succeed");

    assert!(executor.requests()[0].url.contains("database=analytics"));
}

#[tokio::test]
async fn test_unparseable_page_is_a_redacted_parse_error() {
    let executor = ScriptedExecutor::new([ok("alice is not allowed")]);

    let err = execute_query(&client(&executor), &QueryRequest::new("SELECT 1"))
        .await
        .expect_err("body is not json");

    assert!(matches!(err, ChNodeError::Parse { .. }));
    assert_eq!(
        err.to_string(),
        "Failed to parse ClickHouse JSON response. *** is not allowed"
    );
}

#[tokio::test]
async fn test_into_output_carries_summary() {
    let executor = ScriptedExecutor::new([json_page(json!([{"id": 1}]))]);

    let output = execute_query(&client(&executor), &QueryRequest::new("SELECT 1").limit(10))
        .await
        .expect("query should succeed")
        .into_output();

    assert_eq!(
        Value::Object(output.summary),
        json!({"rowCount": 1, "limit": 10, "pages": 1, "paginated": false})
    );
    assert_eq!(Value::from(output.meta), json!([{"name": "id", "type": "UInt64"}]));
}
