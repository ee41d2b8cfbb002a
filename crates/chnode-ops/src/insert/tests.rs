use super::*;
use crate::testing::{ScriptedExecutor, client, ok, ok_with_headers};
use chnode_transport::gunzip;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn rows(value: Value) -> Vec<JsonObject> {
    value
        .as_array()
        .expect("array of rows")
        .iter()
        .filter_map(|row| row.as_object().cloned())
        .collect()
}

fn target(table: &str) -> InsertTarget {
    InsertTarget {
        table: table.to_string(),
        ..InsertTarget::default()
    }
}

#[rstest]
#[case::table_only(None, "events", &[], "INSERT INTO events FORMAT JSONEachRow")]
#[case::qualified(
    Some(" analytics "),
    " events ",
    &[],
    "INSERT INTO analytics.events FORMAT JSONEachRow"
)]
#[case::columns(
    None,
    "events",
    &["id", "name"],
    "INSERT INTO events (id, name) FORMAT JSONEachRow"
)]
#[case::empty_database(Some(""), "events", &[], "INSERT INTO events FORMAT JSONEachRow")]
fn test_build_insert_query(
    #[case] database: Option<&str>,
    #[case] table: &str,
    #[case] columns: &[&str],
    #[case] expected: &str,
) {
    let target = InsertTarget {
        database: database.map(str::to_string),
        table: table.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
    };
    assert_eq!(build_insert_query(&target).expect("valid target"), expected);
}

#[test]
fn test_build_insert_query_requires_table() {
    let err = build_insert_query(&target("   ")).expect_err("blank table");
    assert_eq!(err.to_string(), "Configuration error: Table name is required for insert");
}

#[test]
fn test_build_ndjson_preserves_key_order() {
    let rows = rows(json!([{"z": 1, "a": "x"}, {"id": 2, "nested": {"b": 1, "a": 2}}]));
    assert_eq!(
        build_ndjson(&rows),
        "{\"z\":1,\"a\":\"x\"}\n{\"id\":2,\"nested\":{\"b\":1,\"a\":2}}"
    );
    assert_eq!(build_ndjson(&[]), "");
}

#[rstest]
#[case::even(4, 2, vec![2, 2])]
#[case::remainder(5, 2, vec![2, 2, 1])]
#[case::zero_batch(3, 0, vec![1, 1, 1])]
#[case::negative_batch(2, -5, vec![1, 1])]
#[case::large_batch(3, 1000, vec![3])]
#[case::no_rows(0, 10, vec![])]
fn test_chunk_rows(#[case] count: usize, #[case] batch_size: i64, #[case] expected: Vec<usize>) {
    let rows: Vec<JsonObject> = (0..count)
        .map(|i| rows(json!([{ "id": i }])).remove(0))
        .collect();

    let batches = chunk_rows(&rows, batch_size);

    assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), expected);
    assert_eq!(batches.concat(), rows);
}

#[rstest]
#[case::csv(Some(" id, ,name ,"), None, vec!["id", "name"])]
#[case::nothing(None, None, vec![])]
#[case::ui_wins(
    Some("a,b"),
    Some(json!({"columns": [{"column": " id "}, {"column": ""}]})),
    vec!["id"]
)]
#[case::ui_values_alias(None, Some(json!({"values": [{"column": "x"}]})), vec!["x"])]
#[case::ui_column_alias(None, Some(json!({"column": [{"column": "y"}]})), vec!["y"])]
#[case::ui_nested(None, Some(json!({"columns": {"columns": [{"column": "z"}]}})), vec!["z"])]
#[case::ui_empty_falls_back(Some("a"), Some(json!({"columns": []})), vec!["a"])]
#[case::ui_not_object(Some("a"), Some(json!("columns")), vec!["a"])]
#[case::ui_bad_entries(
    None,
    Some(json!({"columns": [1, null, {"column": 5}, {"name": "n"}]})),
    vec![]
)]
fn test_parse_columns(
    #[case] csv: Option<&str>,
    #[case] ui: Option<Value>,
    #[case] expected: Vec<&str>,
) {
    assert_eq!(parse_columns(csv, ui.as_ref()), expected);
}

#[rstest]
#[case::top_level("rows", Some(json!([1])))]
#[case::dotted("payload.items", Some(json!([{"id": 1}])))]
#[case::bracket("payload[items]", Some(json!([{"id": 1}])))]
#[case::index("list[1].v", Some(json!("b")))]
#[case::missing("payload.nope", None)]
#[case::through_scalar("rows.x", None)]
#[case::empty("", None)]
fn test_get_value_at_path(#[case] path: &str, #[case] expected: Option<Value>) {
    let input = json!({
        "rows": [1],
        "payload": {"items": [{"id": 1}]},
        "list": [{"v": "a"}, {"v": "b"}],
    });
    assert_eq!(get_value_at_path(&input, path).cloned(), expected);
}

#[test]
fn test_collect_rows_from_json_field() {
    let items = rows(json!([
        {"payload": {"rows": [{"id": 1}, 5, {"id": 2}]}},
        {"payload": {"rows": "not an array"}},
        {"other": [{"id": 3}]},
    ]));
    let paths = ["payload.rows", "payload.rows", "other"];

    let collected = collect_rows_from_json_field(&items, |index| paths[index].to_string());

    assert_eq!(Value::from(collected), json!([{"id": 1}, {"id": 2}, {"id": 3}]));
}

#[tokio::test]
async fn test_insert_without_rows_sends_nothing() {
    let executor = ScriptedExecutor::new([]);

    let summary = execute_insert(&client(&executor), &InsertRequest::new(target("events")), &[])
        .await
        .expect("empty insert succeeds");

    assert_eq!(summary, InsertSummary::default());
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_insert_with_blank_table_fails_before_sending() {
    let executor = ScriptedExecutor::new([]);
    let rows = rows(json!([{"id": 1}]));

    let err = execute_insert(&client(&executor), &InsertRequest::new(target("")), &rows)
        .await
        .expect_err("table is required");

    assert!(matches!(err, ChNodeError::Configuration(_)));
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_insert_batches_rows_with_query_in_url() {
    let executor = ScriptedExecutor::new([
        ok(""),
        ok_with_headers(
            "",
            &[
                ("x-clickhouse-summary", "{\"written_rows\":\"1\"}"),
                ("set-cookie", "session=1"),
            ],
        ),
    ]);
    let rows = rows(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
    let request = InsertRequest::new(InsertTarget {
        database: Some("analytics".to_string()),
        table: "events".to_string(),
        columns: vec!["id".to_string()],
    })
    .batch_size(2)
    .ignore_unknown_fields(true);

    let summary = execute_insert(&client(&executor), &request, &rows)
        .await
        .expect("insert succeeds");

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.batches, 2);
    assert_eq!(
        summary.headers.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["x-clickhouse-summary"]
    );

    assert_eq!(executor.bodies(), vec!["{\"id\":1}\n{\"id\":2}", "{\"id\":3}"]);
    let url = &executor.requests()[0].url;
    assert!(url.contains("database=analytics"));
    assert!(url.contains("wait_end_of_query=1"));
    assert!(url.contains("query=INSERT+INTO+analytics.events+%28id%29+FORMAT+JSONEachRow"));
    assert!(url.ends_with("input_format_skip_unknown_fields=1"));
}

#[tokio::test]
async fn test_insert_gzips_batches() {
    let executor = ScriptedExecutor::new([ok("")]);
    let rows = rows(json!([{"id": 1}]));
    let request = InsertRequest::new(target("events")).gzip_request(true);

    execute_insert(&client(&executor), &request, &rows)
        .await
        .expect("insert succeeds");

    let sent = &executor.requests()[0];
    assert!(sent.is_gzip());
    assert_eq!(gunzip(&sent.body).expect("gzip body"), b"{\"id\":1}".to_vec());
    assert!(!sent.url.contains("input_format_skip_unknown_fields"));
}

#[tokio::test]
async fn test_insert_stops_at_first_failing_batch() {
    let failure = chnode_core::ClickHouseResponse::new(
        500,
        chnode_core::HeaderMap::new(),
        "Code: 27. Cannot parse input",
    );
    let executor = ScriptedExecutor::new([ok(""), failure]);
    let rows = rows(json!([{"id": 1}, {"id": 2}, {"id": 3}]));

    let err = execute_insert(
        &client(&executor),
        &InsertRequest::new(target("events")).batch_size(1),
        &rows,
    )
    .await
    .expect_err("second batch fails");

    assert_eq!(err.status(), Some(500));
    assert_eq!(executor.requests().len(), 2);
}
