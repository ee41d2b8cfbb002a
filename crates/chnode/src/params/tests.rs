use super::*;
use crate::StaticContext;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn params(value: Value) -> NodeParameters {
    let Value::Object(values) = value else {
        panic!("parameters must be an object");
    };
    NodeParameters::from_object(values).expect("valid parameters")
}

#[test]
fn test_defaults_when_nothing_is_set() {
    let parsed = params(json!({}));
    let defaults = NodeDefaults::default();

    assert_eq!(parsed, NodeParameters::default());
    assert_eq!(parsed.resource, "query");
    assert_eq!(parsed.operation, "executeQuery");
    assert_eq!(parsed.timeout_ms(&defaults), 60_000);
    assert!(parsed.compress(&defaults));
    assert_eq!(parsed.limit(&defaults), 100);
    assert_eq!(parsed.batch_size(&defaults), 1000);
    assert_eq!(parsed.output_mode, OutputMode::Single);
}

#[rstest]
#[case::number(json!(5000), Some(5000))]
#[case::fractional(json!(1500.7), Some(1500))]
#[case::string(json!("2500"), Some(2500))]
#[case::zero_is_unset(json!(0), None)]
#[case::negative(json!(-1), None)]
#[case::garbage(json!("soon"), None)]
fn test_timeout_is_lenient(#[case] value: Value, #[case] expected: Option<u64>) {
    assert_eq!(params(json!({ "timeoutMs": value })).timeout_ms, expected);
}

#[rstest]
#[case::fractional(json!(10.9), Some(10))]
#[case::negative(json!(-2.5), Some(-3))]
#[case::string(json!(" 7 "), Some(7))]
#[case::object(json!({}), None)]
fn test_limit_is_floored(#[case] value: Value, #[case] expected: Option<i64>) {
    assert_eq!(params(json!({ "limit": value })).limit, expected);
}

#[test]
fn test_flags_and_strings() {
    let parsed = params(json!({
        "compress": false,
        "paginate": 1,
        "gzipRequest": "",
        "databaseOverride": "  analytics ",
        "metadataDatabase": "   ",
        "outputMode": "perRow",
        "columnsUi": {"columns": [{"column": "id"}]},
    }));

    assert_eq!(parsed.compress, Some(false));
    assert_eq!(parsed.paginate, Some(true));
    assert_eq!(parsed.gzip_request, Some(false));
    assert_eq!(parsed.database_override.as_deref(), Some("analytics"));
    assert_eq!(parsed.metadata_database, None);
    assert_eq!(parsed.metadata_database_override(), Some("analytics"));
    assert_eq!(parsed.output_mode, OutputMode::PerRow);
    assert!(parsed.columns_ui.is_some());
}

#[test]
fn test_metadata_database_takes_precedence() {
    let parsed = params(json!({"metadataDatabase": "meta", "databaseOverride": "other"}));
    assert_eq!(parsed.metadata_database_override(), Some("meta"));
}

#[rstest]
#[case::per_row(json!("perRow"), OutputMode::PerRow)]
#[case::single(json!("single"), OutputMode::Single)]
#[case::blank(json!(""), OutputMode::Single)]
#[case::unknown(json!("everything"), OutputMode::Single)]
#[case::wrong_case(json!("PerRow"), OutputMode::Single)]
#[case::number(json!(1), OutputMode::Single)]
fn test_output_mode_is_lenient(#[case] value: Value, #[case] expected: OutputMode) {
    assert_eq!(params(json!({ "outputMode": value })).output_mode, expected);
}

#[test]
fn test_malformed_parameters_are_a_configuration_error() {
    let Value::Object(values) = json!({"resource": ["query"]}) else {
        unreachable!();
    };
    let err = NodeParameters::from_object(values).expect_err("resource must be a string");
    assert!(err.to_string().starts_with("Configuration error: Invalid node parameters"));
}

#[test]
fn test_read_from_context_skips_nulls() {
    let ctx = StaticContext::default()
        .with_parameter("resource", "command")
        .with_parameter("operation", "executeCommand")
        .with_parameter("table", Value::Null)
        .with_item_parameter(1, "command", "DROP TABLE t");

    let first = NodeParameters::read(&ctx, 0).expect("item 0");
    let second = NodeParameters::read(&ctx, 1).expect("item 1");

    assert_eq!(first.resource, "command");
    assert_eq!(first.command, "");
    assert_eq!(first.table, "");
    assert_eq!(second.command, "DROP TABLE t");
}

#[rstest]
#[case::query("query", "executeQuery", Operation::ExecuteQuery)]
#[case::command("command", "executeCommand", Operation::ExecuteCommand)]
#[case::insert_items("insert", "insertFromItems", Operation::InsertFromItems)]
#[case::insert_json("insert", "insertFromJson", Operation::InsertFromJson)]
#[case::databases("metadata", "listDatabases", Operation::ListDatabases)]
#[case::tables("metadata", "listTables", Operation::ListTables)]
#[case::columns("metadata", "listColumns", Operation::ListColumns)]
fn test_operation_resolution(
    #[case] resource: &str,
    #[case] operation: &str,
    #[case] expected: Operation,
) {
    assert_eq!(Operation::resolve(resource, operation).expect("known"), expected);
}

#[test]
fn test_resource_level_operations() {
    assert!(!Operation::ExecuteQuery.is_resource_level());
    assert!(!Operation::ExecuteCommand.is_resource_level());
    assert!(Operation::InsertFromJson.is_resource_level());
    assert!(Operation::ListColumns.is_resource_level());
}

#[rstest]
#[case::bad_operation(
    "query",
    "drop",
    "Configuration error: Unsupported operation \"drop\" for resource \"query\""
)]
#[case::bad_resource(
    "graph",
    "executeQuery",
    "Configuration error: Unsupported resource \"graph\""
)]
fn test_unknown_operations(
    #[case] resource: &str,
    #[case] operation: &str,
    #[case] expected: &str,
) {
    let err = Operation::resolve(resource, operation).expect_err("unknown");
    assert_eq!(err.to_string(), expected);
}
