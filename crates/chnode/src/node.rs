//! The node's entry points

use crate::{ExecutionContext, NodeParameters, NodeRecord, Operation, OutputMode};
use chnode_core::{ChNodeError, JsonObject, NodeDefaults, Result};
use chnode_ops::{
    CommandRequest, InsertRequest, InsertTarget, LoadOption, MetadataRequest, QueryRequest,
    collect_rows_from_json_field, database_options, execute_command, execute_insert,
    execute_query, list_columns, list_databases, list_tables, parse_columns, pick_database,
    table_options,
};
use chnode_transport::ClickHouseClient;

/// ClickHouse integration node
///
/// Stateless apart from its defaults; a fresh client is built from the
/// host's credentials on every call.
#[derive(Debug, Clone, Default)]
pub struct ClickHouseNode {
    defaults: NodeDefaults,
}

impl ClickHouseNode {
    pub fn new(defaults: NodeDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &NodeDefaults {
        &self.defaults
    }

    /// Run the configured operation over the host's input items
    ///
    /// Insert and metadata operations run once, with parameters from item 0,
    /// and pair their records to item 0. Query and command run per item.
    /// Under continue-on-fail a failure becomes an `{error}` record paired
    /// to its item; otherwise the first failure aborts the run.
    #[tracing::instrument(skip_all, fields(items = ctx.input_items().len()))]
    pub async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<NodeRecord>> {
        let client = self.client(ctx).await?;

        if let Ok(first) = NodeParameters::read(ctx, 0)
            && let Ok(operation) = Operation::resolve(&first.resource, &first.operation)
            && operation.is_resource_level()
        {
            tracing::debug!(?operation, "running resource-level operation");
            let outcome = match operation {
                Operation::InsertFromItems | Operation::InsertFromJson => {
                    self.run_insert(ctx, &client, operation, &first).await
                }
                _ => self.run_metadata(&client, operation, &first).await,
            };
            return recover(ctx, outcome, 0);
        }

        let mut records = Vec::new();
        for index in 0..ctx.input_items().len() {
            let outcome = self.run_item(ctx, &client, index).await;
            records.extend(recover(ctx, outcome, index)?);
        }
        Ok(records)
    }

    /// Database names for the host's dropdown
    pub async fn load_databases(&self, ctx: &dyn ExecutionContext) -> Result<Vec<LoadOption>> {
        let client = self.client(ctx).await?;
        let params = NodeParameters::read(ctx, 0)?;

        let rows = list_databases(&client, self.metadata_request(&params)).await?;
        Ok(database_options(&rows))
    }

    /// Table names of the selected database for the host's dropdown
    pub async fn load_tables(&self, ctx: &dyn ExecutionContext) -> Result<Vec<LoadOption>> {
        let client = self.client(ctx).await?;
        let params = NodeParameters::read(ctx, 0)?;
        let database = pick_database(client.credentials(), params.metadata_database_override());

        let rows = list_tables(&client, &database, self.metadata_request(&params)).await?;
        Ok(table_options(&rows))
    }

    /// Check the host's credentials with `SELECT 1`
    #[tracing::instrument(skip_all)]
    pub async fn test_credentials(&self, ctx: &dyn ExecutionContext) -> Result<()> {
        let client = self.client(ctx).await?;
        client.ping(self.defaults.timeout_ms).await?;
        tracing::debug!(base_url = %client.base_url(), "credentials accepted");
        Ok(())
    }

    async fn client(&self, ctx: &dyn ExecutionContext) -> Result<ClickHouseClient> {
        let credentials = ctx.credentials().await?.normalize();
        Ok(ClickHouseClient::new(credentials, ctx.http_delegate()))
    }

    fn metadata_request(&self, params: &NodeParameters) -> MetadataRequest {
        MetadataRequest {
            timeout_ms: params.timeout_ms(&self.defaults),
            compress: params.compress(&self.defaults),
        }
    }

    async fn run_item(
        &self,
        ctx: &dyn ExecutionContext,
        client: &ClickHouseClient,
        index: usize,
    ) -> Result<Vec<NodeRecord>> {
        let params = NodeParameters::read(ctx, index)?;
        let operation = Operation::resolve(&params.resource, &params.operation)?;

        match operation {
            Operation::ExecuteQuery => {
                let request = QueryRequest::new(params.query.as_str())
                    .limit(params.limit(&self.defaults))
                    .paginate(params.paginate.unwrap_or(false))
                    .database(params.database_override.as_deref())
                    .timeout_ms(params.timeout_ms(&self.defaults))
                    .compress(params.compress(&self.defaults));
                let result = execute_query(client, &request).await?;

                match params.output_mode {
                    OutputMode::PerRow => Ok(result
                        .rows
                        .into_iter()
                        .map(|row| NodeRecord::new(row, index))
                        .collect()),
                    OutputMode::Single => {
                        Ok(vec![NodeRecord::from_serialize(&result.into_output(), index)?])
                    }
                }
            }
            Operation::ExecuteCommand => {
                let request = CommandRequest::new(params.command.as_str())
                    .database(params.database_override.as_deref())
                    .timeout_ms(params.timeout_ms(&self.defaults))
                    .compress(params.compress(&self.defaults));
                let summary = execute_command(client, &request).await?;
                Ok(vec![NodeRecord::from_serialize(&summary, index)?])
            }
            _ => Err(ChNodeError::configuration(format!(
                "Operation \"{}\" of resource \"{}\" cannot be mixed with per-item operations",
                params.operation, params.resource
            ))),
        }
    }

    async fn run_insert(
        &self,
        ctx: &dyn ExecutionContext,
        client: &ClickHouseClient,
        operation: Operation,
        params: &NodeParameters,
    ) -> Result<Vec<NodeRecord>> {
        let items = ctx.input_items();
        let rows: Vec<JsonObject> = match operation {
            Operation::InsertFromJson => collect_rows_from_json_field(items, |index| {
                ctx.parameter("jsonArrayField", index)
                    .and_then(|value| value.as_str().map(str::to_string))
                    .unwrap_or_default()
            }),
            _ => items.to_vec(),
        };

        let target = InsertTarget {
            database: params.database_override.clone(),
            table: params.table.clone(),
            columns: parse_columns(params.columns_csv.as_deref(), params.columns_ui.as_ref()),
        };
        let request = InsertRequest::new(target)
            .batch_size(params.batch_size(&self.defaults))
            .ignore_unknown_fields(params.ignore_unknown_fields.unwrap_or(false))
            .gzip_request(params.gzip_request.unwrap_or(false))
            .timeout_ms(params.timeout_ms(&self.defaults))
            .compress(params.compress(&self.defaults));

        let summary = execute_insert(client, &request, &rows).await?;
        Ok(vec![NodeRecord::from_serialize(&summary, 0)?])
    }

    async fn run_metadata(
        &self,
        client: &ClickHouseClient,
        operation: Operation,
        params: &NodeParameters,
    ) -> Result<Vec<NodeRecord>> {
        let request = self.metadata_request(params);
        let database = pick_database(client.credentials(), params.metadata_database_override());

        let rows = match operation {
            Operation::ListDatabases => list_databases(client, request).await?,
            Operation::ListTables => list_tables(client, &database, request).await?,
            Operation::ListColumns => {
                list_columns(client, &database, params.metadata_table.as_deref(), request).await?
            }
            other => {
                return Err(ChNodeError::configuration(format!(
                    "{:?} is not a metadata operation",
                    other
                )));
            }
        };
        Ok(rows.into_iter().map(|row| NodeRecord::new(row, 0)).collect())
    }
}

/// Turn a failure into an `{error}` record when the host asks to continue
fn recover(
    ctx: &dyn ExecutionContext,
    outcome: Result<Vec<NodeRecord>>,
    index: usize,
) -> Result<Vec<NodeRecord>> {
    match outcome {
        Ok(records) => Ok(records),
        Err(err) if ctx.continue_on_fail() => {
            tracing::warn!(item = index, error = %err, "item failed, continuing");
            Ok(vec![NodeRecord::error(&err, index)])
        }
        Err(err) => Err(err),
    }
}
