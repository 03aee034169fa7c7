//! Google BigQuery REST implementation of the Warehouse trait.
//!
//! Talks to the `jobs.query` / `getQueryResults` endpoints of the
//! BigQuery v2 REST API. Results are paged: the cursor holds one page of
//! rows at a time and follows `pageToken` for the rest.
//!
//! Scalar cells arrive as JSON strings (INT64 as `"123"`, TIMESTAMP as
//! epoch-seconds float text like `"1.231006505E9"`). The client passes
//! them through as raw scalars; the normalizer owns the exact casts.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use coinscan_core::{RawNumber, RawRow, RawTimestamp};

use crate::config::BigQueryConfig;
use crate::error::{Result, WarehouseError};
use crate::traits::{RowCursor, Warehouse};

/// The range join: every coinbase output created in the height range,
/// decorated with its spend status as of the query moment. The join runs
/// remotely so the input-side table never crosses the wire.
const RANGE_QUERY_TEMPLATE: &str = "\
WITH coinbase_outputs AS (
  SELECT
    tx.block_number AS creation_block_height,
    tx.block_timestamp AS creation_block_time,
    tx.hash AS coinbase_txid,
    out.index AS output_index,
    out.value AS value_sats
  FROM `{transactions}` AS tx, UNNEST(tx.outputs) AS out
  WHERE tx.block_number BETWEEN @start_height AND @end_height
    AND tx.is_coinbase = TRUE
)
SELECT
  c.creation_block_height,
  c.creation_block_time,
  c.coinbase_txid,
  c.output_index,
  c.value_sats,
  i.transaction_hash AS spend_txid,
  i.block_number AS spend_block_height,
  i.block_timestamp AS spend_block_time
FROM coinbase_outputs AS c
LEFT JOIN `{inputs}` i
  ON i.spent_transaction_hash = c.coinbase_txid
  AND i.spent_output_index = c.output_index";

/// How long one request lets the server wait for job completion.
const REQUEST_TIMEOUT_MS: u32 = 30_000;

/// Delay between completion polls for long-running jobs.
const POLL_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

// ─────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query_parameters: Vec<QueryParameter>,
    max_results: u32,
    timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: &'static str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

impl QueryParameter {
    fn int64(name: &'static str, value: i64) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "INT64" },
            parameter_value: ParameterValue {
                value: value.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ParameterValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: Option<bool>,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct SchemaField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

// ─────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────

/// BigQuery-backed warehouse.
pub struct BigQueryWarehouse {
    http: reqwest::Client,
    config: BigQueryConfig,
}

impl BigQueryWarehouse {
    /// Build a client from validated configuration.
    pub fn new(config: BigQueryConfig) -> std::result::Result<Self, crate::ConfigError> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn range_query_text(&self) -> String {
        RANGE_QUERY_TEMPLATE
            .replace("{transactions}", &self.config.transactions_table())
            .replace("{inputs}", &self.config.inputs_table())
    }
}

fn query_url(config: &BigQueryConfig) -> String {
    format!(
        "{}/bigquery/v2/projects/{}/queries",
        config.endpoint, config.billing_project
    )
}

fn results_url(config: &BigQueryConfig, job: &JobReference) -> String {
    format!(
        "{}/bigquery/v2/projects/{}/queries/{}",
        config.endpoint, config.billing_project, job.job_id
    )
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::BAD_REQUEST {
        Err(WarehouseError::InvalidQuery(format!("{status}: {body}")))
    } else {
        Err(WarehouseError::Unavailable(format!("{status}: {body}")))
    }
}

async fn post_query(
    http: &reqwest::Client,
    config: &BigQueryConfig,
    request: &QueryRequest,
) -> Result<QueryResponse> {
    let resp = http
        .post(query_url(config))
        .bearer_auth(config.access_token.expose_secret())
        .json(request)
        .send()
        .await?;
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

async fn get_results(
    http: &reqwest::Client,
    config: &BigQueryConfig,
    job: &JobReference,
    page_token: Option<&str>,
) -> Result<QueryResponse> {
    let mut req = http
        .get(results_url(config, job))
        .bearer_auth(config.access_token.expose_secret())
        .query(&[
            ("maxResults", config.page_size.to_string()),
            ("timeoutMs", REQUEST_TIMEOUT_MS.to_string()),
        ]);
    if let Some(location) = &job.location {
        req = req.query(&[("location", location.as_str())]);
    }
    if let Some(token) = page_token {
        req = req.query(&[("pageToken", token)]);
    }
    let resp = check_status(req.send().await?).await?;
    Ok(resp.json().await?)
}

/// Wait for a just-submitted query job to report completion.
async fn await_completion(
    http: &reqwest::Client,
    config: &BigQueryConfig,
    mut response: QueryResponse,
) -> Result<QueryResponse> {
    while response.job_complete != Some(true) {
        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| WarehouseError::Decode("incomplete job without jobReference".into()))?;
        tokio::time::sleep(POLL_DELAY).await;
        response = get_results(http, config, &job, None).await?;
    }
    Ok(response)
}

// ─────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────

/// Column positions, resolved by name from the response schema so the
/// client never depends on projection order.
#[derive(Debug)]
struct ColumnMap {
    coinbase_txid: usize,
    output_index: usize,
    value_sats: usize,
    creation_block_height: usize,
    creation_block_time: usize,
    spend_txid: usize,
    spend_block_height: usize,
    spend_block_time: usize,
}

impl ColumnMap {
    fn from_schema(schema: &TableSchema) -> Result<Self> {
        let find = |name: &str| {
            schema
                .fields
                .iter()
                .position(|f| f.name == name)
                .ok_or_else(|| WarehouseError::Decode(format!("missing column {name:?}")))
        };
        Ok(Self {
            coinbase_txid: find("coinbase_txid")?,
            output_index: find("output_index")?,
            value_sats: find("value_sats")?,
            creation_block_height: find("creation_block_height")?,
            creation_block_time: find("creation_block_time")?,
            spend_txid: find("spend_txid")?,
            spend_block_height: find("spend_block_height")?,
            spend_block_time: find("spend_block_time")?,
        })
    }
}

fn cell(row: &TableRow, idx: usize) -> Option<&serde_json::Value> {
    row.f.get(idx).map(|c| &c.v)
}

fn cell_text(row: &TableRow, idx: usize) -> Option<String> {
    match cell(row, idx) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn cell_number(row: &TableRow, idx: usize) -> Option<RawNumber> {
    match cell(row, idx) {
        Some(serde_json::Value::String(s)) => Some(RawNumber::Text(s.clone())),
        Some(serde_json::Value::Number(n)) => Some(match n.as_i64() {
            Some(v) => RawNumber::Int(v),
            None => RawNumber::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        _ => None,
    }
}

fn cell_timestamp(row: &TableRow, idx: usize) -> Option<RawTimestamp> {
    match cell(row, idx) {
        Some(serde_json::Value::String(s)) => Some(RawTimestamp::Text(s.clone())),
        Some(serde_json::Value::Number(n)) => Some(RawTimestamp::EpochSeconds(
            n.as_f64().unwrap_or(f64::NAN),
        )),
        _ => None,
    }
}

fn decode_rows(columns: &ColumnMap, rows: &[TableRow]) -> Result<Vec<RawRow>> {
    rows.iter()
        .map(|row| {
            let coinbase_txid = cell_text(row, columns.coinbase_txid)
                .ok_or_else(|| WarehouseError::Decode("null coinbase_txid cell".into()))?;
            let output_index = cell_number(row, columns.output_index)
                .ok_or_else(|| WarehouseError::Decode("null output_index cell".into()))?;
            let value_sats = cell_number(row, columns.value_sats)
                .ok_or_else(|| WarehouseError::Decode("null value_sats cell".into()))?;
            let creation_block_height = cell_number(row, columns.creation_block_height)
                .ok_or_else(|| WarehouseError::Decode("null creation_block_height cell".into()))?;

            Ok(RawRow {
                coinbase_txid,
                output_index,
                value_sats,
                creation_block_height,
                creation_block_time: cell_timestamp(row, columns.creation_block_time),
                spend_txid: cell_text(row, columns.spend_txid),
                spend_block_height: cell_number(row, columns.spend_block_height),
                spend_block_time: cell_timestamp(row, columns.spend_block_time),
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────────────────────

enum CursorState {
    /// Query not yet submitted.
    Start(Box<QueryRequest>),
    /// Job complete, following page tokens.
    Paging {
        job: JobReference,
        page_token: String,
    },
    Done,
}

/// Paged cursor over one range query's result set.
pub struct BigQueryCursor {
    http: reqwest::Client,
    config: BigQueryConfig,
    state: CursorState,
}

#[async_trait]
impl RowCursor for BigQueryCursor {
    async fn next_page(&mut self) -> Result<Option<Vec<RawRow>>> {
        loop {
            let response = match std::mem::replace(&mut self.state, CursorState::Done) {
                CursorState::Done => return Ok(None),
                CursorState::Start(request) => {
                    let response = post_query(&self.http, &self.config, &request).await?;
                    await_completion(&self.http, &self.config, response).await?
                }
                CursorState::Paging { job, page_token } => {
                    get_results(&self.http, &self.config, &job, Some(&page_token)).await?
                }
            };

            let schema = response
                .schema
                .as_ref()
                .ok_or_else(|| WarehouseError::Decode("response without schema".into()))?;
            let columns = ColumnMap::from_schema(schema)?;
            let rows = decode_rows(&columns, &response.rows)?;

            self.state = match (response.job_reference, response.page_token) {
                (Some(job), Some(page_token)) => CursorState::Paging { job, page_token },
                _ => CursorState::Done,
            };

            if !rows.is_empty() {
                debug!(rows = rows.len(), "warehouse page fetched");
                return Ok(Some(rows));
            }
            if matches!(self.state, CursorState::Done) {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn max_available_height(&self) -> Result<i64> {
        let request = QueryRequest {
            query: format!(
                "SELECT MAX(block_number) AS max_height FROM `{}`",
                self.config.transactions_table()
            ),
            use_legacy_sql: false,
            parameter_mode: None,
            query_parameters: Vec::new(),
            max_results: 1,
            timeout_ms: REQUEST_TIMEOUT_MS,
        };

        let response = post_query(&self.http, &self.config, &request).await?;
        let response = await_completion(&self.http, &self.config, response).await?;

        let row = response
            .rows
            .first()
            .ok_or_else(|| WarehouseError::Decode("max height query returned no rows".into()))?;
        let raw = cell_number(row, 0)
            .ok_or_else(|| WarehouseError::Decode("max height is null".into()))?;
        match raw {
            RawNumber::Int(v) => Ok(v),
            RawNumber::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                WarehouseError::Decode(format!("max height is not an integer: {s:?}"))
            }),
            RawNumber::Float(f) => Err(WarehouseError::Decode(format!(
                "max height is not an integer: {f}"
            ))),
        }
    }

    async fn fetch_range(&self, start: i64, end: i64) -> Result<Box<dyn RowCursor>> {
        if start > end {
            return Err(WarehouseError::InvalidQuery(format!(
                "empty range: start {start} > end {end}"
            )));
        }

        let request = QueryRequest {
            query: self.range_query_text(),
            use_legacy_sql: false,
            parameter_mode: Some("NAMED"),
            query_parameters: vec![
                QueryParameter::int64("start_height", start),
                QueryParameter::int64("end_height", end),
            ],
            max_results: self.config.page_size,
            timeout_ms: REQUEST_TIMEOUT_MS,
        };

        debug!(start, end, "range query planned");
        Ok(Box::new(BigQueryCursor {
            http: self.http.clone(),
            config: self.config.clone(),
            state: CursorState::Start(Box::new(request)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn warehouse() -> BigQueryWarehouse {
        BigQueryWarehouse::new(BigQueryConfig::new("billing", "token")).unwrap()
    }

    fn response_fixture() -> QueryResponse {
        serde_json::from_value(json!({
            "jobComplete": true,
            "jobReference": { "jobId": "job_1", "location": "US" },
            "schema": { "fields": [
                { "name": "creation_block_height", "type": "INTEGER" },
                { "name": "creation_block_time", "type": "TIMESTAMP" },
                { "name": "coinbase_txid", "type": "STRING" },
                { "name": "output_index", "type": "INTEGER" },
                { "name": "value_sats", "type": "NUMERIC" },
                { "name": "spend_txid", "type": "STRING" },
                { "name": "spend_block_height", "type": "INTEGER" },
                { "name": "spend_block_time", "type": "TIMESTAMP" }
            ]},
            "rows": [
                { "f": [
                    { "v": "0" },
                    { "v": "1.231006505E9" },
                    { "v": "4a5e1e4b" },
                    { "v": "0" },
                    { "v": "5000000000" },
                    { "v": null },
                    { "v": null },
                    { "v": null }
                ]},
                { "f": [
                    { "v": "9" },
                    { "v": "1.231473279E9" },
                    { "v": "0437cd7f" },
                    { "v": "0" },
                    { "v": "5000000000" },
                    { "v": "f4184fc5" },
                    { "v": "170" },
                    { "v": "1.231731025E9" }
                ]}
            ],
            "pageToken": null
        }))
        .unwrap()
    }

    #[test]
    fn decode_rows_maps_columns_by_name() {
        let response = response_fixture();
        let columns = ColumnMap::from_schema(response.schema.as_ref().unwrap()).unwrap();
        let rows = decode_rows(&columns, &response.rows).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].coinbase_txid, "4a5e1e4b");
        assert_eq!(rows[0].output_index, RawNumber::Text("0".to_string()));
        assert_eq!(rows[0].spend_txid, None);
        assert_eq!(rows[0].spend_block_time, None);

        assert_eq!(rows[1].spend_txid.as_deref(), Some("f4184fc5"));
        assert_eq!(
            rows[1].spend_block_time,
            Some(RawTimestamp::Text("1.231731025E9".to_string()))
        );
    }

    #[test]
    fn decode_rejects_missing_column() {
        let schema: TableSchema =
            serde_json::from_value(json!({ "fields": [{ "name": "coinbase_txid" }] })).unwrap();
        let err = ColumnMap::from_schema(&schema).unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(_)));
    }

    #[test]
    fn decode_rejects_null_identity_cell() {
        let response = response_fixture();
        let columns = ColumnMap::from_schema(response.schema.as_ref().unwrap()).unwrap();
        let rows: Vec<TableRow> = serde_json::from_value(json!([
            { "f": [ { "v": "0" }, { "v": "1.2E9" }, { "v": null }, { "v": "0" },
                     { "v": "1" }, { "v": null }, { "v": null }, { "v": null } ] }
        ]))
        .unwrap();
        let err = decode_rows(&columns, &rows).unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(_)));
    }

    #[tokio::test]
    async fn inverted_range_rejected_before_any_request() {
        let err = warehouse().fetch_range(10, 9).await.err().unwrap();
        assert!(matches!(err, WarehouseError::InvalidQuery(_)));
    }

    #[test]
    fn range_query_names_both_tables() {
        let query = warehouse().range_query_text();
        assert!(query.contains("`bigquery-public-data.crypto_bitcoin.transactions`"));
        assert!(query.contains("`bigquery-public-data.crypto_bitcoin.inputs`"));
        assert!(query.contains("@start_height"));
        assert!(query.contains("@end_height"));
    }
}
