use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{self as sdk, ProvisionedThroughput, PutRequest, WriteRequest},
    Client,
};
use std::fmt::Debug;
use tracing::debug;

use crate::dynamodb::store::{ScanPage, ScanRequest, TableStore};
use crate::dynamodb::{BillingMode, Capacity, Item, TableDescription, TableStatus};
use crate::error::StoreFault;

/// Error codes DynamoDB uses to reject a request for exceeding throughput.
const THROTTLING_CODES: [&str; 3] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// DynamoDB client wrapper implementing [`TableStore`].
///
/// # DynamoDB Concepts
///
/// ## Scan
/// A scan reads every item in a table, one page (at most 1 MB) per request.
/// The response carries a `LastEvaluatedKey` whenever more pages remain; it is
/// passed back as `ExclusiveStartKey` to fetch the next one. With `Segment` and
/// `TotalSegments` the table is split into disjoint partitions that can be
/// scanned in parallel.
///
/// ## BatchWriteItem
/// Puts up to 25 items per request. Items the service could not handle within
/// the table's throughput are returned as `UnprocessedItems` and must be
/// resubmitted by the caller.
///
/// ## Provisioned throughput
/// `UpdateTable` changes a provisioned table's read/write capacity units. The
/// table goes through `UPDATING` before it is `ACTIVE` again.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TableStore for DynamoDb {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, StoreFault> {
        let output = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(store_fault)?;

        let table = output
            .table()
            .ok_or_else(|| StoreFault::service(None, "describe response has no table"))?;

        Ok(TableDescription {
            name: table.table_name().unwrap_or(table_name).to_string(),
            status: table.table_status().map_or_else(
                || TableStatus::Other("UNKNOWN".to_string()),
                table_status,
            ),
            // Tables that were always provisioned carry no billing mode summary.
            billing_mode: match table.billing_mode_summary().and_then(|s| s.billing_mode()) {
                Some(sdk::BillingMode::PayPerRequest) => BillingMode::OnDemand,
                _ => BillingMode::Provisioned,
            },
            capacity: table.provisioned_throughput().map(|throughput| {
                Capacity::new(
                    units(throughput.read_capacity_units()),
                    units(throughput.write_capacity_units()),
                )
            }),
        })
    }

    async fn update_table(&self, table_name: &str, capacity: Capacity) -> Result<(), StoreFault> {
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(i64::try_from(capacity.read).unwrap_or(i64::MAX))
            .write_capacity_units(i64::try_from(capacity.write).unwrap_or(i64::MAX))
            .build()
            .map_err(|e| StoreFault::service(None, e.to_string()))?;

        self.client
            .update_table()
            .table_name(table_name)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(store_fault)?;
        Ok(())
    }

    async fn scan_page(&self, request: ScanRequest) -> Result<ScanPage, StoreFault> {
        let segment = request.segment;
        let output = self
            .client
            .scan()
            .table_name(&request.table_name)
            .set_segment(segment.map(|s| s.index as i32))
            .set_total_segments(segment.map(|s| s.total as i32))
            .set_exclusive_start_key(request.exclusive_start_key)
            .send()
            .await
            .map_err(store_fault)?;

        Ok(ScanPage {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(Item::from)
                .collect(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn batch_write_item(
        &self,
        table_name: &str,
        items: Vec<Item>,
    ) -> Result<Vec<Item>, StoreFault> {
        let requests = items
            .into_iter()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(item.attributes))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreFault::service(None, e.to_string()))?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table_name, requests)
            .send()
            .await
            .map_err(store_fault)?;

        let unprocessed: Vec<Item> = output
            .unprocessed_items
            .and_then(|mut tables| tables.remove(table_name))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request)
            .map(|put| Item::from(put.item))
            .collect();

        if !unprocessed.is_empty() {
            debug!("{table_name}: {} unprocessed items", unprocessed.len());
        }
        Ok(unprocessed)
    }
}

fn table_status(status: &sdk::TableStatus) -> TableStatus {
    match status {
        sdk::TableStatus::Active => TableStatus::Active,
        sdk::TableStatus::Creating => TableStatus::Creating,
        sdk::TableStatus::Updating => TableStatus::Updating,
        sdk::TableStatus::Deleting => TableStatus::Deleting,
        sdk::TableStatus::Archiving => TableStatus::Archiving,
        sdk::TableStatus::Archived => TableStatus::Archived,
        sdk::TableStatus::InaccessibleEncryptionCredentials => {
            TableStatus::InaccessibleEncryptionCredentials
        }
        other => TableStatus::Other(other.as_str().to_string()),
    }
}

fn units(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

/// Map an SDK error into a [`StoreFault`], separating throttling from the rest.
fn store_fault<E, R>(err: SdkError<E, R>) -> StoreFault
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    let throttled = code
        .as_deref()
        .is_some_and(|code| THROTTLING_CODES.contains(&code));

    match code {
        Some(code) if throttled => StoreFault::Throttled { code, message },
        code => StoreFault::Service { code, message },
    }
}
