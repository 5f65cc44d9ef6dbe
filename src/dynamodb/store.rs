use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::dynamodb::{Capacity, Item, Page, TableDescription};
use crate::error::StoreFault;

/// Primary key of the last item read, used to resume a scan.
pub type StartKey = HashMap<String, AttributeValue>;

/// One disjoint partition of a parallel scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub index: u32,
    pub total: u32,
}

/// A single fetch of a scan cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub table_name: String,
    /// `None` requests a sequential scan of the whole table.
    pub segment: Option<Segment>,
    pub exclusive_start_key: Option<StartKey>,
}

/// Items fetched by one [`ScanRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Page,
    /// `None` when the store has no more pages for this cursor.
    pub last_evaluated_key: Option<StartKey>,
}

/// The subset of the table store API the copy relies on.
///
/// The copy is written against this trait so the AWS client can be replaced
/// by an in-memory store in tests.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, StoreFault>;

    async fn update_table(&self, table_name: &str, capacity: Capacity) -> Result<(), StoreFault>;

    async fn scan_page(&self, request: ScanRequest) -> Result<ScanPage, StoreFault>;

    /// Puts up to 25 items; returns the items the store left unprocessed.
    async fn batch_write_item(
        &self,
        table_name: &str,
        items: Vec<Item>,
    ) -> Result<Vec<Item>, StoreFault>;
}
