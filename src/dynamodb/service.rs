use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{RetryConfig, MAX_TOTAL_SEGMENTS};
use crate::dynamodb::store::{ScanRequest, Segment, TableStore};
use crate::dynamodb::{Capacity, Item, Page, TableDescription};
use crate::error::{CopyError, Result};
use crate::retry::{Attempt, Backoff, RetryExecutor};

/// Retry-aware access to a single table.
#[derive(Clone)]
pub struct TableService {
    table_name: String,
    store: Arc<dyn TableStore>,
    retry: RetryExecutor,
    max_batch_size: usize,
}

impl std::fmt::Debug for TableService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableService")
            .field("table_name", &self.table_name)
            .field("max_batch_size", &self.max_batch_size)
            .finish_non_exhaustive()
    }
}

impl TableService {
    pub fn new(
        table_name: impl Into<String>,
        store: Arc<dyn TableStore>,
        backoff: Arc<dyn Backoff>,
        config: &RetryConfig,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            store,
            retry: RetryExecutor::new(backoff, config.max_elapsed),
            max_batch_size: config.batch_size(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn describe(&self) -> Result<TableDescription> {
        self.store
            .describe_table(&self.table_name)
            .await
            .map_err(|e| CopyError::store(&self.table_name, "describe", e))
    }

    /// Sets the table's provisioned throughput and waits for it to be active again.
    pub async fn update_capacity(&self, capacity: Capacity) -> Result<()> {
        if capacity.read == 0 || capacity.write == 0 {
            return Err(CopyError::Validation(format!(
                "invalid update capacity {capacity} for table {}: capacity units must be greater than 0",
                self.table_name
            )));
        }

        info!("updating {} with {capacity}", self.table_name);
        self.store
            .update_table(&self.table_name, capacity)
            .await
            .map_err(|e| CopyError::store(&self.table_name, "update", e))?;

        self.wait_for_ready().await
    }

    /// Polls the table description until its status is `ACTIVE`.
    pub async fn wait_for_ready(&self) -> Result<()> {
        self.retry
            .run(&self.table_name, |attempt, elapsed| async move {
                let description = self.describe().await?;
                if description.is_active() {
                    return Ok(Attempt::Done(()));
                }
                debug!(
                    "{} is {:?}: waited {} ms (attempt {attempt})",
                    self.table_name,
                    description.status,
                    elapsed.as_millis()
                );
                Ok(Attempt::Retry)
            })
            .await
    }

    /// Scans segment `segment` of `total_segments`, sending every page to `sink`.
    ///
    /// A single segment means a plain sequential scan. The sink is left open.
    /// Returns the number of items scanned.
    pub async fn scan(
        &self,
        total_segments: u32,
        segment: u32,
        sink: &mpsc::Sender<Page>,
    ) -> Result<u64> {
        if total_segments == 0 {
            return Err(CopyError::Validation(
                "totalSegments has to be greater than 0".to_string(),
            ));
        }
        if total_segments > MAX_TOTAL_SEGMENTS {
            return Err(CopyError::Validation(format!(
                "totalSegments {total_segments} is above the limit of {MAX_TOTAL_SEGMENTS}"
            )));
        }
        if segment >= total_segments {
            return Err(CopyError::Validation(format!(
                "segment {segment} is out of range for {total_segments} total segments"
            )));
        }

        let segment_request = (total_segments > 1).then_some(Segment {
            index: segment,
            total: total_segments,
        });

        let mut total_scanned: u64 = 0;
        let mut exclusive_start_key = None;
        loop {
            let page = self
                .store
                .scan_page(ScanRequest {
                    table_name: self.table_name.clone(),
                    segment: segment_request,
                    exclusive_start_key,
                })
                .await
                .map_err(|e| CopyError::Store {
                    table: self.table_name.clone(),
                    segment: Some(segment),
                    operation: "scan",
                    source: e,
                })?;

            total_scanned += page.items.len() as u64;
            debug!(
                "{} table scanned page with {} items (reader {segment})",
                self.table_name,
                page.items.len()
            );

            sink.send(page.items).await.map_err(|_| {
                CopyError::Pipeline(format!(
                    "page channel closed while scanning {} (reader {segment})",
                    self.table_name
                ))
            })?;

            exclusive_start_key = page.last_evaluated_key;
            if exclusive_start_key.is_none() {
                break;
            }
        }

        info!(
            "{} table scanned a total of {total_scanned} items (reader {segment})",
            self.table_name
        );
        Ok(total_scanned)
    }

    /// Writes `items` in chunks of at most 25, retrying throttled requests and
    /// resubmitting whatever the store leaves unprocessed.
    pub async fn batch_write(&self, mut items: Vec<Item>) -> Result<()> {
        debug!("writing batch of {} to {}", items.len(), self.table_name);
        if items.is_empty() {
            return Ok(());
        }

        while !items.is_empty() {
            let rest = items.split_off(items.len().min(self.max_batch_size));
            self.write_chunk(items).await?;
            items = rest;
        }
        Ok(())
    }

    async fn write_chunk(&self, chunk: Vec<Item>) -> Result<()> {
        let started = Instant::now();
        let mut remaining = chunk;
        let mut elapsed = tokio::time::Duration::ZERO;

        loop {
            let (unprocessed, spent) = self
                .retry
                .run_from(&self.table_name, elapsed, |attempt, elapsed| {
                    let requests = remaining.clone();
                    async move {
                        match self
                            .store
                            .batch_write_item(&self.table_name, requests)
                            .await
                        {
                            Ok(unprocessed) => Ok(Attempt::Done(unprocessed)),
                            Err(fault) if fault.is_throttling() => {
                                warn!(
                                    "batch write to {} throttled: waited {} ms \
                                     (attempt {attempt}): {fault}",
                                    self.table_name,
                                    elapsed.as_millis()
                                );
                                Ok(Attempt::Retry)
                            }
                            Err(fault) => {
                                Err(CopyError::store(&self.table_name, "batch write to", fault))
                            }
                        }
                    }
                })
                .await?;

            if unprocessed.is_empty() {
                return Ok(());
            }

            elapsed = spent.max(started.elapsed());
            if elapsed >= self.retry.max_elapsed() {
                return Err(self.retry.timeout(&self.table_name, elapsed));
            }
            debug!(
                "resubmitting {} unprocessed items to {}",
                unprocessed.len(),
                self.table_name
            );
            remaining = unprocessed;
        }
    }
}
