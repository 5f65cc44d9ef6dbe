//! # DynamoDB Module
//!
//! Store-access layer of the copy: everything that talks to a table.
//!
//! ## Components
//!
//! - `TableStore`: The table store API the copy needs, as an async trait.
//! - `DynamoDb`: `TableStore` implemented over the AWS SDK client.
//! - `TableService`: Retry-aware operations on one table (describe, capacity
//!   update, readiness wait, segmented scan, chunked batch write).
//! - `Item`, `Page`: Opaque items and the pages a scan yields.
//! - `Capacity`, `TableDescription`: Throughput and describe snapshots.
//!
//! ## Usage
//!
//! The AWS client is configured from the environment:
//!
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION` or a shared
//!   config profile.
//! - `AWS_ENDPOINT_URL`: For using a custom endpoint (e.g., DynamoDB Local).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dynamodb_copy::config::RetryConfig;
//! use dynamodb_copy::dynamodb::{DynamoDb, TableService};
//! use dynamodb_copy::retry::JitterBackoff;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sdk_config = aws_config::load_from_env().await;
//!     let retry = RetryConfig::default();
//!
//!     let products = TableService::new(
//!         "products",
//!         Arc::new(DynamoDb::new(&sdk_config)),
//!         Arc::new(JitterBackoff::new(retry.max_jitter)),
//!         &retry,
//!     );
//!
//!     let description = products.describe().await?;
//!     println!("{:?}", description.provisioned_capacity());
//!     Ok(())
//! }
//! ```

mod client;
mod item;
mod service;
pub mod store;
mod table;

pub use client::DynamoDb;
pub use item::{Item, Page};
pub use service::TableService;
pub use store::TableStore;
pub use table::{BillingMode, Capacity, TableDescription, TableStatus};
