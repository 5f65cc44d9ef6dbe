//! Copies every item of a DynamoDB table into another one, raising the
//! tables' provisioned throughput for the duration of the copy.

pub mod config;
pub mod copier;
pub mod copy_table;
pub mod dynamodb;
pub mod error;
pub mod logging;
pub mod provisioning;
pub mod retry;


pub use copier::{Copier, CopySummary};
pub use copy_table::run_copy_table;
pub use error::{CopyError, Result};
pub use provisioning::{CapacityMinimums, Provisioner, Provisioning};
