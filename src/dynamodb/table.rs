use std::fmt;

/// Read and write throughput units of a provisioned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capacity {
    pub read: u64,
    pub write: u64,
}

impl Capacity {
    pub fn new(read: u64, write: u64) -> Self {
        Self { read, write }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read: {}, write: {}", self.read, self.write)
    }
}

/// Lifecycle status of a table as reported by `DescribeTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Updating,
    Active,
    Deleting,
    Archiving,
    Archived,
    InaccessibleEncryptionCredentials,
    Other(String),
}

/// Billing mode of a table.
///
/// # Table Capacity Modes
///
/// - **Provisioned**: You specify the number of reads and writes per second.
/// - **On-Demand**: DynamoDB instantly accommodates workloads as they ramp up or down.
///
/// Only provisioned tables carry a [`Capacity`] that the copy may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    Provisioned,
    OnDemand,
}

/// Read-only snapshot of a table produced by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub status: TableStatus,
    pub billing_mode: BillingMode,
    pub capacity: Option<Capacity>,
}

impl TableDescription {
    pub fn is_active(&self) -> bool {
        self.status == TableStatus::Active
    }

    /// Capacity of the table if, and only if, it is billed by provisioned throughput.
    pub fn provisioned_capacity(&self) -> Option<Capacity> {
        match self.billing_mode {
            BillingMode::Provisioned => self.capacity,
            BillingMode::OnDemand => None,
        }
    }
}
