//! Error types for the copy job.

use thiserror::Error;

/// Result type alias for the copy core.
pub type Result<T> = std::result::Result<T, CopyError>;

/// Fault reported by the table store for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    /// Throttling or provisioned-throughput-exceeded rejection, safe to retry.
    #[error("{code}: {message}")]
    Throttled { code: String, message: String },

    /// Any other store fault: permissions, missing table, transport...
    #[error("{}: {message}", code.as_deref().unwrap_or("Unknown"))]
    Service {
        code: Option<String>,
        message: String,
    },
}

impl StoreFault {
    pub fn throttled(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Throttled {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn service(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Errors that can occur while provisioning or copying tables.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unable to {operation} table {table}{}: {source}", segment_suffix(.segment))]
    Store {
        table: String,
        /// Scan segment the fault occurred in, if any.
        segment: Option<u32>,
        operation: &'static str,
        #[source]
        source: StoreFault,
    },

    #[error("waited for too long ({elapsed_ms} ms, limit {max_elapsed_ms} ms) to perform operation on {table} table")]
    Timeout {
        table: String,
        elapsed_ms: u64,
        max_elapsed_ms: u64,
    },

    #[error("copy task failed: {0}")]
    Pipeline(String),

    /// Provisioning could not be restored; capacity may remain boosted.
    #[error("{}", restore_message(.source, .copy_error))]
    Restore {
        #[source]
        source: Box<CopyError>,
        copy_error: Option<Box<CopyError>>,
    },
}

fn segment_suffix(segment: &Option<u32>) -> String {
    segment.map_or_else(String::new, |segment| format!(" (segment {segment})"))
}

fn restore_message(source: &CopyError, copy_error: &Option<Box<CopyError>>) -> String {
    match copy_error {
        Some(copy_error) => format!(
            "unable to restore provisioning after failed copy ({copy_error}): {source}; capacity may remain boosted"
        ),
        None => format!("unable to restore provisioning: {source}; capacity may remain boosted"),
    }
}

impl CopyError {
    pub(crate) fn store(table: &str, operation: &'static str, source: StoreFault) -> Self {
        Self::Store {
            table: table.to_string(),
            segment: None,
            operation,
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_restore_failure(&self) -> bool {
        matches!(self, Self::Restore { .. })
    }
}
