use tokio::time::Duration;

use crate::error::{CopyError, Result};
use crate::provisioning::CapacityMinimums;

/// Most items DynamoDB accepts in a single `BatchWriteItem` request.
pub const MAX_BATCH_WRITE_SIZE: usize = 25;

/// Most segments DynamoDB accepts for a parallel scan.
pub const MAX_TOTAL_SEGMENTS: u32 = 1_000_000;

/// Time ceiling for a single retried store operation.
pub const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(3 * 60);

/// Upper bound (exclusive) of the random jitter added to every backoff.
pub const MAX_RETRY_JITTER: Duration = Duration::from_millis(100);

/// Retry and batching limits of a [`TableService`](crate::dynamodb::TableService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_elapsed: Duration,
    pub max_jitter: Duration,
    pub max_batch_size: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_elapsed: MAX_RETRY_ELAPSED,
            max_jitter: MAX_RETRY_JITTER,
            max_batch_size: MAX_BATCH_WRITE_SIZE,
        }
    }
}

impl RetryConfig {
    /// Batch size clamped to what the store accepts.
    pub fn batch_size(&self) -> usize {
        self.max_batch_size.clamp(1, MAX_BATCH_WRITE_SIZE)
    }
}

/// Parameters of one copy job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Minimum read capacity for the source table while copying; 0 never boosts.
    pub read_capacity: u64,
    /// Minimum write capacity for the target table while copying; 0 never boosts.
    pub write_capacity: u64,
    pub readers: u32,
    pub writers: u32,
}

impl CopyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.readers == 0 {
            return Err(CopyError::Validation(
                "reader count must be greater than 0".to_string(),
            ));
        }
        if self.readers > MAX_TOTAL_SEGMENTS {
            return Err(CopyError::Validation(format!(
                "reader count must be at most {MAX_TOTAL_SEGMENTS}"
            )));
        }
        if self.writers == 0 {
            return Err(CopyError::Validation(
                "writer count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn minimums(&self) -> CapacityMinimums {
        CapacityMinimums {
            read: self.read_capacity,
            write: self.write_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_limits() {
        let config = RetryConfig::default();
        assert_eq!(config.max_elapsed.as_millis(), 180_000);
        assert_eq!(config.max_jitter.as_millis(), 100);
        assert_eq!(config.batch_size(), 25);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let config = RetryConfig {
            max_batch_size: 100,
            ..RetryConfig::default()
        };
        assert_eq!(config.batch_size(), 25);

        let config = RetryConfig {
            max_batch_size: 0,
            ..RetryConfig::default()
        };
        assert_eq!(config.batch_size(), 1);
    }

    #[test]
    fn test_validate_worker_counts() {
        let config = CopyConfig {
            read_capacity: 0,
            write_capacity: 0,
            readers: 1,
            writers: 1,
        };
        assert!(config.validate().is_ok());

        let no_readers = CopyConfig {
            readers: 0,
            ..config.clone()
        };
        assert!(matches!(no_readers.validate(), Err(CopyError::Validation(_))));

        let too_many_readers = CopyConfig {
            readers: MAX_TOTAL_SEGMENTS + 1,
            ..config.clone()
        };
        assert!(matches!(
            too_many_readers.validate(),
            Err(CopyError::Validation(_))
        ));

        let no_writers = CopyConfig { writers: 0, ..config };
        assert!(matches!(no_writers.validate(), Err(CopyError::Validation(_))));
    }
}
