//! Save, boost and restore of the source and target tables' throughput.

use tracing::info;

use crate::dynamodb::{Capacity, TableService};
use crate::error::Result;

/// Provisioned capacity of the source and target tables.
///
/// A side is `None` when that table is billed on demand, and is then never updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provisioning {
    pub source: Option<Capacity>,
    pub target: Option<Capacity>,
}

/// Operator-configured capacity floors applied while copying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityMinimums {
    /// Floor for the source table's read capacity.
    pub read: u64,
    /// Floor for the target table's write capacity.
    pub write: u64,
}

impl CapacityMinimums {
    /// Computes the boosted provisioning for a copy.
    ///
    /// Only the source read and target write units are raised, and never lowered.
    /// On-demand sides stay on demand.
    pub fn policy(&self, current: Provisioning) -> Provisioning {
        let source = current.source.map(|capacity| {
            if self.read > capacity.read {
                Capacity::new(self.read, capacity.write)
            } else {
                capacity
            }
        });

        let target = current.target.map(|capacity| {
            if self.write > capacity.write {
                Capacity::new(capacity.read, self.write)
            } else {
                capacity
            }
        });

        Provisioning { source, target }
    }
}

/// Reads and applies [`Provisioning`] values on the source and target tables.
#[derive(Debug, Clone)]
pub struct Provisioner {
    source: TableService,
    target: TableService,
}

impl Provisioner {
    pub fn new(source: TableService, target: TableService) -> Self {
        Self { source, target }
    }

    /// Returns the current provisioning of both tables, source first.
    pub async fn fetch(&self) -> Result<Provisioning> {
        let source = self.source.describe().await?;
        let target = self.target.describe().await?;

        Ok(Provisioning {
            source: source.provisioned_capacity(),
            target: target.provisioned_capacity(),
        })
    }

    /// Applies `provisioning` to each table whose current capacity differs.
    ///
    /// The current values are re-fetched first. The source is updated before the
    /// target and nothing is rolled back: a target failure leaves the source
    /// change in place.
    pub async fn update(&self, provisioning: Provisioning) -> Result<Provisioning> {
        let current = self.fetch().await?;

        if let Some(capacity) = changed(current.source, provisioning.source) {
            self.source.update_capacity(capacity).await?;
            info!("updated source table {}: {capacity}", self.source.table_name());
        }

        if let Some(capacity) = changed(current.target, provisioning.target) {
            self.target.update_capacity(capacity).await?;
            info!("updated target table {}: {capacity}", self.target.table_name());
        }

        Ok(provisioning)
    }
}

fn changed(current: Option<Capacity>, requested: Option<Capacity>) -> Option<Capacity> {
    match (current, requested) {
        (Some(current), Some(requested)) if current != requested => Some(requested),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::dynamodb::BillingMode;
    use crate::error::{CopyError, StoreFault};
    use crate::retry::tests::NoopBackoff;
    use crate::tests::fake::FakeStore;
    use std::sync::Arc;

    fn provisioner(store: &Arc<FakeStore>) -> Provisioner {
        let backoff = Arc::new(NoopBackoff::default());
        let config = RetryConfig::default();
        Provisioner::new(
            TableService::new("source", store.clone(), backoff.clone(), &config),
            TableService::new("target", store.clone(), backoff, &config),
        )
    }

    fn provisioned(read: u64, write: u64) -> Option<Capacity> {
        Some(Capacity::new(read, write))
    }

    #[test]
    fn test_policy_raises_source_read_only() {
        let minimums = CapacityMinimums { read: 20, write: 20 };
        let current = Provisioning {
            source: provisioned(10, 10),
            target: provisioned(5, 30),
        };

        let boosted = minimums.policy(current);

        assert_eq!(boosted.source, provisioned(20, 10));
        assert_eq!(boosted.target, provisioned(5, 30));
    }

    #[test]
    fn test_policy_raises_target_write_only() {
        let minimums = CapacityMinimums { read: 1, write: 50 };
        let current = Provisioning {
            source: provisioned(10, 10),
            target: provisioned(5, 30),
        };

        let boosted = minimums.policy(current);

        assert_eq!(boosted.source, provisioned(10, 10));
        assert_eq!(boosted.target, provisioned(5, 50));
    }

    #[test]
    fn test_policy_never_lowers_or_manufactures_capacity() {
        let currents = [
            Provisioning::default(),
            Provisioning {
                source: provisioned(1, 1),
                target: None,
            },
            Provisioning {
                source: None,
                target: provisioned(300, 400),
            },
            Provisioning {
                source: provisioned(100, 7),
                target: provisioned(9, 100),
            },
        ];

        for read in [0, 1, 50, 1000] {
            for write in [0, 1, 50, 1000] {
                let minimums = CapacityMinimums { read, write };
                for current in currents {
                    let boosted = minimums.policy(current);
                    assert_eq!(boosted.source.is_some(), current.source.is_some());
                    assert_eq!(boosted.target.is_some(), current.target.is_some());
                    for (before, after) in [
                        (current.source, boosted.source),
                        (current.target, boosted.target),
                    ] {
                        if let (Some(before), Some(after)) = (before, after) {
                            assert!(after.read >= before.read);
                            assert!(after.write >= before.write);
                        }
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_projects_only_provisioned_tables() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::Provisioned, provisioned(10, 5));
        store.add_table("target", BillingMode::OnDemand, provisioned(0, 0));

        let current = provisioner(&store).fetch().await.unwrap();

        assert_eq!(
            current,
            Provisioning {
                source: provisioned(10, 5),
                target: None,
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_fails_on_source_before_target() {
        let store = Arc::new(FakeStore::default());
        store.add_table("target", BillingMode::Provisioned, provisioned(1, 1));

        let err = provisioner(&store).fetch().await.unwrap_err();

        assert!(err.to_string().contains("table source"));
    }

    #[tokio::test]
    async fn test_update_is_noop_when_unchanged() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::Provisioned, provisioned(10, 5));
        store.add_table("target", BillingMode::Provisioned, provisioned(3, 4));

        let requested = Provisioning {
            source: provisioned(10, 5),
            target: provisioned(3, 4),
        };
        let applied = provisioner(&store).update(requested).await.unwrap();

        assert_eq!(applied, requested);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_skips_on_demand_sides() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::OnDemand, None);
        store.add_table("target", BillingMode::Provisioned, provisioned(3, 4));

        provisioner(&store)
            .update(Provisioning {
                source: provisioned(100, 100),
                target: None,
            })
            .await
            .unwrap();

        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_source_then_target() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::Provisioned, provisioned(10, 5));
        store.add_table("target", BillingMode::Provisioned, provisioned(3, 4));

        provisioner(&store)
            .update(Provisioning {
                source: provisioned(20, 5),
                target: provisioned(3, 40),
            })
            .await
            .unwrap();

        assert_eq!(
            store.updates(),
            vec![
                ("source".to_string(), Capacity::new(20, 5)),
                ("target".to_string(), Capacity::new(3, 40)),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_source_failure_skips_target() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::Provisioned, provisioned(10, 5));
        store.add_table("target", BillingMode::Provisioned, provisioned(3, 4));
        store.fail_updates("source", StoreFault::service(Some("LimitExceededException"), "no"));

        let err = provisioner(&store)
            .update(Provisioning {
                source: provisioned(20, 5),
                target: provisioned(3, 40),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::Store { .. }));
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_target_failure_keeps_source_change() {
        let store = Arc::new(FakeStore::default());
        store.add_table("source", BillingMode::Provisioned, provisioned(10, 5));
        store.add_table("target", BillingMode::Provisioned, provisioned(3, 4));
        store.fail_updates("target", StoreFault::service(Some("LimitExceededException"), "no"));

        let result = provisioner(&store)
            .update(Provisioning {
                source: provisioned(20, 5),
                target: provisioned(3, 40),
            })
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.updates(),
            vec![("source".to_string(), Capacity::new(20, 5))]
        );
        let current = provisioner(&store).fetch().await.unwrap();
        assert_eq!(current.source, provisioned(20, 5));
    }
}
