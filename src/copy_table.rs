use tracing::{error, info, warn};

use crate::copier::{Copier, CopySummary};
use crate::error::{CopyError, Result};
use crate::provisioning::{CapacityMinimums, Provisioner, Provisioning};

/// Runs a full copy job: boosts the tables' capacity, copies every item and
/// restores the initial capacity whatever the copy outcome.
///
/// The restore starts only after every copy task has stopped.
pub async fn run_copy_table(
    provisioner: &Provisioner,
    copier: &Copier,
    minimums: CapacityMinimums,
) -> Result<CopySummary> {
    let initial = provisioner.fetch().await?;
    info!("initial provisioning: {}", describe(&initial));

    let boosted = minimums.policy(initial);
    if boosted != initial {
        info!("boosting provisioning to {}", describe(&boosted));
    }

    let outcome = match provisioner.update(boosted).await {
        Ok(_) => copier.copy().await,
        Err(err) => {
            error!("unable to boost provisioning: {err}");
            Err(err)
        }
    };

    let restored = provisioner.update(initial).await;
    match (outcome, restored) {
        (Ok(summary), Ok(_)) => {
            info!("provisioning restored to {}", describe(&initial));
            Ok(summary)
        }
        (Err(err), Ok(_)) => Err(err),
        (outcome, Err(restore_err)) => {
            warn!(
                "unable to restore provisioning to {}: {restore_err}",
                describe(&initial)
            );
            Err(CopyError::Restore {
                source: Box::new(restore_err),
                copy_error: outcome.err().map(Box::new),
            })
        }
    }
}

fn describe(provisioning: &Provisioning) -> String {
    let side = |capacity: Option<crate::dynamodb::Capacity>| {
        capacity.map_or_else(|| "on demand".to_string(), |c| c.to_string())
    };
    format!(
        "source ({}), target ({})",
        side(provisioning.source),
        side(provisioning.target)
    )
}
