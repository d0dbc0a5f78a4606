//! Default-promotion invariant manager
//!
//! The single place that mutates `is_default` across a bucket. Invariant:
//! within one (tenant, template_type, specialty) bucket at most one active
//! template is the default at any observable instant. The unset-then-write
//! sequence runs inside one store transaction; a concurrent promotion over
//! the same bucket surfaces as `TransactionConflict` and may be retried by
//! the caller.

use tracing::{debug, info};

use crate::definition::TemplateDefinition;
use crate::error::TemplateError;
use crate::ports::{DefaultBucket, TemplateStore, WriteStamp};

/// Persist `def` with `is_default = true`, demoting every other active
/// default in its bucket inside one transaction. `def` must already carry
/// the final field values, including updated stamps.
pub async fn promote(
    store: &dyn TemplateStore,
    def: TemplateDefinition,
    stamp: WriteStamp,
) -> Result<(), TemplateError> {
    debug_assert!(def.is_default && def.is_active);
    let bucket = DefaultBucket::of(&def);
    let target = def.id;

    let mut txn = store.begin().await?;
    let outcome = async {
        let demoted = txn.clear_other_defaults(&bucket, target, &stamp).await?;
        if demoted > 0 {
            debug!(
                template_id = %target,
                demoted,
                template_type = bucket.template_type.as_str(),
                "demoted previous bucket defaults"
            );
        }
        txn.put(def).await
    }
    .await;

    match outcome {
        Ok(()) => {
            txn.commit().await?;
            info!(
                template_id = %target,
                tenant_id = %bucket.tenant_id,
                template_type = bucket.template_type.as_str(),
                specialty = bucket.specialty.as_deref().unwrap_or("-"),
                "promoted bucket default"
            );
            Ok(())
        }
        Err(err) => {
            // Roll back so no partial promotion is observable. The rollback
            // error, if any, is secondary to the original failure.
            let _ = txn.rollback().await;
            Err(err.into())
        }
    }
}

/// Persist a non-default create/update without touching the rest of the
/// bucket. Kept next to `promote` so every template write path lives here.
pub async fn write_plain(
    store: &dyn TemplateStore,
    def: TemplateDefinition,
    is_new: bool,
) -> Result<(), TemplateError> {
    if is_new {
        store.insert(def).await?;
    } else {
        store.update(def).await?;
    }
    Ok(())
}
