//! Insert-or-fetch against a unique index.
//!
//! No in-process locks guard the tables. An insert that collides with a
//! row written by a concurrent caller is rolled back to its savepoint and
//! the row is read back once. A collision whose row cannot be read back is
//! a genuine storage failure and is surfaced.

use tracing::{debug, warn};

use dagvault_store::{StoreResult, StoreTx};

use crate::error::CoreResult;

/// Outcome of [`insert_or_fetch`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Claim<T> {
    /// This caller's insert was applied.
    Inserted,
    /// A matching row already existed.
    Existing(T),
}

/// Run `insert` inside a savepoint. On a unique violation, roll back and
/// return the row found by `refetch`.
pub(crate) fn insert_or_fetch<T>(
    tx: &mut dyn StoreTx,
    insert: impl FnOnce(&mut dyn StoreTx) -> StoreResult<()>,
    refetch: impl FnOnce(&dyn StoreTx) -> StoreResult<Option<T>>,
) -> CoreResult<Claim<T>> {
    let savepoint = tx.savepoint();
    match insert(&mut *tx) {
        Ok(()) => Ok(Claim::Inserted),
        Err(err) if err.is_unique_violation() => {
            tx.rollback_to(savepoint)?;
            debug!(error = %err, "insert collided; re-reading");
            match refetch(&*tx)? {
                Some(existing) => Ok(Claim::Existing(existing)),
                None => Err(err.into()),
            }
        }
        Err(err) => {
            // The insert error is the one worth reporting.
            if let Err(rollback) = tx.rollback_to(savepoint) {
                warn!(error = %err, rollback = %rollback, "savepoint rollback failed");
            }
            Err(err.into())
        }
    }
}
