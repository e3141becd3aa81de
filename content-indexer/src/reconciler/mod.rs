//! Periodic full reconciliation of the search indices with the primary store.

mod full_sync;
mod scheduler;

pub use full_sync::{IndexSyncReport, ReconciliationReport, Reconciler};
pub use scheduler::{SyncRunner, SyncScheduler};
