//! Reconciliation of local and remote inventories, and the transfer plans
//! derived from the merged view.

pub mod reconcile;
pub mod select;

pub use reconcile::{reconcile, remote_file_name};
pub use select::{select_deletions, select_uploads, StoragePolicy};
