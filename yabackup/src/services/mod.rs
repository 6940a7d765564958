//! Background work: the upload pass and its schedule.

pub mod restore;
pub mod scheduler;
pub mod upload_task;

pub use restore::RestoreService;
pub use scheduler::BackupScheduler;
pub use upload_task::{RunOutcome, UploadReport, UploadTask};
