//! Data model shared by the inventory, reconciliation and transfer stages.

pub mod backup;
pub mod transfer;

pub use backup::{
    AddonInfo, BackupArchiveInfo, BackupFileInfo, GeneralFileInfo, LocalBackupRecord,
    RemoteFileInfo, UNKNOWN_VERSION,
};
pub use transfer::{DeleteCandidate, DiskInfo, NetworkFileInfo, TransferResult, UploadCandidate};
