//! Byte transfer plumbing shared by uploads and downloads.

pub mod download;
pub mod monitor;
pub mod progress;
pub mod progress_stream;

use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// Owned byte stream handed between collaborators
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

pub use monitor::{run_monitored, MonitorOptions};
pub use progress::{format_bytes, format_duration, format_speed};
pub use progress_stream::ProgressStream;
