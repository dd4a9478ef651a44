//! Progress and message reporting
//!
//! The core stays silent: everything user-facing goes through the
//! [`Reporter`] trait so the library is testable and rendering lives in one
//! adapter. [`ConsoleReporter`] renders text and progress bars;
//! [`NullReporter`] swallows everything.

mod console;

pub use console::{ConsoleReporter, ProgressMode};

use std::path::PathBuf;

/// Events emitted by the upload and lint flows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A single-file upload is starting; length is unknown for
    /// non-regular files
    UploadStarted {
        path: PathBuf,
        total_bytes: Option<u64>,
    },
    /// Cumulative bytes transferred for the file currently uploading
    UploadProgress { bytes: u64 },
    /// The current file's upload ended (successfully or not)
    UploadFinished { path: PathBuf },
    /// Human-readable status line
    Message(String),
}

/// Rendering seam for user-facing output
pub trait Reporter {
    fn report(&self, event: ReportEvent);
}

/// Reporter that discards all events
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: ReportEvent) {}
}
