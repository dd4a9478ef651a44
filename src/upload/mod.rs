//! Sequential upload driver
//!
//! Uploads the main artifact first, then each component in the caller's
//! order, through the injected transport primitive. Uploads are strictly
//! sequential so progress reporting stays linear and the store never sees
//! more than one session from this process. A failure aborts the rest of the
//! sequence; handles already obtained are dropped and left to the store's
//! garbage collection of abandoned pending uploads.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::component::ComponentSpec;
use crate::report::{ReportEvent, Reporter};
use crate::store::{TransportError, UploadHandle, UploadPrimitive};

/// Shared cancellation flag, set from the SIGINT handler.
///
/// Checked before each file and between transport copy chunks; cancellation
/// surfaces as [`TransportError::Cancelled`] with no partial rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the in-flight sequence
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Upload the main file, then each component in input order.
///
/// Returns the main handle plus a name-to-handle mapping covering exactly
/// the uploaded components. Component paths are resolved against `base_dir`
/// (the artifact's directory).
pub fn upload_all(
    main_file: &Path,
    components: &[ComponentSpec],
    base_dir: &Path,
    transport: &dyn UploadPrimitive,
    reporter: &dyn Reporter,
    cancel: &CancelFlag,
) -> Result<(UploadHandle, BTreeMap<String, UploadHandle>), TransportError> {
    let main_handle = upload_one(main_file, transport, reporter, cancel)?;

    let mut component_handles = BTreeMap::new();
    for spec in components {
        let path = spec.resolve(base_dir);
        let handle = upload_one(&path, transport, reporter, cancel)?;
        component_handles.insert(spec.name.clone(), handle);
    }

    Ok((main_handle, component_handles))
}

fn upload_one(
    path: &Path,
    transport: &dyn UploadPrimitive,
    reporter: &dyn Reporter,
    cancel: &CancelFlag,
) -> Result<UploadHandle, TransportError> {
    if cancel.is_cancelled() {
        return Err(TransportError::Cancelled);
    }

    // Length is advisory; the console adapter falls back to an
    // indeterminate indicator when it is unknown.
    let total_bytes = fs::metadata(path).map(|m| m.len()).ok();
    reporter.report(ReportEvent::UploadStarted {
        path: path.to_path_buf(),
        total_bytes,
    });

    debug!(path = %path.display(), "uploading file");
    let mut on_progress = |bytes: u64| {
        reporter.report(ReportEvent::UploadProgress { bytes });
    };
    let result = transport.upload(path, &mut on_progress);

    reporter.report(ReportEvent::UploadFinished {
        path: path.to_path_buf(),
    });
    result
}
