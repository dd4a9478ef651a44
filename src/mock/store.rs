//! Mock store with failure injection

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::store::{
    NotifyPrimitive, PublishError, PublishRequest, PublishResult, TransportError, UploadHandle,
    UploadPrimitive,
};

/// One upload observed by the mock, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub path: PathBuf,
    pub handle: UploadHandle,
}

#[derive(Debug, Default)]
struct MockStoreState {
    uploads: Vec<RecordedUpload>,
    notifies: Vec<PublishRequest>,
    upload_calls: u32,
    /// Fail every upload once this many have succeeded
    fail_upload_after: Option<(u32, String)>,
    notify_failure: Option<String>,
    next_revision: u64,
}

/// In-memory store implementing both primitives.
///
/// Uploads read the file for real (so missing files fail like a transport
/// would) and synthesize progress callbacks in four cumulative steps.
#[derive(Debug)]
pub struct MockStore {
    state: Mutex<MockStoreState>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockStoreState {
                next_revision: 1,
                ..MockStoreState::default()
            }),
        }
    }

    /// Let `successes` uploads succeed, then fail every later upload
    pub fn fail_upload_after(&self, successes: u32, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_upload_after = Some((successes, message.into()));
        }
    }

    /// Fail every notify call with the given remote-side reason
    pub fn fail_notify(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.notify_failure = Some(message.into());
        }
    }

    /// Uploads observed so far, in call order
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state
            .lock()
            .map(|state| state.uploads.clone())
            .unwrap_or_default()
    }

    /// Paths of observed uploads, in call order
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.uploads().into_iter().map(|u| u.path).collect()
    }

    /// Publish requests observed so far
    pub fn notifies(&self) -> Vec<PublishRequest> {
        self.state
            .lock()
            .map(|state| state.notifies.clone())
            .unwrap_or_default()
    }
}

impl UploadPrimitive for MockStore {
    fn upload(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<UploadHandle, TransportError> {
        {
            let mut state = self.state.lock().map_err(|_| TransportError::Rejected {
                path: path.to_path_buf(),
                reason: "mock state poisoned".to_string(),
            })?;
            let calls = state.upload_calls;
            state.upload_calls += 1;
            if let Some((successes, message)) = &state.fail_upload_after {
                if calls >= *successes {
                    return Err(TransportError::Rejected {
                        path: path.to_path_buf(),
                        reason: message.clone(),
                    });
                }
            }
        }

        let data = fs::read(path).map_err(|source| TransportError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let total = data.len() as u64;
        // Cumulative progress in four steps, like a chunked copy would report
        for step in 1..=4u64 {
            on_progress(total * step / 4);
        }

        let handle = UploadHandle {
            upload_id: format!("mock-upload-{}", uuid::Uuid::new_v4().simple()),
            sha256: hex::encode(Sha256::digest(&data)),
            size_bytes: total,
        };

        if let Ok(mut state) = self.state.lock() {
            state.uploads.push(RecordedUpload {
                path: path.to_path_buf(),
                handle: handle.clone(),
            });
        }
        Ok(handle)
    }
}

impl NotifyPrimitive for MockStore {
    fn notify(&self, request: &PublishRequest) -> Result<PublishResult, PublishError> {
        let mut state = self.state.lock().map_err(|_| PublishError::Refused {
            artifact: request.artifact_name.clone(),
            reason: "mock state poisoned".to_string(),
        })?;

        if let Some(reason) = &state.notify_failure {
            return Err(PublishError::Refused {
                artifact: request.artifact_name.clone(),
                reason: reason.clone(),
            });
        }

        state.notifies.push(request.clone());
        let revision = state.next_revision;
        state.next_revision += 1;
        Ok(PublishResult { revision })
    }
}
