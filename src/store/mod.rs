//! Store primitives
//!
//! The store wire protocol stays behind two narrow traits: single-file
//! upload and publish notification. [`DirectoryStore`] is the file-backed
//! backend used for local development and the integration tests; a remote
//! backend implements the same pair.

mod directory;

pub use directory::DirectoryStore;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque token for a pending upload.
///
/// Created by the store backend for each uploaded file and consumed exactly
/// once when the upload is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHandle {
    /// Store-side pending-upload identifier
    pub upload_id: String,
    /// Hex SHA-256 digest of the uploaded bytes
    pub sha256: String,
    /// Uploaded size in bytes
    pub size_bytes: u64,
}

/// Errors from the single-file upload primitive
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store rejected upload of {path}: {reason}")]
    Rejected { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("upload cancelled")]
    Cancelled,
}

/// Single-file upload primitive.
///
/// `on_progress` receives cumulative bytes transferred for the current file
/// only; a new file starts the count over from zero.
pub trait UploadPrimitive {
    fn upload(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<UploadHandle, TransportError>;
}

/// Errors from the publish notification primitive
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("store refused to publish '{artifact}': {reason}")]
    Refused { artifact: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed revision index: {0}")]
    RevisionIndex(#[from] serde_json::Error),
}

/// Everything the store needs to turn pending uploads into a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Artifact name from the embedded manifest
    pub artifact_name: String,
    /// Handle for the main artifact file
    pub main_upload: UploadHandle,
    /// Build timestamp from the manifest, if recorded
    pub built_at: Option<DateTime<Utc>>,
    /// Channels to release to, in caller order (not deduplicated)
    pub channels: Vec<String>,
    /// Main artifact size in bytes
    pub size_bytes: u64,
    /// Handles for the uploaded components, keyed by declared name
    pub components: BTreeMap<String, UploadHandle>,
}

/// Store-assigned identifier for a published artifact version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub revision: u64,
}

/// Publish notification primitive
pub trait NotifyPrimitive {
    fn notify(&self, request: &PublishRequest) -> Result<PublishResult, PublishError>;
}
