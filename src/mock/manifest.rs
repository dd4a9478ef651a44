//! In-memory manifest reader

use std::path::Path;

use crate::artifact::{ArtifactMetadata, ManifestError, ManifestReader};

/// Manifest reader returning fixed metadata, no squashfs involved.
///
/// `unpack` is a no-op; lint tests that need tree contents write them into
/// the destination directory themselves.
#[derive(Debug, Clone)]
pub struct MockManifestReader {
    metadata: ArtifactMetadata,
    failure: Option<String>,
}

impl MockManifestReader {
    pub fn new(metadata: ArtifactMetadata) -> Self {
        Self {
            metadata,
            failure: None,
        }
    }

    /// Make every read fail as an unpack error with this reason
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }
}

impl ManifestReader for MockManifestReader {
    fn read_metadata(&self, artifact: &Path) -> Result<ArtifactMetadata, ManifestError> {
        match &self.failure {
            Some(reason) => Err(ManifestError::Unpack {
                path: artifact.to_path_buf(),
                reason: reason.clone(),
            }),
            None => Ok(self.metadata.clone()),
        }
    }

    fn unpack(&self, artifact: &Path, _dest: &Path) -> Result<(), ManifestError> {
        match &self.failure {
            Some(reason) => Err(ManifestError::Unpack {
                path: artifact.to_path_buf(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}
