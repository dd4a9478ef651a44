//! File-backed store backend
//!
//! Pending uploads live under `<root>/incoming/`, published revisions under
//! `<root>/revisions/<name>/<rev>/`, and the revision index in
//! `<root>/revisions.json`. The backend copies uploads in fixed-size chunks
//! so the progress callback contract is exercised for real.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    NotifyPrimitive, PublishError, PublishRequest, PublishResult, TransportError, UploadHandle,
    UploadPrimitive,
};
use crate::upload::CancelFlag;

/// Copy chunk size; one progress callback per chunk
const CHUNK_SIZE: usize = 64 * 1024;

/// One published revision in `revisions.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub artifact: String,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub built_at: Option<DateTime<Utc>>,
    pub channels: Vec<String>,
    pub size_bytes: u64,
    pub sha256: String,
    pub components: std::collections::BTreeMap<String, String>,
}

/// File-backed store rooted at a local directory
pub struct DirectoryStore {
    root: PathBuf,
    cancel: Option<CancelFlag>,
}

impl DirectoryStore {
    /// Create a store rooted at `root`; directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cancel: None,
        }
    }

    /// Attach a cancellation flag checked between copy chunks
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn incoming_dir(&self) -> PathBuf {
        self.root.join("incoming")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("revisions.json")
    }

    fn load_index(&self) -> Result<Vec<RevisionRecord>, PublishError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn store_index(&self, records: &[RevisionRecord]) -> Result<(), PublishError> {
        fs::create_dir_all(&self.root)?;
        let data = serde_json::to_string_pretty(records)?;
        fs::write(self.index_path(), data)?;
        Ok(())
    }

    /// Move a pending upload into the revision directory, verifying it exists
    fn claim_upload(
        &self,
        request: &PublishRequest,
        handle: &UploadHandle,
        dest: &Path,
    ) -> Result<(), PublishError> {
        let pending = self.incoming_dir().join(&handle.upload_id);
        if !pending.is_file() {
            return Err(PublishError::Refused {
                artifact: request.artifact_name.clone(),
                reason: format!("unknown upload id '{}'", handle.upload_id),
            });
        }
        fs::rename(pending, dest)?;
        Ok(())
    }
}

impl UploadPrimitive for DirectoryStore {
    fn upload(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<UploadHandle, TransportError> {
        let mut src = File::open(path).map_err(|source| TransportError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let incoming = self.incoming_dir();
        fs::create_dir_all(&incoming)?;

        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let mut dest = File::create(incoming.join(&upload_id))?;

        let mut hasher = Sha256::new();
        let mut buf = [0u8; CHUNK_SIZE];
        let mut transferred = 0u64;

        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                return Err(TransportError::Cancelled);
            }

            let n = src.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            dest.write_all(&buf[..n])?;
            transferred += n as u64;
            on_progress(transferred);
        }
        dest.flush()?;

        Ok(UploadHandle {
            upload_id,
            sha256: hex::encode(hasher.finalize()),
            size_bytes: transferred,
        })
    }
}

impl NotifyPrimitive for DirectoryStore {
    fn notify(&self, request: &PublishRequest) -> Result<PublishResult, PublishError> {
        let mut records = self.load_index()?;

        let revision = records
            .iter()
            .filter(|r| r.artifact == request.artifact_name)
            .map(|r| r.revision)
            .max()
            .unwrap_or(0)
            + 1;

        let revision_dir = self
            .root
            .join("revisions")
            .join(&request.artifact_name)
            .join(revision.to_string());
        fs::create_dir_all(&revision_dir)?;

        let main_dest = revision_dir.join(format!("{}.artifact", request.artifact_name));
        self.claim_upload(request, &request.main_upload, &main_dest)?;

        for (name, handle) in &request.components {
            let dest = revision_dir.join(format!("{name}.component"));
            self.claim_upload(request, handle, &dest)?;
        }

        records.push(RevisionRecord {
            artifact: request.artifact_name.clone(),
            revision,
            created_at: Utc::now(),
            built_at: request.built_at,
            channels: request.channels.clone(),
            size_bytes: request.size_bytes,
            sha256: request.main_upload.sha256.clone(),
            components: request
                .components
                .iter()
                .map(|(name, handle)| (name.clone(), handle.sha256.clone()))
                .collect(),
        });
        self.store_index(&records)?;

        Ok(PublishResult { revision })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn upload_reports_cumulative_progress_and_digest() {
        let scratch = tempfile::tempdir().unwrap();
        let store_root = tempfile::tempdir().unwrap();
        let data = vec![7u8; CHUNK_SIZE + 100];
        let file = write_file(scratch.path(), "art.sq", &data);

        let store = DirectoryStore::new(store_root.path());
        let mut seen = Vec::new();
        let handle = store.upload(&file, &mut |bytes| seen.push(bytes)).unwrap();

        assert_eq!(handle.size_bytes, data.len() as u64);
        assert_eq!(handle.sha256, hex::encode(Sha256::digest(&data)));
        assert_eq!(seen, vec![CHUNK_SIZE as u64, data.len() as u64]);
        assert!(store_root
            .path()
            .join("incoming")
            .join(&handle.upload_id)
            .is_file());
    }

    #[test]
    fn upload_of_missing_file_fails_before_any_write() {
        let store_root = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(store_root.path());
        let err = store
            .upload(Path::new("/nonexistent/file.sq"), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, TransportError::FileRead { .. }));
        assert!(!store_root.path().join("incoming").exists());
    }

    #[test]
    fn cancelled_flag_aborts_upload() {
        let scratch = tempfile::tempdir().unwrap();
        let store_root = tempfile::tempdir().unwrap();
        let file = write_file(scratch.path(), "art.sq", b"data");

        let cancel = CancelFlag::new();
        cancel.cancel();
        let store = DirectoryStore::new(store_root.path()).with_cancel(cancel);

        let err = store.upload(&file, &mut |_| {}).unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[test]
    fn notify_moves_uploads_and_assigns_increasing_revisions() {
        let scratch = tempfile::tempdir().unwrap();
        let store_root = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(store_root.path());

        let main = write_file(scratch.path(), "art.sq", b"main");
        let comp = write_file(scratch.path(), "a.bin", b"comp");

        for expected_revision in 1..=2u64 {
            let main_handle = store.upload(&main, &mut |_| {}).unwrap();
            let comp_handle = store.upload(&comp, &mut |_| {}).unwrap();

            let mut components = BTreeMap::new();
            components.insert("comp-a".to_string(), comp_handle);

            let request = PublishRequest {
                artifact_name: "art".to_string(),
                size_bytes: main_handle.size_bytes,
                main_upload: main_handle,
                built_at: None,
                channels: vec!["edge".to_string()],
                components,
            };

            let result = store.notify(&request).unwrap();
            assert_eq!(result.revision, expected_revision);

            let rev_dir = store_root
                .path()
                .join("revisions/art")
                .join(expected_revision.to_string());
            assert!(rev_dir.join("art.artifact").is_file());
            assert!(rev_dir.join("comp-a.component").is_file());
        }

        let records = store.load_index().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].revision, 2);
        assert_eq!(records[1].channels, vec!["edge".to_string()]);
    }

    #[test]
    fn notify_with_unknown_upload_id_is_refused() {
        let store_root = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(store_root.path());

        let request = PublishRequest {
            artifact_name: "art".to_string(),
            main_upload: UploadHandle {
                upload_id: "bogus".to_string(),
                sha256: String::new(),
                size_bytes: 0,
            },
            built_at: None,
            channels: Vec::new(),
            size_bytes: 0,
            components: BTreeMap::new(),
        };

        let err = store.notify(&request).unwrap_err();
        assert!(matches!(err, PublishError::Refused { .. }));
    }
}
