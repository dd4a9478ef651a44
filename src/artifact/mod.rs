//! Artifact metadata
//!
//! An artifact is a compressed squashfs filesystem image carrying its own
//! manifest at `meta/artifact.yaml`. Metadata is read once, up front, and is
//! immutable for the rest of the flow.

mod squashfs;

pub use squashfs::SquashfsManifestReader;

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Relative path of the manifest inside the artifact image
pub const MANIFEST_PATH: &str = "meta/artifact.yaml";

/// Metadata extracted from an artifact's embedded manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Artifact name
    pub name: String,
    /// Names of the components the manifest declares; may be empty
    pub declared_components: BTreeSet<String>,
    /// When the build started, if the manifest records it
    pub built_at: Option<DateTime<Utc>>,
}

/// Errors reading an artifact's manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("'{0}' is not a valid file")]
    NotAFile(PathBuf),

    #[error("failed to unpack artifact {path}: {reason}")]
    Unpack { path: PathBuf, reason: String },

    #[error("artifact {path} has no manifest at {MANIFEST_PATH}")]
    MissingManifest { path: PathBuf },

    #[error("malformed manifest in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads artifact metadata and unpacks artifact contents.
///
/// The squashfs implementation shells out to `unsquashfs`; tests substitute
/// an in-memory reader.
pub trait ManifestReader {
    /// Read the embedded manifest of the artifact at `artifact`
    fn read_metadata(&self, artifact: &Path) -> Result<ArtifactMetadata, ManifestError>;

    /// Unpack the artifact's whole filesystem tree into `dest`
    fn unpack(&self, artifact: &Path, dest: &Path) -> Result<(), ManifestError>;
}
