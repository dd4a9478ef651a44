//! Squashfs-backed manifest reader
//!
//! Extracts `meta/artifact.yaml` (or the full tree, for linting) by shelling
//! out to `unsquashfs` into a scratch directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{ArtifactMetadata, ManifestError, ManifestReader, MANIFEST_PATH};

/// On-disk manifest schema
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: String,
    #[serde(default)]
    components: BTreeMap<String, serde_yaml::Value>,
    #[serde(rename = "build-started-at")]
    build_started_at: Option<DateTime<Utc>>,
}

/// Manifest reader for squashfs artifact images
#[derive(Debug, Default)]
pub struct SquashfsManifestReader;

impl SquashfsManifestReader {
    pub fn new() -> Self {
        Self
    }

    /// Run `unsquashfs -force -dest <dest> <artifact> [paths...]`
    fn unsquash(
        &self,
        artifact: &Path,
        dest: &Path,
        paths: &[&str],
    ) -> Result<(), ManifestError> {
        let mut command = Command::new("unsquashfs");
        command
            .arg("-force")
            .arg("-dest")
            .arg(dest)
            .arg(artifact)
            .args(paths);

        debug!(artifact = %artifact.display(), "extracting squashfs image");
        let output = command.output().map_err(|source| ManifestError::Io {
            path: artifact.to_path_buf(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ManifestError::Unpack {
                path: artifact.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl ManifestReader for SquashfsManifestReader {
    fn read_metadata(&self, artifact: &Path) -> Result<ArtifactMetadata, ManifestError> {
        if !artifact.is_file() {
            return Err(ManifestError::NotAFile(artifact.to_path_buf()));
        }

        let scratch = tempfile::tempdir().map_err(|source| ManifestError::Io {
            path: artifact.to_path_buf(),
            source,
        })?;
        self.unsquash(artifact, scratch.path(), &[MANIFEST_PATH])?;

        let manifest_file = scratch.path().join(MANIFEST_PATH);
        if !manifest_file.is_file() {
            return Err(ManifestError::MissingManifest {
                path: artifact.to_path_buf(),
            });
        }

        let data = fs::read_to_string(&manifest_file).map_err(|source| ManifestError::Io {
            path: artifact.to_path_buf(),
            source,
        })?;
        let raw: RawManifest =
            serde_yaml::from_str(&data).map_err(|source| ManifestError::Malformed {
                path: artifact.to_path_buf(),
                source,
            })?;

        Ok(ArtifactMetadata {
            name: raw.name,
            declared_components: raw.components.into_keys().collect(),
            built_at: raw.build_started_at,
        })
    }

    fn unpack(&self, artifact: &Path, dest: &Path) -> Result<(), ManifestError> {
        if !artifact.is_file() {
            return Err(ManifestError::NotAFile(artifact.to_path_buf()));
        }
        self.unsquash(artifact, dest, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_yaml_parses_name_components_and_timestamp() {
        let raw: RawManifest = serde_yaml::from_str(
            "name: my-artifact\n\
             components:\n\
             \x20 comp-a: {}\n\
             \x20 comp-b: {}\n\
             build-started-at: 2024-03-01T12:00:00Z\n",
        )
        .unwrap();
        assert_eq!(raw.name, "my-artifact");
        assert_eq!(
            raw.components.keys().collect::<Vec<_>>(),
            vec!["comp-a", "comp-b"]
        );
        assert!(raw.build_started_at.is_some());
    }

    #[test]
    fn manifest_yaml_defaults_optional_fields() {
        let raw: RawManifest = serde_yaml::from_str("name: bare\n").unwrap();
        assert!(raw.components.is_empty());
        assert!(raw.build_started_at.is_none());
    }

    #[test]
    fn missing_artifact_file_is_rejected() {
        let reader = SquashfsManifestReader::new();
        let err = reader
            .read_metadata(Path::new("/nonexistent/artifact.sq"))
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotAFile(_)));
    }
}
