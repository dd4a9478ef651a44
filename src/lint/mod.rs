//! Built-in linters
//!
//! Linters run over an unpacked artifact tree plus its metadata and report
//! issues with a severity. Error-severity findings map to the dedicated
//! lint exit-code class; warnings are reported but do not fail the command.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::ArtifactMetadata;

/// Issue severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single linter finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// Which linter reported it
    pub linter: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Offending path inside the artifact tree, when one applies
    pub path: Option<PathBuf>,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.severity.as_str(),
            self.linter,
            self.message
        )?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}

/// Aggregated result of a lint run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintStatus {
    Ok,
    Warnings,
    Errors,
}

/// Errors while walking the unpacked tree
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("failed to scan artifact tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run all built-in linters over an unpacked artifact tree
pub fn run_linters(
    root: &Path,
    metadata: &ArtifactMetadata,
) -> Result<Vec<LintIssue>, LintError> {
    let mut issues = Vec::new();
    lint_metadata(metadata, &mut issues);
    lint_stray_components(root, metadata, &mut issues);
    lint_permissions(root, &mut issues)?;
    Ok(issues)
}

/// Aggregate findings into the overall status
pub fn status(issues: &[LintIssue]) -> LintStatus {
    match issues.iter().map(|i| i.severity).max() {
        Some(Severity::Error) => LintStatus::Errors,
        Some(Severity::Warning) => LintStatus::Warnings,
        None => LintStatus::Ok,
    }
}

/// Manifest completeness checks
fn lint_metadata(metadata: &ArtifactMetadata, issues: &mut Vec<LintIssue>) {
    if !metadata
        .name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        issues.push(LintIssue {
            linter: "metadata",
            severity: Severity::Error,
            message: format!(
                "artifact name '{}' may only contain lowercase letters, digits and dashes",
                metadata.name
            ),
            path: None,
        });
    }

    if metadata.built_at.is_none() {
        issues.push(LintIssue {
            linter: "metadata",
            severity: Severity::Warning,
            message: "manifest has no build-started-at timestamp".to_string(),
            path: None,
        });
    }
}

/// Component directories in the tree must be backed by manifest declarations
fn lint_stray_components(root: &Path, metadata: &ArtifactMetadata, issues: &mut Vec<LintIssue>) {
    if !metadata.declared_components.is_empty() {
        return;
    }

    let Ok(entries) = fs::read_dir(root.join("components")) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            let name = entry.file_name().to_string_lossy().into_owned();
            issues.push(LintIssue {
                linter: "metadata",
                severity: Severity::Warning,
                message: format!(
                    "tree has component directory '{name}' but the manifest declares no components"
                ),
                path: Some(Path::new("components").join(entry.file_name())),
            });
        }
    }
}

/// File permission checks over the unpacked tree
fn lint_permissions(root: &Path, issues: &mut Vec<LintIssue>) -> Result<(), LintError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        use walkdir::WalkDir;

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let mode = entry.metadata()?.permissions().mode();

            if mode & 0o002 != 0 {
                issues.push(LintIssue {
                    linter: "permissions",
                    severity: Severity::Error,
                    message: "file is world-writable".to_string(),
                    path: Some(rel.clone()),
                });
            }
            if mode & 0o6000 != 0 {
                issues.push(LintIssue {
                    linter: "permissions",
                    severity: Severity::Error,
                    message: "file has setuid/setgid bits set".to_string(),
                    path: Some(rel),
                });
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (root, &issues);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::fs;

    fn metadata(name: &str, with_timestamp: bool) -> ArtifactMetadata {
        ArtifactMetadata {
            name: name.to_string(),
            declared_components: BTreeSet::new(),
            built_at: with_timestamp.then(Utc::now),
        }
    }

    #[test]
    fn clean_tree_and_complete_manifest_pass() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin"), b"ok").unwrap();
        let issues = run_linters(dir.path(), &metadata("good-name", true)).unwrap();
        assert!(issues.is_empty());
        assert_eq!(status(&issues), LintStatus::Ok);
    }

    #[test]
    fn missing_timestamp_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let issues = run_linters(dir.path(), &metadata("good-name", false)).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(status(&issues), LintStatus::Warnings);
    }

    #[test]
    fn invalid_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let issues = run_linters(dir.path(), &metadata("Bad_Name", true)).unwrap();
        assert_eq!(status(&issues), LintStatus::Errors);
    }

    #[cfg(unix)]
    #[test]
    fn world_writable_file_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("loose");
        fs::write(&file, b"x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o666)).unwrap();

        let issues = run_linters(dir.path(), &metadata("good-name", true)).unwrap();
        assert_eq!(status(&issues), LintStatus::Errors);
        let issue = issues
            .iter()
            .find(|i| i.linter == "permissions")
            .expect("permissions issue");
        assert_eq!(issue.path.as_deref(), Some(Path::new("loose")));
    }

    #[test]
    fn stray_component_dir_without_declarations_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/extra")).unwrap();

        let issues = run_linters(dir.path(), &metadata("good-name", true)).unwrap();
        assert_eq!(status(&issues), LintStatus::Warnings);
        let issue = issues
            .iter()
            .find(|i| i.message.contains("component directory 'extra'"))
            .expect("stray component warning");
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(
            issue.path.as_deref(),
            Some(Path::new("components/extra"))
        );
    }

    #[test]
    fn component_dirs_backed_by_declarations_pass() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/extra")).unwrap();

        let mut meta = metadata("good-name", true);
        meta.declared_components.insert("extra".to_string());

        let issues = run_linters(dir.path(), &meta).unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn loose_files_under_components_are_not_flagged() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/readme"), b"x").unwrap();

        let issues = run_linters(dir.path(), &metadata("good-name", true)).unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn issue_rendering_includes_severity_and_linter() {
        let issue = LintIssue {
            linter: "metadata",
            severity: Severity::Warning,
            message: "something".to_string(),
            path: None,
        };
        assert_eq!(issue.to_string(), "warning: metadata: something");
    }
}
