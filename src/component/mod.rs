//! Component validation and reconciliation
//!
//! An artifact's manifest declares the named components that must accompany
//! it to the store. The caller supplies `name=path` pairs on the command
//! line; this module checks that the two sets match exactly, and that every
//! referenced file exists, before any upload begins.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A named component file supplied by the caller.
///
/// Equality and uniqueness are by `name`; the path is kept relative and
/// resolved against the artifact's directory at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Component name as declared in the artifact manifest
    pub name: String,
    /// File path relative to the artifact's directory
    pub path: PathBuf,
}

impl ComponentSpec {
    /// Create a component spec from a name and a relative path
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Resolve the component file against the artifact's directory
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.path)
    }
}

/// Errors for component option parsing and reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("the component format must be <name>=<filename>, got '{0}'")]
    InvalidOption(String),

    #[error("component '{0}' was provided more than once")]
    Duplicate(String),

    #[error(
        "artifact '{artifact}' has components but no component files were provided. \
         Use `--component <name>=<filename>`."
    )]
    MissingComponentFiles { artifact: String },

    #[error("component '{0}' is missing")]
    MissingComponent(String),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("artifact '{artifact}' declares no components but component files were provided")]
    UnexpectedComponents { artifact: String },

    #[error("component file {0} does not exist")]
    FileNotFound(PathBuf),
}

/// Parse a `name=path` component option into a [`ComponentSpec`].
///
/// Whitespace around either part is trimmed; empty parts are rejected. Pure
/// function so it can back any CLI layer's value parser.
pub fn parse_component_option(value: &str) -> Result<ComponentSpec, ComponentError> {
    let parts: Vec<&str> = value
        .split('=')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [name, path] => Ok(ComponentSpec::new(*name, *path)),
        _ => Err(ComponentError::InvalidOption(value.to_string())),
    }
}

/// Validate provided components against the manifest's declared set.
///
/// Reports the first violated invariant. On success the caller may upload
/// the provided list as-is, in its original order.
///
/// Checks, in order:
/// - duplicates in `provided` (ambiguous name-to-file mapping)
/// - declared non-empty but nothing provided
/// - declared names with no provided counterpart
/// - provided names not declared anywhere
/// - provided files resolvable to an existing regular file under `base_dir`
pub fn reconcile(
    artifact: &str,
    declared: &BTreeSet<String>,
    provided: &[ComponentSpec],
    base_dir: &Path,
) -> Result<(), ComponentError> {
    let mut seen = BTreeSet::new();
    for spec in provided {
        if !seen.insert(spec.name.as_str()) {
            return Err(ComponentError::Duplicate(spec.name.clone()));
        }
    }

    if declared.is_empty() {
        if provided.is_empty() {
            return Ok(());
        }
        return Err(ComponentError::UnexpectedComponents {
            artifact: artifact.to_string(),
        });
    }

    if provided.is_empty() {
        return Err(ComponentError::MissingComponentFiles {
            artifact: artifact.to_string(),
        });
    }

    for name in declared {
        if !provided.iter().any(|spec| &spec.name == name) {
            return Err(ComponentError::MissingComponent(name.clone()));
        }
    }

    for spec in provided {
        if !declared.contains(&spec.name) {
            return Err(ComponentError::UnknownComponent(spec.name.clone()));
        }

        let resolved = spec.resolve(base_dir);
        if !resolved.is_file() {
            return Err(ComponentError::FileNotFound(resolved));
        }
    }

    Ok(())
}
