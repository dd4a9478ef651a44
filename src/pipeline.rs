//! Upload and lint flows
//!
//! Ties the modules together: validation runs to completion before the first
//! upload byte moves, and lint dispatch never falls back to local execution
//! when provisioning fails.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::artifact::{ManifestError, ManifestReader};
use crate::component::{self, ComponentError, ComponentSpec};
use crate::environment::{
    self, EnvironmentError, ExecutionMode, InstanceConfig, Provisioner,
};
use crate::lint::{self, LintError, LintStatus};
use crate::publish;
use crate::report::{ReportEvent, Reporter};
use crate::store::{NotifyPrimitive, PublishError, PublishResult, TransportError, UploadPrimitive};
use crate::upload::{self, CancelFlag};

/// Exit code classes
pub const EXIT_OK: i32 = 0;
/// Validation or other user error
pub const EXIT_USAGE: i32 = 1;
/// Transport, publish or environment failure
pub const EXIT_EXTERNAL: i32 = 2;
/// Linter findings of error severity
pub const EXIT_LINT: i32 = 3;
/// Interrupted by the user
pub const EXIT_CANCELLED: i32 = 130;

/// Name given to provisioned lint instances
pub const LINT_INSTANCE_NAME: &str = "cargohold-linter";

/// Errors from the upload and lint flows
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("'{0}' is not a valid file")]
    InvalidArtifact(PathBuf),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Lint(#[from] LintError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Map an error to its process exit code class
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Transport(TransportError::Cancelled) => EXIT_CANCELLED,
            PipelineError::InvalidArtifact(_)
            | PipelineError::Manifest(_)
            | PipelineError::Component(_) => EXIT_USAGE,
            PipelineError::Transport(_)
            | PipelineError::Publish(_)
            | PipelineError::Environment(_)
            | PipelineError::Lint(_)
            | PipelineError::Io(_) => EXIT_EXTERNAL,
        }
    }
}

/// Caller input for the upload flow
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub artifact: PathBuf,
    /// Channels to release to, in order; empty means upload only
    pub channels: Vec<String>,
    /// Components supplied as `name=path` pairs
    pub components: Vec<ComponentSpec>,
}

/// Upload an artifact and its components, then publish the revision.
///
/// Order: read metadata, reconcile the component sets, upload main file then
/// components, notify. A reconciliation failure leaves the store untouched.
pub fn upload_flow(
    options: &UploadOptions,
    manifest_reader: &dyn ManifestReader,
    transport: &dyn UploadPrimitive,
    notifier: &dyn NotifyPrimitive,
    reporter: &dyn Reporter,
    cancel: &CancelFlag,
) -> Result<PublishResult, PipelineError> {
    let artifact = &options.artifact;
    if !artifact.is_file() {
        return Err(PipelineError::InvalidArtifact(artifact.clone()));
    }

    let metadata = manifest_reader.read_metadata(artifact)?;
    debug!(
        artifact = %metadata.name,
        components = metadata.declared_components.len(),
        "read artifact metadata"
    );

    let base_dir = artifact.parent().unwrap_or(Path::new("."));
    component::reconcile(
        &metadata.name,
        &metadata.declared_components,
        &options.components,
        base_dir,
    )?;

    let (main_handle, component_handles) = upload::upload_all(
        artifact,
        &options.components,
        base_dir,
        transport,
        reporter,
        cancel,
    )?;

    let request =
        publish::build_request(&metadata, &options.channels, main_handle, component_handles);
    let result = publish::publish(&request, notifier)?;

    reporter.report(ReportEvent::Message(publish::success_message(
        &result, &request,
    )));
    Ok(result)
}

/// Caller input for the lint flow
#[derive(Debug, Clone)]
pub struct LintOptions {
    pub artifact: PathBuf,
    /// Run on the host even when not inside a managed instance
    pub force_host: bool,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    /// Image for the provisioned instance
    pub instance_image: String,
}

/// Lint an artifact, locally or inside a provisioned instance.
///
/// Returns the aggregated lint status; provisioning failures are fatal.
pub fn lint_flow(
    options: &LintOptions,
    manifest_reader: &dyn ManifestReader,
    provisioner: &dyn Provisioner,
    reporter: &dyn Reporter,
) -> Result<LintStatus, PipelineError> {
    let artifact = &options.artifact;
    if !artifact.is_file() {
        return Err(PipelineError::InvalidArtifact(artifact.clone()));
    }

    let mode = environment::decide(
        environment::is_managed_mode(),
        options.force_host || environment::host_forced_by_env(),
    );
    match mode {
        ExecutionMode::RunLocal => {
            debug!("linting on the host");
            lint_locally(artifact, manifest_reader, reporter)
        }
        ExecutionMode::RunInProvisionedEnvironment => {
            debug!("linting inside a provisioned instance");
            lint_in_instance(options, provisioner, reporter)
        }
    }
}

fn lint_locally(
    artifact: &Path,
    manifest_reader: &dyn ManifestReader,
    reporter: &dyn Reporter,
) -> Result<LintStatus, PipelineError> {
    let metadata = manifest_reader.read_metadata(artifact)?;

    let scratch = tempfile::tempdir()?;
    manifest_reader.unpack(artifact, scratch.path())?;

    let issues = lint::run_linters(scratch.path(), &metadata)?;
    for issue in &issues {
        reporter.report(ReportEvent::Message(issue.to_string()));
    }

    let status = lint::status(&issues);
    let summary = match status {
        LintStatus::Ok => format!("'{}' is clean", metadata.name),
        LintStatus::Warnings => format!("'{}' has lint warnings", metadata.name),
        LintStatus::Errors => format!("'{}' has lint errors", metadata.name),
    };
    reporter.report(ReportEvent::Message(summary));
    Ok(status)
}

fn lint_in_instance(
    options: &LintOptions,
    provisioner: &dyn Provisioner,
    reporter: &dyn Reporter,
) -> Result<LintStatus, PipelineError> {
    let artifact = &options.artifact;
    let file_name = artifact
        .file_name()
        .ok_or_else(|| PipelineError::InvalidArtifact(artifact.clone()))?;

    let config = InstanceConfig {
        instance_name: LINT_INSTANCE_NAME.to_string(),
        image: options.instance_image.clone(),
        http_proxy: options.http_proxy.clone(),
        https_proxy: options.https_proxy.clone(),
    };

    reporter.report(ReportEvent::Message("Launching instance...".to_string()));
    let instance = provisioner.launch(&config)?;

    let dest = Path::new("/root").join(file_name);
    instance.push_file(artifact, &dest)?;

    // Recurse into the same command inside the instance; its managed-mode
    // env var makes the inner invocation run locally.
    let argv = vec![
        "cargohold".to_string(),
        "lint".to_string(),
        dest.display().to_string(),
    ];
    let status = instance.execute(&argv)?;

    match status {
        EXIT_OK => Ok(LintStatus::Ok),
        EXIT_LINT => Ok(LintStatus::Errors),
        other => Err(PipelineError::Environment(EnvironmentError::Exec {
            name: config.instance_name,
            argv,
            reason: format!("exited with status {other}"),
        })),
    }
}
