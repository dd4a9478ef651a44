//! Managed-environment dispatch
//!
//! Decides whether a task runs on the host or inside a provisioned instance,
//! and defines the provisioning seam. Provisioning failures are fatal and
//! never downgraded to local execution.

mod lxd;

pub use lxd::LxdProvisioner;

use std::env;
use std::path::Path;

/// Env var marking a process already inside a managed instance
pub const MANAGED_MODE_ENV: &str = "CARGOHOLD_MANAGED_MODE";

/// Env var forcing host execution (`host` opts out of provisioning)
pub const BUILD_ENVIRONMENT_ENV: &str = "CARGOHOLD_BUILD_ENVIRONMENT";

/// Default image for provisioned instances
pub const DEFAULT_IMAGE: &str = "ubuntu:22.04";

/// Where a dispatched task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    RunLocal,
    RunInProvisionedEnvironment,
}

/// Pure dispatch table: already managed, or host explicitly forced, runs
/// locally; everything else gets an instance.
pub fn decide(is_managed: bool, force_host: bool) -> ExecutionMode {
    if is_managed || force_host {
        ExecutionMode::RunLocal
    } else {
        ExecutionMode::RunInProvisionedEnvironment
    }
}

/// Whether this process is already inside a managed instance
pub fn is_managed_mode() -> bool {
    env::var(MANAGED_MODE_ENV).map(|v| v == "1").unwrap_or(false)
}

/// Whether the environment forces host execution
pub fn host_forced_by_env() -> bool {
    env::var(BUILD_ENVIRONMENT_ENV)
        .map(|v| v == "host")
        .unwrap_or(false)
}

/// Base configuration for a provisioned instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub instance_name: String,
    pub image: String,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

/// Errors from provisioning, file transfer, or in-instance execution
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("failed to launch instance '{name}': {reason}")]
    Launch { name: String, reason: String },

    #[error("failed to push {src} into instance '{name}': {reason}")]
    Push {
        name: String,
        src: std::path::PathBuf,
        reason: String,
    },

    #[error("command {argv:?} failed inside instance '{name}': {reason}")]
    Exec {
        name: String,
        argv: Vec<String>,
        reason: String,
    },

    #[error("provisioner unavailable: {0}")]
    Unavailable(String),
}

/// A running provisioned instance; torn down on drop
pub trait Instance {
    /// Copy a host file into the instance
    fn push_file(&self, src: &Path, dest: &Path) -> Result<(), EnvironmentError>;

    /// Run a command inside the instance, returning its exit status
    fn execute(&self, argv: &[String]) -> Result<i32, EnvironmentError>;
}

/// Acquires managed instances
pub trait Provisioner {
    fn launch(&self, config: &InstanceConfig) -> Result<Box<dyn Instance>, EnvironmentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_mode_runs_locally() {
        assert_eq!(decide(true, false), ExecutionMode::RunLocal);
    }

    #[test]
    fn forced_host_runs_locally() {
        assert_eq!(decide(false, true), ExecutionMode::RunLocal);
        assert_eq!(decide(true, true), ExecutionMode::RunLocal);
    }

    #[test]
    fn unmanaged_unforced_provisions() {
        assert_eq!(
            decide(false, false),
            ExecutionMode::RunInProvisionedEnvironment
        );
    }
}
