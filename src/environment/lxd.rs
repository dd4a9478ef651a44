//! LXD-backed provisioner
//!
//! Drives the `lxc` client to launch an ephemeral container, copy files in,
//! and run commands. The instance is deleted when the handle drops.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::{EnvironmentError, Instance, InstanceConfig, Provisioner, MANAGED_MODE_ENV};

/// Provisioner shelling out to the `lxc` client
#[derive(Debug, Default)]
pub struct LxdProvisioner;

impl LxdProvisioner {
    pub fn new() -> Self {
        Self
    }
}

fn run_lxc(args: &[String]) -> Result<std::process::Output, EnvironmentError> {
    debug!(?args, "running lxc");
    Command::new("lxc")
        .args(args)
        .output()
        .map_err(|e| EnvironmentError::Unavailable(format!("cannot run lxc: {e}")))
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl Provisioner for LxdProvisioner {
    fn launch(&self, config: &InstanceConfig) -> Result<Box<dyn Instance>, EnvironmentError> {
        let launch_args = vec![
            "launch".to_string(),
            config.image.clone(),
            config.instance_name.clone(),
            "--ephemeral".to_string(),
        ];
        let output = run_lxc(&launch_args)?;
        if !output.status.success() {
            return Err(EnvironmentError::Launch {
                name: config.instance_name.clone(),
                reason: stderr_of(&output),
            });
        }

        let instance = LxdInstance {
            name: config.instance_name.clone(),
        };

        let mut env_vars = vec![(MANAGED_MODE_ENV.to_string(), "1".to_string())];
        if let Some(proxy) = &config.http_proxy {
            env_vars.push(("http_proxy".to_string(), proxy.clone()));
        }
        if let Some(proxy) = &config.https_proxy {
            env_vars.push(("https_proxy".to_string(), proxy.clone()));
        }
        for (key, value) in env_vars {
            let args = vec![
                "config".to_string(),
                "set".to_string(),
                instance.name.clone(),
                format!("environment.{key}"),
                value,
            ];
            let output = run_lxc(&args)?;
            if !output.status.success() {
                return Err(EnvironmentError::Launch {
                    name: instance.name.clone(),
                    reason: stderr_of(&output),
                });
            }
        }

        Ok(Box::new(instance))
    }
}

/// A launched LXD container, deleted on drop
struct LxdInstance {
    name: String,
}

impl Instance for LxdInstance {
    fn push_file(&self, src: &Path, dest: &Path) -> Result<(), EnvironmentError> {
        let args = vec![
            "file".to_string(),
            "push".to_string(),
            src.display().to_string(),
            format!("{}{}", self.name, dest.display()),
        ];
        let output = run_lxc(&args)?;
        if !output.status.success() {
            return Err(EnvironmentError::Push {
                name: self.name.clone(),
                src: src.to_path_buf(),
                reason: stderr_of(&output),
            });
        }
        Ok(())
    }

    fn execute(&self, argv: &[String]) -> Result<i32, EnvironmentError> {
        let mut args = vec!["exec".to_string(), self.name.clone(), "--".to_string()];
        args.extend_from_slice(argv);

        debug!(?argv, instance = %self.name, "executing in instance");
        let status = Command::new("lxc")
            .args(&args)
            .status()
            .map_err(|e| EnvironmentError::Exec {
                name: self.name.clone(),
                argv: argv.to_vec(),
                reason: e.to_string(),
            })?;

        // Exit-by-signal has no code; report it as a generic failure code
        Ok(status.code().unwrap_or(1))
    }
}

impl Drop for LxdInstance {
    fn drop(&mut self) {
        let args = vec![
            "delete".to_string(),
            "--force".to_string(),
            self.name.clone(),
        ];
        if let Err(e) = run_lxc(&args) {
            debug!(instance = %self.name, "failed to delete instance: {e}");
        }
    }
}
