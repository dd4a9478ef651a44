//! Mock provisioner recording launches, pushes and executions

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::environment::{EnvironmentError, Instance, InstanceConfig, Provisioner};

/// Everything the mock provisioner observed
#[derive(Debug, Default)]
pub struct ProvisionerLog {
    pub launched: Vec<InstanceConfig>,
    pub pushed: Vec<(PathBuf, PathBuf)>,
    pub executed: Vec<Vec<String>>,
}

/// Provisioner double with configurable launch failure and exit status
#[derive(Debug, Clone, Default)]
pub struct MockProvisioner {
    log: Arc<Mutex<ProvisionerLog>>,
    launch_failure: Option<String>,
    exec_status: i32,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `launch` fail with the given reason
    pub fn with_launch_failure(mut self, reason: impl Into<String>) -> Self {
        self.launch_failure = Some(reason.into());
        self
    }

    /// Exit status in-instance commands report (default 0)
    pub fn with_exec_status(mut self, status: i32) -> Self {
        self.exec_status = status;
        self
    }

    /// Snapshot of the observed calls
    pub fn log(&self) -> ProvisionerLog {
        self.log
            .lock()
            .map(|log| ProvisionerLog {
                launched: log.launched.clone(),
                pushed: log.pushed.clone(),
                executed: log.executed.clone(),
            })
            .unwrap_or_default()
    }
}

impl Provisioner for MockProvisioner {
    fn launch(&self, config: &InstanceConfig) -> Result<Box<dyn Instance>, EnvironmentError> {
        if let Some(reason) = &self.launch_failure {
            return Err(EnvironmentError::Launch {
                name: config.instance_name.clone(),
                reason: reason.clone(),
            });
        }
        if let Ok(mut log) = self.log.lock() {
            log.launched.push(config.clone());
        }
        Ok(Box::new(MockInstance {
            log: Arc::clone(&self.log),
            exec_status: self.exec_status,
        }))
    }
}

struct MockInstance {
    log: Arc<Mutex<ProvisionerLog>>,
    exec_status: i32,
}

impl Instance for MockInstance {
    fn push_file(&self, src: &Path, dest: &Path) -> Result<(), EnvironmentError> {
        if let Ok(mut log) = self.log.lock() {
            log.pushed.push((src.to_path_buf(), dest.to_path_buf()));
        }
        Ok(())
    }

    fn execute(&self, argv: &[String]) -> Result<i32, EnvironmentError> {
        if let Ok(mut log) = self.log.lock() {
            log.executed.push(argv.to_vec());
        }
        Ok(self.exec_status)
    }
}
