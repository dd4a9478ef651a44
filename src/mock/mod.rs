//! Test doubles
//!
//! In-process mocks for the store primitives, the provisioner, the manifest
//! reader, and the reporter, with failure injection for error-path tests.
//! Used by the unit tests and the integration suites in `tests/`.

mod manifest;
mod provisioner;
mod reporter;
mod store;

pub use manifest::MockManifestReader;
pub use provisioner::{MockProvisioner, ProvisionerLog};
pub use reporter::RecordingReporter;
pub use store::{MockStore, RecordedUpload};
