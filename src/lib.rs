//! cargohold - upload and lint packaged build artifacts
//!
//! This crate implements the `cargohold` tool: it uploads a packaged build
//! artifact and its declared components to an artifact store, optionally
//! releasing to named channels, and lints artifact contents either on the
//! host or inside a provisioned managed environment.

pub mod artifact;
pub mod component;
pub mod config;
pub mod environment;
pub mod lint;
pub mod mock;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod store;
pub mod upload;

pub use artifact::{ArtifactMetadata, ManifestReader, SquashfsManifestReader};
pub use component::{parse_component_option, reconcile, ComponentSpec};
pub use pipeline::{lint_flow, upload_flow, LintOptions, PipelineError, UploadOptions};
pub use store::{NotifyPrimitive, PublishRequest, PublishResult, UploadHandle, UploadPrimitive};
