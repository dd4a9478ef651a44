//! Publish finalization
//!
//! Builds the well-formed publish request from the manifest metadata and the
//! obtained upload handles, hands it to the notify primitive, and renders
//! the success summary.

use std::collections::BTreeMap;

use crate::artifact::ArtifactMetadata;
use crate::store::{NotifyPrimitive, PublishError, PublishRequest, PublishResult, UploadHandle};

/// Assemble the publish request for an uploaded artifact.
///
/// The artifact size comes from the main upload handle; the component
/// mapping must already be keyed by declared names.
pub fn build_request(
    metadata: &ArtifactMetadata,
    channels: &[String],
    main_upload: UploadHandle,
    components: BTreeMap<String, UploadHandle>,
) -> PublishRequest {
    PublishRequest {
        artifact_name: metadata.name.clone(),
        built_at: metadata.built_at,
        channels: channels.to_vec(),
        size_bytes: main_upload.size_bytes,
        main_upload,
        components,
    }
}

/// Submit the request to the store's notify endpoint
pub fn publish(
    request: &PublishRequest,
    notifier: &dyn NotifyPrimitive,
) -> Result<PublishResult, PublishError> {
    notifier.notify(request)
}

/// Render the post-publish status line, naming any released channels
pub fn success_message(result: &PublishResult, request: &PublishRequest) -> String {
    let mut message = format!(
        "Revision {} created for '{}'",
        result.revision, request.artifact_name
    );
    if !request.channels.is_empty() {
        message.push_str(&format!(
            " and released to {}",
            humanize_list(&request.channels, "and")
        ));
    }
    message
}

/// Join items for humans: the last two joined by `conjunction`, earlier
/// items comma-separated.
pub fn humanize_list(items: &[String], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} {conjunction} {last}", head.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn humanize_empty_and_single() {
        assert_eq!(humanize_list(&[], "and"), "");
        assert_eq!(humanize_list(&strings(&["stable"]), "and"), "stable");
    }

    #[test]
    fn humanize_joins_last_two_with_conjunction() {
        assert_eq!(
            humanize_list(&strings(&["stable", "edge"]), "and"),
            "stable and edge"
        );
        assert_eq!(
            humanize_list(&strings(&["stable", "beta", "edge"]), "and"),
            "stable, beta and edge"
        );
    }

    #[test]
    fn success_message_without_channels() {
        let handle = UploadHandle {
            upload_id: "u1".into(),
            sha256: "ff".into(),
            size_bytes: 10,
        };
        let request = PublishRequest {
            artifact_name: "my-artifact".into(),
            main_upload: handle,
            built_at: None,
            channels: Vec::new(),
            size_bytes: 10,
            components: BTreeMap::new(),
        };
        let message = success_message(&PublishResult { revision: 17 }, &request);
        assert_eq!(message, "Revision 17 created for 'my-artifact'");
    }

    #[test]
    fn success_message_names_released_channels() {
        let handle = UploadHandle {
            upload_id: "u1".into(),
            sha256: "ff".into(),
            size_bytes: 10,
        };
        let request = PublishRequest {
            artifact_name: "my-artifact".into(),
            main_upload: handle,
            built_at: None,
            channels: strings(&["stable", "edge"]),
            size_bytes: 10,
            components: BTreeMap::new(),
        };
        let message = success_message(&PublishResult { revision: 3 }, &request);
        assert!(message.ends_with("released to stable and edge"));
    }
}
