//! End-to-end upload against the file-backed store

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use cargohold::artifact::ArtifactMetadata;
use cargohold::component::ComponentSpec;
use cargohold::mock::{MockManifestReader, RecordingReporter};
use cargohold::pipeline::{upload_flow, UploadOptions};
use cargohold::store::DirectoryStore;
use cargohold::upload::CancelFlag;

#[test]
fn upload_flow_publishes_into_the_store_tree() {
    let scratch = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();

    let artifact = scratch.path().join("my-artifact.sq");
    fs::write(&artifact, vec![9u8; 100_000]).unwrap();
    fs::write(scratch.path().join("extra.bin"), b"extra bytes").unwrap();

    let reader = MockManifestReader::new(ArtifactMetadata {
        name: "my-artifact".to_string(),
        declared_components: ["extra"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>(),
        built_at: None,
    });
    let store = DirectoryStore::new(store_root.path());
    let reporter = RecordingReporter::new();

    let options = UploadOptions {
        artifact,
        channels: vec!["edge".to_string()],
        components: vec![ComponentSpec::new("extra", "extra.bin")],
    };

    let result = upload_flow(
        &options,
        &reader,
        &store,
        &store,
        &reporter,
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(result.revision, 1);

    let revision_dir = store_root.path().join("revisions/my-artifact/1");
    assert!(revision_dir.join("my-artifact.artifact").is_file());
    assert!(revision_dir.join("extra.component").is_file());
    assert_eq!(
        fs::read(revision_dir.join("extra.component")).unwrap(),
        b"extra bytes"
    );

    // Pending uploads were claimed, not copied
    let incoming: Vec<_> = fs::read_dir(store_root.path().join("incoming"))
        .map(|entries| entries.flatten().collect())
        .unwrap_or_default();
    assert!(incoming.is_empty());

    let index = fs::read_to_string(store_root.path().join("revisions.json")).unwrap();
    assert!(index.contains("\"my-artifact\""));
    assert!(index.contains("\"edge\""));

    assert_eq!(
        reporter.messages().last().map(String::as_str),
        Some("Revision 1 created for 'my-artifact' and released to edge")
    );

    // A second publish of the same artifact bumps the revision
    fs::write(scratch.path().join("extra.bin"), b"extra bytes v2").unwrap();
    let result = upload_flow(
        &options,
        &reader,
        &store,
        &store,
        &reporter,
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(result.revision, 2);
    assert!(Path::new(&store_root.path().join("revisions/my-artifact/2/my-artifact.artifact")).is_file());
}
