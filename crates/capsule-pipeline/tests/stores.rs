//! Filesystem stores and the HTTP renderer.

use std::sync::Arc;
use std::time::Duration;

use capsule_core::{
    ContentBlob, ContentDigest, ProofStatus, Record, RecordId, SourceDescriptor, StorageReference,
    TimestampProof,
};
use capsule_crypto::sha256_hex;
use capsule_pipeline::{
    BlobStore, FsBlobStore, FsRecordStore, GatewayBlobStore, HttpRenderer, MemoryBlobStore,
    PipelineError, RecordStore, Renderer,
};
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(status: ProofStatus) -> Record {
    Record::new(
        ContentDigest::from_bytes([9; 32]),
        Some(StorageReference {
            id: "cid".into(),
            url: "file:///tmp/cid/evidence.html".into(),
        }),
        TimestampProof::new(vec![0, 1, 2]),
        status,
        SourceDescriptor::url("https://example.com", Some("Example".into()))
            .with_description(Some("desc".into())),
    )
}

// ── FsBlobStore ──────────────────────────────────────────────────────

#[tokio::test]
async fn blob_store_is_content_addressed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path().join("blobs"));

    let blob = ContentBlob::new(b"<html>evidence</html>".to_vec(), "evidence.html");
    let first = store.put(&blob).await.unwrap();
    let second = store.put(&blob).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.id, sha256_hex(&blob.bytes));
    assert!(first.url.starts_with("file://"));
    assert!(first.url.ends_with(&format!("{}/evidence.html", first.id)));
    assert_eq!(store.get(&first).await.unwrap(), blob.bytes);

    let other = store
        .put(&ContentBlob::new(b"other".to_vec(), "evidence.html"))
        .await
        .unwrap();
    assert_ne!(other.id, first.id);
}

#[tokio::test]
async fn blob_store_repairs_a_torn_copy_under_the_same_digest() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("blobs");
    let store = FsBlobStore::new(root.clone());

    let blob = ContentBlob::new(b"<html>evidence</html>".to_vec(), "evidence.html");
    let id = sha256_hex(&blob.bytes);
    std::fs::create_dir_all(root.join(&id)).unwrap();
    std::fs::write(root.join(&id).join("evidence.html"), b"<html>evi").unwrap();

    let reference = store.put(&blob).await.unwrap();
    assert_eq!(reference.id, id);
    assert_eq!(store.get(&reference).await.unwrap(), blob.bytes);

    let leftovers: Vec<_> = std::fs::read_dir(root.join(&id))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("evidence.html")]);
}

#[tokio::test]
async fn blob_store_rejects_unsafe_filenames() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());
    for name in ["", "..", "../escape.txt", "a/b.txt"] {
        let err = store
            .put(&ContentBlob::new(b"x".to_vec(), name))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Blob(_)), "{name:?}");
    }
}

#[tokio::test]
async fn blob_store_refuses_references_outside_its_root() {
    let dir = tempfile::tempdir().unwrap();
    let outside = dir.path().join("secret.txt");
    std::fs::write(&outside, b"secret").unwrap();
    let store = FsBlobStore::new(dir.path().join("blobs"));

    let forged = StorageReference {
        id: "whatever".into(),
        url: Url::from_file_path(&outside).unwrap().to_string(),
    };
    assert!(matches!(store.get(&forged).await, Err(PipelineError::Blob(_))));

    let not_a_file = StorageReference {
        id: "x".into(),
        url: "https://example.com/x".into(),
    };
    assert!(store.get(&not_a_file).await.is_err());
}

// ── FsRecordStore ────────────────────────────────────────────────────

#[tokio::test]
async fn record_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path().join("records"));
    let r = record(ProofStatus::Incomplete);

    assert_eq!(store.get(&r.id).await.unwrap(), None);
    store.put(&r).await.unwrap();
    assert_eq!(store.get(&r.id).await.unwrap(), Some(r.clone()));

    let file = dir.path().join("records").join(format!("{}.json", r.id));
    let json = std::fs::read_to_string(file).unwrap();
    assert!(json.contains("\"proof_status\": \"INCOMPLETE\""));
    assert!(json.contains("\"AAEC\""));
}

#[tokio::test]
async fn record_store_updates_are_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());
    let r = record(ProofStatus::Incomplete);
    store.put(&r).await.unwrap();

    let same = store
        .update_proof(&r.id, TimestampProof::new(vec![7]), ProofStatus::Incomplete)
        .await
        .unwrap();
    assert_eq!(same, r);

    let done = store
        .update_proof(&r.id, TimestampProof::new(vec![7, 7]), ProofStatus::Complete)
        .await
        .unwrap();
    assert_eq!(done.proof_status, ProofStatus::Complete);
    assert_eq!(store.get(&r.id).await.unwrap(), Some(done.clone()));

    let err = store
        .update_proof(&r.id, TimestampProof::empty(), ProofStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Core(_)));
    assert_eq!(store.get(&r.id).await.unwrap(), Some(done));

    let missing = RecordId::new();
    assert!(matches!(
        store
            .update_proof(&missing, TimestampProof::empty(), ProofStatus::Complete)
            .await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn concurrent_updates_settle_on_the_highest_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsRecordStore::new(dir.path()));
    let r = record(ProofStatus::Pending);
    store.put(&r).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let store = store.clone();
        let id = r.id;
        tasks.push(tokio::spawn(async move {
            let status = if i % 2 == 0 {
                ProofStatus::Complete
            } else {
                ProofStatus::Incomplete
            };
            store.update_proof(&id, TimestampProof::new(vec![i]), status).await
        }));
    }
    for task in tasks {
        // Late INCOMPLETE writers lose with an error; nobody corrupts the file.
        let _ = task.await.unwrap();
    }

    let final_record = store.get(&r.id).await.unwrap().unwrap();
    assert_eq!(final_record.proof_status, ProofStatus::Complete);
}

#[tokio::test]
async fn corrupt_record_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());
    let id = RecordId::new();
    std::fs::write(dir.path().join(format!("{id}.json")), b"{not json").unwrap();
    assert!(matches!(store.get(&id).await, Err(PipelineError::Records(_))));
}

// ── GatewayBlobStore ─────────────────────────────────────────────────

fn gateway_store(server: &MockServer, timeout: Duration) -> GatewayBlobStore {
    GatewayBlobStore::new(
        Arc::new(MemoryBlobStore::new()),
        &format!("{}/blobs", server.uri()),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn gateway_serves_what_was_stored() {
    let server = MockServer::start().await;
    let store = gateway_store(&server, Duration::from_secs(5));
    let blob = ContentBlob::new(b"<html>served</html>".to_vec(), "evidence.html");
    let reference = store.put(&blob).await.unwrap();
    assert_eq!(reference.id, sha256_hex(&blob.bytes));
    assert_eq!(
        reference.url,
        format!("{}/blobs/{}/evidence.html", server.uri(), reference.id)
    );

    let served = format!("/blobs/{}/evidence.html", reference.id);
    Mock::given(method("GET"))
        .and(path(served.as_str()))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(blob.bytes.clone()))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(served.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert_eq!(store.get(&reference).await.unwrap(), blob.bytes);
    assert!(store.is_accessible(&reference).await);
}

#[tokio::test]
async fn gateway_misses_are_blob_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = gateway_store(&server, Duration::from_secs(5));
    let reference = store
        .put(&ContentBlob::new(b"gone".to_vec(), "evidence.html"))
        .await
        .unwrap();
    match store.get(&reference).await {
        Err(PipelineError::Blob(msg)) => assert!(msg.contains("404"), "{msg}"),
        other => panic!("expected a blob error, got {other:?}"),
    }
    assert!(!store.is_accessible(&reference).await);
}

#[tokio::test]
async fn slow_gateways_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let store = gateway_store(&server, Duration::from_millis(200));
    let reference = store
        .put(&ContentBlob::new(b"late".to_vec(), "evidence.html"))
        .await
        .unwrap();
    match store.get(&reference).await {
        Err(PipelineError::Blob(msg)) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

// ── HttpRenderer ─────────────────────────────────────────────────────

#[tokio::test]
async fn renderer_returns_body_and_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>A</title>"))
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(Duration::from_secs(5)).unwrap();
    let url = format!("{}/article", server.uri());
    let page = renderer.render(&url).await.unwrap();
    assert_eq!(page.html, "<title>A</title>");
    assert_eq!(page.final_url, url);
    assert_eq!(page.title_hint, None);
}

#[tokio::test]
async fn renderer_keeps_error_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<p>Not here</p>"))
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(Duration::from_secs(5)).unwrap();
    let page = renderer.render(&format!("{}/gone", server.uri())).await.unwrap();
    assert_eq!(page.html, "<p>Not here</p>");
}

#[tokio::test]
async fn renderer_transport_failures_are_errors() {
    let renderer = HttpRenderer::new(Duration::from_secs(2)).unwrap();
    for url in ["http://127.0.0.1:1/", "file:///etc/passwd", "not a url"] {
        assert!(
            matches!(renderer.render(url).await, Err(PipelineError::Render { .. })),
            "{url}"
        );
    }
}
