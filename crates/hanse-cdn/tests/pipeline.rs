//! End-to-end pipeline tests over a mock HTTP transport.
//!
//! These tests drive [`Client`] through whole calls: URL synthesis,
//! status judgment, length enforcement, envelope unpacking and keyed
//! chunk processing, without touching the network.

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::stream;
use url::Url;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use hanse_cdn::{
    BoxStream, CdnError, ChunkData, Client, DepotManifest, FileEntry, HttpClient, HttpResponse,
    Phase, Scheme, Server, Timeouts, file_flags,
};
use hanse_keys::{DepotKey, ProcessError, chunk_checksum, symmetric_encrypt};

#[derive(Debug, thiserror::Error)]
#[error("mock transport error")]
struct MockError;

/// Mock HTTP client serving one canned response for every request.
struct MockHttp {
    status: u16,
    content_length: Option<u64>,
    body: Vec<u8>,
    chunk_size: usize,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockHttp {
    fn serving(body: Vec<u8>) -> Self {
        let length = body.len() as u64;
        Self {
            status: 200,
            content_length: Some(length),
            body,
            // Small enough that every body crosses several stream chunks.
            chunk_size: 7,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }
}

impl HttpClient for MockHttp {
    type Error = MockError;

    async fn send(&self, url: Url) -> Result<HttpResponse<MockError>, MockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_string());

        let chunks: Vec<Result<Bytes, MockError>> = self
            .body
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(HttpResponse {
            status: self.status,
            content_length: self.content_length,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

/// Mock HTTP client whose requests never complete.
struct PendingHttp;

impl HttpClient for PendingHttp {
    type Error = MockError;

    async fn send(&self, _url: Url) -> Result<HttpResponse<MockError>, MockError> {
        std::future::pending::<Result<HttpResponse<MockError>, MockError>>().await
    }
}

/// Mock HTTP client whose responses arrive but whose bodies never do.
struct BodyStallHttp;

impl HttpClient for BodyStallHttp {
    type Error = MockError;

    async fn send(&self, _url: Url) -> Result<HttpResponse<MockError>, MockError> {
        let body: BoxStream<'static, Result<Bytes, MockError>> = Box::pin(stream::pending());
        Ok(HttpResponse {
            status: 200,
            content_length: Some(100),
            body,
        })
    }
}

fn origin() -> Server {
    Server::new(Scheme::Http, "cdn1.example", 8080)
}

fn plain_entry(filename: &str) -> FileEntry {
    FileEntry {
        filename: filename.into(),
        flags: 0,
        total_size: 0,
        hash: Vec::new(),
        chunks: Vec::new(),
    }
}

fn sample_manifest() -> DepotManifest {
    DepotManifest {
        depot_id: 441,
        manifest_gid: 7,
        creation_time: 1_700_000_000,
        filenames_encrypted: false,
        total_compressed_size: 2048,
        total_uncompressed_size: 4096,
        files: vec![FileEntry {
            filename: "game/bin/launcher".into(),
            flags: file_flags::EXECUTABLE,
            total_size: 4096,
            hash: Vec::new(),
            chunks: vec![ChunkData {
                chunk_id: Some(vec![0xab; 20]),
                checksum: 0x1234_5678,
                offset: 0,
                compressed_length: 2048,
                uncompressed_length: 4096,
            }],
        }],
    }
}

fn zip_envelope(members: &[&[u8]]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (index, member) in members.iter().enumerate() {
        writer
            .start_file(format!("{index}"), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(member).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_download_manifest_round_trip() {
    let manifest = sample_manifest();
    let mock = MockHttp::serving(zip_envelope(&[&manifest.to_bytes().unwrap()]));
    let seen = Arc::clone(&mock.seen);
    let client = Client::new(mock);

    let fetched = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap();

    assert_eq!(fetched, manifest);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["http://cdn1.example:8080/depot/441/manifest/7/5"]
    );
}

#[tokio::test]
async fn test_manifest_request_code_extends_path() {
    let manifest = sample_manifest();
    let mock = MockHttp::serving(zip_envelope(&[&manifest.to_bytes().unwrap()]));
    let seen = Arc::clone(&mock.seen);
    let client = Client::new(mock);

    client
        .download_manifest(441, 7, 998_877, &origin(), None, None, None)
        .await
        .unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["http://cdn1.example:8080/depot/441/manifest/7/5/998877"]
    );
}

#[tokio::test]
async fn test_manifest_auth_token_rides_the_query() {
    let manifest = sample_manifest();
    let mock = MockHttp::serving(zip_envelope(&[&manifest.to_bytes().unwrap()]));
    let seen = Arc::clone(&mock.seen);
    let client = Client::new(mock);

    client
        .download_manifest(441, 7, 0, &origin(), None, None, Some("token=abc123"))
        .await
        .unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["http://cdn1.example:8080/depot/441/manifest/7/5?token=abc123"]
    );
}

#[tokio::test]
async fn test_manifest_short_body_rejected() {
    let envelope = zip_envelope(&[&sample_manifest().to_bytes().unwrap()]);
    let declared = envelope.len() as u64 + 5;
    let mock = MockHttp::serving(envelope).content_length(Some(declared));
    let client = Client::new(mock);

    let err = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CdnError::LengthMismatch { .. }));
}

#[tokio::test]
async fn test_manifest_without_content_length_buffers() {
    let manifest = sample_manifest();
    let mock =
        MockHttp::serving(zip_envelope(&[&manifest.to_bytes().unwrap()])).content_length(None);
    let client = Client::new(mock);

    let fetched = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap();

    assert_eq!(fetched, manifest);
}

#[tokio::test]
async fn test_manifest_envelope_extra_members_tolerated() {
    let manifest = sample_manifest();
    let payload = manifest.to_bytes().unwrap();
    let mock = MockHttp::serving(zip_envelope(&[&payload, b"trailing junk"]));
    let client = Client::new(mock);

    let fetched = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap();

    assert_eq!(fetched, manifest);
}

#[tokio::test]
async fn test_manifest_filenames_decrypted_and_sorted() {
    let key = DepotKey::new([7u8; 32]);
    let mut manifest = sample_manifest();
    manifest.filenames_encrypted = true;
    manifest.files = vec![
        plain_entry("zulu\\maps\\overworld.dat"),
        plain_entry("alpha\\bin\\client"),
    ];
    for file in &mut manifest.files {
        file.filename = BASE64.encode(symmetric_encrypt(file.filename.as_bytes(), &key));
    }

    let mock = MockHttp::serving(zip_envelope(&[&manifest.to_bytes().unwrap()]));
    let client = Client::new(mock);

    let fetched = client
        .download_manifest(441, 7, 0, &origin(), Some(&key), None, None)
        .await
        .unwrap();

    assert!(!fetched.filenames_encrypted);
    let names: Vec<_> = fetched.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["alpha/bin/client", "zulu/maps/overworld.dat"]);
}

#[tokio::test]
async fn test_download_chunk_plain() {
    let payload: Vec<u8> = (0u8..100).collect();
    let mock = MockHttp::serving(payload.clone());
    let seen = Arc::clone(&mock.seen);
    let client = Client::new(mock);
    let chunk = ChunkData {
        chunk_id: Some(vec![0xab, 0xcd]),
        compressed_length: 100,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 128];

    let written = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap();

    assert_eq!(written, 100);
    assert_eq!(&destination[..written], &payload[..]);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["http://cdn1.example:8080/depot/1/chunk/abcd"]
    );
}

#[tokio::test]
async fn test_chunk_without_id_fails_before_network() {
    let mock = MockHttp::serving(Vec::new());
    let calls = Arc::clone(&mock.calls);
    let client = Client::new(mock);
    let mut destination = vec![0u8; 16];

    let err = client
        .download_depot_chunk(
            1,
            &ChunkData::default(),
            &origin(),
            &mut destination,
            None,
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CdnError::MissingChunkId));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chunk_small_buffer_fails_before_network() {
    let mock = MockHttp::serving(Vec::new());
    let calls = Arc::clone(&mock.calls);
    let client = Client::new(mock);
    let chunk = ChunkData {
        chunk_id: Some(vec![0x01]),
        compressed_length: 64,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 16];

    let err = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CdnError::BufferTooSmall {
            needed: 64,
            capacity: 16
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chunk_header_metadata_conflict_rejected() {
    let payload = vec![0u8; 100];
    let mock = MockHttp::serving(payload).content_length(Some(90));
    let client = Client::new(mock);
    let chunk = ChunkData {
        chunk_id: Some(vec![0x01]),
        compressed_length: 100,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 128];

    let err = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CdnError::LengthMismatch {
            declared: 90,
            actual: 100
        }
    ));
}

#[tokio::test]
async fn test_chunk_metadata_covers_missing_header() {
    let payload = vec![3u8; 100];
    let mock = MockHttp::serving(payload.clone()).content_length(None);
    let client = Client::new(mock);
    let chunk = ChunkData {
        chunk_id: Some(vec![0x01]),
        compressed_length: 100,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 128];

    let written = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap();

    assert_eq!(written, 100);
    assert_eq!(&destination[..written], &payload[..]);
}

#[tokio::test]
async fn test_chunk_unknown_length_everywhere_rejected() {
    let mock = MockHttp::serving(vec![1u8; 32]).content_length(None);
    let client = Client::new(mock);
    let chunk = ChunkData {
        chunk_id: Some(vec![0x01]),
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 128];

    let err = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CdnError::UnknownTransferLength));
}

#[tokio::test]
async fn test_download_chunk_keyed_end_to_end() {
    let key = DepotKey::new([42u8; 32]);
    let plaintext: Vec<u8> = (0u8..=255).cycle().take(3000).collect();
    let compressed = hanse_keys::vzip::compress(&plaintext).unwrap();
    let checksum = chunk_checksum(&compressed);
    let payload = symmetric_encrypt(&compressed, &key);

    let chunk = ChunkData {
        chunk_id: Some(vec![0x01, 0x02, 0x03]),
        checksum,
        offset: 0,
        compressed_length: payload.len() as u32,
        uncompressed_length: plaintext.len() as u32,
    };

    let mock = MockHttp::serving(payload);
    let client = Client::new(mock);
    let mut destination = vec![0u8; plaintext.len()];

    let written = client
        .download_depot_chunk(
            441,
            &chunk,
            &origin(),
            &mut destination,
            Some(&key),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(written, plaintext.len());
    assert_eq!(destination, plaintext);
}

#[tokio::test]
async fn test_chunk_checksum_mismatch_surfaces_process_error() {
    let key = DepotKey::new([42u8; 32]);
    let plaintext = vec![6u8; 512];
    let compressed = hanse_keys::vzip::compress(&plaintext).unwrap();
    let checksum = chunk_checksum(&compressed);
    let payload = symmetric_encrypt(&compressed, &key);

    let chunk = ChunkData {
        chunk_id: Some(vec![0x0f]),
        checksum: checksum ^ 1,
        offset: 0,
        compressed_length: payload.len() as u32,
        uncompressed_length: plaintext.len() as u32,
    };

    let mock = MockHttp::serving(payload);
    let client = Client::new(mock);
    let mut destination = vec![0u8; plaintext.len()];

    let err = client
        .download_depot_chunk(
            441,
            &chunk,
            &origin(),
            &mut destination,
            Some(&key),
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CdnError::Process(ProcessError::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn test_http_error_status_rejected() {
    let mock = MockHttp::serving(Vec::new()).status(404);
    let client = Client::new(mock);

    let err = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CdnError::RequestFailed { status: 404, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_request_budget_cuts_unresponsive_server() {
    let client =
        Client::new(PendingHttp).timeouts(Timeouts::default().request(Duration::from_secs(3)));

    let err = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CdnError::Timeout {
            phase: Phase::Request
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_response_body_budget_cuts_stalled_stream() {
    let client = Client::new(BodyStallHttp);
    let chunk = ChunkData {
        chunk_id: Some(vec![0xab]),
        compressed_length: 100,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 128];

    let err = client
        .download_depot_chunk(1, &chunk, &origin(), &mut destination, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CdnError::Timeout {
            phase: Phase::ResponseBody
        }
    ));
}

#[tokio::test]
async fn test_proxy_routes_through_template() {
    let payload = vec![9u8; 10];
    let mock = MockHttp::serving(payload.clone());
    let seen = Arc::clone(&mock.seen);
    let client = Client::new(mock);
    let proxy = Server::proxy(Scheme::Http, "cache.lan", 8080, "/proxy/%host%%path%");
    let chunk = ChunkData {
        chunk_id: Some(vec![0xab]),
        compressed_length: 10,
        ..ChunkData::default()
    };
    let mut destination = vec![0u8; 16];

    let written = client
        .download_depot_chunk(
            1,
            &chunk,
            &origin(),
            &mut destination,
            None,
            Some(&proxy),
            None,
        )
        .await
        .unwrap();

    assert_eq!(written, 10);
    assert_eq!(&destination[..written], &payload[..]);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["http://cache.lan:8080/proxy/cdn1.example/depot/1/chunk/ab"]
    );
}

#[tokio::test]
async fn test_body_overrun_fails_fast() {
    let mock = MockHttp::serving(vec![0u8; 120]).content_length(Some(100));
    let client = Client::new(mock);

    let err = client
        .download_manifest(441, 7, 0, &origin(), None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CdnError::LengthMismatch { declared: 100, .. }));
}
