//! Integration tests for attachment downloads.
//!
//! These tests verify single and bulk downloads against mock HTTP servers.

use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use leankit_client::{AttachmentDownload, Error, LeanKitClient};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{client_for, config_for, config_for_addr, start_scripted_server_or_skip};

fn attachment_path(id: u64) -> String {
    format!("/kanban/api/card/downloadAttachment/101/{id}")
}

#[tokio::test]
async fn test_download_attachment_streams_to_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let content = b"%PDF-1.4\nThis is the attachment body.\n".repeat(512);

    Mock::given(method("GET"))
        .and(path(attachment_path(42)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(content.clone(), "application/octet-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let destination = temp_dir.path().join("spec.pdf");
    let (written, bytes) = client_for(&mock_server)
        .download_attachment(42, &destination)
        .await
        .unwrap();

    assert_eq!(written, destination);
    assert_eq!(bytes, content.len() as u64);
    assert_eq!(std::fs::read(&destination).unwrap(), content);
}

#[tokio::test]
async fn test_download_json_content_type_is_not_decoded() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let body = r#"{"ReplyCode":503,"ReplyText":"not an envelope here"}"#;

    Mock::given(method("GET"))
        .and(path(attachment_path(8)))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&mock_server)
        .await;

    let destination = temp_dir.path().join("data.json");
    client_for(&mock_server)
        .download_attachment(8, &destination)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), body);
}

#[tokio::test]
async fn test_slow_stream_outlives_read_timeout_while_bytes_flow() {
    let head = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
                 Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
        .to_vec();
    let mut script = vec![(Duration::ZERO, head)];
    // Six chunks 150 ms apart: ~900 ms in total, each gap well under the 400 ms limit.
    for _ in 0..6 {
        script.push((Duration::from_millis(150), b"4\r\nabcd\r\n".to_vec()));
    }
    script.push((Duration::ZERO, b"0\r\n\r\n".to_vec()));

    let Some(addr) = start_scripted_server_or_skip(script).await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let config = config_for_addr(addr)
        .read_timeout(Duration::from_millis(400))
        .build()
        .unwrap();
    let destination = temp_dir.path().join("slow.bin");
    let (_, bytes) = LeanKitClient::new(config)
        .unwrap()
        .download_attachment(9, &destination)
        .await
        .unwrap();

    assert_eq!(bytes, 24);
    assert_eq!(std::fs::read(&destination).unwrap(), b"abcd".repeat(6));
}

#[tokio::test]
async fn test_truncated_stream_removes_partial_file() {
    let script = vec![
        (
            Duration::ZERO,
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec(),
        ),
        (Duration::ZERO, b"only ten b".to_vec()),
    ];
    let Some(addr) = start_scripted_server_or_skip(script).await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let client = LeanKitClient::new(config_for_addr(addr).build().unwrap()).unwrap();
    let destination = temp_dir.path().join("cut.bin");
    let result = client.download_attachment(3, &destination).await;

    assert!(
        matches!(result, Err(Error::Transport { .. })),
        "unexpected result: {result:?}"
    );
    assert!(!destination.exists(), "partial file should be removed");
}

#[tokio::test]
async fn test_download_http_error_creates_no_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(attachment_path(404)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let destination = temp_dir.path().join("missing.bin");
    let result = client_for(&mock_server)
        .download_attachment(404, &destination)
        .await;

    assert!(matches!(result, Err(Error::Http { status: 404, .. })));
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_download_into_missing_directory_is_io_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(attachment_path(1)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
        .mount(&mock_server)
        .await;

    let destination = temp_dir.path().join("no-such-dir").join("a.bin");
    let result = client_for(&mock_server)
        .download_attachment(1, &destination)
        .await;
    assert!(matches!(result, Err(Error::Io { ref path, .. }) if *path == destination));
}

#[tokio::test]
async fn test_bulk_download_partial_failure() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    for id in [1_u64, 3] {
        Mock::given(method("GET"))
            .and(path(attachment_path(id)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(format!("file {id}")))
            .mount(&mock_server)
            .await;
    }
    // Item 2 sends nothing for longer than the read timeout: a network-level failure.
    Mock::given(method("GET"))
        .and(path(attachment_path(2)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server)
        .read_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let client = LeanKitClient::new(config).unwrap();

    let items: Vec<_> = (1..=3)
        .map(|id| AttachmentDownload::new(id, temp_dir.path().join(format!("{id}.txt"))))
        .collect();
    let result = client.download_bulk_attachments(items).await;

    match result {
        Err(Error::Batch { total, failures }) => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 1);
            assert!(
                matches!(failures[0], Error::Transport { ref url, .. } if url.ends_with("/2")),
                "unexpected failure: {:?}",
                failures[0]
            );
        }
        other => panic!("Expected Batch error, got: {other:?}"),
    }

    let read = |id: u64| std::fs::read_to_string(temp_dir.path().join(format!("{id}.txt")));
    assert_eq!(read(1).unwrap(), "file 1");
    assert_eq!(read(3).unwrap(), "file 3");
    assert!(read(2).is_err());
}

#[tokio::test]
async fn test_bulk_download_all_succeed() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("payload")
                .set_delay(Duration::from_millis(20)),
        )
        .expect(25)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server).concurrency(10).build().unwrap();
    let client = LeanKitClient::new(config).unwrap();

    let items: Vec<_> = (1..=25)
        .map(|id| AttachmentDownload::new(id, temp_dir.path().join(format!("{id}.bin"))))
        .collect();
    client.download_bulk_attachments(items).await.unwrap();

    let written = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(written, 25);
}

#[tokio::test]
async fn test_bulk_download_rejected_in_dry_run_before_any_request() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server).dry_run(true).build().unwrap();
    let client = LeanKitClient::new(config).unwrap();

    let result = client
        .download_bulk_attachments(vec![AttachmentDownload::new(
            1,
            temp_dir.path().join("1.bin"),
        )])
        .await;

    assert!(matches!(result, Err(Error::Precondition(_))));
    assert!(!temp_dir.path().join("1.bin").exists());
}
