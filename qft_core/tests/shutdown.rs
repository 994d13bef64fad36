mod common;

use common::{TEST_TIMEOUT, TestServer, all_files, client_config, pattern, write_source};
use qft_core::TransferError;
use qft_core::transfer::constants::CLOSE_OK;
use qft_core::transfer::protocol::encode_header;
use qft_core::transfer::{SupervisorState, make_client_endpoint, send_file};
use quinn::ConnectionError;
use std::time::Duration;

#[tokio::test]
async fn test_in_flight_transfer_completes_after_shutdown() {
    let mut server = TestServer::start().await;
    let content = pattern(512 * 1024, 5);
    let (first_half, second_half) = content.split_at(content.len() / 2);

    // Start a transfer and leave it half done
    let endpoint = make_client_endpoint(server.addr).unwrap();
    let connection = endpoint
        .connect(server.addr, "localhost")
        .unwrap()
        .await
        .unwrap();
    let (mut send, _recv) = connection.open_bi().await.unwrap();
    send.write_all(&encode_header("slow.bin").unwrap()).await.unwrap();
    send.write_all(first_half).await.unwrap();

    // The handler has the stream once the destination file exists
    tokio::time::timeout(TEST_TIMEOUT, async {
        while all_files(&server.upload_dir).is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("handler never created the destination file");

    server.shutdown.cancel();
    server
        .state
        .wait_for(|s| *s == SupervisorState::ShuttingDown)
        .await
        .unwrap();

    // New connections are refused while the old one drains
    let src = tempfile::tempdir().unwrap();
    let late = write_source(src.path(), "late.txt", b"too late");
    let mut config = client_config();
    config.connect_timeout_secs = 1;
    let err = send_file(&late, &server.addr_string(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Connect { .. }), "{err}");

    // The in-flight transfer is allowed to finish
    send.write_all(second_half).await.unwrap();
    send.finish().unwrap();
    let closed = tokio::time::timeout(TEST_TIMEOUT, connection.closed())
        .await
        .unwrap();
    assert!(
        matches!(closed, ConnectionError::ApplicationClosed(ref c) if c.error_code == CLOSE_OK),
        "{closed}"
    );
    endpoint.wait_idle().await;

    let (upload_dir, _guard) = server.stop().await;
    let files = all_files(&upload_dir);
    assert_eq!(files.len(), 1);
    assert!(std::fs::read(&files[0]).unwrap() == content);
}

#[tokio::test]
async fn test_shutdown_with_idle_server_is_prompt() {
    let server = TestServer::start().await;
    tokio::time::timeout(Duration::from_secs(10), server.stop())
        .await
        .expect("idle server took too long to stop");
}
