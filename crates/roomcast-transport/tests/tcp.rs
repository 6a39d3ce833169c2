//! Integration tests for the TCP transport.
//!
//! These spin up a real listener on a random port and talk to it with a
//! plain `Framed` client, verifying that frames survive the trip in both
//! directions and that closes are reported as `Ok(None)`.

use futures_util::{SinkExt, StreamExt};
use roomcast_protocol::FrameCodec;
use roomcast_transport::{Connection, TcpTransport, Transport, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

async fn accept_one(
    max_frame_len: Option<usize>,
) -> (roomcast_transport::TcpConnection, TcpStream) {
    let mut transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    if let Some(max) = max_frame_len {
        transport = transport.max_frame_len(max);
    }
    let addr = transport.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let client = TcpStream::connect(addr).await.expect("should connect");
    let conn = server.await.expect("accept task");
    (conn, client)
}

#[tokio::test]
async fn test_tcp_send_and_receive_frames() {
    let (conn, client) = accept_one(None).await;
    let mut client = Framed::new(client, FrameCodec::new());

    assert!(conn.id().into_inner() > 0);

    // --- Server sends, client receives ---
    conn.send("SUCCESS|general").await.expect("send");
    let frame = client.next().await.unwrap().expect("decode");
    assert_eq!(frame, "SUCCESS|general");

    // --- Client sends, server receives ---
    client.send("LOGIN|alice|pw1").await.expect("client send");
    let received = conn.recv().await.expect("recv").expect("some frame");
    assert_eq!(received, "LOGIN|alice|pw1");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_client_close() {
    let (conn, client) = accept_one(None).await;
    drop(client);

    let result = conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should return None on client close");
}

#[tokio::test]
async fn test_tcp_oversized_frame_is_malformed() {
    let (conn, mut client) = accept_one(Some(16)).await;

    // Announce a 1 KiB payload; the server must refuse before reading it.
    client.write_all(&1024u32.to_be_bytes()).await.expect("write");

    let result = conn.recv().await;
    assert!(matches!(result, Err(TransportError::Malformed(_))));
}

#[tokio::test]
async fn test_tcp_send_and_recv_run_concurrently() {
    // A handler parked in recv() must not block a write to the same peer.
    let (conn, client) = accept_one(None).await;
    let conn = std::sync::Arc::new(conn);
    let mut client = Framed::new(client, FrameCodec::new());

    let reader = {
        let conn = std::sync::Arc::clone(&conn);
        tokio::spawn(async move { conn.recv().await })
    };
    tokio::task::yield_now().await;

    conn.send("[2024-01-01 00:00:00] bob: hi").await.expect("send");
    let frame = client.next().await.unwrap().expect("decode");
    assert_eq!(frame, "[2024-01-01 00:00:00] bob: hi");

    client.send("VIEW_ROOMS").await.expect("client send");
    let received = reader.await.expect("task").expect("recv");
    assert_eq!(received.as_deref(), Some("VIEW_ROOMS"));
}
