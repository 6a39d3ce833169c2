//! Integration tests for framing over a real async byte stream.
//!
//! The unit tests in `codec.rs` feed hand-built buffers to the decoder.
//! These push bytes through `tokio::io::duplex` in awkward chunks and
//! read them back through `FramedRead`, the way a server would.

use futures_util::StreamExt;
use roomcast_protocol::{Command, FrameCodec};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Encoder, FramedRead};

fn wire_bytes(frames: &[&str]) -> Vec<u8> {
    let mut codec = FrameCodec::new();
    let mut buf = bytes::BytesMut::new();
    for frame in frames {
        codec.encode(*frame, &mut buf).expect("encode");
    }
    buf.to_vec()
}

#[tokio::test]
async fn test_chunked_writes_decode_to_original_frames() {
    let (mut client, server) = tokio::io::duplex(64);
    let frames = ["REGISTER|alice|pw1", "CREATE_ROOM|alice|general", "VIEW_ROOMS"];
    let bytes = wire_bytes(&frames);

    // Write in 3-byte chunks so every frame straddles several reads.
    let writer = tokio::spawn(async move {
        for chunk in bytes.chunks(3) {
            client.write_all(chunk).await.expect("write");
            client.flush().await.expect("flush");
        }
    });

    let mut reader = FramedRead::new(server, FrameCodec::new());
    let mut received = Vec::new();
    for _ in 0..frames.len() {
        let frame = reader
            .next()
            .await
            .expect("stream should yield a frame")
            .expect("frame should decode");
        received.push(frame);
    }
    writer.await.expect("writer task");

    assert_eq!(received, frames);
    assert!(matches!(
        Command::decode(&received[1]).unwrap(),
        Command::CreateRoom { .. }
    ));
}

#[tokio::test]
async fn test_single_write_with_many_frames_decodes_each() {
    let (mut client, server) = tokio::io::duplex(1024);
    let frames = ["LOGIN|bob|pw2", "JOIN_ROOM|bob|general", "MESSAGE|bob|hi"];
    client
        .write_all(&wire_bytes(&frames))
        .await
        .expect("write");
    drop(client);

    let reader = FramedRead::new(server, FrameCodec::new());
    let received: Vec<String> = reader
        .map(|frame| frame.expect("frame should decode"))
        .collect()
        .await;

    assert_eq!(received, frames);
}

#[tokio::test]
async fn test_truncated_stream_reports_error() {
    let (mut client, server) = tokio::io::duplex(64);
    let bytes = wire_bytes(&["LOGOUT|alice"]);
    client.write_all(&bytes[..6]).await.expect("write");
    drop(client);

    let mut reader = FramedRead::new(server, FrameCodec::new());

    // EOF in the middle of a frame is an error, not a silent short frame.
    let result = reader.next().await.expect("should yield an item");
    assert!(result.is_err());
}
