//! TCP transport: plain sockets framed with the length-prefixed codec.
//!
//! The socket is split into independent read and write halves, each
//! behind its own lock, so a handler waiting for the next inbound frame
//! never blocks an outbound write to the same peer.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use roomcast_protocol::{DEFAULT_MAX_FRAME_LEN, FrameCodec};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self::from_listener(listener))
    }

    /// Wraps an already-bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the largest frame payload accepted from (or sent to) a peer.
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // Chat lines are small and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
        }

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");

        let (read_half, write_half) = stream.into_split();
        let codec = FrameCodec::with_max_frame_len(self.max_frame_len);

        Ok(TcpConnection {
            id,
            peer,
            reader: Mutex::new(FramedRead::new(read_half, codec.clone())),
            writer: Mutex::new(FramedWrite::new(write_half, codec)),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single framed TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<FramedRead<OwnedReadHalf, FrameCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, FrameCodec>>,
}

impl Connection for TcpConnection {
    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(frame)
            .await
            .map_err(TransportError::on_send)
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        match self.reader.lock().await.next().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(TransportError::on_recv(e)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .get_mut()
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
