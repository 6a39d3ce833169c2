use roomcast_protocol::{ErrorCode, ProtocolError};

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A write did not complete within the write timeout.
    #[error("write timed out")]
    TimedOut,

    /// The peer sent bytes that do not form a valid frame, or we tried
    /// to send one that is too large.
    #[error("malformed frame: {0}")]
    Malformed(#[source] ProtocolError),
}

impl TransportError {
    /// Maps a codec error hit while reading.
    pub(crate) fn on_recv(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::ReceiveFailed(e),
            other => Self::Malformed(other),
        }
    }

    /// Maps a codec error hit while writing.
    pub(crate) fn on_send(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::SendFailed(e),
            other => Self::Malformed(other),
        }
    }

    /// The wire error this maps to. Every transport error is fatal to
    /// its connection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) => ErrorCode::MalformedFrame,
            _ => ErrorCode::ConnectionLost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_recv_splits_io_from_malformed() {
        let io = TransportError::on_recv(ProtocolError::Io(
            std::io::ErrorKind::ConnectionReset.into(),
        ));
        assert!(matches!(io, TransportError::ReceiveFailed(_)));
        assert_eq!(io.code(), ErrorCode::ConnectionLost);

        let bad = TransportError::on_recv(ProtocolError::InvalidUtf8);
        assert!(matches!(bad, TransportError::Malformed(_)));
        assert_eq!(bad.code(), ErrorCode::MalformedFrame);
    }

    #[test]
    fn test_timed_out_is_connection_lost() {
        assert_eq!(TransportError::TimedOut.code(), ErrorCode::ConnectionLost);
    }
}
