/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("bind to {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The protocol upgrade (e.g. the WebSocket handshake) failed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` if the error means the peer is gone and retrying on
    /// the same connection is pointless.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::ReceiveFailed(_))
    }
}
