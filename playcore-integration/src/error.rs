use thiserror::Error;

/// Low-level transport/protocol error shared by the HTTP and WebSocket glue (§6 External
/// interfaces). Higher layers (execution, data) wrap this into their own richer error enums
/// rather than propagating it directly to callers.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("http error building request: {0}")]
    HttpBuilder(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("failed to deserialise binary response: {error}")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("failed to serialise outgoing payload: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("subscription rejected: {0}")]
    Subscribe(String),
}

/// Whether an error should be treated as fatal to its owning connection/channel, versus one
/// that can be retried or simply counted (§7 Data/Exchange error policy).
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

impl Unrecoverable for SocketError {
    fn is_unrecoverable(&self) -> bool {
        matches!(self, SocketError::HttpBuilder(_) | SocketError::Signing(_))
    }
}
