use playcore_integration::error::SocketError;
use thiserror::Error;

/// Wraps the low-level transport error plus Bybit's own REST error envelope (§6). Carries a
/// `code`/`message` rather than the raw JSON so callers can match on Bybit's numeric retCode
/// without depending on `serde_json` downstream.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Transport(#[from] SocketError),

    #[error("bybit api error {code}: {message}")]
    Api { code: i64, message: String },
}

/// Bybit v5's REST error envelope shape: `{"retCode": ..., "retMsg": "..."}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BybitApiError {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg")]
    pub ret_msg: String,
}

impl From<BybitApiError> for ExecutionError {
    fn from(error: BybitApiError) -> Self {
        ExecutionError::Api { code: error.ret_code, message: error.ret_msg }
    }
}
