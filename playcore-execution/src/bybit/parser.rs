use crate::error::{BybitApiError, ExecutionError};
use playcore_integration::protocol::http::HttpParser;
use reqwest::StatusCode;

/// Bybit v5 wraps every response — success or failure — in the same `{retCode, retMsg, result}`
/// envelope, so a non-zero `retCode` inside an HTTP 200 is how most API errors actually surface
/// (the default [`HttpParser::parse`] would otherwise treat this as a successful deserialize).
#[derive(Debug, Clone, Copy, Default)]
pub struct BybitHttpParser;

impl HttpParser for BybitHttpParser {
    type ApiError = BybitApiError;
    type OutputError = ExecutionError;

    fn parse_api_error(&self, _status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        ExecutionError::from(error)
    }
}
