use crate::error::SocketError;
use crate::protocol::http::{BuildStrategy, HttpParser};
use crate::protocol::http::rest::RestRequest;
use crate::rate_limit::{Priority, RateLimiter};
use tracing::debug;
use url::Url;

/// Generic, rate-limited REST client that signs and executes a [`RestRequest`] against a base
/// `url`, using `Signer` for request construction and `Parser` for response/error parsing.
///
/// Every outbound request passes through `limiter` first — the Bybit v5 adapter (C7/C9) uses
/// one `RestClient` per credential pair so its own rate limit doesn't starve the other mode.
pub struct RestClient<Signer, Parser> {
    http: reqwest::Client,
    base_url: Url,
    signer: Signer,
    parser: Parser,
    limiter: RateLimiter,
}

impl<Signer, Parser> RestClient<Signer, Parser>
where
    Signer: BuildStrategy,
    Parser: HttpParser,
{
    pub fn new(base_url: Url, signer: Signer, parser: Parser, limiter: RateLimiter) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            signer,
            parser,
            limiter,
        }
    }

    pub async fn execute<Request>(&self, request: Request) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        self.limiter.acquire(Priority::Normal).await;

        let url = self
            .base_url
            .join(&request.path())
            .map_err(|e| Parser::OutputError::from(SocketError::Signing(e.to_string())))?;

        let builder = self
            .http
            .request(Request::method(), url)
            .timeout(Request::timeout());
        let builder = match request.body() {
            Some(body) => builder.json(body),
            None => builder,
        };

        let built = self
            .signer
            .build(request, builder)
            .map_err(Parser::OutputError::from)?;

        debug!(method = %built.method(), url = %built.url(), "executing rest request");

        let response = self
            .http
            .execute(built)
            .await
            .map_err(SocketError::from)
            .map_err(Parser::OutputError::from)?;
        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(SocketError::from)
            .map_err(Parser::OutputError::from)?;

        self.parser.parse(status, &payload)
    }
}
