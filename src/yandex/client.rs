use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::query::Query;

const SEARCH_ENDPOINT: &str = "https://yandex.com/search/xml";
const LOCALE: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Outcome of one search request that reached the server.
///
/// Anything other than HTTP 200 is reported as `Status` with the body discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// Abstraction over the search provider.
/// Implemented by `YandexClient` for production; mock implementations used in tests.
pub trait SearchClient {
    async fn search(&self, query: &Query) -> Result<RawResponse, SearchError>;
}

#[derive(Clone)]
struct AccessKey(String);

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Yandex XML account name plus the key issued for it.
#[derive(Debug, Clone)]
pub struct Credentials {
    user: String,
    key: AccessKey,
}

impl Credentials {
    pub fn new(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key: AccessKey(key.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct YandexClient {
    http: Client,
    credentials: Credentials,
    endpoint: String,
}

impl YandexClient {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            endpoint: SEARCH_ENDPOINT.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(http: Client, credentials: Credentials, endpoint: &str) -> Self {
        Self {
            http,
            credentials,
            endpoint: endpoint.to_string(),
        }
    }

    fn request_url(&self, query: &Query) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &self.endpoint,
            [
                ("l10n", LOCALE),
                ("user", self.credentials.user.as_str()),
                ("key", self.credentials.key.0.as_str()),
                ("text", query.as_str()),
            ],
        )
    }
}

impl SearchClient for YandexClient {
    async fn search(&self, query: &Query) -> Result<RawResponse, SearchError> {
        let url = self.request_url(query)?;

        debug_assert!(
            url.scheme() == "https" || cfg!(test),
            "access key must only be sent over HTTPS"
        );

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = %status, "Yandex search request rejected");
            return Ok(RawResponse::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Yandex search complete");
        Ok(RawResponse::Body(body.to_vec()))
    }
}
