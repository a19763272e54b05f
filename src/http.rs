//! Thin async HTTP utility shared by provider bootstrap, the token client,
//! and the userinfo client. Wraps a single `reqwest::Client` so connection
//! pooling is shared, and enforces a caller-or-default deadline uniformly.

use std::time::Duration;

/// Default deadline applied to every HTTP operation unless the caller
/// supplies one explicitly (§5 Concurrency & Resource Model).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Shared HTTP client used everywhere a network call is needed.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let fut = self.client.get(url).send();
        let resp = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| HttpError::Timeout)??;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }

    pub async fn get_bearer(&self, url: &str, bearer: &str) -> Result<HttpResponse, HttpError> {
        let fut = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {bearer}"))
            .send();
        let resp = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| HttpError::Timeout)??;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }

    /// POST a URL-form-encoded body, with caller-supplied extra headers
    /// (e.g. a pre-built `Authorization: Basic ...` value, or
    /// `Accept: application/json` for introspection). Headers are built by
    /// the caller rather than here, since the `Basic` value in this spec is
    /// not `reqwest`'s own `basic_auth` encoding (see `token::client`).
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut req = self.client.post(url).form(form);
        for (k, v) in extra_headers {
            req = req.header(*k, *v);
        }
        let resp = tokio::time::timeout(self.timeout, req.send())
            .await
            .map_err(|_| HttpError::Timeout)??;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
