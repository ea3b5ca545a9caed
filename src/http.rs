//! HTTP transport for AList API requests.
//!
//! Wraps a [`reqwest::Client`] with the server's base URL, the bearer
//! token header, and a fixed-size permit pool bounding in-flight requests.
//! One transport is created per distinct server and shared by every path
//! bound to it; the token can be replaced in place after a login.

use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::api::models::Resp;
use crate::error::{AlistError, Result};

/// Total per-request timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum simultaneous outbound requests per transport.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 30;

/// HTTP transport bound to a single AList server.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    permits: Semaphore,
}

impl HttpTransport {
    /// Create a transport for `base_url` with default timeout and limits.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_limits(base_url, DEFAULT_TIMEOUT, DEFAULT_MAX_IN_FLIGHT)
    }

    /// Create a transport with an explicit timeout and in-flight bound.
    pub fn with_limits(base_url: &str, timeout: Duration, max_in_flight: usize) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            permits: Semaphore::new(max_in_flight.max(1)),
        })
    }

    /// The server base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token in place. Affects all subsequent requests
    /// on this transport, including paths that already hold a reference.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().expect("token lock poisoned") = Some(token.into());
    }

    /// Current token, if a login has succeeded or one was supplied.
    pub fn token(&self) -> Option<String> {
        self.token.read().expect("token lock poisoned").clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|_| AlistError::Custom("transport permit pool closed".to_string()))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    /// POST a JSON body to an API path.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let _permit = self.acquire().await?;
        let request = self.authorized(self.client.post(self.url(path))).json(body);
        Ok(request.send().await?)
    }

    /// POST with query parameters and no body (task endpoints).
    pub async fn post_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let _permit = self.acquire().await?;
        let request = self.authorized(self.client.post(self.url(path))).query(query);
        Ok(request.send().await?)
    }

    /// GET an API path.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let _permit = self.acquire().await?;
        let request = self.authorized(self.client.get(self.url(path)));
        Ok(request.send().await?)
    }

    /// GET a fully-qualified URL, following redirects. Used for downloads,
    /// whose signed URLs may point at another host entirely.
    pub async fn get_absolute(&self, url: &str) -> Result<reqwest::Response> {
        let _permit = self.acquire().await?;
        let request = self.authorized(self.client.get(url));
        Ok(request.send().await?)
    }

    /// PUT a byte payload with extra headers (streaming upload endpoint).
    pub async fn put_bytes(
        &self,
        path: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<reqwest::Response> {
        let _permit = self.acquire().await?;
        let mut request = self.authorized(self.client.put(self.url(path)));
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        Ok(request.body(body).send().await?)
    }
}

/// Read a response into a typed envelope.
///
/// A non-2xx status with an unparsable body becomes a synthetic envelope
/// carrying the HTTP status as `code`; a 200 envelope whose `data` does
/// not match `T` is a schema error, logged with full context and raised.
pub(crate) async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<Resp<T>> {
    let status = response.status();
    let text = response.text().await?;

    let loose: Resp<serde_json::Value> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(
                context,
                status = status.as_u16(),
                "response body is not a JSON envelope: {err}"
            );
            return Ok(Resp::synthetic(
                status.as_u16() as i64,
                format!("invalid response body: {err}"),
            ));
        }
    };

    let data = match loose.data {
        Some(value) if loose.code == 200 => match serde_json::from_value::<T>(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::error!(
                    context,
                    code = loose.code,
                    body = %text,
                    "envelope data did not match the expected shape"
                );
                return Err(AlistError::Schema {
                    endpoint: context.to_string(),
                    detail: err.to_string(),
                });
            }
        },
        _ => None,
    };

    Ok(Resp {
        code: loose.code,
        message: loose.message,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let transport = HttpTransport::new("http://server:5244/").unwrap();
        assert_eq!(transport.base_url(), "http://server:5244");
        assert_eq!(transport.url("/api/me"), "http://server:5244/api/me");
    }

    #[test]
    fn test_token_replaced_in_place() {
        let transport = HttpTransport::new("http://server:5244").unwrap();
        assert!(transport.token().is_none());

        transport.set_token("alist-abc");
        assert_eq!(transport.token().as_deref(), Some("alist-abc"));

        transport.set_token("alist-def");
        assert_eq!(transport.token().as_deref(), Some("alist-def"));
    }

    #[tokio::test]
    async fn test_permit_pool_bounds_concurrency() {
        let transport = HttpTransport::with_limits("http://server", DEFAULT_TIMEOUT, 2).unwrap();

        let first = transport.acquire().await.unwrap();
        let _second = transport.acquire().await.unwrap();
        assert_eq!(transport.permits.available_permits(), 0);

        drop(first);
        assert_eq!(transport.permits.available_permits(), 1);
    }
}
