//! Blocking facade over the async client and path types.
//!
//! Each blocking [`Client`] owns a current-thread tokio runtime and
//! drives the async implementation with `block_on`, so both variants
//! share one code path and behave identically with respect to caching
//! and error semantics. Do not use these types inside an async context;
//! use the async surface directly there.

use std::sync::Arc;

use crate::api::models::{Item, Me};
use crate::api::AlistClient;
use crate::error::{AlistError, Result};
use crate::path::{self, PureAlistPath, RetryPolicy};

/// Blocking client for a single AList server.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<AlistClient>,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl Client {
    /// Create an unauthenticated blocking client for `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AlistError::Custom(format!("failed to build runtime: {e}")))?;
        Ok(Self {
            inner: Arc::new(AlistClient::new(base_url)?),
            runtime: Arc::new(runtime),
        })
    }

    /// The server base URL in canonical drive form.
    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    /// Set a pre-issued API token.
    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.set_token(token);
    }

    /// Log in with username and password, storing the token on success.
    pub fn login(&self, username: &str, password: &str, otp_code: Option<&str>) -> Result<Me> {
        self.runtime
            .block_on(self.inner.login(username, password, otp_code))
    }

    /// Profile of the authenticated user.
    pub fn me(&self) -> Result<Me> {
        self.runtime.block_on(self.inner.me())
    }

    /// Bind a path on this server.
    pub fn path(&self, s: impl AsRef<str>) -> Result<AlistPath> {
        Ok(AlistPath {
            inner: path::AlistPath::new(self.inner.clone(), s)?,
            runtime: self.runtime.clone(),
        })
    }
}

/// Blocking counterpart of [`crate::AlistPath`].
#[derive(Debug, Clone)]
pub struct AlistPath {
    inner: path::AlistPath,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl AlistPath {
    fn wrap(&self, inner: path::AlistPath) -> Self {
        Self {
            inner,
            runtime: self.runtime.clone(),
        }
    }

    pub fn pure(&self) -> &PureAlistPath {
        self.inner.pure()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn as_posix(&self) -> String {
        self.inner.as_posix()
    }

    pub fn join(&self, other: impl AsRef<str>) -> Self {
        self.wrap(self.inner.join(other))
    }

    pub fn parent(&self) -> Self {
        self.wrap(self.inner.parent())
    }

    pub fn cached_stat(&self) -> Option<Item> {
        self.inner.cached_stat()
    }

    pub fn stat(&self) -> Result<Item> {
        self.runtime.block_on(self.inner.stat())
    }

    pub fn re_stat(&self, policy: &RetryPolicy) -> Result<Item> {
        self.runtime.block_on(self.inner.re_stat(policy))
    }

    pub fn exists(&self) -> Result<bool> {
        self.runtime.block_on(self.inner.exists())
    }

    pub fn is_dir(&self) -> Result<bool> {
        self.runtime.block_on(self.inner.is_dir())
    }

    pub fn is_file(&self) -> Result<bool> {
        self.runtime.block_on(self.inner.is_file())
    }

    pub fn iterdir(&self) -> Result<Vec<AlistPath>> {
        let children = self.runtime.block_on(self.inner.iterdir())?;
        Ok(children.into_iter().map(|c| self.wrap(c)).collect())
    }

    pub fn mkdir(&self, parents: bool, exist_ok: bool) -> Result<()> {
        self.runtime.block_on(self.inner.mkdir(parents, exist_ok))
    }

    pub fn unlink(&self, missing_ok: bool) -> Result<()> {
        self.runtime.block_on(self.inner.unlink(missing_ok))
    }

    pub fn rmdir(&self, missing_ok: bool) -> Result<()> {
        self.runtime.block_on(self.inner.rmdir(missing_ok))
    }

    pub fn rename(&self, target: impl AsRef<str>) -> Result<AlistPath> {
        let renamed = self.runtime.block_on(self.inner.rename(target))?;
        Ok(self.wrap(renamed))
    }

    pub fn download_uri(&self) -> Result<String> {
        self.runtime.block_on(self.inner.download_uri())
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.read_bytes())
    }

    pub fn read_text(&self) -> Result<String> {
        self.runtime.block_on(self.inner.read_text())
    }

    pub fn write_bytes(&self, data: Vec<u8>, as_task: bool) -> Result<Item> {
        self.runtime.block_on(self.inner.write_bytes(data, as_task))
    }

    pub fn write_text(&self, text: &str, as_task: bool) -> Result<Item> {
        self.runtime.block_on(self.inner.write_text(text, as_task))
    }

    pub fn touch(&self) -> Result<()> {
        self.runtime.block_on(self.inner.touch())
    }
}

impl std::fmt::Display for AlistPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl PartialEq for AlistPath {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for AlistPath {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_path_algebra() {
        let client = Client::new("http://server:5244/").unwrap();
        assert_eq!(client.base_url(), "http://server:5244");

        let dir = client.path("/local/a").unwrap();
        let child = dir.join("f.txt");
        assert_eq!(child.to_string(), "http://server:5244/local/a/f.txt");
        assert_eq!(child.parent(), dir);
        assert_eq!(child.name(), "f.txt");
        assert!(child.cached_stat().is_none());
    }

    #[test]
    fn test_blocking_client_token_passthrough() {
        let client = Client::new("http://server:5244").unwrap();
        client.set_token("alist-xyz");
        // The path layer shares the same transport state.
        let path = client.path("/local").unwrap();
        assert_eq!(path.as_posix(), "/local");
    }
}
