//! AList API client: login flow and the filesystem endpoint surface.
//!
//! One method per REST endpoint; each builds a request, feeds the raw
//! response through the envelope reader, and returns the typed envelope.
//! The path layer interprets envelopes; nothing here raises on a non-200
//! code except the login flow, which must not continue unauthenticated.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::json;

use crate::api::models::{
    DirItem, Item, ListData, LoginData, Me, RawItem, Resp, SearchData,
};
use crate::cache::DirCache;
use crate::error::{AlistError, Result};
use crate::http::{HttpTransport, read_envelope};

/// Matches Python's `urllib.parse.quote_plus`: everything but
/// `[A-Za-z0-9_.-~]` is escaped, and spaces become `+`.
const FILE_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, FILE_PATH_SET)
        .to_string()
        .replace("%20", "+")
}

/// What `/api/fs/search` should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All = 0,
    Directories = 1,
    Files = 2,
}

/// Client for a single AList server.
///
/// Owns the authenticated transport and the directory-listing cache.
/// Create one per server via [`crate::Registry`] and share it with `Arc`.
#[derive(Debug)]
pub struct AlistClient {
    transport: HttpTransport,
    dir_cache: Mutex<DirCache>,
}

impl AlistClient {
    /// Create an unauthenticated client for `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(base_url)?,
            dir_cache: Mutex::new(DirCache::default()),
        })
    }

    /// Create a client around a pre-configured transport.
    pub fn with_transport(transport: HttpTransport) -> Self {
        Self {
            transport,
            dir_cache: Mutex::new(DirCache::default()),
        }
    }

    /// The server base URL in canonical drive form.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Set the API token directly (pre-issued tokens).
    pub fn set_token(&self, token: impl Into<String>) {
        self.transport.set_token(token);
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.transport.token()
    }

    pub(crate) fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Exchange credentials for a token, store it on the transport, and
    /// verify it against `/api/me`.
    ///
    /// On failure the token stays unset and an authentication error is
    /// raised; the client never continues silently unauthenticated.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        otp_code: Option<&str>,
    ) -> Result<Me> {
        let response = self
            .transport
            .post_json(
                "/api/auth/login",
                &json!({
                    "username": username,
                    "password": password,
                    "otp_code": otp_code.unwrap_or(""),
                }),
            )
            .await?;
        let envelope: Resp<LoginData> = read_envelope(response, "/api/auth/login").await?;

        if !envelope.is_ok() {
            tracing::warn!(code = envelope.code, "login failed: {}", envelope.message);
            return Err(AlistError::Auth(envelope.message));
        }
        let token = envelope
            .data
            .ok_or_else(|| AlistError::Auth("login response carried no token".to_string()))?
            .token;
        self.transport.set_token(token);

        let me = self.me().await?;
        tracing::info!(username = %me.username, server = %self.base_url(), "login verified");
        Ok(me)
    }

    /// Profile of the authenticated user. Doubles as token verification.
    pub async fn me(&self) -> Result<Me> {
        let response = self.transport.get("/api/me").await?;
        let envelope: Resp<Me> = read_envelope(response, "/api/me").await?;
        if !envelope.is_ok() {
            return Err(AlistError::Auth(envelope.message));
        }
        envelope.into_data("/api/me")
    }

    // ---- filesystem endpoints ----

    /// List a directory (`/api/fs/list`).
    pub async fn list_files(&self, path: &str, refresh: bool) -> Result<Resp<ListData>> {
        self.list_files_paged(path, None, 1, 0, refresh).await
    }

    /// List a directory with paging and an optional access password.
    pub async fn list_files_paged(
        &self,
        path: &str,
        password: Option<&str>,
        page: u64,
        per_page: u64,
        refresh: bool,
    ) -> Result<Resp<ListData>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/list",
                &json!({
                    "path": path,
                    "password": password.unwrap_or(""),
                    "page": page,
                    "per_page": per_page,
                    "refresh": refresh,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/list").await
    }

    /// Full information for a single object (`/api/fs/get`).
    pub async fn get_item_info(
        &self,
        path: &str,
        password: Option<&str>,
    ) -> Result<Resp<RawItem>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/get",
                &json!({
                    "path": path,
                    "password": password.unwrap_or(""),
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/get").await
    }

    /// Child directory names only (`/api/fs/dirs`).
    pub async fn get_dirs(&self, path: &str, refresh: bool) -> Result<Resp<Vec<DirItem>>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/dirs",
                &json!({
                    "path": path,
                    "password": "",
                    "refresh": refresh,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/dirs").await
    }

    /// Create a directory (`/api/fs/mkdir`). Parents are created by the
    /// server as needed; precise exists/missing semantics live in the
    /// path layer.
    pub async fn mkdir(&self, path: &str) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json("/api/fs/mkdir", &json!({ "path": path }))
            .await?;
        read_envelope(response, "/api/fs/mkdir").await
    }

    /// Rename an object in place (`/api/fs/rename`). `path` is the full
    /// current path, `name` the bare new leaf name.
    pub async fn rename(&self, name: &str, path: &str) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/rename",
                &json!({
                    "name": name,
                    "path": path,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/rename").await
    }

    /// Move named children of `src_dir` into `dst_dir` (`/api/fs/move`).
    pub async fn move_files(
        &self,
        src_dir: &str,
        dst_dir: &str,
        names: &[&str],
    ) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/move",
                &json!({
                    "src_dir": src_dir,
                    "dst_dir": dst_dir,
                    "names": names,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/move").await
    }

    /// Copy named children of `src_dir` into `dst_dir` (`/api/fs/copy`).
    pub async fn copy_files(
        &self,
        src_dir: &str,
        dst_dir: &str,
        names: &[&str],
    ) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/copy",
                &json!({
                    "src_dir": src_dir,
                    "dst_dir": dst_dir,
                    "names": names,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/copy").await
    }

    /// Move the entire contents of one directory into another
    /// (`/api/fs/recursive_move`).
    pub async fn recursive_move(
        &self,
        src_dir: &str,
        dst_dir: &str,
    ) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/recursive_move",
                &json!({
                    "src_dir": src_dir,
                    "dst_dir": dst_dir,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/recursive_move").await
    }

    /// Remove named children of `dir` (`/api/fs/remove`).
    pub async fn remove(&self, dir: &str, names: &[&str]) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/remove",
                &json!({
                    "dir": dir,
                    "names": names,
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/remove").await
    }

    /// Remove an empty directory (`/api/fs/remove_empty_directory`).
    pub async fn remove_empty_directory(
        &self,
        src_dir: &str,
    ) -> Result<Resp<serde_json::Value>> {
        let response = self
            .transport
            .post_json("/api/fs/remove_empty_directory", &json!({ "src_dir": src_dir }))
            .await?;
        read_envelope(response, "/api/fs/remove_empty_directory").await
    }

    /// Streaming upload (`PUT /api/fs/put`). The target path travels in a
    /// URL-escaped header; `as_task` defers the write to a server task.
    pub async fn upload_file_put(
        &self,
        data: Vec<u8>,
        path: &str,
        as_task: bool,
    ) -> Result<Resp<serde_json::Value>> {
        let headers = [
            ("As-Task", if as_task { "true" } else { "false" }.to_string()),
            ("Content-Type", "application/octet-stream".to_string()),
            ("Last-Modified", Utc::now().timestamp_millis().to_string()),
            ("File-Path", quote_plus(path)),
        ];
        let response = self.transport.put_bytes("/api/fs/put", &headers, data).await?;
        read_envelope(response, "/api/fs/put").await
    }

    /// Search under `parent` (`/api/fs/search`).
    pub async fn search(
        &self,
        parent: &str,
        keywords: &str,
        scope: SearchScope,
        page: u64,
        per_page: u64,
    ) -> Result<Resp<SearchData>> {
        let response = self
            .transport
            .post_json(
                "/api/fs/search",
                &json!({
                    "parent": parent,
                    "keywords": keywords,
                    "scope": scope as i64,
                    "page": page,
                    "per_page": per_page,
                    "password": "",
                }),
            )
            .await?;
        read_envelope(response, "/api/fs/search").await
    }

    /// GET a fully-qualified (signed) download URL, following redirects,
    /// and return the body bytes.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.transport.get_absolute(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AlistError::Storage {
                code: status.as_u16() as i64,
                message: format!("download failed for {url}"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    // ---- directory-listing cache ----

    /// Listing of `dir` as a name-to-metadata map, served from the cache
    /// unless `refresh` forces a re-fetch.
    ///
    /// Each returned item carries `parent = dir`, so a single listing
    /// resolves both `iterdir()` and the `stat()` of every child. Empty
    /// listings are cached only when `allow_empty` is set.
    pub async fn list_dir_cached(
        &self,
        dir: &str,
        refresh: bool,
        allow_empty: bool,
    ) -> Result<HashMap<String, Item>> {
        if !refresh {
            let cache = self.dir_cache.lock().expect("dir cache lock poisoned");
            if let Some(listing) = cache.get(dir) {
                return Ok(listing.clone());
            }
        }

        let envelope = self.list_files(dir, refresh).await?;
        if envelope.indicates_missing() {
            return Err(AlistError::NotFound(dir.to_string()));
        }
        let data = envelope.into_data("/api/fs/list")?;

        let mut listing = HashMap::new();
        for mut item in data.content.unwrap_or_default() {
            item.parent = Some(dir.to_string());
            listing.insert(item.name.clone(), item);
        }

        self.dir_cache
            .lock()
            .expect("dir cache lock poisoned")
            .insert(dir, listing.clone(), allow_empty);
        Ok(listing)
    }

    /// Metadata for `name` under `dir` if the listing is already cached.
    pub fn cached_child(&self, dir: &str, name: &str) -> Option<Item> {
        self.dir_cache
            .lock()
            .expect("dir cache lock poisoned")
            .lookup(dir, name)
    }

    /// Drop the cached listing for `dir`.
    pub fn invalidate_dir(&self, dir: &str) {
        self.dir_cache
            .lock()
            .expect("dir cache lock poisoned")
            .invalidate(dir);
    }

    #[cfg(test)]
    pub(crate) fn seed_dir_cache(&self, dir: &str, listing: HashMap<String, Item>) {
        self.dir_cache
            .lock()
            .expect("dir cache lock poisoned")
            .insert(dir, listing, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plus_matches_python() {
        assert_eq!(quote_plus("/local/a/f.txt"), "%2Flocal%2Fa%2Ff.txt");
        assert_eq!(quote_plus("/local/my file.txt"), "%2Flocal%2Fmy+file.txt");
        assert_eq!(quote_plus("safe_-.~chars"), "safe_-.~chars");
        assert_eq!(quote_plus("/本地/文件"), "%2F%E6%9C%AC%E5%9C%B0%2F%E6%96%87%E4%BB%B6");
    }

    #[test]
    fn test_search_scope_codes() {
        assert_eq!(SearchScope::All as i64, 0);
        assert_eq!(SearchScope::Directories as i64, 1);
        assert_eq!(SearchScope::Files as i64, 2);
    }

    #[test]
    fn test_client_starts_unauthenticated() {
        let client = AlistClient::new("http://server:5244/").unwrap();
        assert!(client.token().is_none());
        assert_eq!(client.base_url(), "http://server:5244");
    }

    #[test]
    fn test_cached_child_roundtrip() {
        use chrono::Utc;

        let client = AlistClient::new("http://server:5244").unwrap();
        let item = Item {
            name: "f.txt".to_string(),
            size: 5,
            is_dir: false,
            modified: Utc::now(),
            created: None,
            sign: "s".to_string(),
            thumb: String::new(),
            type_code: 4,
            hashinfo: None,
            parent: Some("/local/a".to_string()),
        };
        client.seed_dir_cache("/local/a", HashMap::from([("f.txt".to_string(), item)]));

        let hit = client.cached_child("/local/a", "f.txt").unwrap();
        assert_eq!(hit.size, 5);
        assert!(client.cached_child("/local/a", "g.txt").is_none());

        client.invalidate_dir("/local/a");
        assert!(client.cached_child("/local/a", "f.txt").is_none());
    }
}
