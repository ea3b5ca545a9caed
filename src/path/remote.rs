//! Remote paths bound to an authenticated client.
//!
//! [`AlistPath`] maps filesystem idioms onto REST calls: `stat` resolves
//! through the parent's listing cache, `iterdir` pre-populates each child
//! with its metadata so statting them costs no extra round-trips, and the
//! mutating verbs pre-check existence client-side to produce the precise
//! exists/missing semantics the remote API does not distinguish.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::models::Item;
use crate::api::AlistClient;
use crate::error::{AlistError, Result};
use crate::path::pure::PureAlistPath;
use crate::registry::ServerIdentity;

/// Bounded retry for absorbing eventual-consistency lag after writes.
///
/// Only `re_stat` retries; every other operation treats an immediate
/// NotFound as authoritative. Tests use [`RetryPolicy::none`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Single attempt, no waiting.
    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// A remote path bound to its server's client.
///
/// Cloning and the derivation methods (`join`, `parent`) are cheap; each
/// derived path starts with an empty stat snapshot. The snapshot is set
/// by `iterdir` pre-population or the first `stat()`, and is dropped only
/// by `re_stat` and the mutating verbs, never silently.
#[derive(Debug, Clone)]
pub struct AlistPath {
    pure: PureAlistPath,
    client: Arc<AlistClient>,
    snapshot: Arc<Mutex<Option<Item>>>,
}

impl AlistPath {
    /// Bind a path string to `client`. A drive-less path adopts the
    /// client's server; a drive-carrying path must name the same server.
    pub fn new(client: Arc<AlistClient>, path: impl AsRef<str>) -> Result<Self> {
        let parsed = PureAlistPath::new(path.as_ref());
        let server = ServerIdentity::parse(client.base_url())?;

        let pure = if parsed.drive().is_empty() {
            if !parsed.has_root() {
                return Err(AlistError::InvalidPath(format!(
                    "remote path must be absolute: {parsed}"
                )));
            }
            PureAlistPath::new(format!("{server}{}", parsed.as_posix()))
        } else {
            if ServerIdentity::parse(parsed.drive())? != server {
                return Err(AlistError::InvalidPath(format!(
                    "path drive {} does not match client server {server}",
                    parsed.drive()
                )));
            }
            parsed
        };

        Ok(Self::bound(pure, client))
    }

    pub(crate) fn bound(pure: PureAlistPath, client: Arc<AlistClient>) -> Self {
        Self {
            pure,
            client,
            snapshot: Arc::new(Mutex::new(None)),
        }
    }

    fn with_snapshot(pure: PureAlistPath, client: Arc<AlistClient>, item: Item) -> Self {
        Self {
            pure,
            client,
            snapshot: Arc::new(Mutex::new(Some(item))),
        }
    }

    // ---- structure ----

    /// The network-free path value.
    pub fn pure(&self) -> &PureAlistPath {
        &self.pure
    }

    /// The client this path dispatches to.
    pub fn client(&self) -> &Arc<AlistClient> {
        &self.client
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.pure.name()
    }

    /// POSIX form with the drive stripped, as the server expects.
    pub fn as_posix(&self) -> String {
        self.pure.as_posix()
    }

    /// Join with a relative (or rooted) path, staying on this server.
    pub fn join(&self, other: impl AsRef<str>) -> Self {
        Self::bound(self.pure.join(other), self.client.clone())
    }

    /// Parent path. The parent of the server root is the root itself.
    pub fn parent(&self) -> Self {
        Self::bound(self.pure.parent(), self.client.clone())
    }

    /// Whether this is the server's root directory.
    pub fn is_server_root(&self) -> bool {
        self.pure.segments().is_empty()
    }

    /// Current stat snapshot, if one is cached on this instance.
    pub fn cached_stat(&self) -> Option<Item> {
        self.snapshot.lock().expect("snapshot lock poisoned").clone()
    }

    fn store_snapshot(&self, item: Item) {
        *self.snapshot.lock().expect("snapshot lock poisoned") = Some(item);
    }

    fn clear_snapshot(&self) {
        *self.snapshot.lock().expect("snapshot lock poisoned") = None;
    }

    // ---- stat family ----

    /// Metadata for this path, served from the cheapest source available:
    /// the per-instance snapshot, then the parent's listing cache, with
    /// the root falling back to the item-info endpoint.
    pub async fn stat(&self) -> Result<Item> {
        if let Some(item) = self.cached_stat() {
            return Ok(item);
        }

        if self.is_server_root() {
            return self.fetch_item_info(&RetryPolicy::none()).await;
        }

        let parent = self.parent().as_posix();
        let listing = self.client.list_dir_cached(&parent, false, false).await?;
        match listing.get(self.name()) {
            Some(item) => {
                self.store_snapshot(item.clone());
                Ok(item.clone())
            }
            None => Err(AlistError::NotFound(self.to_string())),
        }
    }

    /// Drop the snapshot and re-fetch authoritative metadata from the
    /// item-info endpoint, retrying per `policy` to absorb listing lag
    /// after a just-completed write.
    pub async fn re_stat(&self, policy: &RetryPolicy) -> Result<Item> {
        self.clear_snapshot();
        self.fetch_item_info(policy).await
    }

    async fn fetch_item_info(&self, policy: &RetryPolicy) -> Result<Item> {
        let posix = self.as_posix();
        let mut attempt = 0u32;
        loop {
            let envelope = self.client.get_item_info(&posix, None).await?;
            if envelope.is_ok() {
                let parent = (!self.is_server_root()).then(|| self.parent().as_posix());
                let item = envelope.into_data("/api/fs/get")?.into_item(parent);
                self.store_snapshot(item.clone());
                return Ok(item);
            }
            if !envelope.indicates_missing() {
                return Err(AlistError::Storage {
                    code: envelope.code,
                    message: envelope.message,
                });
            }
            if attempt >= policy.retries {
                return Err(AlistError::NotFound(self.to_string()));
            }
            attempt += 1;
            tracing::debug!(path = %self, attempt, "item not visible yet, retrying stat");
            tokio::time::sleep(policy.delay).await;
        }
    }

    /// Whether the path exists right now. Always force-refreshes: a stale
    /// cache never answers an existence check.
    pub async fn exists(&self) -> Result<bool> {
        match self.re_stat(&RetryPolicy::none()).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether the path is a directory.
    pub async fn is_dir(&self) -> Result<bool> {
        Ok(self.stat().await?.is_dir)
    }

    /// Whether the path is a regular file.
    pub async fn is_file(&self) -> Result<bool> {
        Ok(!self.stat().await?.is_dir)
    }

    // ---- directory operations ----

    /// Children of this directory, each pre-populated with its metadata
    /// snapshot so an immediate `stat()` needs no further network call.
    ///
    /// The listing is fetched with `refresh`, bypassing both caches, and
    /// is returned sorted by name.
    pub async fn iterdir(&self) -> Result<Vec<AlistPath>> {
        if !self.is_dir().await? {
            return Err(AlistError::NotADirectory(self.to_string()));
        }

        let posix = self.as_posix();
        let listing = self.client.list_dir_cached(&posix, true, true).await?;

        let mut children: Vec<AlistPath> = listing
            .into_values()
            .map(|item| {
                let pure = self.pure.join(&item.name);
                Self::with_snapshot(pure, self.client.clone(), item)
            })
            .collect();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(children)
    }

    /// Create this directory.
    ///
    /// With `parents` unset, a missing parent is an error raised before
    /// the endpoint is called (the server would happily create the whole
    /// chain). With `exist_ok`, an existing directory is not an error;
    /// an existing non-directory always is.
    pub async fn mkdir(&self, parents: bool, exist_ok: bool) -> Result<()> {
        match self.re_stat(&RetryPolicy::none()).await {
            Ok(existing) => {
                return if exist_ok && existing.is_dir {
                    Ok(())
                } else {
                    Err(AlistError::FileExists(self.to_string()))
                };
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        if !parents {
            let parent = self.parent();
            if !parent.is_server_root() && !parent.exists().await? {
                return Err(AlistError::NotFound(parent.to_string()));
            }
        }

        self.client
            .mkdir(&self.as_posix())
            .await?
            .ensure_ok("/api/fs/mkdir")?;
        self.client.invalidate_dir(&self.parent().as_posix());
        Ok(())
    }

    /// Remove this file. With `missing_ok`, an already-absent path is not
    /// an error. Directories are refused; use [`AlistPath::rmdir`].
    pub async fn unlink(&self, missing_ok: bool) -> Result<()> {
        let meta = match self.re_stat(&RetryPolicy::none()).await {
            Ok(meta) => meta,
            Err(err) if err.is_not_found() && missing_ok => return Ok(()),
            Err(err) => return Err(err),
        };
        if meta.is_dir {
            return Err(AlistError::IsADirectory(self.to_string()));
        }

        let parent = self.parent().as_posix();
        self.client
            .remove(&parent, &[self.name()])
            .await?
            .ensure_ok("/api/fs/remove")?;
        self.clear_snapshot();
        self.client.invalidate_dir(&parent);
        Ok(())
    }

    /// Remove this directory, which must be empty.
    pub async fn rmdir(&self, missing_ok: bool) -> Result<()> {
        let meta = match self.re_stat(&RetryPolicy::none()).await {
            Ok(meta) => meta,
            Err(err) if err.is_not_found() && missing_ok => return Ok(()),
            Err(err) => return Err(err),
        };
        if !meta.is_dir {
            return Err(AlistError::NotADirectory(self.to_string()));
        }

        let posix = self.as_posix();
        self.client
            .remove_empty_directory(&posix)
            .await?
            .ensure_ok("/api/fs/remove_empty_directory")?;
        self.clear_snapshot();
        self.client.invalidate_dir(&posix);
        self.client.invalidate_dir(&self.parent().as_posix());
        Ok(())
    }

    /// Resolve a rename target: a bare name renames in place, a rooted
    /// path addresses the same server, a full URI must match the drive.
    fn resolve_rename_target(&self, target: &str) -> Result<PureAlistPath> {
        let parsed = PureAlistPath::new(target);
        if !parsed.drive().is_empty() {
            if parsed.drive() != self.pure.drive() {
                return Err(AlistError::InvalidPath(format!(
                    "cannot rename across servers: {} -> {}",
                    self, parsed
                )));
            }
            return Ok(parsed);
        }
        if parsed.has_root() {
            return Ok(self.pure.join(target));
        }
        Ok(self.pure.parent().join(target))
    }

    /// Move/rename this path to `target` on the same server.
    ///
    /// A relative `target` renames within the current parent; a rooted
    /// one addresses the same server. A parent change issues a move call;
    /// a leaf-name change issues a rename call; both when needed, in that
    /// order. If the rename fails after the move succeeded the item stays
    /// moved under its old name; there is no rollback.
    pub async fn rename(&self, target: impl AsRef<str>) -> Result<AlistPath> {
        let target_pure = self.resolve_rename_target(target.as_ref())?;
        let target = Self::bound(target_pure, self.client.clone());
        if target.pure == self.pure {
            return Ok(target);
        }

        self.re_stat(&RetryPolicy::none()).await?;

        let src_parent = self.parent().as_posix();
        let dst_parent = target.parent().as_posix();

        if src_parent != dst_parent {
            self.client
                .move_files(&src_parent, &dst_parent, &[self.name()])
                .await?
                .ensure_ok("/api/fs/move")?;
        }

        if self.name() != target.name() {
            let moved = target.parent().join(self.name()).as_posix();
            self.client
                .rename(target.name(), &moved)
                .await?
                .ensure_ok("/api/fs/rename")?;
        }

        self.clear_snapshot();
        self.client.invalidate_dir(&src_parent);
        self.client.invalidate_dir(&dst_parent);
        Ok(target)
    }

    // ---- content operations ----

    /// Signed download URI for this file: drive + `/d` + path + `?sign=`.
    ///
    /// The signature is fetched fresh on every call; a cached one may
    /// have expired.
    pub async fn download_uri(&self) -> Result<String> {
        if !self.pure.is_absolute() {
            return Err(AlistError::InvalidPath(format!(
                "relative path has no download URI: {self}"
            )));
        }
        let envelope = self.client.get_item_info(&self.as_posix(), None).await?;
        if envelope.indicates_missing() {
            return Err(AlistError::NotFound(self.to_string()));
        }
        let raw = envelope.into_data("/api/fs/get")?;
        if raw.is_dir {
            return Err(AlistError::IsADirectory(self.to_string()));
        }
        Ok(format!(
            "{}/d{}?sign={}",
            self.pure.drive(),
            self.as_posix(),
            raw.sign
        ))
    }

    /// Download the file contents, following redirects to the backing
    /// provider.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let uri = self.download_uri().await?;
        self.client.download(&uri).await
    }

    /// Download and decode the file contents as UTF-8.
    pub async fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes().await?;
        String::from_utf8(bytes)
            .map_err(|_| AlistError::Custom(format!("file is not valid UTF-8: {self}")))
    }

    /// Upload `data` to this path, then return the freshly re-fetched
    /// metadata. The default retry policy absorbs the remote listing lag
    /// right after an upload.
    pub async fn write_bytes(&self, data: Vec<u8>, as_task: bool) -> Result<Item> {
        self.write_bytes_with(data, as_task, &RetryPolicy::default()).await
    }

    /// [`AlistPath::write_bytes`] with an explicit post-write stat policy.
    pub async fn write_bytes_with(
        &self,
        data: Vec<u8>,
        as_task: bool,
        policy: &RetryPolicy,
    ) -> Result<Item> {
        let posix = self.as_posix();
        self.client
            .upload_file_put(data, &posix, as_task)
            .await?
            .ensure_ok("/api/fs/put")?;
        self.client.invalidate_dir(&self.parent().as_posix());
        self.re_stat(policy).await
    }

    /// Upload a UTF-8 string to this path.
    pub async fn write_text(&self, text: &str, as_task: bool) -> Result<Item> {
        self.write_bytes(text.as_bytes().to_vec(), as_task).await
    }

    /// Create an empty file at this path.
    pub async fn touch(&self) -> Result<()> {
        self.write_bytes(Vec::new(), false).await?;
        Ok(())
    }
}

impl fmt::Display for AlistPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pure.fmt(f)
    }
}

/// Equality and hashing are structural over the path value; the snapshot
/// and client binding do not participate.
impl PartialEq for AlistPath {
    fn eq(&self, other: &Self) -> bool {
        self.pure == other.pure
    }
}

impl Eq for AlistPath {}

impl Hash for AlistPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pure.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn client() -> Arc<AlistClient> {
        Arc::new(AlistClient::new("http://server:5244").unwrap())
    }

    fn item(name: &str, size: u64, is_dir: bool, parent: &str) -> Item {
        Item {
            name: name.to_string(),
            size,
            is_dir,
            modified: Utc::now(),
            created: None,
            sign: "sig".to_string(),
            thumb: String::new(),
            type_code: 0,
            hashinfo: None,
            parent: Some(parent.to_string()),
        }
    }

    #[test]
    fn test_new_adopts_client_drive() {
        let path = AlistPath::new(client(), "/local/f.txt").unwrap();
        assert_eq!(path.to_string(), "http://server:5244/local/f.txt");
        assert_eq!(path.as_posix(), "/local/f.txt");
    }

    #[test]
    fn test_new_accepts_matching_drive_any_spelling() {
        let path = AlistPath::new(client(), "http://server:5244/local/f.txt").unwrap();
        assert_eq!(path.name(), "f.txt");

        // A different server is rejected.
        let err = AlistPath::new(client(), "http://other:5244/local/f.txt");
        assert!(matches!(err, Err(AlistError::InvalidPath(_))));

        // A relative path cannot be bound.
        let err = AlistPath::new(client(), "local/f.txt");
        assert!(matches!(err, Err(AlistError::InvalidPath(_))));
    }

    #[test]
    fn test_join_and_parent_share_client() {
        let dir = AlistPath::new(client(), "/local/a").unwrap();
        let child = dir.join("f.txt");
        assert_eq!(child.as_posix(), "/local/a/f.txt");
        assert!(Arc::ptr_eq(child.client(), dir.client()));

        assert_eq!(child.parent(), dir);
        assert!(child.cached_stat().is_none());
    }

    #[test]
    fn test_root_detection() {
        let root = AlistPath::new(client(), "/").unwrap();
        assert!(root.is_server_root());
        assert_eq!(root.parent(), root);
        assert!(!root.join("a").is_server_root());
    }

    #[test]
    fn test_structural_equality() {
        let a = AlistPath::new(client(), "/local/f.txt").unwrap();
        let b = AlistPath::new(client(), "http://server:80/local/f.txt");
        // Different client instances, different default-port spelling:
        // still not the same server (5244 vs 80).
        assert!(b.is_err() || a != b.unwrap());

        let c = AlistPath::new(a.client().clone(), "/local/f.txt").unwrap();
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn test_stat_served_from_parent_listing_cache() {
        let client = client();
        client.seed_dir_cache(
            "/local/a",
            HashMap::from([("f.txt".to_string(), item("f.txt", 5, false, "/local/a"))]),
        );

        let path = AlistPath::new(client, "/local/a/f.txt").unwrap();
        assert!(path.cached_stat().is_none());

        let meta = path.stat().await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(!meta.is_dir);

        // The snapshot is now populated; statting again is instance-local.
        assert_eq!(path.cached_stat().unwrap().size, 5);
        assert_eq!(path.stat().await.unwrap().size, 5);
    }

    #[tokio::test]
    async fn test_stat_missing_child_is_not_found() {
        let client = client();
        client.seed_dir_cache(
            "/local/a",
            HashMap::from([("f.txt".to_string(), item("f.txt", 5, false, "/local/a"))]),
        );

        let path = AlistPath::new(client, "/local/a/missing.txt").unwrap();
        match path.stat().await {
            Err(AlistError::NotFound(p)) => {
                assert_eq!(p, "http://server:5244/local/a/missing.txt")
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_is_dir_uses_snapshot() {
        let client = client();
        client.seed_dir_cache(
            "/local",
            HashMap::from([("a".to_string(), item("a", 0, true, "/local"))]),
        );
        let dir = AlistPath::new(client, "/local/a").unwrap();
        assert!(dir.is_dir().await.unwrap());
        assert!(!dir.is_file().await.unwrap());
    }

    #[test]
    fn test_retry_policy_values() {
        let none = RetryPolicy::none();
        assert_eq!(none.retries, 0);
        assert_eq!(none.delay, Duration::ZERO);

        let default = RetryPolicy::default();
        assert!(default.retries > 0);

        let custom = RetryPolicy::new(7, Duration::from_millis(50));
        assert_eq!(custom.retries, 7);
        assert_eq!(custom.delay, Duration::from_millis(50));
    }

    #[test]
    fn test_rename_target_resolution() {
        let src = AlistPath::new(client(), "/local/a/f.txt").unwrap();

        // A bare name renames within the parent.
        let sibling = src.resolve_rename_target("g.txt").unwrap();
        assert_eq!(sibling.as_posix(), "/local/a/g.txt");
        assert_eq!(sibling.drive(), "http://server:5244");

        // A rooted path addresses the same server.
        let moved = src.resolve_rename_target("/local/b/g.txt").unwrap();
        assert_eq!(moved.as_posix(), "/local/b/g.txt");
        assert_eq!(moved.drive(), "http://server:5244");

        // A full URI must match the drive.
        let full = src
            .resolve_rename_target("http://server:5244/local/b/g.txt")
            .unwrap();
        assert_eq!(full.as_posix(), "/local/b/g.txt");
        assert!(
            src.resolve_rename_target("http://other/local/b/g.txt")
                .is_err()
        );
    }
}
