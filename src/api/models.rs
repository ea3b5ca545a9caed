//! Typed response payloads for the AList REST API.
//!
//! Every endpoint wraps its payload in the same `{code, message, data}`
//! envelope; the shape of `data` depends on the endpoint that produced it.
//! The envelope is generic over the payload type, and each endpoint method
//! selects the decoder by instantiating [`Resp`] with the matching variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `{code, message, data}` wrapper present on every API response.
///
/// `code == 200` signals success. Non-2xx HTTP responses and unparsable
/// bodies are converted into a synthetic envelope carrying the HTTP status
/// as `code`, so callers always receive a typed envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Resp<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Resp<T> {
    /// Build an envelope for a response the server never produced
    /// (transport failure, non-JSON body).
    pub fn synthetic(code: i64, message: impl Into<String>) -> Self {
        Resp {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Whether the server reported success.
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }

    /// The server reports "object not found" / "storage not found" as a
    /// generic 500; stat-family operations translate that into NotFound.
    pub fn indicates_missing(&self) -> bool {
        self.code == 500
            && (self.message.contains("object not found")
                || self.message.contains("storage not found")
                || self.message.contains("failed get storage"))
    }

    /// Check for success, discarding any payload. For endpoints whose
    /// success `data` is null (mkdir, rename, remove).
    pub fn ensure_ok(self, _context: &str) -> crate::Result<()> {
        if !self.is_ok() {
            return Err(crate::AlistError::Storage {
                code: self.code,
                message: self.message,
            });
        }
        Ok(())
    }

    /// Extract the success payload, or the error the envelope stands for.
    pub fn into_data(self, context: &str) -> crate::Result<T> {
        if !self.is_ok() {
            return Err(crate::AlistError::Storage {
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or_else(|| crate::AlistError::Schema {
            endpoint: context.to_string(),
            detail: "missing data in 200 envelope".to_string(),
        })
    }
}

impl<T> Resp<Vec<T>> {
    /// Extract a list payload, treating a null `data` as empty. The task
    /// endpoints return `data: null` for an empty queue.
    pub fn into_list(self, _context: &str) -> crate::Result<Vec<T>> {
        if !self.is_ok() {
            return Err(crate::AlistError::Storage {
                code: self.code,
                message: self.message,
            });
        }
        Ok(self.data.unwrap_or_default())
    }
}

/// A file or directory entry as returned by `/api/fs/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// Download signature; may expire and differ per request.
    #[serde(default)]
    pub sign: String,
    #[serde(default)]
    pub thumb: String,
    /// MIME-ish type code assigned by the server.
    #[serde(rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub hashinfo: Option<String>,
    /// Directory that produced this entry; filled in client-side.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Item {
    /// Full remote path of this entry, derived from `parent` + `name`.
    pub fn full_path(&self) -> String {
        match self.parent.as_deref() {
            Some("/") | None => format!("/{}", self.name),
            Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), self.name),
        }
    }
}

/// Full information for a single object, as returned by `/api/fs/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sign: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub raw_url: String,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub related: Option<serde_json::Value>,
}

impl RawItem {
    /// Reduce to the listing-entry shape used for stat snapshots.
    pub fn into_item(self, parent: Option<String>) -> Item {
        Item {
            name: self.name,
            size: self.size,
            is_dir: self.is_dir,
            modified: self.modified,
            created: self.created,
            sign: self.sign,
            thumb: self.thumb,
            type_code: self.type_code,
            hashinfo: None,
            parent,
        }
    }
}

/// Payload of `/api/fs/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListData {
    /// `null` for an empty directory on some providers.
    pub content: Option<Vec<Item>>,
    pub total: u64,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub header: String,
    pub write: bool,
    pub provider: String,
}

/// Payload entry of `/api/fs/dirs`.
#[derive(Debug, Clone, Deserialize)]
pub struct DirItem {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// A match returned by `/api/fs/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub parent: String,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    #[serde(rename = "type")]
    pub type_code: i64,
}

/// Payload of `/api/fs/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    pub content: Option<Vec<SearchItem>>,
    pub total: u64,
}

/// Payload of `/api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
}

/// Payload of `/api/me`: the authenticated user's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub base_path: String,
    pub role: i64,
    pub disabled: bool,
    pub permission: i64,
    #[serde(default)]
    pub sso_id: Option<String>,
    #[serde(default)]
    pub otp: Option<bool>,
}

/// A server-side asynchronous operation (deferred upload, copy).
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub state: i64,
    #[serde(default)]
    pub status: String,
    pub progress: f64,
    #[serde(default)]
    pub error: String,
}

/// The task queues the admin task endpoints operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    Upload,
    Copy,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Upload => "upload",
            TaskType::Copy => "copy",
        }
    }
}

/// A storage backend as managed via `/api/admin/storage/*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub id: i64,
    pub mount_path: String,
    #[serde(default)]
    pub order: i64,
    pub driver: String,
    #[serde(default)]
    pub cache_expiration: i64,
    #[serde(default)]
    pub status: String,
    /// Driver-specific settings, serialized JSON.
    #[serde(default)]
    pub addition: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
}

/// Paged payload of `/api/admin/storage/list` and `/api/admin/user/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedData<T> {
    pub content: Option<Vec<T>>,
    pub total: u64,
}

/// A user account as listed by `/api/admin/user/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub base_path: String,
    pub role: i64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub permission: i64,
    #[serde(default)]
    pub sso_id: Option<String>,
}

/// A path meta rule as listed by `/api/admin/meta/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub hide: String,
    #[serde(default)]
    pub readme: String,
}

/// A site setting as listed by `/api/admin/setting/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub help: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub options: String,
    #[serde(default)]
    pub group: i64,
    #[serde(default)]
    pub flag: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_BODY: &str = r#"{
        "code": 200,
        "message": "success",
        "data": {
            "content": [
                {
                    "name": "f.txt",
                    "size": 5,
                    "is_dir": false,
                    "modified": "2024-03-02T15:04:05Z",
                    "created": "2024-03-01T15:04:05Z",
                    "sign": "abc123",
                    "thumb": "",
                    "type": 4
                }
            ],
            "total": 1,
            "readme": "",
            "write": true,
            "provider": "Local"
        }
    }"#;

    #[test]
    fn test_decode_list_envelope() {
        let resp: Resp<ListData> = serde_json::from_str(LIST_BODY).unwrap();
        assert!(resp.is_ok());
        let data = resp.into_data("/api/fs/list").unwrap();
        assert_eq!(data.total, 1);
        let items = data.content.unwrap();
        assert_eq!(items[0].name, "f.txt");
        assert_eq!(items[0].size, 5);
        assert!(!items[0].is_dir);
        assert_eq!(items[0].sign, "abc123");
    }

    #[test]
    fn test_decode_empty_dir_listing() {
        let body = r#"{
            "code": 200,
            "message": "success",
            "data": {"content": null, "total": 0, "readme": "", "write": true, "provider": "Local"}
        }"#;
        let resp: Resp<ListData> = serde_json::from_str(body).unwrap();
        let data = resp.into_data("/api/fs/list").unwrap();
        assert!(data.content.is_none());
        assert_eq!(data.total, 0);
    }

    #[test]
    fn test_missing_object_detection() {
        let resp: Resp<RawItem> = serde_json::from_str(
            r#"{"code": 500, "message": "failed get objs: object not found", "data": null}"#,
        )
        .unwrap();
        assert!(!resp.is_ok());
        assert!(resp.indicates_missing());

        let other: Resp<RawItem> =
            serde_json::from_str(r#"{"code": 500, "message": "internal error", "data": null}"#)
                .unwrap();
        assert!(!other.indicates_missing());
    }

    #[test]
    fn test_non_200_into_data_is_storage_error() {
        let resp: Resp<ListData> = Resp::synthetic(403, "permission denied");
        match resp.into_data("/api/fs/list") {
            Err(crate::AlistError::Storage { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(message, "permission denied");
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_item_full_path() {
        let resp: Resp<ListData> = serde_json::from_str(LIST_BODY).unwrap();
        let mut item = resp.into_data("list").unwrap().content.unwrap().remove(0);

        item.parent = Some("/local/a".to_string());
        assert_eq!(item.full_path(), "/local/a/f.txt");

        item.parent = Some("/".to_string());
        assert_eq!(item.full_path(), "/f.txt");

        item.parent = None;
        assert_eq!(item.full_path(), "/f.txt");
    }

    #[test]
    fn test_raw_item_into_item_keeps_sign() {
        let raw: Resp<RawItem> = serde_json::from_str(
            r#"{
                "code": 200,
                "message": "success",
                "data": {
                    "name": "f.txt",
                    "size": 5,
                    "is_dir": false,
                    "modified": "2024-03-02T15:04:05Z",
                    "sign": "sig-1",
                    "thumb": "",
                    "type": 4,
                    "raw_url": "http://server:5244/p/local/f.txt",
                    "readme": "",
                    "provider": "Local",
                    "related": null
                }
            }"#,
        )
        .unwrap();
        let item = raw
            .into_data("/api/fs/get")
            .unwrap()
            .into_item(Some("/local".into()));
        assert_eq!(item.sign, "sig-1");
        assert_eq!(item.full_path(), "/local/f.txt");
    }

    #[test]
    fn test_task_type_paths() {
        assert_eq!(TaskType::Upload.as_str(), "upload");
        assert_eq!(TaskType::Copy.as_str(), "copy");
    }
}
