//! Admin and task endpoint surface.
//!
//! These require a token with admin permission; the server enforces that,
//! not the client.

use serde_json::json;

use crate::api::client::AlistClient;
use crate::api::models::{Meta, PagedData, Resp, SettingItem, Storage, Task, TaskType, User};
use crate::error::Result;
use crate::http::read_envelope;

impl AlistClient {
    // ---- storage management ----

    /// List storage backends (`/api/admin/storage/list`).
    pub async fn admin_storage_list(&self) -> Result<Resp<PagedData<Storage>>> {
        let response = self.transport().get("/api/admin/storage/list").await?;
        read_envelope(response, "/api/admin/storage/list").await
    }

    /// Create a storage backend (`/api/admin/storage/create`). The `id`
    /// and `modified` fields are server-assigned and ignored if set.
    pub async fn admin_storage_create(
        &self,
        storage: &Storage,
    ) -> Result<Resp<serde_json::Value>> {
        let mut body = serde_json::to_value(storage)?;
        if let Some(map) = body.as_object_mut() {
            map.remove("id");
            map.remove("modified");
        }
        let response = self
            .transport()
            .post_json("/api/admin/storage/create", &body)
            .await?;
        read_envelope(response, "/api/admin/storage/create").await
    }

    /// Delete a storage backend by id (`/api/admin/storage/delete`).
    pub async fn admin_storage_delete(&self, id: i64) -> Result<Resp<serde_json::Value>> {
        let id_string = id.to_string();
        let response = self
            .transport()
            .post_query("/api/admin/storage/delete", &[("id", id_string.as_str())])
            .await?;
        read_envelope(response, "/api/admin/storage/delete").await
    }

    // ---- users / metas / settings ----

    /// List user accounts (`/api/admin/user/list`).
    pub async fn admin_user_list(&self) -> Result<Resp<PagedData<User>>> {
        let response = self.transport().get("/api/admin/user/list").await?;
        read_envelope(response, "/api/admin/user/list").await
    }

    /// List path meta rules (`/api/admin/meta/list`).
    pub async fn admin_meta_list(&self) -> Result<Resp<PagedData<Meta>>> {
        let response = self.transport().get("/api/admin/meta/list").await?;
        read_envelope(response, "/api/admin/meta/list").await
    }

    /// List site settings (`/api/admin/setting/list`), optionally for a
    /// single settings group.
    pub async fn admin_setting_list(
        &self,
        group: Option<i64>,
    ) -> Result<Resp<Vec<SettingItem>>> {
        let path = "/api/admin/setting/list";
        let response = match group {
            Some(group) => {
                let group_string = group.to_string();
                self.transport()
                    .post_query(path, &[("group", group_string.as_str())])
                    .await?
            }
            None => self.transport().get(path).await?,
        };
        read_envelope(response, path).await
    }

    // ---- task management ----

    /// Completed tasks of the given queue.
    pub async fn task_done(&self, task_type: TaskType) -> Result<Vec<Task>> {
        let path = format!("/api/admin/task/{}/done", task_type.as_str());
        let response = self.transport().get(&path).await?;
        let envelope: Resp<Vec<Task>> = read_envelope(response, &path).await?;
        envelope.into_list(&path)
    }

    /// Pending tasks of the given queue.
    pub async fn task_undone(&self, task_type: TaskType) -> Result<Vec<Task>> {
        let path = format!("/api/admin/task/{}/undone", task_type.as_str());
        let response = self.transport().get(&path).await?;
        let envelope: Resp<Vec<Task>> = read_envelope(response, &path).await?;
        envelope.into_list(&path)
    }

    /// Delete a task record.
    pub async fn task_delete(
        &self,
        task_type: TaskType,
        task_id: &str,
    ) -> Result<Resp<serde_json::Value>> {
        self.task_action(task_type, "delete", task_id).await
    }

    /// Cancel a running task.
    pub async fn task_cancel(
        &self,
        task_type: TaskType,
        task_id: &str,
    ) -> Result<Resp<serde_json::Value>> {
        self.task_action(task_type, "cancel", task_id).await
    }

    /// Retry a failed task.
    pub async fn task_retry(
        &self,
        task_type: TaskType,
        task_id: &str,
    ) -> Result<Resp<serde_json::Value>> {
        self.task_action(task_type, "retry", task_id).await
    }

    /// Clear all finished tasks from the queue.
    pub async fn task_clear_done(&self, task_type: TaskType) -> Result<Resp<serde_json::Value>> {
        let path = format!("/api/admin/task/{}/clear_done", task_type.as_str());
        let response = self.transport().post_json(&path, &json!({})).await?;
        read_envelope(response, &path).await
    }

    /// Clear only the succeeded tasks from the queue.
    pub async fn task_clear_succeeded(
        &self,
        task_type: TaskType,
    ) -> Result<Resp<serde_json::Value>> {
        let path = format!("/api/admin/task/{}/clear_succeeded", task_type.as_str());
        let response = self.transport().post_json(&path, &json!({})).await?;
        read_envelope(response, &path).await
    }

    async fn task_action(
        &self,
        task_type: TaskType,
        action: &str,
        task_id: &str,
    ) -> Result<Resp<serde_json::Value>> {
        let path = format!("/api/admin/task/{}/{}", task_type.as_str(), action);
        let response = self.transport().post_query(&path, &[("tid", task_id)]).await?;
        read_envelope(response, &path).await
    }
}
