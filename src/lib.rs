//! # alistlib
//!
//! Rust client library for the [AList](https://alist.nn.ci) file-storage
//! REST API.
//!
//! ## Features
//!
//! - **Authentication**: username/password login (with optional OTP) or
//!   pre-issued tokens; one authenticated client per server, shared
//!   through a resettable [`Registry`].
//! - **Pathlib-style remote paths**: [`AlistPath`] embeds the server in
//!   the path's drive (`https://server:5244/local/f.txt`) and maps
//!   familiar filesystem verbs onto REST calls:
//!   - `stat`, `exists`, `is_dir`, `is_file`
//!   - `iterdir` (children arrive with their metadata pre-populated)
//!   - `read_bytes` / `read_text` / `write_bytes` / `write_text` / `touch`
//!   - `mkdir`, `unlink`, `rmdir`, `rename`
//! - **Caching**: a bounded per-server directory-listing cache plus
//!   per-path stat snapshots, so listing a directory and statting its
//!   children costs a single round-trip.
//! - **Typed endpoint surface**: one method per REST endpoint on
//!   [`AlistClient`], including search, task management, and the admin
//!   storage/user/meta/setting listings; every response is validated
//!   against the expected envelope shape.
//! - **Sync and async**: the async surface is primary; [`blocking`]
//!   exposes the same operations for synchronous callers.
//!
//! Outbound requests per server are bounded by a permit pool (default
//! 30) and carry a 30-second timeout.
//!
//! ## Example
//!
//! ```no_run
//! use alistlib::{Credentials, Registry};
//!
//! # async fn example() -> alistlib::Result<()> {
//! let registry = Registry::new();
//! registry
//!     .login(
//!         "http://localhost:5244",
//!         Credentials::password("admin", "123456"),
//!     )
//!     .await?;
//!
//! let dir = registry.path("http://localhost:5244/local")?;
//! for child in dir.iterdir().await? {
//!     let meta = child.stat().await?; // served from the listing, no extra call
//!     println!("{} ({} bytes)", child.name(), meta.size);
//! }
//!
//! let file = dir.join("hello.txt");
//! file.write_text("hello", false).await?;
//! assert_eq!(file.read_text().await?, "hello");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod blocking;
pub mod cache;
pub mod error;
pub mod http;
pub mod path;
pub mod registry;

// Re-export commonly used types
pub use api::{AlistClient, Item, Me, RawItem, Resp, SearchScope, Storage, Task, TaskType};
pub use error::{AlistError, Result};
pub use path::{AlistPath, PureAlistPath, RetryPolicy};
pub use registry::{Credentials, Registry, ServerIdentity};
