//! AList API client and response types.

mod admin;
pub mod client;
pub mod models;

pub use client::{AlistClient, SearchScope};
pub use models::{Item, ListData, Me, RawItem, Resp, SearchData, Storage, Task, TaskType};
