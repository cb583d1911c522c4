//! Represents an archived document and the folder it lives in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single archived file.
///
/// The payload itself lives in the remote object store; this row only keeps
/// the retrieval URL handed out at upload time.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub id: i64,

    /// Human-facing title; defaults to the original filename.
    pub title: String,

    /// Retrieval URL of the backing object.
    pub file_path: String,

    /// Size in bytes.
    pub file_size: i64,

    /// Format label reported by the store (e.g. `pdf`, `jpg`).
    pub file_type: String,

    pub folder_id: i64,

    pub uploader_id: i64,

    pub created_at: DateTime<Utc>,
}

/// A folder grouping archives. Owned by one user.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
