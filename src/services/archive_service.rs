//! src/services/archive_service.rs
//!
//! ArchiveService: archive and folder metadata in SQLite, with payloads
//! delegated to `TransferService`. A metadata row only exists while its
//! backing object does: uploads happen before the insert, and a failed insert
//! removes the uploaded object again.

use crate::{
    auth::SessionUser,
    models::{
        archive::{Archive, Folder},
        stored_object::DeleteOutcome,
    },
    services::transfer_service::{TransferError, TransferService},
};
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{0}")]
    Validation(String),
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("{0}")]
    Forbidden(String),
    #[error("folder `{0}` not found")]
    FolderNotFound(i64),
    #[error("archive `{0}` not found")]
    ArchiveNotFound(i64),
    #[error(transparent)]
    Transfer(TransferError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<TransferError> for ArchiveError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            TransferError::EmptyPayload => Self::Validation("uploaded file is empty".into()),
            other => Self::Transfer(other),
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct NewArchive {
    pub folder_id: i64,
    /// Optional title; the original filename is used when absent.
    pub title: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub payload: Bytes,
}

#[derive(Clone)]
pub struct ArchiveService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    pub transfer: TransferService,
}

const ARCHIVE_COLUMNS: &str =
    "id, title, file_path, file_size, file_type, folder_id, uploader_id, created_at";

impl ArchiveService {
    pub fn new(db: Arc<SqlitePool>, transfer: TransferService) -> Self {
        Self { db, transfer }
    }

    /// Create a folder owned by `user_id`.
    pub async fn create_folder(
        &self,
        name: &str,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> ArchiveResult<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ArchiveError::Validation("folder name is required".into()));
        }

        let folder = sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (name, user_id, parent_id, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, name, user_id, parent_id, created_at",
        )
        .bind(name)
        .bind(user_id)
        .bind(parent_id)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(folder)
    }

    async fn fetch_folder(&self, id: i64) -> ArchiveResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "SELECT id, name, user_id, parent_id, created_at FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ArchiveError::FolderNotFound(id))
    }

    pub async fn fetch_archive(&self, id: i64) -> ArchiveResult<Archive> {
        sqlx::query_as::<_, Archive>(&format!(
            "SELECT {} FROM archives WHERE id = ?",
            ARCHIVE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ArchiveError::ArchiveNotFound(id))
    }

    /// Upload a payload into `folder_id` and record it.
    ///
    /// - Size is checked before anything else, so an oversized payload never
    ///   reaches the store.
    /// - Only admins and the folder owner may upload.
    /// - If the row cannot be written, the uploaded object is removed again.
    pub async fn create_archive(
        &self,
        user: &SessionUser,
        upload: NewArchive,
    ) -> ArchiveResult<Archive> {
        self.transfer.check_size(upload.payload.len())?;

        let folder = self.fetch_folder(upload.folder_id).await?;
        if !user.can_manage(folder.user_id) {
            return Err(ArchiveError::Forbidden("access denied".into()));
        }

        let asset = self
            .transfer
            .upload(upload.payload, &upload.content_type, &upload.filename)
            .await?;

        let title = upload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(asset.display_name.as_str())
            .to_string();

        let insert = sqlx::query_as::<_, Archive>(&format!(
            "INSERT INTO archives (title, file_path, file_size, file_type, folder_id, uploader_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {}",
            ARCHIVE_COLUMNS
        ))
        .bind(&title)
        .bind(&asset.retrieval_url)
        .bind(asset.byte_size)
        .bind(&asset.format_label)
        .bind(folder.id)
        .bind(user.id)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert {
            Ok(archive) => {
                info!(archive_id = archive.id, folder_id = folder.id, "archive created");
                Ok(archive)
            }
            Err(err) => {
                warn!(error = %err, "archive insert failed, removing uploaded object");
                let outcome = self.transfer.delete_by_url(&asset.retrieval_url).await;
                if !outcome.is_clean() {
                    warn!(?outcome, "uploaded object left behind");
                }
                Err(ArchiveError::Sqlx(err))
            }
        }
    }

    /// Change an archive's title. Admins and the uploader only.
    pub async fn rename_archive(
        &self,
        user: &SessionUser,
        id: i64,
        title: &str,
    ) -> ArchiveResult<Archive> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ArchiveError::Validation("title must not be empty".into()));
        }

        let archive = self.fetch_archive(id).await?;
        if !user.can_manage(archive.uploader_id) {
            return Err(ArchiveError::Forbidden(
                "not allowed to rename this archive".into(),
            ));
        }

        let updated = sqlx::query_as::<_, Archive>(&format!(
            "UPDATE archives SET title = ? WHERE id = ? RETURNING {}",
            ARCHIVE_COLUMNS
        ))
        .bind(title)
        .bind(id)
        .fetch_one(&*self.db)
        .await?;
        Ok(updated)
    }

    /// Delete an archive and its stored object.
    ///
    /// Admins and the owner of the containing folder only. The remote delete
    /// is best-effort: its outcome is returned, and the row is removed
    /// whatever happened remotely.
    pub async fn delete_archive(
        &self,
        user: &SessionUser,
        id: i64,
    ) -> ArchiveResult<(Archive, DeleteOutcome)> {
        let archive = self.fetch_archive(id).await?;
        let folder = self.fetch_folder(archive.folder_id).await?;
        if !user.can_manage(folder.user_id) {
            return Err(ArchiveError::Forbidden("access denied".into()));
        }

        let outcome = if archive.file_path.trim().is_empty() {
            DeleteOutcome::SkippedForeignHost {
                url: String::new(),
            }
        } else {
            self.transfer.delete_by_url(&archive.file_path).await
        };

        let result = sqlx::query("DELETE FROM archives WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ArchiveError::ArchiveNotFound(id));
        }

        info!(archive_id = id, clean = outcome.is_clean(), "archive deleted");
        Ok((archive, outcome))
    }
}
