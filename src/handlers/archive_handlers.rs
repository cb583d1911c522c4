//! HTTP handlers for archive operations.
//! Every route requires a session; storage and permission rules live in
//! `ArchiveService`.

use crate::{
    auth::SessionUser,
    errors::AppError,
    models::archive::Archive,
    services::{
        archive_service::{ArchiveService, NewArchive},
        object_store::DirectUploadSignature,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Body for `PUT /api/archives/{id}`.
#[derive(Debug, Deserialize)]
pub struct RenameArchiveReq {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenameArchiveResp {
    pub message: String,
    pub data: Archive,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteArchiveResp {
    pub success: bool,
    pub message: String,
    /// True when the stored object could not be confirmed removed.
    pub cleanup_incomplete: bool,
}

struct UploadedFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// `POST /api/archives/upload`: multipart `file`, `folderId`, optional `title`.
pub async fn upload_archive(
    State(service): State<ArchiveService>,
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<Json<Archive>, AppError> {
    let mut file = None;
    let mut folder_id = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "folderId" => folder_id = Some(field.text().await?),
            "title" => title = Some(field.text().await?),
            _ => {}
        }
    }

    let (Some(file), Some(folder_id)) = (file, folder_id) else {
        return Err(AppError::bad_request("file and folderId are required"));
    };
    let folder_id = folder_id
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("folderId must be a number"))?;

    let archive = service
        .create_archive(
            &user,
            NewArchive {
                folder_id,
                title,
                filename: file.filename,
                content_type: file.content_type,
                payload: file.data,
            },
        )
        .await?;

    Ok(Json(archive))
}

/// `PUT /api/archives/{id}`: rename.
pub async fn rename_archive(
    State(service): State<ArchiveService>,
    user: SessionUser,
    Path(id): Path<i64>,
    Json(payload): Json<RenameArchiveReq>,
) -> Result<Json<RenameArchiveResp>, AppError> {
    let title = payload.title.unwrap_or_default();
    let archive = service.rename_archive(&user, id, &title).await?;

    Ok(Json(RenameArchiveResp {
        message: "archive renamed".into(),
        data: archive,
    }))
}

/// `DELETE /api/archives/{id}`: remove the record and its stored object.
pub async fn delete_archive(
    State(service): State<ArchiveService>,
    user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Json<DeleteArchiveResp>, AppError> {
    let (_archive, outcome) = service.delete_archive(&user, id).await?;

    Ok(Json(DeleteArchiveResp {
        success: true,
        message: "archive deleted".into(),
        cleanup_incomplete: !outcome.is_clean(),
    }))
}

/// `GET /api/archives/signature`: parameters for a direct browser upload.
pub async fn upload_signature(
    State(service): State<ArchiveService>,
    _user: SessionUser,
) -> Json<DirectUploadSignature> {
    Json(service.transfer.direct_upload_signature())
}
