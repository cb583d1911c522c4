//! Defines routes for archive operations.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`: liveness
//!   - `GET    /readyz` : SQLite readiness
//!
//! - **Archive endpoints** (session cookie required)
//!   - `GET    /api/archives/signature`: direct-upload signature
//!   - `POST   /api/archives/upload`   : multipart upload into a folder
//!   - `PUT    /api/archives/{id}`     : rename
//!   - `DELETE /api/archives/{id}`     : delete record and stored object

use crate::{
    handlers::{
        archive_handlers::{delete_archive, rename_archive, upload_archive, upload_signature},
        health_handlers::{healthz, readyz},
    },
    services::archive_service::ArchiveService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Room for multipart boundaries and the non-file fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build and return the router for all archive routes.
///
/// The body limit sits just above `max_upload_bytes` so oversized files are
/// still read far enough to be rejected with a proper 413 by the service.
pub fn routes(max_upload_bytes: usize) -> Router<ArchiveService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/archives/signature", get(upload_signature))
        .route("/api/archives/upload", post(upload_archive))
        .route(
            "/api/archives/{id}",
            put(rename_archive).delete(delete_archive),
        )
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
}
