//! TransferService: moves payloads into the object store and removes them
//! again given only the retrieval URL that was handed out.
//!
//! Upload and delete share one set of rules for deriving the store identity:
//! the resource kind decides the delivery mode, and whether the identifier
//! carries the file extension. Delete re-derives both from the URL, so no
//! side table of identifiers is kept.

use crate::{
    models::stored_object::{
        DeleteOutcome, ResourceKind, StoredObjectDescriptor, UploadedAsset,
    },
    services::{
        asset_url::{AssetUrl, AssetUrlError},
        object_store::{DestroyStatus, DirectUploadSignature, ObjectStore, StoreError, UploadRequest},
        public_id::{FALLBACK_FILENAME, derive_identifier, last_component},
    },
};
use bytes::Bytes;
use chrono::Utc;
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("payload is empty")]
    EmptyPayload,
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("storage transfer failed: {0}")]
    Store(#[from] StoreError),
}

pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn ObjectStore>,
    /// Folder every object is grouped under.
    namespace: String,
    max_upload_bytes: usize,
}

impl TransferService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        namespace: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into().trim_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    /// Reject payloads over the configured limit.
    pub fn check_size(&self, size: usize) -> TransferResult<()> {
        if size > self.max_upload_bytes {
            return Err(TransferError::PayloadTooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Upload `payload` under an identifier derived from `filename`.
    pub async fn upload(
        &self,
        payload: Bytes,
        content_type: &str,
        filename: &str,
    ) -> TransferResult<UploadedAsset> {
        self.upload_at(payload, content_type, filename, Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`upload`](Self::upload) with an explicit uniqueness timestamp.
    pub async fn upload_at(
        &self,
        payload: Bytes,
        content_type: &str,
        filename: &str,
        timestamp_millis: i64,
    ) -> TransferResult<UploadedAsset> {
        if payload.is_empty() {
            return Err(TransferError::EmptyPayload);
        }
        self.check_size(payload.len())?;

        let resource_kind = ResourceKind::from_mime(content_type);
        let delivery_mode = resource_kind.default_delivery();
        let identifier = derive_identifier(filename, resource_kind, timestamp_millis);
        let display_name = match last_component(filename) {
            "" => FALLBACK_FILENAME.to_string(),
            name => name.to_string(),
        };
        let size = payload.len();

        debug!(
            %identifier,
            kind = %resource_kind,
            delivery = %delivery_mode,
            size,
            "starting transfer"
        );

        let receipt = self
            .store
            .upload(UploadRequest {
                namespace: self.namespace.clone(),
                identifier,
                resource_kind,
                delivery_mode,
                overwrite: true,
                filename: display_name.clone(),
                payload,
            })
            .await
            .inspect_err(|err| error!(error = %err, filename = %display_name, "transfer failed"))?;

        let descriptor = StoredObjectDescriptor {
            public_id: receipt.public_id,
            resource_kind,
            delivery_mode,
        };
        let retrieval_url = if delivery_mode.requires_signature() {
            self.store.signed_url(&descriptor, receipt.version)
        } else {
            receipt.secure_url
        };
        let format_label = receipt
            .format
            .filter(|format| !format.is_empty())
            .or_else(|| Some(content_type.trim().to_string()).filter(|mime| !mime.is_empty()))
            .unwrap_or_else(|| "unknown".to_string());

        info!(public_id = %descriptor.public_id, "transfer complete");

        Ok(UploadedAsset {
            retrieval_url,
            display_name,
            format_label,
            byte_size: receipt.bytes.unwrap_or(size as i64),
            descriptor,
        })
    }

    /// Recover the store identity behind a retrieval URL.
    ///
    /// Returns `Ok(None)` when the URL is not served by the configured
    /// delivery host, including relative legacy paths.
    pub fn resolve_url(&self, url: &str) -> Result<Option<StoredObjectDescriptor>, AssetUrlError> {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase));
        if host.as_deref() != Some(self.store.delivery_host()) {
            return Ok(None);
        }

        let asset = AssetUrl::parse(url)?;
        Ok(Some(asset.descriptor(&self.namespace)))
    }

    /// Delete the object behind `url`. Never fails; the outcome says whether
    /// the remote object may have been left behind.
    pub async fn delete_by_url(&self, url: &str) -> DeleteOutcome {
        let descriptor = match self.resolve_url(url) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!(%url, "url not served by object store, skipping delete");
                return DeleteOutcome::SkippedForeignHost {
                    url: url.to_string(),
                };
            }
            Err(err) => {
                warn!(%url, error = %err, "could not derive object identity from url");
                return DeleteOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        match self.store.destroy(&descriptor, true).await {
            Ok(DestroyStatus::Deleted) => {
                info!(public_id = %descriptor.public_id, "stored object deleted");
                DeleteOutcome::Deleted {
                    public_id: descriptor.public_id,
                }
            }
            Ok(DestroyStatus::NotFound) => {
                warn!(public_id = %descriptor.public_id, "stored object already missing");
                DeleteOutcome::Missing {
                    public_id: descriptor.public_id,
                }
            }
            Err(err) => {
                warn!(public_id = %descriptor.public_id, error = %err, "failed to delete stored object");
                DeleteOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Signature for a browser to upload straight into the namespace.
    pub fn direct_upload_signature(&self) -> DirectUploadSignature {
        self.store
            .direct_upload_signature(&self.namespace, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::stored_object::DeliveryMode,
        services::fake_store::FakeStore,
    };

    const TS: i64 = 1_718_000_000_123;
    const NS: &str = "app_archives";

    fn service(store: Arc<FakeStore>) -> TransferService {
        TransferService::new(store, NS, 1024)
    }

    #[tokio::test]
    async fn pdf_upload_is_raw_signed_and_deletable() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());

        let asset = service
            .upload_at(Bytes::from_static(b"%PDF-1.7"), "application/pdf", "report.pdf", TS)
            .await
            .unwrap();

        let sent = &store.uploads()[0];
        assert_eq!(sent.identifier, "report_1718000000123.pdf");
        assert_eq!(sent.namespace, NS);
        assert!(sent.overwrite);
        assert_eq!(asset.descriptor.resource_kind, ResourceKind::Raw);
        assert_eq!(asset.descriptor.delivery_mode, DeliveryMode::Authenticated);
        assert!(asset.retrieval_url.contains("/raw/"));
        assert!(asset.retrieval_url.contains("/authenticated/"));
        assert!(asset.retrieval_url.contains("/s--"));
        assert_eq!(asset.display_name, "report.pdf");
        assert_eq!(asset.format_label, "application/pdf");
        assert_eq!(asset.byte_size, 8);

        let outcome = service.delete_by_url(&asset.retrieval_url).await;
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                public_id: "app_archives/report_1718000000123.pdf".into()
            }
        );
        assert_eq!(store.destroy_calls(), vec![(asset.descriptor.clone(), true)]);
        assert!(!store.contains(&asset.descriptor));
    }

    #[tokio::test]
    async fn jpeg_upload_is_public_and_delete_strips_extension() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());

        let asset = service
            .upload_at(Bytes::from_static(b"\xff\xd8\xff"), "image/jpeg", "photo.JPG", TS)
            .await
            .unwrap();

        assert_eq!(store.uploads()[0].identifier, "photo_1718000000123");
        assert_eq!(asset.descriptor.delivery_mode, DeliveryMode::Public);
        assert!(asset.retrieval_url.contains("/image/upload/"));
        assert!(asset.retrieval_url.ends_with("photo_1718000000123.jpg"));
        assert_eq!(asset.format_label, "jpg");

        service.delete_by_url(&asset.retrieval_url).await;
        assert_eq!(store.destroys()[0].public_id, "app_archives/photo_1718000000123");
        assert!(!store.contains(&asset.descriptor));
    }

    #[tokio::test]
    async fn client_paths_are_reduced_to_file_name() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());

        let asset = service
            .upload_at(
                Bytes::from_static(b"%PDF"),
                "application/pdf",
                "C:\\Users\\me\\Laporan.pdf",
                TS,
            )
            .await
            .unwrap();
        assert_eq!(asset.display_name, "Laporan.pdf");
        assert_eq!(store.uploads()[0].filename, "Laporan.pdf");
        assert_eq!(store.uploads()[0].identifier, "Laporan_1718000000123.pdf");
    }

    #[tokio::test]
    async fn issued_urls_resolve_to_upload_identity() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());
        let cases = [
            ("scan.2024.final.png", "image/png"),
            ("Laporan Akhir.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            ("README", "text/plain"),
            ("", "application/octet-stream"),
            ("diagram.SVG", "image/svg+xml"),
        ];

        for (idx, (filename, mime)) in cases.into_iter().enumerate() {
            let asset = service
                .upload_at(Bytes::from_static(b"data"), mime, filename, TS + idx as i64)
                .await
                .unwrap();
            let resolved = service.resolve_url(&asset.retrieval_url).unwrap();
            assert_eq!(resolved.as_ref(), Some(&asset.descriptor), "{}", filename);
            assert!(store.contains(&asset.descriptor));
        }
    }

    #[tokio::test]
    async fn foreign_urls_are_skipped() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());

        for url in [
            "https://files.example.com/demo/raw/authenticated/v1/app_archives/a.pdf",
            "/uploads/legacy-report.pdf",
            "",
        ] {
            let outcome = service.delete_by_url(url).await;
            assert!(matches!(outcome, DeleteOutcome::SkippedForeignHost { .. }));
        }
        assert!(store.destroys().is_empty());
    }

    #[tokio::test]
    async fn oversized_payload_never_reaches_store() {
        let store = Arc::new(FakeStore::new());
        let service = service(store.clone());

        let err = service
            .upload_at(Bytes::from(vec![0u8; 1025]), "application/pdf", "big.pdf", TS)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::PayloadTooLarge { size: 1025, max: 1024 }));

        let err = service
            .upload_at(Bytes::new(), "application/pdf", "empty.pdf", TS)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::EmptyPayload));
        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_transfer_error() {
        let store = Arc::new(FakeStore::failing_uploads());
        let service = service(store);

        let err = service
            .upload_at(Bytes::from_static(b"x"), "application/pdf", "a.pdf", TS)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Store(_)));
    }

    #[tokio::test]
    async fn delete_failures_are_reported_not_raised() {
        let store = Arc::new(FakeStore::failing_destroys());
        let service = service(store.clone());
        let outcome = service
            .delete_by_url("https://res.cloudinary.com/demo/raw/authenticated/v1/app_archives/a_1.pdf")
            .await;
        assert!(matches!(outcome, DeleteOutcome::Failed { .. }));
        assert_eq!(store.destroys().len(), 1);

        let outcome = service
            .delete_by_url("https://res.cloudinary.com/demo/video/upload/v1/app_archives/clip.mp4")
            .await;
        assert!(!outcome.is_clean());
        assert_eq!(store.destroys().len(), 1);
    }

    #[tokio::test]
    async fn deleting_twice_reports_missing() {
        let store = Arc::new(FakeStore::new());
        let service = service(store);
        let asset = service
            .upload_at(Bytes::from_static(b"x"), "application/pdf", "a.pdf", TS)
            .await
            .unwrap();

        service.delete_by_url(&asset.retrieval_url).await;
        let outcome = service.delete_by_url(&asset.retrieval_url).await;
        assert!(matches!(outcome, DeleteOutcome::Missing { .. }));
        assert!(outcome.is_clean());
    }

    #[test]
    fn direct_upload_signature_targets_namespace() {
        let service = service(Arc::new(FakeStore::default()));
        let signed = service.direct_upload_signature();
        assert_eq!(signed.folder, NS);
        assert_eq!(signed.signature.len(), 40);
    }
}
