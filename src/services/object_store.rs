//! Remote object store client.
//!
//! `ObjectStore` is the seam between the transfer logic and the store's HTTP
//! API. `CloudinaryStore` talks to the real service; tests substitute an
//! in-memory fake. URL and direct-upload signing are local computations over
//! the account credentials, so they are provided methods on the trait.

use crate::{
    models::stored_object::{DeliveryMode, ResourceKind, StoredObjectDescriptor},
    services::{asset_url::AssetUrl, signing::Credentials},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the store needs to accept one payload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Folder the object is grouped under.
    pub namespace: String,
    /// Namespace-relative identifier.
    pub identifier: String,
    pub resource_kind: ResourceKind,
    pub delivery_mode: DeliveryMode,
    /// Replace an existing object with the same identifier instead of failing.
    pub overwrite: bool,
    pub filename: String,
    pub payload: Bytes,
}

/// What the store reports back after an upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    /// Namespace-qualified identifier.
    pub public_id: String,
    pub version: u64,
    pub secure_url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyStatus {
    Deleted,
    NotFound,
}

/// Parameters a browser needs to upload straight to the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectUploadSignature {
    pub timestamp: i64,
    pub signature: String,
    pub api_key: String,
    pub cloud_name: String,
    pub folder: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn credentials(&self) -> &Credentials;

    /// Host that serves delivery URLs, e.g. `res.cloudinary.com`.
    fn delivery_host(&self) -> &str;

    async fn upload(&self, request: UploadRequest) -> StoreResult<UploadReceipt>;

    /// Remove an object. `invalidate` also purges CDN-cached copies.
    async fn destroy(
        &self,
        descriptor: &StoredObjectDescriptor,
        invalidate: bool,
    ) -> StoreResult<DestroyStatus>;

    /// Signed delivery URL for an object, valid for as long as the store
    /// honours the signature.
    fn signed_url(&self, descriptor: &StoredObjectDescriptor, version: u64) -> String {
        let credentials = self.credentials();
        let url = AssetUrl::for_descriptor(
            self.delivery_host(),
            &credentials.cloud_name,
            descriptor,
            Some(version),
            None,
        );
        let signature = credentials.url_signature(&url.source());
        url.with_signature(signature).to_string()
    }

    /// Signature over `{folder, timestamp}` for browser-side uploads.
    fn direct_upload_signature(&self, folder: &str, timestamp: i64) -> DirectUploadSignature {
        let credentials = self.credentials();
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", timestamp.to_string());

        DirectUploadSignature {
            timestamp,
            signature: credentials.sign_params(&params),
            api_key: credentials.api_key.clone(),
            cloud_name: credentials.cloud_name.clone(),
            folder: folder.to_string(),
        }
    }
}

/// Cloudinary-backed store.
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    client: Client,
    credentials: Credentials,
    api_base: String,
    delivery_host: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryStore {
    pub fn new(
        client: Client,
        credentials: Credentials,
        api_base: impl Into<String>,
        delivery_host: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            delivery_host: delivery_host.into(),
        }
    }

    fn endpoint(&self, kind: ResourceKind, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.api_base, self.credentials.cloud_name, kind, action
        )
    }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn delivery_host(&self) -> &str {
        &self.delivery_host
    }

    async fn upload(&self, request: UploadRequest) -> StoreResult<UploadReceipt> {
        let mut params = BTreeMap::new();
        params.insert("access_mode", "public".to_string());
        params.insert("folder", request.namespace);
        params.insert("overwrite", request.overwrite.to_string());
        params.insert("public_id", request.identifier);
        params.insert("timestamp", Utc::now().timestamp().to_string());
        params.insert("type", request.delivery_mode.as_str().to_string());
        let signature = self.credentials.sign_params(&params);

        let length = request.payload.len() as u64;
        let file = Part::stream_with_length(request.payload, length).file_name(request.filename);
        let mut form = Form::new()
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .part("file", file);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = self.endpoint(request.resource_kind, "upload");
        debug!(%url, bytes = length, "uploading to object store");
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<UploadReceipt>().await?)
    }

    async fn destroy(
        &self,
        descriptor: &StoredObjectDescriptor,
        invalidate: bool,
    ) -> StoreResult<DestroyStatus> {
        let mut params = BTreeMap::new();
        params.insert("invalidate", invalidate.to_string());
        params.insert("public_id", descriptor.public_id.clone());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        params.insert("type", descriptor.delivery_mode.as_str().to_string());
        let signature = self.credentials.sign_params(&params);
        params.insert("api_key", self.credentials.api_key.clone());
        params.insert("signature", signature);

        let url = self.endpoint(descriptor.resource_kind, "destroy");
        debug!(%url, public_id = %descriptor.public_id, "destroying stored object");
        let response = self.client.post(&url).form(&params).send().await?;
        let response = ensure_success(response).await?;
        let body = response.json::<DestroyResponse>().await?;

        match body.result.as_str() {
            "ok" => Ok(DestroyStatus::Deleted),
            "not found" => Ok(DestroyStatus::NotFound),
            other => Err(StoreError::Rejected {
                status: 200,
                message: format!("unexpected destroy result `{}`", other),
            }),
        }
    }
}

/// Turn a non-2xx response into `StoreError::Rejected`, keeping the store's
/// own error message when it sends one.
async fn ensure_success(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|envelope| envelope.error.message)
        .unwrap_or(text);

    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}
