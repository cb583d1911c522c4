//! Delivery URL shape for stored objects.
//!
//! ```text
//! https://<host>/<cloud>/<image|raw>/<upload|authenticated>[/s--SIG--][/v<version>]/<folder>/<name>
//! ```
//!
//! `AssetUrl` is built when an upload completes and parsed back when the
//! owning record is deleted, so both directions live here and share one set
//! of rules. Identifiers are sanitized at upload time, so segments never need
//! percent-decoding.

use crate::{
    models::stored_object::{DeliveryMode, ResourceKind, StoredObjectDescriptor},
    services::{public_id, signing},
};
use reqwest::Url;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetUrlError {
    #[error("malformed url: {0}")]
    Malformed(String),
    #[error("url has no host")]
    MissingHost,
    #[error("url path has too few segments")]
    TooShort,
    #[error("unsupported resource segment `{0}`")]
    UnsupportedResource(String),
    #[error("unsupported delivery segment `{0}`")]
    UnsupportedDelivery(String),
}

/// Structured form of a delivery URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrl {
    pub host: String,
    pub cloud_name: String,
    pub resource_kind: ResourceKind,
    pub delivery_mode: DeliveryMode,
    /// Full `s--XXXXXXXX--` segment when the URL is signed.
    pub signature: Option<String>,
    pub version: Option<u64>,
    /// Folder path between the version and the final segment; may be empty.
    pub folder: String,
    /// Final path segment, including any delivery extension.
    pub filename: String,
}

impl AssetUrl {
    /// URL for a stored object, unsigned.
    ///
    /// `format` is appended to image names only; raw identifiers already
    /// carry their extension.
    pub fn for_descriptor(
        host: &str,
        cloud_name: &str,
        descriptor: &StoredObjectDescriptor,
        version: Option<u64>,
        format: Option<&str>,
    ) -> Self {
        let (folder, name) = match descriptor.public_id.rsplit_once('/') {
            Some((folder, name)) => (folder.to_string(), name.to_string()),
            None => (String::new(), descriptor.public_id.clone()),
        };
        let filename = match (descriptor.resource_kind, format) {
            (ResourceKind::Image, Some(ext)) if !ext.is_empty() => format!("{}.{}", name, ext),
            _ => name,
        };

        Self {
            host: host.to_string(),
            cloud_name: cloud_name.to_string(),
            resource_kind: descriptor.resource_kind,
            delivery_mode: descriptor.delivery_mode,
            signature: None,
            version,
            folder,
            filename,
        }
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    /// The part of the path that delivery signatures cover.
    pub fn source(&self) -> String {
        if self.folder.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.folder, self.filename)
        }
    }

    /// Parse a delivery URL. Does not check the host against any configuration.
    pub fn parse(raw: &str) -> Result<Self, AssetUrlError> {
        let url = Url::parse(raw.trim()).map_err(|err| AssetUrlError::Malformed(err.to_string()))?;
        let host = url.host_str().ok_or(AssetUrlError::MissingHost)?.to_string();
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let [cloud_name, resource, delivery, rest @ ..] = segments.as_slice() else {
            return Err(AssetUrlError::TooShort);
        };

        let resource_kind = match *resource {
            "image" => ResourceKind::Image,
            "raw" => ResourceKind::Raw,
            other => return Err(AssetUrlError::UnsupportedResource(other.to_string())),
        };
        let delivery_mode = match *delivery {
            "upload" => DeliveryMode::Public,
            "authenticated" => DeliveryMode::Authenticated,
            other => return Err(AssetUrlError::UnsupportedDelivery(other.to_string())),
        };

        let mut rest = rest;
        let mut signature = None;
        if let [first, tail @ ..] = rest {
            if signing::is_url_signature(first) {
                signature = Some(first.to_string());
                rest = tail;
            }
        }
        let mut version = None;
        if let [first, tail @ ..] = rest {
            if let Some(parsed) = parse_version(first) {
                version = Some(parsed);
                rest = tail;
            }
        }

        let Some((filename, folder)) = rest.split_last() else {
            return Err(AssetUrlError::TooShort);
        };

        Ok(Self {
            host,
            cloud_name: cloud_name.to_string(),
            resource_kind,
            delivery_mode,
            signature,
            version,
            folder: folder.join("/"),
            filename: filename.to_string(),
        })
    }

    /// Recover the identity the object was uploaded under.
    ///
    /// The identifier is rebuilt under `namespace`; image names lose their
    /// delivery extension, raw names keep theirs verbatim.
    pub fn descriptor(&self, namespace: &str) -> StoredObjectDescriptor {
        let name = match self.resource_kind {
            ResourceKind::Image => match self.filename.rfind('.') {
                Some(pos) if pos > 0 => &self.filename[..pos],
                _ => self.filename.as_str(),
            },
            ResourceKind::Raw => self.filename.as_str(),
        };

        StoredObjectDescriptor {
            public_id: public_id::qualify(namespace, name),
            resource_kind: self.resource_kind,
            delivery_mode: self.delivery_mode,
        }
    }
}

impl fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://{}/{}/{}/{}",
            self.host, self.cloud_name, self.resource_kind, self.delivery_mode
        )?;
        if let Some(signature) = &self.signature {
            write!(f, "/{}", signature)?;
        }
        if let Some(version) = self.version {
            write!(f, "/v{}", version)?;
        }
        write!(f, "/{}", self.source())
    }
}

fn parse_version(segment: &str) -> Option<u64> {
    let digits = segment.strip_prefix('v')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
