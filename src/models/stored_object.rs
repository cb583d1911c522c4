//! Describes an object held in the remote store and how it is addressed.

use serde::Serialize;
use std::fmt;

/// Store-side classification of an uploaded payload.
///
/// The kind decides the URL shape and whether the store appends a file
/// extension on delivery (it does for `Image`, never for `Raw`).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Raw,
}

impl ResourceKind {
    /// Classify a declared MIME type. Anything that is not `image/*` is raw.
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("image/") {
            Self::Image
        } else {
            Self::Raw
        }
    }

    /// Path segment used by the store for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Raw => "raw",
        }
    }

    /// Delivery mode paired with this kind at upload time.
    ///
    /// Raw binaries such as PDFs are refused by the store when fetched
    /// directly under the public delivery type.
    pub fn default_delivery(&self) -> DeliveryMode {
        match self {
            Self::Image => DeliveryMode::Public,
            Self::Raw => DeliveryMode::Authenticated,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-side access policy for delivery URLs.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Plain delivery (`upload` type), no signature needed.
    Public,
    /// Signed delivery (`authenticated` type).
    Authenticated,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "upload",
            Self::Authenticated => "authenticated",
        }
    }

    pub fn requires_signature(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The triple that uniquely addresses an object in the store.
///
/// `public_id` is namespace-qualified (`<namespace>/<identifier>`), which is
/// the form the store returns from uploads and expects on destroy.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoredObjectDescriptor {
    pub public_id: String,
    pub resource_kind: ResourceKind,
    pub delivery_mode: DeliveryMode,
}

/// Result of a successful transfer, ready to be persisted by the caller.
#[derive(Serialize, Clone, Debug)]
pub struct UploadedAsset {
    /// URL handed out to clients. Signed when the delivery mode requires it.
    pub retrieval_url: String,

    /// Original filename as supplied by the client.
    pub display_name: String,

    /// Store-reported format, falling back to the declared MIME type.
    pub format_label: String,

    /// Size in bytes.
    pub byte_size: i64,

    pub descriptor: StoredObjectDescriptor,
}

/// What happened when a stored object was removed by its retrieval URL.
///
/// Deletion never fails the caller; this type lets the caller decide whether
/// to surface an incomplete cleanup.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { public_id: String },
    /// The store had nothing under this id.
    Missing { public_id: String },
    /// The URL points somewhere other than the configured delivery host.
    SkippedForeignHost { url: String },
    Failed { reason: String },
}

impl DeleteOutcome {
    /// True unless the remote object may still exist.
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_selects_kind_and_delivery() {
        let png = ResourceKind::from_mime("image/png");
        assert_eq!(png, ResourceKind::Image);
        assert_eq!(png.default_delivery(), DeliveryMode::Public);

        let pdf = ResourceKind::from_mime("application/pdf");
        assert_eq!(pdf, ResourceKind::Raw);
        assert_eq!(pdf.default_delivery(), DeliveryMode::Authenticated);

        assert_eq!(ResourceKind::from_mime("IMAGE/JPEG"), ResourceKind::Image);
        assert_eq!(ResourceKind::from_mime(""), ResourceKind::Raw);
    }

    #[test]
    fn failed_outcome_is_not_clean() {
        assert!(DeleteOutcome::Missing { public_id: "a/b".into() }.is_clean());
        assert!(DeleteOutcome::SkippedForeignHost { url: "x".into() }.is_clean());
        assert!(!DeleteOutcome::Failed { reason: "boom".into() }.is_clean());
    }
}
