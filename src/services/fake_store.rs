//! In-memory `ObjectStore` used by tests. Records every call it receives.

use crate::{
    models::stored_object::{ResourceKind, StoredObjectDescriptor},
    services::{
        asset_url::AssetUrl,
        object_store::{
            DestroyStatus, ObjectStore, StoreError, StoreResult, UploadReceipt, UploadRequest,
        },
        public_id::{self, split_filename},
        signing::Credentials,
    },
};
use async_trait::async_trait;
use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

pub const FAKE_HOST: &str = "res.cloudinary.com";
pub const FAKE_VERSION: u64 = 1718000001;

#[derive(Default)]
struct FakeState {
    uploads: Vec<UploadRequest>,
    /// Every destroy call with its `invalidate` flag.
    destroys: Vec<(StoredObjectDescriptor, bool)>,
    live: HashSet<StoredObjectDescriptor>,
}

pub struct FakeStore {
    credentials: Credentials,
    state: Mutex<FakeState>,
    fail_uploads: bool,
    fail_destroys: bool,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            credentials: Credentials {
                cloud_name: "demo".into(),
                api_key: "1234".into(),
                api_secret: "abcd1234secret".into(),
            },
            state: Mutex::new(FakeState::default()),
            fail_uploads: false,
            fail_destroys: false,
        }
    }

    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    pub fn failing_destroys() -> Self {
        Self {
            fail_destroys: true,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake store mutex poisoned")
    }

    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.state().uploads.clone()
    }

    pub fn destroys(&self) -> Vec<StoredObjectDescriptor> {
        self.state()
            .destroys
            .iter()
            .map(|(descriptor, _)| descriptor.clone())
            .collect()
    }

    pub fn destroy_calls(&self) -> Vec<(StoredObjectDescriptor, bool)> {
        self.state().destroys.clone()
    }

    /// True if an object with exactly this id, kind and mode is stored.
    pub fn contains(&self, descriptor: &StoredObjectDescriptor) -> bool {
        self.state().live.contains(descriptor)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn delivery_host(&self) -> &str {
        FAKE_HOST
    }

    async fn upload(&self, request: UploadRequest) -> StoreResult<UploadReceipt> {
        let mut state = self.state();
        state.uploads.push(request.clone());
        if self.fail_uploads {
            return Err(StoreError::Rejected {
                status: 500,
                message: "simulated upload failure".into(),
            });
        }

        let public_id = public_id::qualify(&request.namespace, &request.identifier);
        let format = match request.resource_kind {
            ResourceKind::Image => Some(split_filename(&request.filename).extension.to_lowercase()),
            ResourceKind::Raw => None,
        };
        let descriptor = StoredObjectDescriptor {
            public_id: public_id.clone(),
            resource_kind: request.resource_kind,
            delivery_mode: request.delivery_mode,
        };
        let secure_url = AssetUrl::for_descriptor(
            FAKE_HOST,
            &self.credentials.cloud_name,
            &descriptor,
            Some(FAKE_VERSION),
            format.as_deref(),
        )
        .to_string();
        state.live.insert(descriptor);

        Ok(UploadReceipt {
            public_id,
            version: FAKE_VERSION,
            secure_url,
            format,
            bytes: Some(request.payload.len() as i64),
        })
    }

    async fn destroy(
        &self,
        descriptor: &StoredObjectDescriptor,
        invalidate: bool,
    ) -> StoreResult<DestroyStatus> {
        let mut state = self.state();
        state.destroys.push((descriptor.clone(), invalidate));
        if self.fail_destroys {
            return Err(StoreError::Rejected {
                status: 502,
                message: "simulated destroy failure".into(),
            });
        }

        if state.live.remove(descriptor) {
            Ok(DestroyStatus::Deleted)
        } else {
            Ok(DestroyStatus::NotFound)
        }
    }
}
