//! Service layer: identity derivation, signing, the object store client and
//! the archive metadata store built on top of them.

pub mod archive_service;
pub mod asset_url;
#[cfg(test)]
pub mod fake_store;
pub mod object_store;
pub mod public_id;
pub mod signing;
pub mod transfer_service;
