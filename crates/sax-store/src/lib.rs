//! Remote object storage for the Sax platform environment.
//!
//! Sax cells keep their metadata under a single root that can live either on
//! a local filesystem or in a bucket-addressed object store. This crate owns
//! the object-store half: a small [`RemoteStore`] trait speaking in
//! `(bucket, key)` pairs, and the backends implementing it.
//!
//! # Storage Backends
//!
//! - [`InMemoryRemoteStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`GcsRemoteStore`] -- Google Cloud Storage through the `object_store` crate
//!
//! # Design Rules
//!
//! 1. Object writes are single-shot: a reader never observes a partial object.
//! 2. There are no directories. Hierarchy is a naming convention over keys,
//!    surfaced only through delimiter-based listing.
//! 3. "Not found" is the one failure callers may branch on
//!    ([`StoreError::is_not_found`]); everything else is opaque.
//! 4. Backends never retry. Errors are propagated to the caller as-is.

pub mod error;
pub mod gcs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use gcs::GcsRemoteStore;
pub use memory::InMemoryRemoteStore;
pub use traits::{Listing, ObjectAttrs, RemoteStore};
