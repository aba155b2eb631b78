//! Infrastructure: persistence, blob storage and the application services
//! that orchestrate the domain crates.
//!
//! The domain crates stay pure (no IO, no clocks). Everything here is async
//! and talks to a [`store::RecordStore`] per entity kind, a
//! [`blob::BlobStore`] for uploaded files and a change bus for realtime
//! fan-out.

pub mod blob;
pub mod services;
pub mod store;
pub mod stores;

pub use blob::{BlobError, BlobStore, Bucket, InMemoryBlobStore, LocalBlobStore, public_url};
pub use services::{ServiceConfig, ServiceError, ServiceResult, Services};
pub use store::{
    BatchWriter, InMemoryRecordStore, MemoryDatabase, PostgresBatchWriter, PostgresRecordStore, Record,
    RecordStore, StoreError, StoreResult, Versioned, WriteBatch,
};
pub use stores::Stores;
