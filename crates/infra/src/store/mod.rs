//! Record storage: one keyed collection per entity kind.
//!
//! Stores are dumb persistence. Validation, authorization and cross-record
//! consistency live in the services; the store only guarantees that `insert`
//! never overwrites, `update` never creates, and an update made with
//! `ExpectedVersion::Exact` never lands over a newer row.
//!
//! Writes that belong together (an item and its stock transaction, a fleet
//! and its maintenance record) are staged in a [`WriteBatch`] and committed
//! through the backend's [`BatchWriter`]: all of them land or none do.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use opsconsole_core::{DepartmentId, Entity, ExpectedVersion};

pub mod batch;
pub mod in_memory;
pub mod postgres;

pub use batch::{BatchWriter, WriteBatch};
pub use in_memory::{InMemoryRecordStore, MemoryDatabase};
pub use postgres::{PostgresBatchWriter, PostgresRecordStore, migrate};

/// Anything the stores can persist.
pub trait Record: Entity + Serialize + DeserializeOwned {}

impl<T> Record for T where T: Entity + Serialize + DeserializeOwned {}

/// A record together with the row version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<E> {
    pub record: E,
    pub version: u64,
}

impl<E> Versioned<E> {
    /// Expectation for writing this record back.
    pub fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.version)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    Conflict { kind: &'static str, id: String },

    #[error("{kind} {id} was changed by another writer (expected version {expected}, found {actual})")]
    Stale {
        kind: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("could not (de)serialize {kind}: {message}")]
    Serialization { kind: &'static str, message: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// A retry against fresh data may succeed.
    pub fn is_stale(&self) -> bool {
        matches!(self, StoreError::Stale { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn encode<E: Record>(record: &E) -> StoreResult<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization {
        kind: E::KIND,
        message: e.to_string(),
    })
}

pub(crate) fn decode<E: Record>(body: serde_json::Value) -> StoreResult<E> {
    serde_json::from_value(body).map_err(|e| StoreError::Serialization {
        kind: E::KIND,
        message: e.to_string(),
    })
}

#[async_trait]
pub trait RecordStore<E: Record>: Send + Sync {
    async fn get_versioned(&self, id: E::Id) -> StoreResult<Option<Versioned<E>>>;

    async fn get(&self, id: E::Id) -> StoreResult<Option<E>> {
        Ok(self.get_versioned(id).await?.map(|v| v.record))
    }

    /// Fails with `Conflict` when the id is taken.
    async fn insert(&self, record: E) -> StoreResult<()>;

    /// Fails with `NotFound` when the id is unknown and with `Stale` when the
    /// row moved past `expected`. Returns the new version.
    async fn update_expected(&self, record: E, expected: ExpectedVersion) -> StoreResult<u64>;

    async fn update(&self, record: E) -> StoreResult<()> {
        self.update_expected(record, ExpectedVersion::Any).await.map(|_| ())
    }

    async fn upsert(&self, record: E) -> StoreResult<()>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: E::Id) -> StoreResult<bool>;

    /// All records, oldest id first.
    async fn list(&self) -> StoreResult<Vec<E>>;

    async fn list_by_department(&self, departments: &[DepartmentId]) -> StoreResult<Vec<E>>;

    /// `get` that treats a missing row as an error.
    async fn require(&self, id: E::Id) -> StoreResult<E> {
        Ok(self.require_versioned(id).await?.record)
    }

    async fn require_versioned(&self, id: E::Id) -> StoreResult<Versioned<E>> {
        self.get_versioned(id).await?.ok_or_else(|| StoreError::NotFound {
            kind: E::KIND,
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl<E, S> RecordStore<E> for Arc<S>
where
    E: Record,
    S: RecordStore<E> + ?Sized,
{
    async fn get_versioned(&self, id: E::Id) -> StoreResult<Option<Versioned<E>>> {
        (**self).get_versioned(id).await
    }

    async fn get(&self, id: E::Id) -> StoreResult<Option<E>> {
        (**self).get(id).await
    }

    async fn insert(&self, record: E) -> StoreResult<()> {
        (**self).insert(record).await
    }

    async fn update_expected(&self, record: E, expected: ExpectedVersion) -> StoreResult<u64> {
        (**self).update_expected(record, expected).await
    }

    async fn update(&self, record: E) -> StoreResult<()> {
        (**self).update(record).await
    }

    async fn upsert(&self, record: E) -> StoreResult<()> {
        (**self).upsert(record).await
    }

    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        (**self).delete(id).await
    }

    async fn list(&self) -> StoreResult<Vec<E>> {
        (**self).list().await
    }

    async fn list_by_department(&self, departments: &[DepartmentId]) -> StoreResult<Vec<E>> {
        (**self).list_by_department(departments).await
    }
}
