//! Multi-record writes that commit as one unit.

use async_trait::async_trait;
use uuid::Uuid;

use opsconsole_core::ExpectedVersion;

use super::{Record, StoreResult, encode};

/// One row-level write, already serialized. Both backends consume these, so a
/// typed store call and a batch go through the same code.
#[derive(Debug, Clone)]
pub(crate) struct RowWrite {
    pub(crate) kind: &'static str,
    pub(crate) id: Uuid,
    pub(crate) op: RowOp,
}

#[derive(Debug, Clone)]
pub(crate) enum RowOp {
    Insert {
        department_id: Option<Uuid>,
        body: serde_json::Value,
    },
    Update {
        department_id: Option<Uuid>,
        body: serde_json::Value,
        expected: ExpectedVersion,
    },
    Upsert {
        department_id: Option<Uuid>,
        body: serde_json::Value,
    },
    /// Removing a row that is already gone is not an error.
    Delete,
}

fn department_uuid<E: Record>(record: &E) -> Option<Uuid> {
    record.department_id().map(|d| *d.as_uuid())
}

impl RowWrite {
    pub(crate) fn insert<E: Record>(record: &E) -> StoreResult<Self> {
        Ok(Self {
            kind: E::KIND,
            id: record.id().into(),
            op: RowOp::Insert {
                department_id: department_uuid(record),
                body: encode(record)?,
            },
        })
    }

    pub(crate) fn update<E: Record>(record: &E, expected: ExpectedVersion) -> StoreResult<Self> {
        Ok(Self {
            kind: E::KIND,
            id: record.id().into(),
            op: RowOp::Update {
                department_id: department_uuid(record),
                body: encode(record)?,
                expected,
            },
        })
    }

    pub(crate) fn upsert<E: Record>(record: &E) -> StoreResult<Self> {
        Ok(Self {
            kind: E::KIND,
            id: record.id().into(),
            op: RowOp::Upsert {
                department_id: department_uuid(record),
                body: encode(record)?,
            },
        })
    }

    pub(crate) fn delete<E: Record>(id: E::Id) -> Self {
        Self {
            kind: E::KIND,
            id: id.into(),
            op: RowOp::Delete,
        }
    }
}

/// Staged writes, applied in order on commit.
///
/// Records are serialized while staging, so a record that cannot be encoded
/// fails before anything is sent to the backend.
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<RowWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<E: Record>(&mut self, record: &E) -> StoreResult<()> {
        self.writes.push(RowWrite::insert(record)?);
        Ok(())
    }

    pub fn update<E: Record>(&mut self, record: &E, expected: ExpectedVersion) -> StoreResult<()> {
        self.writes.push(RowWrite::update(record, expected)?);
        Ok(())
    }

    pub fn upsert<E: Record>(&mut self, record: &E) -> StoreResult<()> {
        self.writes.push(RowWrite::upsert(record)?);
        Ok(())
    }

    pub fn delete<E: Record>(&mut self, id: E::Id) {
        self.writes.push(RowWrite::delete::<E>(id));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn into_writes(self) -> Vec<RowWrite> {
        self.writes
    }
}

#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Applies every staged write, or none of them when any one fails.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
