use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use opsconsole_core::{DepartmentId, ExpectedVersion, INITIAL_VERSION};

use super::batch::{BatchWriter, RowOp, RowWrite, WriteBatch};
use super::{Record, RecordStore, StoreError, StoreResult, Versioned, decode};

#[derive(Debug, Clone)]
struct StoredRow {
    department_id: Option<Uuid>,
    body: serde_json::Value,
    version: u64,
}

type Rows = BTreeMap<(&'static str, Uuid), StoredRow>;

/// Process-local row table shared by every in-memory store, laid out like the
/// Postgres `records` table so batches can span entity kinds.
///
/// Keyed by `(kind, id)` in a `BTreeMap`, so listing follows id order, which
/// for UUIDv7 ids is creation order.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    rows: RwLock<Rows>,
}

fn poisoned() -> StoreError {
    StoreError::Backend("record store lock poisoned".to_string())
}

/// Applies one write, returning the row it replaced and the resulting
/// version (0 for deletes).
fn apply_one(rows: &mut Rows, write: RowWrite) -> StoreResult<(Option<StoredRow>, u64)> {
    let key = (write.kind, write.id);
    let previous = rows.get(&key).cloned();
    let version = match (write.op, previous.as_ref()) {
        (RowOp::Insert { .. }, Some(_)) => {
            return Err(StoreError::Conflict {
                kind: write.kind,
                id: write.id.to_string(),
            });
        }
        (RowOp::Insert { department_id, body }, None) => {
            rows.insert(
                key,
                StoredRow {
                    department_id,
                    body,
                    version: INITIAL_VERSION,
                },
            );
            INITIAL_VERSION
        }
        (RowOp::Update { .. }, None) => {
            return Err(StoreError::NotFound {
                kind: write.kind,
                id: write.id.to_string(),
            });
        }
        (
            RowOp::Update {
                department_id,
                body,
                expected,
            },
            Some(current),
        ) => {
            if !expected.matches(current.version) {
                return Err(StoreError::Stale {
                    kind: write.kind,
                    id: write.id.to_string(),
                    expected: match expected {
                        ExpectedVersion::Exact(wanted) => wanted,
                        ExpectedVersion::Any => current.version,
                    },
                    actual: current.version,
                });
            }
            let version = current.version + 1;
            rows.insert(
                key,
                StoredRow {
                    department_id,
                    body,
                    version,
                },
            );
            version
        }
        (RowOp::Upsert { department_id, body }, current) => {
            let version = current.map_or(INITIAL_VERSION, |r| r.version + 1);
            rows.insert(
                key,
                StoredRow {
                    department_id,
                    body,
                    version,
                },
            );
            version
        }
        (RowOp::Delete, _) => {
            rows.remove(&key);
            0
        }
    };
    Ok((previous, version))
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the writes in order under one lock; on the first failure every
    /// earlier write is undone.
    pub(crate) fn apply(&self, writes: Vec<RowWrite>) -> StoreResult<Vec<u64>> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let mut undo = Vec::with_capacity(writes.len());
        let mut versions = Vec::with_capacity(writes.len());

        for write in writes {
            let key = (write.kind, write.id);
            match apply_one(&mut rows, write) {
                Ok((previous, version)) => {
                    undo.push((key, previous));
                    versions.push(version);
                }
                Err(e) => {
                    for (key, previous) in undo.into_iter().rev() {
                        match previous {
                            Some(row) => rows.insert(key, row),
                            None => rows.remove(&key),
                        };
                    }
                    return Err(e);
                }
            }
        }
        Ok(versions)
    }

    fn read(&self, kind: &'static str, id: Uuid) -> StoreResult<Option<StoredRow>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&(kind, id)).cloned())
    }

    fn scan(
        &self,
        kind: &'static str,
        keep: impl Fn(&StoredRow) -> bool,
    ) -> StoreResult<Vec<serde_json::Value>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|((k, _), row)| *k == kind && keep(row))
            .map(|(_, row)| row.body.clone())
            .collect())
    }

    fn remove(&self, kind: &'static str, id: Uuid) -> StoreResult<bool> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        Ok(rows.remove(&(kind, id)).is_some())
    }
}

#[async_trait]
impl BatchWriter for MemoryDatabase {
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.apply(batch.into_writes()).map(|_| ())
    }
}

/// Typed view of one entity kind in a [`MemoryDatabase`], for dev and tests.
#[derive(Debug)]
pub struct InMemoryRecordStore<E> {
    db: Arc<MemoryDatabase>,
    _record: PhantomData<fn() -> E>,
}

impl<E> InMemoryRecordStore<E> {
    /// A store with a database of its own.
    pub fn new() -> Self {
        Self::in_database(Arc::new(MemoryDatabase::new()))
    }

    pub fn in_database(db: Arc<MemoryDatabase>) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }
}

impl<E> Default for InMemoryRecordStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Record> InMemoryRecordStore<E> {
    fn write_one(&self, write: RowWrite) -> StoreResult<u64> {
        Ok(self.db.apply(vec![write])?.first().copied().unwrap_or_default())
    }
}

#[async_trait]
impl<E: Record> RecordStore<E> for InMemoryRecordStore<E> {
    async fn get_versioned(&self, id: E::Id) -> StoreResult<Option<Versioned<E>>> {
        self.db
            .read(E::KIND, id.into())?
            .map(|row| {
                Ok(Versioned {
                    record: decode(row.body)?,
                    version: row.version,
                })
            })
            .transpose()
    }

    async fn insert(&self, record: E) -> StoreResult<()> {
        self.write_one(RowWrite::insert(&record)?).map(|_| ())
    }

    async fn update_expected(&self, record: E, expected: ExpectedVersion) -> StoreResult<u64> {
        self.write_one(RowWrite::update(&record, expected)?)
    }

    async fn upsert(&self, record: E) -> StoreResult<()> {
        self.write_one(RowWrite::upsert(&record)?).map(|_| ())
    }

    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        self.db.remove(E::KIND, id.into())
    }

    async fn list(&self) -> StoreResult<Vec<E>> {
        self.db.scan(E::KIND, |_| true)?.into_iter().map(decode).collect()
    }

    async fn list_by_department(&self, departments: &[DepartmentId]) -> StoreResult<Vec<E>> {
        let wanted: Vec<Uuid> = departments.iter().map(|d| *d.as_uuid()).collect();
        self.db
            .scan(E::KIND, |row| row.department_id.is_some_and(|d| wanted.contains(&d)))?
            .into_iter()
            .map(decode)
            .collect()
    }
}
