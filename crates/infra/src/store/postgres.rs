//! Postgres-backed record store.
//!
//! All kinds share the `records` table (see `migrations/`). Rows are keyed by
//! `(kind, id)`; the serde body is stored as JSONB next to a copy of the
//! record's department so department-scoped listing stays in SQL, and a
//! `version` column that every update bumps.
//!
//! Compare-and-swap updates put the expected version in the `WHERE` clause,
//! so the check and the write are one statement.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | no row updated, row exists | | `Stale` |
//! | no row updated, row missing | | `NotFound` |
//! | any other | | `Backend` |

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use opsconsole_core::{DepartmentId, ExpectedVersion, INITIAL_VERSION};

use super::batch::{BatchWriter, RowOp, RowWrite, WriteBatch};
use super::{Record, RecordStore, StoreError, StoreResult, Versioned, decode};

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
}

pub struct PostgresRecordStore<E> {
    pool: PgPool,
    _record: PhantomData<fn() -> E>,
}

impl<E> PostgresRecordStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }
}

impl<E> Clone for PostgresRecordStore<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

fn body_of<E: Record>(row: &sqlx::postgres::PgRow) -> StoreResult<E> {
    let body: serde_json::Value = row
        .try_get("body")
        .map_err(|e| map_sqlx_error("decode", e))?;
    decode(body)
}

fn version_of(row: &sqlx::postgres::PgRow) -> StoreResult<u64> {
    let version: i64 = row
        .try_get("version")
        .map_err(|e| map_sqlx_error("decode", e))?;
    Ok(version as u64)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

/// Runs one row write on `conn` and returns the row's new version (0 for a
/// delete). Used both for single-record calls and inside batch transactions.
async fn execute_write(conn: &mut PgConnection, write: &RowWrite) -> StoreResult<u64> {
    match &write.op {
        RowOp::Insert {
            department_id,
            body,
        } => {
            let result = sqlx::query(
                r#"
                INSERT INTO records (kind, id, department_id, body, version)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(write.kind)
            .bind(write.id)
            .bind(department_id)
            .bind(body)
            .bind(INITIAL_VERSION as i64)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(_) => Ok(INITIAL_VERSION),
                Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
                    kind: write.kind,
                    id: write.id.to_string(),
                }),
                Err(e) => Err(map_sqlx_error("insert", e)),
            }
        }
        RowOp::Update {
            department_id,
            body,
            expected,
        } => {
            let wanted = match expected {
                ExpectedVersion::Any => None,
                ExpectedVersion::Exact(v) => Some(*v as i64),
            };
            let updated = sqlx::query(
                r#"
                UPDATE records
                SET department_id = $3, body = $4, version = version + 1, updated_at = NOW()
                WHERE kind = $1 AND id = $2 AND ($5::BIGINT IS NULL OR version = $5)
                RETURNING version
                "#,
            )
            .bind(write.kind)
            .bind(write.id)
            .bind(department_id)
            .bind(body)
            .bind(wanted)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

            if let Some(row) = updated {
                return version_of(&row);
            }

            let current = sqlx::query("SELECT version FROM records WHERE kind = $1 AND id = $2")
                .bind(write.kind)
                .bind(write.id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("update", e))?;
            match (current, wanted) {
                (Some(row), Some(wanted)) => Err(StoreError::Stale {
                    kind: write.kind,
                    id: write.id.to_string(),
                    expected: wanted as u64,
                    actual: version_of(&row)?,
                }),
                _ => Err(StoreError::NotFound {
                    kind: write.kind,
                    id: write.id.to_string(),
                }),
            }
        }
        RowOp::Upsert {
            department_id,
            body,
        } => {
            let row = sqlx::query(
                r#"
                INSERT INTO records (kind, id, department_id, body, version)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (kind, id)
                DO UPDATE SET
                    department_id = EXCLUDED.department_id,
                    body = EXCLUDED.body,
                    version = records.version + 1,
                    updated_at = NOW()
                RETURNING version
                "#,
            )
            .bind(write.kind)
            .bind(write.id)
            .bind(department_id)
            .bind(body)
            .bind(INITIAL_VERSION as i64)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("upsert", e))?;
            version_of(&row)
        }
        RowOp::Delete => {
            sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2")
                .bind(write.kind)
                .bind(write.id)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("delete", e))?;
            Ok(0)
        }
    }
}

impl<E: Record> PostgresRecordStore<E> {
    async fn write_one(&self, write: RowWrite) -> StoreResult<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        execute_write(&mut conn, &write).await
    }
}

#[async_trait]
impl<E: Record> RecordStore<E> for PostgresRecordStore<E> {
    #[instrument(skip(self), fields(kind = E::KIND), err)]
    async fn get_versioned(&self, id: E::Id) -> StoreResult<Option<Versioned<E>>> {
        let id: Uuid = id.into();
        let row = sqlx::query("SELECT body, version FROM records WHERE kind = $1 AND id = $2")
            .bind(E::KIND)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref()
            .map(|row| {
                Ok(Versioned {
                    record: body_of::<E>(row)?,
                    version: version_of(row)?,
                })
            })
            .transpose()
    }

    #[instrument(skip(self, record), fields(kind = E::KIND), err)]
    async fn insert(&self, record: E) -> StoreResult<()> {
        self.write_one(RowWrite::insert(&record)?).await.map(|_| ())
    }

    #[instrument(skip(self, record), fields(kind = E::KIND), err)]
    async fn update_expected(&self, record: E, expected: ExpectedVersion) -> StoreResult<u64> {
        self.write_one(RowWrite::update(&record, expected)?).await
    }

    #[instrument(skip(self, record), fields(kind = E::KIND), err)]
    async fn upsert(&self, record: E) -> StoreResult<()> {
        self.write_one(RowWrite::upsert(&record)?).await.map(|_| ())
    }

    #[instrument(skip(self), fields(kind = E::KIND), err)]
    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        let id: Uuid = id.into();
        let done = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2")
            .bind(E::KIND)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(done.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(kind = E::KIND), err)]
    async fn list(&self) -> StoreResult<Vec<E>> {
        let rows = sqlx::query("SELECT body FROM records WHERE kind = $1 ORDER BY id ASC")
            .bind(E::KIND)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;
        rows.iter().map(body_of::<E>).collect()
    }

    #[instrument(skip(self, departments), fields(kind = E::KIND), err)]
    async fn list_by_department(&self, departments: &[DepartmentId]) -> StoreResult<Vec<E>> {
        let ids: Vec<Uuid> = departments.iter().map(|d| *d.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT body FROM records
            WHERE kind = $1 AND department_id = ANY($2)
            ORDER BY id ASC
            "#,
        )
        .bind(E::KIND)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_department", e))?;
        rows.iter().map(body_of::<E>).collect()
    }
}

/// Commits a [`WriteBatch`] inside one Postgres transaction.
#[derive(Clone)]
pub struct PostgresBatchWriter {
    pool: PgPool,
}

impl PostgresBatchWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchWriter for PostgresBatchWriter {
    #[instrument(skip(self, batch), fields(writes = batch.len()), err)]
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for write in batch.into_writes() {
            if let Err(e) = execute_write(&mut tx, &write).await {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e);
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}
