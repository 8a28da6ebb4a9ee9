//! Thin typed adapter over the Postgres pool.
//!
//! Everything the store does goes through `Db`: single statements, row
//! streaming, chunked multi-row inserts and transactions. Statements
//! inside a transaction run serially on one connection; on error the
//! transaction is rolled back and the error surfaces with its context.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use futures::future::BoxFuture;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::{PgConnection, Postgres, Transaction};

/// Postgres caps bind parameters per statement; bulk inserts are chunked
/// to stay under it.
const MAX_BIND_PARAMS: usize = 65_535;

/// Transaction isolation levels the store actually uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Isolation {
    fn set_sql(self) -> &'static str {
        match self {
            Self::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// A dynamically typed bind parameter for adapter-level statements.
///
/// Only the types the schema actually stores are represented; adding a
/// variant is cheaper than threading generics through every bulk insert.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Null,
    Bool(bool),
    NullableBool(Option<bool>),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    NullableInt8(Option<i64>),
    Float8(f64),
    Text(String),
    NullableText(Option<String>),
    TextArray(Vec<String>),
    Bytea(Vec<u8>),
    Timestamptz(DateTime<Utc>),
    Jsonb(serde_json::Value),
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn bind_value(q: PgQuery<'_>, value: SqlValue) -> PgQuery<'_> {
    match value {
        SqlValue::Null => q.bind(Option::<String>::None),
        SqlValue::Bool(v) => q.bind(v),
        SqlValue::NullableBool(v) => q.bind(v),
        SqlValue::Int2(v) => q.bind(v),
        SqlValue::Int4(v) => q.bind(v),
        SqlValue::Int8(v) => q.bind(v),
        SqlValue::NullableInt8(v) => q.bind(v),
        SqlValue::Float8(v) => q.bind(v),
        SqlValue::Text(v) => q.bind(v),
        SqlValue::NullableText(v) => q.bind(v),
        SqlValue::TextArray(v) => q.bind(v),
        SqlValue::Bytea(v) => q.bind(v),
        SqlValue::Timestamptz(v) => q.bind(v),
        SqlValue::Jsonb(v) => q.bind(v),
    }
}

fn build_query(sql: &str, args: Vec<SqlValue>) -> PgQuery<'_> {
    let mut q = sqlx::query(sql);
    for arg in args {
        q = bind_value(q, arg);
    }
    q
}

/// Owns the connection pool and exposes the operations the store builds
/// on. Cloning is cheap; the pool is shared.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Executes a statement, returning the number of affected rows.
    pub async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        let done = build_query(sql, args).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    /// Fetches exactly one row; a missing row maps to `NotFound`.
    pub async fn query_row(&self, sql: &str, args: Vec<SqlValue>) -> Result<PgRow> {
        Ok(build_query(sql, args).fetch_one(&self.pool).await?)
    }

    /// Fetches at most one row.
    pub async fn query_opt(&self, sql: &str, args: Vec<SqlValue>) -> Result<Option<PgRow>> {
        Ok(build_query(sql, args).fetch_optional(&self.pool).await?)
    }

    /// Streams every result row through `consumer`. The consumer can
    /// abort the scan by returning an error.
    pub async fn run_query<F>(&self, sql: &str, args: Vec<SqlValue>, mut consumer: F) -> Result<()>
    where
        F: FnMut(PgRow) -> Result<()>,
    {
        let mut rows = build_query(sql, args).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            consumer(row)?;
        }
        Ok(())
    }

    /// Runs `f` inside a transaction at the given isolation level,
    /// committing on Ok and rolling back on error.
    ///
    /// The closure receives the live transaction and must move its
    /// inputs (the borrow of the transaction is the only non-owned
    /// capture the returned future may hold).
    pub async fn transact<T, F>(&self, isolation: Isolation, f: F) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut Transaction<'static, Postgres>) -> BoxFuture<'t, Result<T>>,
    {
        let mut tx = self.pool.begin().await?;
        sqlx::query(isolation.set_sql()).execute(&mut *tx).await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                // Roll back best-effort; the original error is the one
                // worth reporting.
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

/// Inserts `values` into `table` in chunked multi-row statements.
///
/// `conflict_action` is appended verbatim (for example
/// `"ON CONFLICT DO NOTHING"`); pass `""` for a plain insert. Callers
/// are responsible for ordering rows so concurrent writers acquire row
/// locks in a consistent order.
pub async fn bulk_insert(
    conn: &mut PgConnection,
    table: &str,
    columns: &[&str],
    values: Vec<Vec<SqlValue>>,
    conflict_action: &str,
) -> Result<u64> {
    if values.is_empty() {
        return Ok(0);
    }
    for row in &values {
        if row.len() != columns.len() {
            return Err(StoreError::InvalidArgument(format!(
                "bulk insert into {table}: row has {} values, want {}",
                row.len(),
                columns.len()
            )));
        }
    }

    let rows_per_chunk = (MAX_BIND_PARAMS / columns.len()).max(1);
    let mut affected = 0u64;
    for chunk in values.chunks(rows_per_chunk) {
        let sql = multi_row_insert_sql(table, columns, chunk.len(), conflict_action);
        let mut q = sqlx::query(&sql);
        for row in chunk {
            for value in row {
                q = bind_value(q, value.clone());
            }
        }
        let done = q.execute(&mut *conn).await?;
        affected += done.rows_affected();
    }
    Ok(affected)
}

fn multi_row_insert_sql(
    table: &str,
    columns: &[&str],
    row_count: usize,
    conflict_action: &str,
) -> String {
    let mut sql = format!("INSERT INTO {table} ({}) VALUES ", columns.join(", "));
    let mut param = 1usize;
    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..columns.len() {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&param.to_string());
            param += 1;
        }
        sql.push(')');
    }
    if !conflict_action.is_empty() {
        sql.push(' ');
        sql.push_str(conflict_action);
    }
    sql
}
