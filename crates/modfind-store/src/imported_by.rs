//! Periodic recomputation of `imported_by_count` across all search
//! packages.

use crate::Store;
use crate::db::{Isolation, SqlValue, bulk_insert};
use crate::error::Result;
use modfind_core::{paths, types::STDLIB_MODULE_PATH};
use sqlx::Row;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Counts are applied in batches so one bad batch cannot sink the sweep.
const UPDATE_BATCH_SIZE: usize = 5_000;

impl Store {
    /// Recomputes reverse-import counts from `imports_unique` and
    /// applies the rows that changed. Returns the number of updated
    /// packages. Batch failures are logged and retried on the next
    /// sweep rather than failing the whole run.
    pub async fn update_search_documents_imported_by_count(&self) -> Result<i64> {
        let current = self.read_current_counts().await?;
        let computed = self.compute_counts(&current).await?;

        let mut changed: Vec<(String, i64)> = current
            .iter()
            .filter_map(|(path, &count)| {
                let new_count = computed.get(path).copied().unwrap_or(0);
                (new_count != count).then(|| (path.clone(), new_count))
            })
            .collect();
        changed.sort();
        info!(
            total = current.len(),
            changed = changed.len(),
            "imported-by sweep computed"
        );

        let mut updated = 0i64;
        for batch in changed.chunks(UPDATE_BATCH_SIZE) {
            match self.apply_count_batch(batch).await {
                Ok(n) => updated += n,
                Err(err) => {
                    warn!(error = %err, batch_len = batch.len(), "imported-by batch failed");
                }
            }
        }
        Ok(updated)
    }

    async fn read_current_counts(&self) -> Result<HashMap<String, i64>> {
        let mut counts = HashMap::new();
        self.db
            .run_query(
                "SELECT package_path, imported_by_count FROM search_documents",
                vec![],
                |row| {
                    counts.insert(
                        row.try_get::<String, _>("package_path")?,
                        row.try_get::<i64, _>("imported_by_count")?,
                    );
                    Ok(())
                },
            )
            .await?;
        Ok(counts)
    }

    /// Scans `imports_unique`, counting distinct importers per target
    /// path. Edges from paths we do not index and intra-module edges
    /// are ignored; for the stdlib pseudo-module "intra-module" means
    /// the target is itself in the stdlib.
    async fn compute_counts(
        &self,
        current: &HashMap<String, i64>,
    ) -> Result<HashMap<String, i64>> {
        let mut edges: HashSet<(String, String)> = HashSet::new();
        self.db
            .run_query(
                "SELECT from_path, from_module_path, to_path FROM imports_unique",
                vec![],
                |row| {
                    let from_path: String = row.try_get("from_path")?;
                    let from_module_path: String = row.try_get("from_module_path")?;
                    let to_path: String = row.try_get("to_path")?;
                    if !current.contains_key(&from_path) {
                        return Ok(());
                    }
                    let intra_module = if from_module_path == STDLIB_MODULE_PATH {
                        paths::is_stdlib_path(&to_path)
                    } else {
                        paths::module_contains(&from_module_path, &to_path)
                    };
                    if !intra_module {
                        edges.insert((from_path, to_path));
                    }
                    Ok(())
                },
            )
            .await?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for (_, to_path) in edges {
            *counts.entry(to_path).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Applies one batch inside a transaction: stage the counts in a
    /// temp table, lock `search_documents` against concurrent package
    /// upserts, update by join.
    async fn apply_count_batch(&self, batch: &[(String, i64)]) -> Result<i64> {
        let rows: Vec<Vec<SqlValue>> = batch
            .iter()
            .map(|(path, count)| {
                vec![SqlValue::Text(path.clone()), SqlValue::Int8(*count)]
            })
            .collect();
        self.db
            .transact(Isolation::ReadCommitted, move |tx| {
                Box::pin(async move {
                    sqlx::query(
                        "CREATE TEMPORARY TABLE computed_imported_by_counts ( \
                             package_path TEXT NOT NULL, \
                             imported_by_count BIGINT NOT NULL) ON COMMIT DROP",
                    )
                    .execute(&mut **tx)
                    .await?;
                    bulk_insert(
                        &mut **tx,
                        "computed_imported_by_counts",
                        &["package_path", "imported_by_count"],
                        rows,
                        "",
                    )
                    .await?;
                    sqlx::query("LOCK TABLE search_documents IN SHARE ROW EXCLUSIVE MODE")
                        .execute(&mut **tx)
                        .await?;
                    let done = sqlx::query(
                        "UPDATE search_documents sd SET \
                             imported_by_count = c.imported_by_count, \
                             imported_by_count_updated_at = CURRENT_TIMESTAMP \
                         FROM computed_imported_by_counts c \
                         WHERE sd.package_path = c.package_path",
                    )
                    .execute(&mut **tx)
                    .await?;
                    // Symbol rows denormalise the same count; keep them
                    // in step within the same transaction.
                    sqlx::query(
                        "UPDATE symbol_search_documents ssd SET \
                             imported_by_count = c.imported_by_count \
                         FROM computed_imported_by_counts c \
                         WHERE ssd.package_path = c.package_path",
                    )
                    .execute(&mut **tx)
                    .await?;
                    Ok(done.rows_affected() as i64)
                })
            })
            .await
            .map_err(|e| e.in_context("apply imported-by batch"))
    }
}
