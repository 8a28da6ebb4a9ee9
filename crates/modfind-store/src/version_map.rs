//! The `version_map` cache: requested version string → stored version.

use crate::Store;
use crate::db::SqlValue;
use crate::error::{Result, StoreError};
use modfind_core::{VersionMapEntry, version};
use sqlx::Row;

impl Store {
    /// Records the resolution of a client-supplied version string. The
    /// `sort_version` column is maintained here so resolver joins can
    /// order on it directly.
    pub async fn upsert_version_map(&self, entry: &VersionMapEntry) -> Result<()> {
        if entry.module_path.is_empty() || entry.requested_version.is_empty() {
            return Err(StoreError::InvalidArgument(
                "version map entry needs module path and requested version".into(),
            ));
        }
        let sort_version = entry
            .resolved_version
            .as_deref()
            .map(version::for_sorting);
        self.db
            .execute(
                "INSERT INTO version_map \
                     (module_path, requested_version, resolved_version, status, error, sort_version) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (module_path, requested_version) DO UPDATE SET \
                     resolved_version = excluded.resolved_version, \
                     status = excluded.status, \
                     error = excluded.error, \
                     sort_version = excluded.sort_version, \
                     updated_at = CURRENT_TIMESTAMP",
                vec![
                    SqlValue::Text(entry.module_path.clone()),
                    SqlValue::Text(entry.requested_version.clone()),
                    SqlValue::NullableText(entry.resolved_version.clone()),
                    SqlValue::Int4(entry.status),
                    SqlValue::NullableText(entry.error.clone()),
                    SqlValue::NullableText(sort_version),
                ],
            )
            .await
            .map_err(|e| e.in_context("upsert version map"))?;
        Ok(())
    }

    pub async fn get_version_map(
        &self,
        module_path: &str,
        requested_version: &str,
    ) -> Result<VersionMapEntry> {
        let row = self
            .db
            .query_row(
                "SELECT module_path, requested_version, resolved_version, status, error, \
                        sort_version \
                 FROM version_map WHERE module_path = $1 AND requested_version = $2",
                vec![
                    SqlValue::Text(module_path.to_string()),
                    SqlValue::Text(requested_version.to_string()),
                ],
            )
            .await?;
        Ok(VersionMapEntry {
            module_path: row.try_get("module_path")?,
            requested_version: row.try_get("requested_version")?,
            resolved_version: row.try_get("resolved_version")?,
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            sort_version: row.try_get("sort_version")?,
        })
    }
}
